use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::{ports::SheetStore, DomainError, SessionContext, SpreadsheetRef};
use crate::infrastructure::config::SheetsConfig;

/// Google Sheets v4 values API, authorized with the caller's bearer token.
pub struct GoogleSheetsStore {
    client: reqwest::Client,
    api_base: Url,
    header_range: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
}

impl GoogleSheetsStore {
    pub fn new(config: &SheetsConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| DomainError::internal(format!("Invalid sheets api_base: {e}")))?;
        Ok(Self {
            client,
            api_base,
            header_range: config.header_range.clone(),
        })
    }

    fn values_url(&self, sheet: &SpreadsheetRef, range: &str) -> Result<Url, DomainError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| DomainError::internal("Sheets api_base cannot be a base URL"))?
            .pop_if_empty()
            .extend(["spreadsheets", sheet.id(), "values", range]);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, DomainError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GoogleErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| format!("Sheets API returned {}", status.as_u16()));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(DomainError::unauthorized(message))
            }
            _ => Err(DomainError::external(message)),
        }
    }
}

fn transport(e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::timeout("Sheets API request timed out")
    } else {
        DomainError::external(format!("Sheets API request failed: {e}"))
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    #[instrument(skip(self, session), fields(spreadsheet = sheet.id()))]
    async fn fetch_headers(
        &self,
        session: &SessionContext,
        sheet: &SpreadsheetRef,
    ) -> Result<Vec<String>, DomainError> {
        let url = self.values_url(sheet, &self.header_range)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(session.access_token())
            .send()
            .await
            .map_err(transport)?;

        let range: ValueRange = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::external(format!("Invalid Sheets response: {e}")))?;

        let headers = range.values.into_iter().next().unwrap_or_default();
        debug!(columns = headers.len(), "headers fetched");
        Ok(headers)
    }

    #[instrument(skip(self, session, rows), fields(spreadsheet = sheet.id(), rows = rows.len()))]
    async fn append_rows(
        &self,
        session: &SessionContext,
        sheet: &SpreadsheetRef,
        rows: Vec<Vec<String>>,
    ) -> Result<(), DomainError> {
        let mut url = self.values_url(sheet, "A1:append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        let response = self
            .client
            .post(url)
            .bearer_auth(session.access_token())
            .json(&json!({ "values": rows }))
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, session, headers), fields(spreadsheet = sheet.id()))]
    async fn update_headers(
        &self,
        session: &SessionContext,
        sheet: &SpreadsheetRef,
        headers: &[String],
    ) -> Result<(), DomainError> {
        let mut url = self.values_url(sheet, "A1")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        let response = self
            .client
            .put(url)
            .bearer_auth(session.access_token())
            .json(&json!({ "values": [headers] }))
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await?;
        Ok(())
    }
}
