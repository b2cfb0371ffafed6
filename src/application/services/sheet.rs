use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::{
    ports::SheetStore, DomainError, ExtractionRecord, SessionContext, SpreadsheetRef,
};

/// Body of a save request: one record or a reviewed batch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SavePayload {
    Many(Vec<ExtractionRecord>),
    Single(ExtractionRecord),
}

impl SavePayload {
    pub fn into_records(self) -> Vec<ExtractionRecord> {
        match self {
            Self::Many(records) => records,
            Self::Single(record) => vec![record],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetHeaders {
    pub spreadsheet_id: String,
    pub headers: Vec<String>,
}

pub struct SheetService {
    store: Arc<dyn SheetStore>,
}

impl SheetService {
    pub fn new(store: Arc<dyn SheetStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, session))]
    pub async fn headers(
        &self,
        session: &SessionContext,
        url: &str,
    ) -> Result<SheetHeaders, DomainError> {
        let sheet = SpreadsheetRef::parse(url)?;
        let headers = self.require_headers(session, &sheet).await?;
        Ok(SheetHeaders {
            spreadsheet_id: sheet.id().to_string(),
            headers,
        })
    }

    /// Appends records, mapping each field to the column whose header matches.
    /// Returns the number of rows written.
    #[instrument(skip(self, session, payload))]
    pub async fn save(
        &self,
        session: &SessionContext,
        url: &str,
        payload: SavePayload,
    ) -> Result<usize, DomainError> {
        let sheet = SpreadsheetRef::parse(url)?;
        let records = payload.into_records();
        if records.is_empty() {
            return Err(DomainError::validation("No records to save"));
        }

        let headers = self.require_headers(session, &sheet).await?;
        let rows: Vec<Vec<String>> = records.iter().map(|r| r.to_row(&headers)).collect();
        let count = rows.len();

        self.store.append_rows(session, &sheet, rows).await?;
        info!(spreadsheet = sheet.id(), rows = count, "rows appended");
        Ok(count)
    }

    #[instrument(skip(self, session))]
    pub async fn update_headers(
        &self,
        session: &SessionContext,
        url: &str,
        headers: &[String],
    ) -> Result<(), DomainError> {
        let sheet = SpreadsheetRef::parse(url)?;
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(DomainError::validation("Headers array is required"));
        }
        self.store.update_headers(session, &sheet, headers).await
    }

    async fn require_headers(
        &self,
        session: &SessionContext,
        sheet: &SpreadsheetRef,
    ) -> Result<Vec<String>, DomainError> {
        let headers = self.store.fetch_headers(session, sheet).await?;
        if headers.is_empty() {
            return Err(DomainError::validation(
                "Sheet is empty or headers not found in row 1",
            ));
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemorySheetStore;

    const URL: &str = "https://docs.google.com/spreadsheets/d/sheet-1/edit";

    fn session() -> SessionContext {
        SessionContext::new("token")
    }

    fn service_with_headers(headers: &[&str]) -> (SheetService, Arc<InMemorySheetStore>) {
        let store = Arc::new(InMemorySheetStore::new());
        store.seed("sheet-1", headers.iter().map(|h| h.to_string()).collect());
        (SheetService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_headers() {
        let (service, _) = service_with_headers(&["No", "Nama", "Tanggal"]);
        let result = service.headers(&session(), URL).await.unwrap();
        assert_eq!(result.spreadsheet_id, "sheet-1");
        assert_eq!(result.headers, vec!["No", "Nama", "Tanggal"]);
    }

    #[tokio::test]
    async fn test_headers_of_empty_sheet() {
        let service = SheetService::new(Arc::new(InMemorySheetStore::new()));
        let err = service.headers(&session(), URL).await.unwrap_err();
        assert!(err.to_string().contains("headers not found"));
    }

    #[tokio::test]
    async fn test_save_maps_fields_to_columns() {
        let (service, store) = service_with_headers(&["Tanggal", "Alamat", "Nama"]);
        let payload: SavePayload = serde_json::from_str(
            r#"[{"Nama": "Budi", "Tanggal": "01-01-2026"}, {"Nama": "Siti", "Extra": "x"}]"#,
        )
        .unwrap();

        let rows = service.save(&session(), URL, payload).await.unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            store.rows("sheet-1"),
            vec![
                vec!["Tanggal", "Alamat", "Nama"],
                vec!["01-01-2026", "", "Budi"],
                vec!["", "", "Siti"],
            ]
        );
    }

    #[tokio::test]
    async fn test_save_single_record() {
        let (service, store) = service_with_headers(&["Nama"]);
        let payload: SavePayload = serde_json::from_str(r#"{"Nama": "Budi"}"#).unwrap();
        assert!(matches!(payload, SavePayload::Single(_)));

        service.save(&session(), URL, payload).await.unwrap();
        assert_eq!(store.rows("sheet-1").len(), 2);
    }

    #[tokio::test]
    async fn test_save_rejects_bad_url_and_empty_batch() {
        let (service, _) = service_with_headers(&["Nama"]);
        let err = service
            .save(&session(), "https://example.com", SavePayload::Many(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m == "Invalid Spreadsheet URL"));

        let err = service
            .save(&session(), URL, SavePayload::Many(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_headers() {
        let (service, store) = service_with_headers(&["Old"]);
        let headers = vec!["Nama".to_string(), "Tanggal".to_string()];
        service.update_headers(&session(), URL, &headers).await.unwrap();
        assert_eq!(store.rows("sheet-1")[0], headers);

        assert!(service.update_headers(&session(), URL, &[]).await.is_err());
    }
}
