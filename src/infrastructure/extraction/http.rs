use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::{
    ports::DocumentExtractor, Document, DomainError, ExtractionError, ExtractionRecord,
    RawExtraction, Schema,
};
use crate::infrastructure::config::ExtractionConfig;

/// Client for a remote extraction endpoint (`POST /api/v1/extract`).
///
/// Sends the document as the `file` part and the JSON-encoded field list as
/// the `headers` part. Does not retry.
pub struct HttpExtractionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExtractionClient {
    pub fn new(config: &ExtractionConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(Self::with_client(client, &config.endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(document: &Document, schema: &Schema) -> Result<Form, ExtractionError> {
        let file = Part::bytes(document.content().to_vec())
            .file_name(document.name().to_string())
            .mime_str(document.mime_type().as_ref())
            .map_err(|e| ExtractionError::invalid_input(e.to_string()))?;
        Ok(Form::new()
            .part("file", file)
            .text("headers", schema.to_json()))
    }
}

#[async_trait]
impl DocumentExtractor for HttpExtractionClient {
    #[instrument(skip_all, fields(document = document.name(), endpoint = %self.endpoint))]
    async fn extract_one(
        &self,
        document: &Document,
        schema: &Schema,
    ) -> Result<Vec<ExtractionRecord>, ExtractionError> {
        document.validate()?;

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(Self::form(document, schema)?)
            .send()
            .await
            .map_err(|e| ExtractionError::transport(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExtractionError::transport(format!("Failed to read response: {e}")))?;
        debug!(status = status.as_u16(), bytes = body.len(), "extraction endpoint answered");

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| {
                format!("Extraction service returned HTTP {}", status.as_u16())
            });
            return Err(ExtractionError::upstream(status.as_u16(), message));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "extraction endpoint returned non-JSON body");
            ExtractionError::malformed(e.to_string())
        })?;

        let payload = unwrap_envelope(value, status.as_u16())?;
        let raw = RawExtraction::from_value(payload, schema)
            .map_err(|e| ExtractionError::malformed(e.to_string()))?;
        Ok(raw.normalize(schema))
    }
}

/// Strips `{ "success": true, "data": ... }`; raw objects and arrays pass through.
fn unwrap_envelope(value: Value, status: u16) -> Result<Value, ExtractionError> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };
    match map.get("success").and_then(Value::as_bool) {
        Some(true) => map
            .remove("data")
            .ok_or_else(|| ExtractionError::malformed("envelope without data")),
        Some(false) => Err(ExtractionError::upstream(
            status,
            error_from_object(&map)
                .unwrap_or_else(|| "Extraction service reported failure".to_string()),
        )),
        None => Ok(Value::Object(map)),
    }
}

/// `error` and `details` from an `{ error, details }` body, when present.
fn error_message(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body).ok()? {
        Value::Object(map) => error_from_object(&map),
        _ => None,
    }
}

fn error_from_object(map: &serde_json::Map<String, Value>) -> Option<String> {
    let error = map.get("error").and_then(Value::as_str);
    let details = map.get("details").and_then(Value::as_str);
    match (error, details) {
        (Some(e), Some(d)) => Some(format!("{e} ({d})")),
        (Some(e), None) => Some(e.to_string()),
        (None, Some(d)) => Some(d.to_string()),
        (None, None) => None,
    }
}
