use axum::extract::{multipart::MultipartError, Multipart};
use std::path::Path;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{mime_from_path, Document, Schema};

/// Files and the `headers` field of a multipart upload.
#[derive(Default)]
pub struct Upload {
    pub documents: Vec<Document>,
    pub headers: Option<String>,
}

impl Upload {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut upload = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") | Some("files") => {
                    let file_name = field
                        .file_name()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("document-{}", upload.documents.len() + 1));
                    let content_type = content_type(field.content_type(), &file_name);
                    let bytes = field.bytes().await.map_err(bad_multipart)?;
                    upload
                        .documents
                        .push(Document::from_parts(file_name, &content_type, bytes)?);
                }
                Some("headers") => {
                    upload.headers = Some(field.text().await.map_err(bad_multipart)?);
                }
                _ => {}
            }
        }
        Ok(upload)
    }

    /// The field list, sent as a JSON array of names.
    pub fn schema(&self) -> ApiResult<Schema> {
        let raw = self
            .headers
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("File and headers are required"))?;
        Ok(Schema::from_json(raw)?)
    }

    pub fn into_single(mut self) -> ApiResult<Document> {
        match self.documents.len() {
            0 => Err(ApiError::bad_request("File and headers are required")),
            1 => Ok(self.documents.remove(0)),
            n => Err(ApiError::bad_request(format!("Expected one file, got {n}"))),
        }
    }
}

/// Browsers and curl often send `application/octet-stream`; fall back to the
/// file extension then.
fn content_type(declared: Option<&str>, file_name: &str) -> String {
    match declared {
        Some(ct) if ct != mime::APPLICATION_OCTET_STREAM.essence_str() => ct.to_string(),
        _ => mime_from_path(Path::new(file_name))
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
            .to_string(),
    }
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::bad_request("Invalid multipart body").with_details(e.body_text())
}
