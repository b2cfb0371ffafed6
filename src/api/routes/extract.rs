use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use super::upload::Upload;
use crate::api::{error::ApiResult, state::AppState};
use crate::domain::{ports::DocumentExtractor, ExtractionRecord};

#[derive(Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub data: Vec<ExtractionRecord>,
}

#[derive(Serialize)]
pub struct TemplateResponse {
    pub success: bool,
    pub headers: Vec<String>,
}

/// `file` + `headers` in, normalized records out.
pub async fn extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ExtractResponse>> {
    let upload = Upload::read(multipart).await?;
    let schema = upload.schema()?;
    let document = upload.into_single()?;

    let data = state.extraction.extract_one(&document, &schema).await?;
    info!(document = document.name(), records = data.len(), "document extracted");
    Ok(Json(ExtractResponse {
        success: true,
        data,
    }))
}

pub async fn extract_template(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<TemplateResponse>> {
    let document = Upload::read(multipart).await?.into_single()?;
    let headers = state.extraction.extract_template_headers(&document).await?;
    Ok(Json(TemplateResponse {
        success: true,
        headers,
    }))
}
