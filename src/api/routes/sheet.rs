use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::{error::ApiResult, middleware::Session, state::AppState};
use crate::application::SavePayload;

#[derive(Debug, Deserialize)]
pub struct HeadersRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub url: String,
    pub data: SavePayload,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHeadersRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<String>,
}

#[derive(Serialize)]
pub struct HeadersResponse {
    pub success: bool,
    pub spreadsheet_id: String,
    pub headers: Vec<String>,
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub rows: usize,
}

#[derive(Serialize)]
pub struct Ack {
    pub success: bool,
}

pub async fn sheet_headers(
    State(state): State<AppState>,
    Session(session): Session,
    Json(request): Json<HeadersRequest>,
) -> ApiResult<Json<HeadersResponse>> {
    let sheet = state.sheets.headers(&session, &request.url).await?;
    Ok(Json(HeadersResponse {
        success: true,
        spreadsheet_id: sheet.spreadsheet_id,
        headers: sheet.headers,
    }))
}

pub async fn save_to_sheet(
    State(state): State<AppState>,
    Session(session): Session,
    Json(request): Json<SaveRequest>,
) -> ApiResult<Json<SaveResponse>> {
    let rows = state.sheets.save(&session, &request.url, request.data).await?;
    Ok(Json(SaveResponse {
        success: true,
        rows,
    }))
}

pub async fn update_sheet_headers(
    State(state): State<AppState>,
    Session(session): Session,
    Json(request): Json<UpdateHeadersRequest>,
) -> ApiResult<Json<Ack>> {
    state
        .sheets
        .update_headers(&session, &request.url, &request.headers)
        .await?;
    Ok(Json(Ack { success: true }))
}
