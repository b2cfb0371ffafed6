pub mod batches;
pub mod extract;
pub mod health;
pub mod sheet;
mod upload;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, patch, post};
use axum::{middleware, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::middleware::request_logger;
use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);
    let body_limit = state.config.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/extract", post(extract::extract))
        .route("/template/extract", post(extract::extract_template))
        .route("/sheet/headers", post(sheet::sheet_headers))
        .route("/sheet/save", post(sheet::save_to_sheet))
        .route("/sheet/update-headers", post(sheet::update_sheet_headers))
        .route("/batches", post(batches::create_batch))
        .route(
            "/batches/{id}",
            get(batches::get_batch).delete(batches::discard_batch),
        )
        .route(
            "/batches/{id}/records/{index}",
            patch(batches::edit_record).delete(batches::delete_record),
        )
        .route("/batches/{id}/commit", post(batches::commit_batch))
}
