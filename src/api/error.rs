use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::{DomainError, ExtractionError, MALFORMED_RESPONSE};

/// Error response rendered as `{ "error": ..., "details": ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::bad_request(msg),
            DomainError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            DomainError::Unauthorized(msg) => Self::unauthorized().with_details(msg),
            DomainError::ExternalService(msg) => {
                Self::new(StatusCode::BAD_GATEWAY, "Upstream service failed").with_details(msg)
            }
            DomainError::Timeout(msg) => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "Upstream service timed out")
                    .with_details(msg)
            }
            DomainError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::InvalidInput(msg) => Self::bad_request(msg),
            ExtractionError::Malformed { detail } => {
                Self::new(StatusCode::BAD_GATEWAY, MALFORMED_RESPONSE).with_details(detail)
            }
            ExtractionError::Timeout(msg) => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "Upstream service timed out")
                    .with_details(msg)
            }
            ExtractionError::Config(msg) => {
                tracing::error!(error = %msg, "extractor misconfigured");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            other => Self::new(StatusCode::BAD_GATEWAY, "Failed to process document")
                .with_details(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.error,
            details: self.details.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
