use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

/// Fixed diagnostic for responses that are not JSON or not an object/array.
pub const MALFORMED_RESPONSE: &str = "extraction service returned a malformed response";

/// Failure of a single `extract_one` call.
///
/// Cloneable so a batch can keep the message in its failure list while the
/// error is also logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Transport(String),

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("extraction service returned a malformed response")]
    Malformed { detail: String },

    #[error("{0}")]
    Timeout(String),

    /// The extractor itself is misconfigured, e.g. a missing API key.
    #[error("{0}")]
    Config(String),
}

impl ExtractionError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}

impl From<DomainError> for ExtractionError {
    /// Failures of the model call behind an extractor.
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Timeout(msg) => Self::Timeout(msg),
            DomainError::Internal(msg) => Self::Config(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}
