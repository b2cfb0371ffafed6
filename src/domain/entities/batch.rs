use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ExtractionRecord;

/// Records accumulated across a batch, in chunk completion order.
pub type BatchResult = Vec<ExtractionRecord>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDocument {
    pub name: String,
    pub message: String,
}

impl FailedDocument {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Per-document failures collected while a batch runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchFailure(Vec<FailedDocument>);

impl BatchFailure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failed: FailedDocument) {
        self.0.push(failed);
    }

    pub fn extend(&mut self, failed: impl IntoIterator<Item = FailedDocument>) {
        self.0.extend(failed);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailedDocument> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|f| f.name.as_str()).collect()
    }

    /// One line per failed document: `name: reason`.
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(|f| format!("{}: {}", f.name, f.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Outcome of a batch that produced at least one record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub records: BatchResult,
    pub failures: BatchFailure,
}

impl BatchReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Error, Debug, Clone)]
pub enum BatchError {
    #[error("No documents to process")]
    NoDocuments,

    #[error("No data could be extracted from any document:\n{}", .failures.summary())]
    NothingExtracted { failures: BatchFailure },
}

impl BatchError {
    pub fn failures(&self) -> Option<&BatchFailure> {
        match self {
            Self::NoDocuments => None,
            Self::NothingExtracted { failures } => Some(failures),
        }
    }
}

/// Rounded percentage of processed documents. Only a finished batch reports 100.
pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 || processed >= total {
        return 100;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 99.0) as u8
}
