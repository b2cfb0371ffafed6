mod batch;
mod document;
mod record;
mod session;

pub use batch::{
    progress_percent, BatchError, BatchFailure, BatchReport, BatchResult, FailedDocument,
};
pub use document::{mime_from_path, Document, SUPPORTED_MIME_TYPES};
pub use record::{ExtractionRecord, RawExtraction, Schema, ShapeError};
pub use session::{SessionContext, SpreadsheetRef};
