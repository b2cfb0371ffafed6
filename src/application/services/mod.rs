mod batch;
mod extraction;
mod review;
mod sheet;

pub use batch::{BatchOrchestrator, DEFAULT_CHUNK_SIZE};
pub use extraction::{strip_code_fences, ExtractionService};
pub use review::{ReviewState, ReviewStore};
pub use sheet::{SavePayload, SheetHeaders, SheetService};
