//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits) rather than concrete
//! adapters: the batch orchestrator drives any `DocumentExtractor`, the sheet
//! service any `SheetStore`, and the extraction service any `VisionModel`.

pub mod services;

pub use services::{
    BatchOrchestrator, ExtractionService, ReviewState, ReviewStore, SavePayload, SheetHeaders,
    SheetService, DEFAULT_CHUNK_SIZE,
};
