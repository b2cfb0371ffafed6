mod extractor;
mod sheet_store;
mod vision;

pub use extractor::DocumentExtractor;
pub use sheet_store::SheetStore;
pub use vision::VisionModel;
