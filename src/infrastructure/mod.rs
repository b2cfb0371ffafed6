pub mod config;
pub mod extraction;
pub mod jobs;
pub mod llm;
pub mod sheets;

pub use config::{
    AppConfig, BatchConfig, Config, ConfigError, ExtractionConfig, LlmConfig, PromptsConfig,
    SheetBackend, SheetsConfig,
};
pub use extraction::HttpExtractionClient;
pub use jobs::{BatchJob, JobRegistry, JobSnapshot, JobStatus};
pub use llm::GeminiVision;
pub use sheets::{GoogleSheetsStore, InMemorySheetStore};
