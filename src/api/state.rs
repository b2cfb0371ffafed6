use std::sync::Arc;
use std::time::Duration;

use crate::application::{BatchOrchestrator, ExtractionService, SheetService};
use crate::domain::{
    ports::{SheetStore, VisionModel},
    DomainError,
};
use crate::infrastructure::{
    AppConfig, GeminiVision, GoogleSheetsStore, InMemorySheetStore, JobRegistry, SheetBackend,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub extraction: Arc<ExtractionService>,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub sheets: Arc<SheetService>,
    pub jobs: Arc<JobRegistry>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        vision: Arc<dyn VisionModel>,
        sheet_store: Arc<dyn SheetStore>,
    ) -> Self {
        let extraction = Arc::new(ExtractionService::new(
            vision,
            config.prompts.extraction.clone(),
            config.prompts.template.clone(),
        ));
        let orchestrator = Arc::new(BatchOrchestrator::with_chunk_size(
            extraction.clone(),
            config.config.batch.chunk_size,
        ));
        let retention = Duration::from_secs(config.config.batch.retention_seconds);
        Self {
            config: Arc::new(config),
            extraction,
            orchestrator,
            sheets: Arc::new(SheetService::new(sheet_store)),
            jobs: Arc::new(JobRegistry::with_retention(retention)),
        }
    }

    /// Wires the Gemini model and the configured sheet backend.
    pub fn from_config(config: AppConfig) -> Result<Self, DomainError> {
        let vision = Arc::new(GeminiVision::new(&config.config.llm)?);
        let sheet_store: Arc<dyn SheetStore> = match config.config.sheets.backend {
            SheetBackend::Google => Arc::new(GoogleSheetsStore::new(&config.config.sheets)?),
            SheetBackend::Memory => Arc::new(InMemorySheetStore::new()),
        };
        Ok(Self::new(config, vision, sheet_store))
    }
}
