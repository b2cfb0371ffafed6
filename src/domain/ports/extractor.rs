use async_trait::async_trait;

use crate::domain::{Document, ExtractionError, ExtractionRecord, Schema};

/// Turns one document into zero or more records shaped by `schema`.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract_one(
        &self,
        document: &Document,
        schema: &Schema,
    ) -> Result<Vec<ExtractionRecord>, ExtractionError>;
}
