use async_trait::async_trait;

use crate::domain::{errors::DomainError, Document};

#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Sends `prompt` together with the document inline and returns the model text.
    async fn generate(&self, prompt: &str, document: &Document) -> Result<String, DomainError>;
}
