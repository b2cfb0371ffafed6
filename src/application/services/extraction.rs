use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::domain::{
    ports::{DocumentExtractor, VisionModel},
    Document, DomainError, ExtractionError, ExtractionRecord, RawExtraction, Schema,
};

/// Prompt placeholders filled from the schema.
pub const FIELDS_PLACEHOLDER: &str = "{fields}";
pub const EXAMPLE_PLACEHOLDER: &str = "{example}";

/// Server side of the extraction endpoint: prompts a vision model and
/// normalizes whatever JSON it answers with.
pub struct ExtractionService {
    vision: Arc<dyn VisionModel>,
    extraction_prompt: String,
    template_prompt: String,
}

impl ExtractionService {
    pub fn new(
        vision: Arc<dyn VisionModel>,
        extraction_prompt: impl Into<String>,
        template_prompt: impl Into<String>,
    ) -> Self {
        Self {
            vision,
            extraction_prompt: extraction_prompt.into(),
            template_prompt: template_prompt.into(),
        }
    }

    pub fn render_prompt(&self, schema: &Schema) -> String {
        let fields = schema
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{}. {}", i + 1, f))
            .collect::<Vec<_>>()
            .join("\n");
        let example = serde_json::to_string_pretty(&ExtractionRecord::blank(schema))
            .unwrap_or_else(|_| "{}".to_string());

        self.extraction_prompt
            .replace(FIELDS_PLACEHOLDER, &fields)
            .replace(EXAMPLE_PLACEHOLDER, &example)
    }

    /// Reads column headers off a screenshot of a form or spreadsheet.
    #[instrument(skip(self, document), fields(document = document.name()))]
    pub async fn extract_template_headers(
        &self,
        document: &Document,
    ) -> Result<Vec<String>, DomainError> {
        document
            .validate()
            .map_err(|e| DomainError::validation(e.to_string()))?;

        let text = self.vision.generate(&self.template_prompt, document).await?;
        let value: Value = serde_json::from_str(strip_code_fences(&text)).map_err(|e| {
            warn!(error = %e, "template answer is not JSON");
            DomainError::external("Failed to parse template headers. AI did not return a valid list.")
        })?;

        let headers: Vec<String> = match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .filter(|h| !h.is_empty())
                .collect(),
            Value::String(s) => vec![s.trim().to_string()],
            Value::Null => Vec::new(),
            other => vec![other.to_string()],
        };

        if headers.is_empty() {
            return Err(DomainError::external("AI did not return any headers."));
        }
        Ok(headers)
    }
}

#[async_trait]
impl DocumentExtractor for ExtractionService {
    #[instrument(skip_all, fields(document = document.name(), fields = schema.len()))]
    async fn extract_one(
        &self,
        document: &Document,
        schema: &Schema,
    ) -> Result<Vec<ExtractionRecord>, ExtractionError> {
        document.validate()?;

        let prompt = self.render_prompt(schema);
        let text = self
            .vision
            .generate(&prompt, document)
            .await?;

        let value: Value = serde_json::from_str(strip_code_fences(&text)).map_err(|e| {
            warn!(error = %e, "model answer is not JSON");
            ExtractionError::malformed(e.to_string())
        })?;

        let raw = RawExtraction::from_value(value, schema)
            .map_err(|e| ExtractionError::malformed(e.to_string()))?;
        Ok(raw.normalize(schema))
    }
}

/// Drops a surrounding markdown code fence, with or without a `json` tag.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.trim();
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedVision {
        answer: Result<String, String>,
        error: fn(String) -> DomainError,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedVision {
        fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(text.to_string()),
                error: |m| DomainError::external(m),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Self::failing_with(|m| DomainError::external(m), message)
        }

        fn failing_with(error: fn(String) -> DomainError, message: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(message.to_string()),
                error,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl VisionModel for CannedVision {
        async fn generate(&self, prompt: &str, _document: &Document) -> Result<String, DomainError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer.clone().map_err(self.error)
        }
    }

    fn service(vision: Arc<CannedVision>) -> ExtractionService {
        ExtractionService::new(
            vision,
            "Extract:\n{fields}\nFormat:\n{example}",
            "List the headers.",
        )
    }

    fn document() -> Document {
        Document::new("sertifikat.jpg", mime::IMAGE_JPEG, vec![0xFF, 0xD8])
    }

    fn schema() -> Schema {
        Schema::new(["Nama", "Tanggal"]).unwrap()
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_render_prompt_lists_fields_in_order() {
        let service = service(CannedVision::answering("{}"));
        let prompt = service.render_prompt(&schema());
        assert!(prompt.contains("1. Nama\n2. Tanggal"));
        assert!(prompt.contains("\"Nama\": \"\""));
        assert!(prompt.find("\"Nama\"").unwrap() < prompt.find("\"Tanggal\"").unwrap());
    }

    #[tokio::test]
    async fn test_extract_one_parses_fenced_object() {
        let vision = CannedVision::answering("```json\n{\"Nama\": \"BUDI\", \"Kota\": \"Jakarta\"}\n```");
        let records = service(vision.clone())
            .extract_one(&document(), &schema())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Nama"), Some("BUDI"));
        assert_eq!(records[0].get("Tanggal"), Some(""));
        assert_eq!(records[0].get("Kota"), None);
        assert!(vision.prompts.lock().unwrap()[0].contains("2. Tanggal"));
    }

    #[tokio::test]
    async fn test_extract_one_accepts_table_rows() {
        let vision = CannedVision::answering(r#"{"rows": [{"Nama": "A"}, {"Nama": "B"}]}"#);
        let records = service(vision).extract_one(&document(), &schema()).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_extract_one_reports_malformed_answer() {
        let vision = CannedVision::answering("Sorry, I cannot read this image.");
        let err = service(vision).extract_one(&document(), &schema()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }));

        let vision = CannedVision::answering("\"just a string\"");
        let err = service(vision).extract_one(&document(), &schema()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_extract_one_surfaces_model_failure() {
        let vision = CannedVision::failing("Gemini API returned 429: quota");
        let err = service(vision).extract_one(&document(), &schema()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Transport(ref m) if m.contains("429")));
    }

    #[tokio::test]
    async fn test_extract_one_keeps_timeouts_and_config_errors_apart() {
        let vision = CannedVision::failing_with(|m| DomainError::timeout(m), "Gemini request timed out");
        let err = service(vision).extract_one(&document(), &schema()).await.unwrap_err();
        assert_eq!(err, ExtractionError::timeout("Gemini request timed out"));

        let vision = CannedVision::failing_with(
            |m| DomainError::internal(m),
            "Server Configuration Error: GEMINI_API_KEY is missing.",
        );
        let err = service(vision).extract_one(&document(), &schema()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Config(_)));
    }

    #[tokio::test]
    async fn test_extract_one_validates_before_calling_model() {
        let vision = CannedVision::answering("{}");
        let empty = Document::new("blank.png", mime::IMAGE_PNG, Vec::<u8>::new());
        let err = service(vision.clone()).extract_one(&empty, &schema()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidInput(_)));
        assert!(vision.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_template_headers() {
        let vision = CannedVision::answering("```json\n[\"Name\", \"Date of Birth\", \"\", 7]\n```");
        let headers = service(vision).extract_template_headers(&document()).await.unwrap();
        assert_eq!(headers, vec!["Name", "Date of Birth", "7"]);

        let vision = CannedVision::answering("\"Total\"");
        let headers = service(vision).extract_template_headers(&document()).await.unwrap();
        assert_eq!(headers, vec!["Total"]);

        let vision = CannedVision::answering("Name, Date");
        assert!(service(vision).extract_template_headers(&document()).await.is_err());
    }
}
