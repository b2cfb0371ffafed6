use bytes::Bytes;
use mime::Mime;
use std::path::Path;

use crate::domain::{DomainError, ExtractionError};

/// MIME essences the vision model accepts.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/heic",
    "image/heif",
    "application/pdf",
];

/// An uploaded photo or PDF. Content is reference counted so chunks can be
/// dispatched concurrently without copying.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    mime_type: Mime,
    content: Bytes,
}

impl Document {
    pub fn new(name: impl Into<String>, mime_type: Mime, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type,
            content: content.into(),
        }
    }

    /// Builds a document from a raw `Content-Type` string.
    pub fn from_parts(
        name: impl Into<String>,
        content_type: &str,
        content: impl Into<Bytes>,
    ) -> Result<Self, DomainError> {
        let mime_type: Mime = content_type
            .parse()
            .map_err(|_| DomainError::validation(format!("Invalid MIME type: {content_type}")))?;
        Ok(Self::new(name, mime_type, content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &Mime {
        &self.mime_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_MIME_TYPES.contains(&self.mime_type.essence_str())
    }

    /// Checks the preconditions of a single extraction call.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.is_empty() {
            return Err(ExtractionError::invalid_input(format!(
                "document '{}' is empty",
                self.name
            )));
        }
        if !self.is_supported() {
            return Err(ExtractionError::invalid_input(format!(
                "document '{}' has unsupported type {}",
                self.name,
                self.mime_type.essence_str()
            )));
        }
        Ok(())
    }
}

/// Guesses a MIME type from a file extension.
pub fn mime_from_path(path: &Path) -> Option<Mime> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let essence = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "pdf" => "application/pdf",
        _ => return None,
    };
    essence.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_supported_image() {
        let doc = Document::new("scan.png", mime::IMAGE_PNG, vec![1u8, 2, 3]);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_content() {
        let doc = Document::new("scan.png", mime::IMAGE_PNG, Vec::<u8>::new());
        assert!(matches!(
            doc.validate(),
            Err(ExtractionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_mime() {
        let doc = Document::new("notes.txt", mime::TEXT_PLAIN, "hello");
        let err = doc.validate().unwrap_err();
        assert!(err.to_string().contains("text/plain"));
    }

    #[test]
    fn test_from_parts_ignores_parameters() {
        let doc = Document::from_parts("a.pdf", "application/pdf; charset=binary", "x").unwrap();
        assert!(doc.is_supported());
        assert!(Document::from_parts("a", "not a mime", "x").is_err());
    }

    #[test]
    fn test_mime_from_path() {
        assert_eq!(
            mime_from_path(Path::new("/tmp/IMG_001.JPG")).unwrap(),
            mime::IMAGE_JPEG
        );
        assert_eq!(
            mime_from_path(Path::new("surat.pdf")).unwrap().essence_str(),
            "application/pdf"
        );
        assert!(mime_from_path(Path::new("README")).is_none());
        assert!(mime_from_path(Path::new("data.csv")).is_none());
    }
}
