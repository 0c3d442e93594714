//! Turns uploaded file bytes into pipeline input: plain text for documents,
//! parsed values for structured data.

use crate::error::{RagError, Result};
use serde_json::Value;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// PDF-like payload; pages are flattened to text.
    Document,
    /// JSON payload.
    StructuredData,
}

impl ContentKind {
    /// Matches a declared content type, ignoring case and any `;` parameters.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            PDF_CONTENT_TYPE => Some(ContentKind::Document),
            JSON_CONTENT_TYPE => Some(ContentKind::StructuredData),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ContentKind::Document => PDF_CONTENT_TYPE,
            ContentKind::StructuredData => JSON_CONTENT_TYPE,
        }
    }
}

/// Allow-list gate for declared content types.
#[derive(Debug, Clone)]
pub struct FileTypeChecker {
    allowed: Vec<ContentKind>,
}

impl FileTypeChecker {
    pub fn new(allowed: Vec<ContentKind>) -> Self {
        Self { allowed }
    }

    pub fn structured_data_only() -> Self {
        Self::new(vec![ContentKind::StructuredData])
    }

    pub fn check(&self, content_type: &str) -> Result<ContentKind> {
        ContentKind::from_content_type(content_type)
            .filter(|kind| self.allowed.contains(kind))
            .ok_or_else(|| RagError::UnsupportedType(content_type.to_string()))
    }
}

impl Default for FileTypeChecker {
    fn default() -> Self {
        Self::new(vec![ContentKind::Document, ContentKind::StructuredData])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Structured data comes back re-serialised as text.
    #[default]
    AsText,
    /// Structured data comes back as the parsed value.
    AsObject,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedContent {
    Text(String),
    Object(Value),
}

impl ExtractedContent {
    pub fn into_text(self) -> String {
        match self {
            ExtractedContent::Text(text) => text,
            ExtractedContent::Object(value) => value.to_string(),
        }
    }

    /// Returns the questions when the content is a non-empty list of strings.
    pub fn into_question_list(self) -> Option<Vec<String>> {
        let Value::Array(items) = (match self {
            ExtractedContent::Object(value) => value,
            ExtractedContent::Text(text) => serde_json::from_str(&text).ok()?,
        }) else {
            return None;
        };

        if items.is_empty() {
            return None;
        }

        items
            .into_iter()
            .map(|item| match item {
                Value::String(question) => Some(question),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    mode: ExtractMode,
}

impl ContentExtractor {
    pub fn new(mode: ExtractMode) -> Self {
        Self { mode }
    }

    pub async fn extract(&self, bytes: Vec<u8>, content_type: &str) -> Result<ExtractedContent> {
        let kind = ContentKind::from_content_type(content_type)
            .ok_or_else(|| RagError::UnsupportedType(content_type.to_string()))?;

        match kind {
            ContentKind::Document => extract_pdf_text(bytes).await.map(ExtractedContent::Text),
            ContentKind::StructuredData => {
                let value: Value = serde_json::from_slice(&bytes)
                    .map_err(|e| RagError::MalformedPayload(format!("invalid JSON: {}", e)))?;

                Ok(match self.mode {
                    ExtractMode::AsText => ExtractedContent::Text(value.to_string()),
                    ExtractMode::AsObject => ExtractedContent::Object(value),
                })
            }
        }
    }
}

/// A document without a text layer yields an empty string, not an error.
async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String> {
    let size = bytes.len();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| RagError::MalformedPayload(format!("PDF extraction aborted: {}", e)))?
        .map_err(|e| RagError::MalformedPayload(format!("PDF extraction failed: {}", e)))?;

    log::debug!("Extracted {} characters from {} byte PDF", text.chars().count(), size);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parameters_are_ignored() {
        assert_eq!(
            ContentKind::from_content_type("application/json; charset=utf-8"),
            Some(ContentKind::StructuredData)
        );
        assert_eq!(
            ContentKind::from_content_type("Application/PDF"),
            Some(ContentKind::Document)
        );
        assert_eq!(ContentKind::from_content_type("text/plain"), None);
    }

    #[test]
    fn checker_rejects_types_outside_allow_list() {
        let err = FileTypeChecker::default().check("text/plain").unwrap_err();
        assert!(matches!(err, RagError::UnsupportedType(ref t) if t == "text/plain"));
        assert_eq!(err.to_string(), "File type 'text/plain' is not allowed.");

        let questions_only = FileTypeChecker::structured_data_only();
        assert!(questions_only.check(PDF_CONTENT_TYPE).is_err());
        assert_eq!(
            questions_only.check(JSON_CONTENT_TYPE).unwrap(),
            ContentKind::StructuredData
        );
    }

    #[tokio::test]
    async fn json_list_extracts_as_text_and_as_object() {
        let payload = br#"["What color is the sky?", "Who wrote it?"]"#.to_vec();

        let text = ContentExtractor::new(ExtractMode::AsText)
            .extract(payload.clone(), JSON_CONTENT_TYPE)
            .await
            .unwrap()
            .into_text();
        assert!(text.contains("What color is the sky?"));
        assert!(text.contains("Who wrote it?"));
        let reparsed: Vec<String> = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed.len(), 2);

        let questions = ContentExtractor::new(ExtractMode::AsObject)
            .extract(payload, JSON_CONTENT_TYPE)
            .await
            .unwrap()
            .into_question_list()
            .unwrap();
        assert_eq!(questions, vec!["What color is the sky?", "Who wrote it?"]);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let err = ContentExtractor::default()
            .extract(b"{not json".to_vec(), JSON_CONTENT_TYPE)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn garbage_pdf_is_malformed() {
        let err = ContentExtractor::default()
            .extract(b"definitely not a pdf".to_vec(), PDF_CONTENT_TYPE)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn unknown_type_is_unsupported() {
        let err = ContentExtractor::default()
            .extract(b"hello".to_vec(), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::UnsupportedType(_)));
    }

    #[test]
    fn question_list_requires_non_empty_strings() {
        let object = |v: Value| ExtractedContent::Object(v);

        assert!(object(serde_json::json!({"a": 1})).into_question_list().is_none());
        assert!(object(serde_json::json!([])).into_question_list().is_none());
        assert!(object(serde_json::json!(["ok", 3])).into_question_list().is_none());
        assert_eq!(
            object(serde_json::json!(["one"])).into_question_list(),
            Some(vec!["one".to_string()])
        );
    }
}
