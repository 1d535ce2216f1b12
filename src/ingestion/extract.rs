//! Text Extraction Collaborator
//!
//! Upstream of the chunker: turns an uploaded file into extracted text
//! plus the mime type it should be presented to the provider as. The
//! engine does not care how the text is produced.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

// ============================================================================
// Extractor Trait
// ============================================================================

/// Extracted text and the mime type to present it as.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub mime_type: String,
}

/// Trait for upload-time text extraction.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path, original_name: &str) -> Result<ExtractedText>;
}

// ============================================================================
// Plain Text Extractor
// ============================================================================

/// Extractor for text-native formats: markdown, plain text, and JSON
/// (treated as plain text for prompting). Binary formats belong to
/// richer extractors plugged in at the application layer.
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path, original_name: &str) -> Result<ExtractedText> {
        let lower = original_name.to_lowercase();

        let mime_type = if lower.ends_with(".md") || lower.ends_with(".markdown") {
            "text/markdown"
        } else if lower.ends_with(".txt") || lower.ends_with(".json") {
            "text/plain"
        } else {
            return Err(ExtractError::Unsupported(original_name.to_string()));
        };

        let text = tokio::fs::read_to_string(path).await?;
        Ok(ExtractedText {
            text,
            mime_type: mime_type.to_string(),
        })
    }
}
