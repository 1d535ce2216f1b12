//! Generation Provider Module
//!
//! Defines the prompt-part model and the GenerationProvider trait the
//! chat service calls, plus the Gemini-backed implementation.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, GenerationError>;

// ============================================================================
// Prompt Parts
// ============================================================================

/// One element of an assembled prompt. The chat service builds the
/// sequence; the provider decides how each part maps onto its API.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    /// Plain instruction or content text.
    Text(String),
    /// Reference to a provider-side uploaded file.
    FileRef { uri: String, mime_type: String },
    /// Handle of a provider-side pre-loaded context cache.
    CachedContext(String),
}

// ============================================================================
// Generation Provider Trait
// ============================================================================

/// Trait for text generation providers.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a completion from the assembled prompt parts.
    async fn generate(&self, parts: &[PromptPart]) -> Result<String>;

    /// Get provider name.
    fn name(&self) -> &str;
}

// ============================================================================
// Gemini Generation
// ============================================================================

/// Generation provider backed by Google's Generative Language API.
pub struct GeminiGeneration {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGeneration {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(api_key: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, parts: &[PromptPart]) -> serde_json::Value {
        let mut content_parts = Vec::new();
        let mut cached_content: Option<&str> = None;

        for part in parts {
            match part {
                PromptPart::Text(text) => content_parts.push(json!({ "text": text })),
                PromptPart::FileRef { uri, mime_type } => content_parts.push(json!({
                    "file_data": { "file_uri": uri, "mime_type": mime_type }
                })),
                PromptPart::CachedContext(handle) => cached_content = Some(handle),
            }
        }

        let mut request = json!({
            "contents": [{ "role": "user", "parts": content_parts }]
        });
        if let Some(handle) = cached_content {
            request["cachedContent"] = json!(handle);
        }
        request
    }
}

#[async_trait]
impl GenerationProvider for GeminiGeneration {
    async fn generate(&self, parts: &[PromptPart]) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(GenerationError::NotConfigured("missing API key".to_string()));
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = self.build_request(parts);
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError(format!("{}: {}", status, body)));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parsed["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                GenerationError::InvalidResponse("no text candidate in response".to_string())
            })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
