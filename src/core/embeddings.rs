//! Embedding Provider Module
//!
//! Defines the EmbeddingProvider trait used by ingestion and retrieval,
//! plus the Gemini-backed implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;

// ============================================================================
// Embedding Provider Trait
// ============================================================================

/// Trait for embedding providers. Each call may fail independently;
/// callers are expected to tolerate per-text failure.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Get provider name.
    fn name(&self) -> &str;
}

// ============================================================================
// Gemini Embeddings
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    model: String,
    content: ContentParts,
}

#[derive(Debug, Serialize)]
struct ContentParts {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Embedding provider backed by Google's Generative Language API.
pub struct GeminiEmbeddings {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

impl GeminiEmbeddings {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Create a new provider for the given model (e.g. "text-embedding-004").
    pub fn new(api_key: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            dimensions: Self::model_dimensions(model),
        }
    }

    /// Override the API endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn model_dimensions(model: &str) -> usize {
        match model {
            "text-embedding-004" => 768,
            "embedding-001" => 768,
            _ => 768,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.api_key.is_empty() {
            return Err(EmbeddingError::NotConfigured("missing API key".to_string()));
        }

        let url = format!(
            "{}/models/{}:embedContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: ContentParts {
                parts: vec![TextPart {
                    text: text.to_string(),
                }],
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiError(format!("{}: {}", status, body)));
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.embedding.values.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "empty embedding vector".to_string(),
            ));
        }

        Ok(parsed.embedding.values)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
