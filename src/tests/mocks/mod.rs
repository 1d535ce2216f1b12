//! Mock implementations for testing
//!
//! Mockall-generated provider mocks plus simple stateful fakes used
//! across the test modules.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mockall::mock;

use crate::core::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::core::generation::{GenerationError, GenerationProvider, PromptPart};
use crate::core::lifecycle::SourceFileStore;

// ============================================================================
// Mockall Provider Mocks
// ============================================================================

mock! {
    pub Embedder {}

    #[async_trait]
    impl EmbeddingProvider for Embedder {
        async fn embed(&self, text: &str) -> crate::core::embeddings::Result<Vec<f32>>;
        fn dimensions(&self) -> usize;
        fn name(&self) -> &str;
    }
}

mock! {
    pub Generator {}

    #[async_trait]
    impl GenerationProvider for Generator {
        async fn generate(&self, parts: &[PromptPart]) -> crate::core::generation::Result<String>;
        fn name(&self) -> &str;
    }
}

// ============================================================================
// Stateful Fakes
// ============================================================================

/// Embedder that always returns the same vector.
pub struct StaticEmbedder {
    pub vector: Vec<f32>,
    pub calls: AtomicUsize,
}

impl StaticEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, _text: &str) -> crate::core::embeddings::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Embedder that fails on a chosen set of call indices (0-based) and
/// succeeds otherwise. Call order is the only scheduling in play, so
/// failures land on deterministic chunks.
pub struct FlakyEmbedder {
    fail_on: HashSet<usize>,
    calls: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(fail_on: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_on: fail_on.into_iter().collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> crate::core::embeddings::Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&call) {
            return Err(EmbeddingError::ApiError("simulated outage".to_string()));
        }
        // Length-derived vector keeps distinct chunks distinguishable.
        Ok(vec![text.len() as f32, 1.0, 0.5])
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Embedder that always fails.
pub struct BrokenEmbedder;

#[async_trait]
impl EmbeddingProvider for BrokenEmbedder {
    async fn embed(&self, _text: &str) -> crate::core::embeddings::Result<Vec<f32>> {
        Err(EmbeddingError::ApiError("always down".to_string()))
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Generator that records every prompt and returns a canned answer.
pub struct EchoGenerator {
    pub response: String,
    pub prompts: Mutex<Vec<Vec<PromptPart>>>,
    pub fail: bool,
}

impl EchoGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            prompts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: String::new(),
            prompts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn last_prompt(&self) -> Vec<PromptPart> {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerationProvider for EchoGenerator {
    async fn generate(&self, parts: &[PromptPart]) -> crate::core::generation::Result<String> {
        self.prompts.lock().unwrap().push(parts.to_vec());
        if self.fail {
            return Err(GenerationError::ApiError("simulated outage".to_string()));
        }
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// File store that records removals and can simulate missing files.
pub struct RecordingFileStore {
    pub removed: Mutex<Vec<String>>,
    pub missing: HashSet<String>,
}

impl RecordingFileStore {
    pub fn new() -> Self {
        Self {
            removed: Mutex::new(Vec::new()),
            missing: HashSet::new(),
        }
    }

    pub fn with_missing(paths: impl IntoIterator<Item = String>) -> Self {
        Self {
            removed: Mutex::new(Vec::new()),
            missing: paths.into_iter().collect(),
        }
    }

    pub fn removed_paths(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceFileStore for RecordingFileStore {
    async fn remove(&self, path: &str) -> std::io::Result<()> {
        if self.missing.contains(path) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            ));
        }
        self.removed.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
