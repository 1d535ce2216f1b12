//! Retrieval Module
//!
//! Ranks stored chunk embeddings against a query vector and returns the
//! most relevant chunk texts for prompt assembly.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::embeddings::EmbeddingProvider;
use crate::database::{ChunkOps, Database};

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
}

/// Cosine similarity between two vectors.
///
/// Returns `None` when either vector has zero magnitude (or the lengths
/// differ) -- such pairs have no defined similarity and must be excluded
/// from ranking rather than allowed to poison it with NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Embedding-based retriever over a campaign's chunk store.
#[derive(Clone)]
pub struct Retriever {
    db: Database,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(db: Database, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { db, embedder }
    }

    /// Rank every chunk scoped to the campaign against `query_vector`
    /// and return the top `k`, most relevant first. Ties keep insertion
    /// order. An empty chunk store yields an empty result.
    pub async fn retrieve_scored(
        &self,
        campaign_id: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, sqlx::Error> {
        let chunks = self.db.chunks_for_campaign(campaign_id).await?;

        let mut scored: Vec<ScoredChunk> = chunks
            .into_iter()
            .filter_map(|chunk| {
                cosine_similarity(&chunk.vector(), query_vector).map(|score| ScoredChunk {
                    text: chunk.content,
                    score,
                })
            })
            .collect();

        // Stable sort: equal scores keep insertion order for
        // reproducible results.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        debug!(campaign_id, returned = scored.len(), "Retrieved context chunks");
        Ok(scored)
    }

    /// Top-`k` chunk texts for a query vector.
    pub async fn retrieve(
        &self,
        campaign_id: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<String>, sqlx::Error> {
        Ok(self
            .retrieve_scored(campaign_id, query_vector, k)
            .await?
            .into_iter()
            .map(|c| c.text)
            .collect())
    }

    /// Embed a query string and retrieve its top-`k` chunks. An
    /// embedding failure degrades to "no relevant context" rather than
    /// failing the chat turn.
    pub async fn retrieve_context(
        &self,
        campaign_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<String>, sqlx::Error> {
        let query_vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(campaign_id, error = %e, "Query embedding failed, proceeding without retrieved context");
                return Ok(Vec::new());
            }
        };

        self.retrieve(campaign_id, &query_vector, k).await
    }
}
