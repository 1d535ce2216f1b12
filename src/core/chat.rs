//! Chat Turn Orchestration
//!
//! Assembles each chat turn: retrieve the most relevant source excerpts,
//! consult the context cache for the campaign's source set, build the
//! prompt around the live document, and call the generation provider.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::core::context_cache::{ContextCacheManager, SourceHandle};
use crate::core::generation::{GenerationError, GenerationProvider, PromptPart};
use crate::core::retrieval::Retriever;
use crate::core::templates::{
    build_canonize_prompt, strip_markdown_fence, DOCUMENT_HEADER, EXCERPTS_HEADER,
    LORE_SYSTEM_PROMPT,
};
use crate::database::{CampaignOps, Database, SourceOps, SourceRecord};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

pub type Result<T> = std::result::Result<T, ChatError>;

// ============================================================================
// Chat Service
// ============================================================================

#[derive(Clone)]
pub struct ChatService {
    db: Database,
    retriever: Retriever,
    cache: ContextCacheManager,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
}

impl ChatService {
    pub fn new(
        db: Database,
        retriever: Retriever,
        cache: ContextCacheManager,
        generator: Arc<dyn GenerationProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            db,
            retriever,
            cache,
            generator,
            top_k,
        }
    }

    /// Run one chat turn for a campaign. `live_document` is the text the
    /// user is currently editing, included so answers stay grounded in
    /// the working draft.
    pub async fn chat(
        &self,
        campaign_id: &str,
        message: &str,
        live_document: Option<&str>,
    ) -> Result<String> {
        if self.db.get_campaign(campaign_id).await?.is_none() {
            return Err(ChatError::NotFound(format!("campaign {}", campaign_id)));
        }

        let sources = self.db.list_sources(campaign_id).await?;
        let handles = source_handles(&sources);

        let excerpts = self
            .retriever
            .retrieve_context(campaign_id, message, self.top_k)
            .await?;

        let cached = self.cache.get_or_create(campaign_id, &handles).await;

        let parts = assemble_prompt(message, &excerpts, live_document, cached, &handles);
        debug!(
            campaign_id,
            excerpts = excerpts.len(),
            cached = parts.iter().any(|p| matches!(p, PromptPart::CachedContext(_))),
            "Dispatching chat turn"
        );

        Ok(self.generator.generate(&parts).await?)
    }

    /// Integrate a lore selection into a working document and return the
    /// full updated Markdown.
    pub async fn canonize(
        &self,
        selection: &str,
        full_response: &str,
        document_content: &str,
    ) -> Result<String> {
        let prompt = build_canonize_prompt(selection, full_response, document_content);
        let updated = self
            .generator
            .generate(&[PromptPart::Text(prompt)])
            .await?;
        Ok(strip_markdown_fence(&updated))
    }
}

/// Provider file handles for every source that has one.
pub fn source_handles(sources: &[SourceRecord]) -> Vec<SourceHandle> {
    sources
        .iter()
        .filter_map(|s| {
            s.file_uri.as_ref().map(|uri| SourceHandle {
                uri: uri.clone(),
                mime_type: s.mime_type.clone(),
            })
        })
        .collect()
}

/// Build the prompt-part sequence for one turn. With a warm cache the
/// source material rides in the provider-side cache; otherwise the
/// source files are attached inline.
fn assemble_prompt(
    message: &str,
    excerpts: &[String],
    live_document: Option<&str>,
    cached_handle: Option<String>,
    handles: &[SourceHandle],
) -> Vec<PromptPart> {
    let mut parts = vec![PromptPart::Text(LORE_SYSTEM_PROMPT.trim().to_string())];

    match cached_handle {
        Some(handle) => parts.push(PromptPart::CachedContext(handle)),
        None => {
            for handle in handles {
                parts.push(PromptPart::FileRef {
                    uri: handle.uri.clone(),
                    mime_type: handle.mime_type.clone(),
                });
            }
        }
    }

    if !excerpts.is_empty() {
        let mut block = String::from(EXCERPTS_HEADER);
        for excerpt in excerpts {
            block.push_str("\n\n");
            block.push_str(excerpt);
        }
        parts.push(PromptPart::Text(block));
    }

    if let Some(document) = live_document {
        parts.push(PromptPart::Text(format!("{}\n{}", DOCUMENT_HEADER, document)));
    }

    parts.push(PromptPart::Text(message.to_string()));
    parts
}
