//! Lore Engine Facade
//!
//! Wires the subsystems together and exposes the surface the CRUD/UI
//! layer calls: source ingestion, context retrieval, cache management,
//! versioned document saves, and campaign lifecycle.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::config::EngineConfig;
use crate::core::chat::{source_handles, ChatError, ChatService};
use crate::core::context_cache::{ContextCacheManager, RemoteCacheProvider};
use crate::core::embeddings::EmbeddingProvider;
use crate::core::generation::GenerationProvider;
use crate::core::lifecycle::{CampaignDeletion, LifecycleManager, LocalFileStore, SourceFileStore};
use crate::core::locks::LockRegistry;
use crate::core::retrieval::Retriever;
use crate::core::versioning::{VersionError, VersionStore};
use crate::database::{
    CampaignOps, CampaignOverview, CampaignRecord, Database, DocumentOps, DocumentRecord,
    GlobalSourceRecord, HistorySummary, SourceOps, SourceRecord,
};
use crate::ingestion::chunker::{ChunkError, Chunker};
use crate::ingestion::extract::TextExtractor;
use crate::ingestion::pipeline::{IngestError, IngestionPipeline};

// ============================================================================
// Error Types
// ============================================================================

/// Request-level error taxonomy surfaced to callers. Provider hiccups
/// that the engine absorbs (chunk embeddings, cache calls, missing
/// backing files) never appear here.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Chunking error: {0}")]
    Chunking(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Database(e.to_string())
    }
}

impl From<ChunkError> for EngineError {
    fn from(e: ChunkError) -> Self {
        EngineError::Chunking(e.to_string())
    }
}

impl From<VersionError> for EngineError {
    fn from(e: VersionError) -> Self {
        match e {
            VersionError::NotFound(what) => EngineError::NotFound(what),
            VersionError::Database(e) => EngineError::Database(e.to_string()),
        }
    }
}

impl From<ChatError> for EngineError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::NotFound(what) => EngineError::NotFound(what),
            ChatError::Database(e) => EngineError::Database(e.to_string()),
            ChatError::Generation(e) => EngineError::Generation(e.to_string()),
        }
    }
}

impl From<crate::core::lifecycle::LifecycleError> for EngineError {
    fn from(e: crate::core::lifecycle::LifecycleError) -> Self {
        EngineError::Database(e.to_string())
    }
}

impl From<IngestError> for EngineError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::SourceNotFound(id) => EngineError::NotFound(format!("source {}", id)),
            IngestError::Database(e) => EngineError::Database(e.to_string()),
            other => EngineError::Ingestion(other.to_string()),
        }
    }
}

// ============================================================================
// Providers
// ============================================================================

/// External collaborators injected into the engine.
pub struct EngineProviders {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub generator: Arc<dyn GenerationProvider>,
    pub cache: Arc<dyn RemoteCacheProvider>,
    pub extractor: Arc<dyn TextExtractor>,
    pub files: Arc<dyn SourceFileStore>,
}

impl EngineProviders {
    /// Providers with local defaults for file storage.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        cache: Arc<dyn RemoteCacheProvider>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            embedder,
            generator,
            cache,
            extractor,
            files: Arc::new(LocalFileStore),
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct LoreEngine {
    db: Database,
    locks: Arc<LockRegistry>,
    retriever: Retriever,
    cache: ContextCacheManager,
    versions: VersionStore,
    lifecycle: LifecycleManager,
    chat: ChatService,
    pipeline: IngestionPipeline,
    extractor: Arc<dyn TextExtractor>,
    files: Arc<dyn SourceFileStore>,
    top_k: usize,
}

impl LoreEngine {
    /// Assemble the engine from configuration, an opened database, and
    /// the provider set.
    pub fn new(config: &EngineConfig, db: Database, providers: EngineProviders) -> Result<Self> {
        let chunker = Chunker::from_config(&config.chunking)?;
        let locks = Arc::new(LockRegistry::new());

        let retriever = Retriever::new(db.clone(), providers.embedder.clone());
        let cache = ContextCacheManager::new(providers.cache.clone(), &config.cache);
        let versions = VersionStore::new(db.clone(), locks.clone());
        let lifecycle = LifecycleManager::new(db.clone(), locks.clone(), providers.files.clone());
        let chat = ChatService::new(
            db.clone(),
            retriever.clone(),
            cache.clone(),
            providers.generator.clone(),
            config.retrieval.top_k,
        );
        let pipeline = IngestionPipeline::start(
            db.clone(),
            providers.embedder.clone(),
            chunker,
            &config.ingestion,
        );

        Ok(Self {
            db,
            locks,
            retriever,
            cache,
            versions,
            lifecycle,
            chat,
            pipeline,
            extractor: providers.extractor,
            files: providers.files,
            top_k: config.retrieval.top_k,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // ========================================================================
    // Campaigns
    // ========================================================================

    pub async fn create_campaign(&self, name: &str, setting: Option<&str>) -> Result<CampaignRecord> {
        let campaign = CampaignRecord::new(name.to_string(), setting.map(|s| s.to_string()));
        self.db.create_campaign(&campaign).await?;
        Ok(campaign)
    }

    pub async fn get_campaign(&self, id: &str) -> Result<CampaignRecord> {
        self.db
            .get_campaign(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("campaign {}", id)))
    }

    pub async fn list_campaigns(&self) -> Result<Vec<CampaignOverview>> {
        Ok(self.db.list_campaigns().await?)
    }

    pub async fn rename_campaign(&self, id: &str, name: &str, setting: Option<&str>) -> Result<()> {
        self.get_campaign(id).await?;
        Ok(self.db.rename_campaign(id, name, setting).await?)
    }

    /// Cascading, idempotent campaign deletion.
    pub async fn delete_campaign(&self, id: &str) -> Result<CampaignDeletion> {
        Ok(self.lifecycle.delete_campaign(id).await?)
    }

    // ========================================================================
    // Documents & Versions
    // ========================================================================

    pub async fn create_document(
        &self,
        campaign_id: &str,
        title: &str,
        content: &str,
    ) -> Result<DocumentRecord> {
        self.get_campaign(campaign_id).await?;

        let _guard = self.locks.lock_campaign_shared(campaign_id).await;
        let document = DocumentRecord::new(
            campaign_id.to_string(),
            title.to_string(),
            content.to_string(),
        );
        self.db.create_document(&document).await?;
        Ok(document)
    }

    pub async fn get_document(&self, id: &str) -> Result<DocumentRecord> {
        self.db
            .get_document(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("document {}", id)))
    }

    pub async fn list_documents(&self, campaign_id: &str) -> Result<Vec<DocumentRecord>> {
        Ok(self.db.list_documents(campaign_id).await?)
    }

    pub async fn rename_document(&self, id: &str, title: &str) -> Result<()> {
        self.get_document(id).await?;
        Ok(self.db.rename_document(id, title).await?)
    }

    pub async fn delete_document(&self, id: &str) -> Result<()> {
        let document = self.get_document(id).await?;

        let _campaign_guard = self.locks.lock_campaign_shared(&document.campaign_id).await;
        let _document_guard = self.locks.lock_document(id).await;
        self.db.delete_document(id).await?;
        drop(_document_guard);
        self.locks.forget_document(id);
        Ok(())
    }

    /// Versioned save: snapshot the replaced content, then overwrite.
    /// Returns the new version number.
    pub async fn save_document(&self, id: &str, content: &str) -> Result<i64> {
        Ok(self.versions.save(id, content).await?)
    }

    /// Fetch a history snapshot's content for the caller to adopt.
    /// Nothing is persisted until the caller saves.
    pub async fn restore_version(&self, history_id: &str) -> Result<String> {
        Ok(self.versions.restore(history_id).await?)
    }

    pub async fn document_history(&self, document_id: &str) -> Result<Vec<HistorySummary>> {
        self.get_document(document_id).await?;
        Ok(self.versions.history(document_id).await?)
    }

    // ========================================================================
    // Sources
    // ========================================================================

    /// Store a campaign source from already-extracted text and queue its
    /// embedding ingestion. Returns as soon as the row is written.
    pub async fn upload_source(
        &self,
        campaign_id: &str,
        name: &str,
        text: &str,
        file_uri: Option<&str>,
        mime_type: &str,
    ) -> Result<SourceRecord> {
        self.get_campaign(campaign_id).await?;

        let _guard = self.locks.lock_campaign_shared(campaign_id).await;
        let source = SourceRecord::new(
            campaign_id.to_string(),
            name.to_string(),
            text.to_string(),
            file_uri.map(|s| s.to_string()),
            mime_type.to_string(),
        );
        self.db.insert_source(&source).await?;
        drop(_guard);

        self.queue_ingestion(&source.id).await;
        Ok(source)
    }

    /// Extract text from an uploaded file via the extractor collaborator
    /// and store it as a campaign source.
    pub async fn upload_source_file(
        &self,
        campaign_id: &str,
        path: &Path,
        original_name: &str,
        file_uri: Option<&str>,
    ) -> Result<SourceRecord> {
        let extracted = self
            .extractor
            .extract(path, original_name)
            .await
            .map_err(|e| EngineError::Ingestion(e.to_string()))?;

        self.upload_source(
            campaign_id,
            original_name,
            &extracted.text,
            file_uri,
            &extracted.mime_type,
        )
        .await
    }

    pub async fn list_sources(&self, campaign_id: &str) -> Result<Vec<SourceRecord>> {
        Ok(self.db.list_sources(campaign_id).await?)
    }

    pub async fn delete_source(&self, id: &str) -> Result<()> {
        let source = self
            .db
            .get_source(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("source {}", id)))?;

        if let Some(path) = &source.file_path {
            if let Err(e) = self.files.remove(path).await {
                warn!(%path, error = %e, "Backing file missing or unremovable; continuing");
            }
        }
        Ok(self.db.delete_source_cascade(id).await?)
    }

    // ========================================================================
    // Global Source Library
    // ========================================================================

    pub async fn add_global_source(
        &self,
        name: &str,
        text: &str,
        file_uri: Option<&str>,
        mime_type: &str,
    ) -> Result<GlobalSourceRecord> {
        let source = GlobalSourceRecord::new(
            name.to_string(),
            text.to_string(),
            file_uri.map(|s| s.to_string()),
            mime_type.to_string(),
        );
        self.db.insert_global_source(&source).await?;
        Ok(source)
    }

    pub async fn list_global_sources(&self) -> Result<Vec<GlobalSourceRecord>> {
        Ok(self.db.list_global_sources().await?)
    }

    pub async fn delete_global_source(&self, id: &str) -> Result<()> {
        let source = self
            .db
            .get_global_source(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("global source {}", id)))?;

        if let Some(path) = &source.file_path {
            if let Err(e) = self.files.remove(path).await {
                warn!(%path, error = %e, "Backing file missing or unremovable; continuing");
            }
        }
        Ok(self.db.delete_global_source_cascade(id).await?)
    }

    /// Copy a library source into a campaign and queue its ingestion.
    /// Assigning the same source twice is a conflict, distinct from
    /// not-found so callers can treat it as "already satisfied".
    pub async fn assign_global_source(
        &self,
        campaign_id: &str,
        global_source_id: &str,
    ) -> Result<SourceRecord> {
        self.get_campaign(campaign_id).await?;

        let global = self
            .db
            .get_global_source(global_source_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("global source {}", global_source_id)))?;

        if let Some(uri) = &global.file_uri {
            if self.db.find_source_by_uri(campaign_id, uri).await?.is_some() {
                return Err(EngineError::Conflict(format!(
                    "source {} already assigned to campaign {}",
                    global_source_id, campaign_id
                )));
            }
        }

        let _guard = self.locks.lock_campaign_shared(campaign_id).await;
        let source = global.to_campaign_source(campaign_id.to_string());
        self.db.insert_source(&source).await?;
        drop(_guard);

        self.queue_ingestion(&source.id).await;
        Ok(source)
    }

    // ========================================================================
    // Context & Chat
    // ========================================================================

    /// Queue embedding ingestion for a source ("accepted" semantics).
    pub async fn ingest_source(&self, source_id: &str) -> Result<()> {
        self.db
            .get_source(source_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("source {}", source_id)))?;
        Ok(self.pipeline.enqueue(source_id).await?)
    }

    /// Top-k relevant source excerpts for a query.
    pub async fn retrieve_context(&self, campaign_id: &str, query: &str, k: Option<usize>) -> Result<Vec<String>> {
        Ok(self
            .retriever
            .retrieve_context(campaign_id, query, k.unwrap_or(self.top_k))
            .await?)
    }

    /// Warm (or create) the provider-side cache for a campaign's current
    /// source set. `None` means this turn should send content inline.
    pub async fn get_or_create_cache(&self, campaign_id: &str) -> Result<Option<String>> {
        let sources = self.db.list_sources(campaign_id).await?;
        let handles = source_handles(&sources);
        Ok(self.cache.get_or_create(campaign_id, &handles).await)
    }

    /// One retrieval-augmented chat turn.
    pub async fn chat(
        &self,
        campaign_id: &str,
        message: &str,
        live_document: Option<&str>,
    ) -> Result<String> {
        Ok(self.chat.chat(campaign_id, message, live_document).await?)
    }

    /// Integrate a lore selection into a working document.
    pub async fn canonize(
        &self,
        selection: &str,
        full_response: &str,
        document_content: &str,
    ) -> Result<String> {
        Ok(self
            .chat
            .canonize(selection, full_response, document_content)
            .await?)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Re-queue ingestion for every source with zero chunks.
    pub async fn backfill_embeddings(&self) -> Result<usize> {
        Ok(self.pipeline.backfill().await?)
    }

    /// Drop expired cache entries, best-effort deleting remote handles.
    pub async fn purge_expired_caches(&self) -> usize {
        self.cache.purge_expired().await
    }

    /// Drain the ingestion queue and stop the worker.
    pub async fn shutdown(&self) {
        self.pipeline.shutdown().await;
    }

    async fn queue_ingestion(&self, source_id: &str) {
        if let Err(e) = self.pipeline.enqueue(source_id).await {
            // The row is persisted; the backfill sweep will pick it up.
            warn!(source_id, error = %e, "Could not queue ingestion");
        }
    }
}
