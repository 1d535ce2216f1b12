//! Campaign Lifecycle Manager
//!
//! Cascading, idempotent campaign deletion: chunks, sources (and their
//! backing files), document history, documents, and the campaign row go
//! in one transaction, followed by an audit record. A missing campaign
//! is success, not an error.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::locks::LockRegistry;
use crate::database::{
    AuditAction, AuditRecord, CampaignOps, CascadeCounts, Database, DocumentOps, SourceOps,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The cascade transaction failed and was rolled back; the campaign
    /// remains fully intact.
    #[error("Deletion transaction failed: {0}")]
    Transaction(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

// ============================================================================
// File Store Collaborator
// ============================================================================

/// External storage holding uploaded source binaries. Removal is
/// best-effort during deletion: a file already gone is logged, never
/// fatal.
#[async_trait]
pub trait SourceFileStore: Send + Sync {
    async fn remove(&self, path: &str) -> std::io::Result<()>;
}

/// File store over the local filesystem.
pub struct LocalFileStore;

#[async_trait]
impl SourceFileStore for LocalFileStore {
    async fn remove(&self, path: &str) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

// ============================================================================
// Lifecycle Manager
// ============================================================================

/// Outcome of a campaign deletion request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CampaignDeletion {
    /// False when the campaign was already gone (idempotent success).
    pub deleted: bool,
    pub counts: CascadeCounts,
}

#[derive(Clone)]
pub struct LifecycleManager {
    db: Database,
    locks: Arc<LockRegistry>,
    files: Arc<dyn SourceFileStore>,
}

impl LifecycleManager {
    pub fn new(db: Database, locks: Arc<LockRegistry>, files: Arc<dyn SourceFileStore>) -> Self {
        Self { db, locks, files }
    }

    /// Delete a campaign and everything it owns. Idempotent: deleting a
    /// campaign that does not exist succeeds without writing an audit
    /// record. Holds the campaign lock exclusively so no save or upload
    /// interleaves with the cascade.
    pub async fn delete_campaign(&self, campaign_id: &str) -> Result<CampaignDeletion> {
        let Some(campaign) = self.db.get_campaign(campaign_id).await? else {
            info!(campaign_id, "Campaign already deleted or never existed");
            return Ok(CampaignDeletion::default());
        };

        let _guard = self.locks.lock_campaign_exclusive(campaign_id).await;

        let sources = self.db.list_sources(campaign_id).await?;
        let documents = self.db.list_documents(campaign_id).await?;

        for source in &sources {
            let Some(path) = &source.file_path else {
                continue;
            };
            if let Err(e) = self.files.remove(path).await {
                warn!(%path, error = %e, "Backing file missing or unremovable; continuing");
            }
        }

        let audit = AuditRecord::new(
            AuditAction::DeleteCampaign,
            format!(
                "Campaign \"{}\" ({}) was deleted: {} sources, {} documents",
                campaign.name,
                campaign_id,
                sources.len(),
                documents.len()
            ),
        );

        let counts = self.db.delete_campaign_cascade(campaign_id, &audit).await?;

        let document_ids: Vec<String> = documents.into_iter().map(|d| d.id).collect();
        drop(_guard);
        self.locks.forget_campaign(campaign_id, &document_ids);

        info!(
            campaign_id,
            chunks = counts.chunks,
            sources = counts.sources,
            history = counts.history_entries,
            documents = counts.documents,
            "Campaign deleted"
        );

        Ok(CampaignDeletion {
            deleted: true,
            counts,
        })
    }
}
