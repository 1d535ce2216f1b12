//! Version Store
//!
//! Bounded, restorable edit history for lore documents. Every save
//! snapshots the content being replaced; restore hands a snapshot back
//! to the caller without touching the database, so a restore that is
//! never saved leaves no trace.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::core::locks::LockRegistry;
use crate::database::{Database, DocumentOps, HistorySummary};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, VersionError>;

// ============================================================================
// Version Store
// ============================================================================

#[derive(Clone)]
pub struct VersionStore {
    db: Database,
    locks: Arc<LockRegistry>,
}

impl VersionStore {
    pub fn new(db: Database, locks: Arc<LockRegistry>) -> Self {
        Self { db, locks }
    }

    /// Save new content for a document, snapshotting the replaced
    /// content first. Returns the new version number.
    ///
    /// The whole read-evict-insert-update sequence runs under the
    /// document's mutex (serializing concurrent saves of one document)
    /// and the campaign's shared lock (excluding campaign deletion).
    pub async fn save(&self, document_id: &str, new_content: &str) -> Result<i64> {
        let document = self
            .db
            .get_document(document_id)
            .await?
            .ok_or_else(|| VersionError::NotFound(format!("document {}", document_id)))?;

        let _campaign_guard = self.locks.lock_campaign_shared(&document.campaign_id).await;
        let _document_guard = self.locks.lock_document(document_id).await;

        let version = self
            .db
            .save_document_revision(document_id, new_content)
            .await?
            .ok_or_else(|| VersionError::NotFound(format!("document {}", document_id)))?;

        debug!(document_id, version, "Document saved");
        Ok(version)
    }

    /// Fetch a snapshot's content for the caller to adopt as working
    /// content. Deliberately read-only: persisting the restored text is
    /// the caller's decision, via a subsequent `save`.
    pub async fn restore(&self, history_id: &str) -> Result<String> {
        let entry = self
            .db
            .get_history_entry(history_id)
            .await?
            .ok_or_else(|| VersionError::NotFound(format!("history entry {}", history_id)))?;

        Ok(entry.content)
    }

    /// History listing for a document, newest first.
    pub async fn history(&self, document_id: &str) -> Result<Vec<HistorySummary>> {
        Ok(self.db.list_history(document_id).await?)
    }
}
