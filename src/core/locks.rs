//! Lock Registry
//!
//! Process-wide lock table serializing mutations that SQLite alone
//! cannot order correctly:
//!
//! - Document saves hold the document's mutex so the read-evict-insert-
//!   update sequence never interleaves for one document.
//! - Saves and uploads hold the campaign lock shared; campaign deletion
//!   holds it exclusive, so a cascade never races an in-flight write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

#[derive(Default)]
pub struct LockRegistry {
    campaigns: StdMutex<HashMap<String, Arc<RwLock<()>>>>,
    documents: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn campaign_entry(&self, campaign_id: &str) -> Arc<RwLock<()>> {
        let mut map = self.campaigns.lock().expect("campaign lock table poisoned");
        map.entry(campaign_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    fn document_entry(&self, document_id: &str) -> Arc<Mutex<()>> {
        let mut map = self.documents.lock().expect("document lock table poisoned");
        map.entry(document_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Shared campaign access for saves and uploads.
    pub async fn lock_campaign_shared(&self, campaign_id: &str) -> OwnedRwLockReadGuard<()> {
        self.campaign_entry(campaign_id).read_owned().await
    }

    /// Exclusive campaign access for cascading deletion.
    pub async fn lock_campaign_exclusive(&self, campaign_id: &str) -> OwnedRwLockWriteGuard<()> {
        self.campaign_entry(campaign_id).write_owned().await
    }

    /// Per-document serialization of the versioned save sequence.
    pub async fn lock_document(&self, document_id: &str) -> OwnedMutexGuard<()> {
        self.document_entry(document_id).lock_owned().await
    }

    /// Drop lock entries for a deleted campaign and its documents. Late
    /// holders keep their own Arc; the table just stops growing.
    pub fn forget_campaign(&self, campaign_id: &str, document_ids: &[String]) {
        self.campaigns
            .lock()
            .expect("campaign lock table poisoned")
            .remove(campaign_id);

        let mut documents = self.documents.lock().expect("document lock table poisoned");
        for id in document_ids {
            documents.remove(id);
        }
    }

    /// Drop the lock entry for a deleted document.
    pub fn forget_document(&self, document_id: &str) {
        self.documents
            .lock()
            .expect("document lock table poisoned")
            .remove(document_id);
    }
}
