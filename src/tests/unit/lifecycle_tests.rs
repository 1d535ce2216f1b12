//! Lifecycle Manager Unit Tests
//!
//! Cascading deletion, idempotency, audit records, and best-effort file
//! cleanup.

use std::sync::Arc;

use sqlx::Row;

use crate::core::lifecycle::LifecycleManager;
use crate::core::locks::LockRegistry;
use crate::database::{AuditOps, CampaignOps, Database, DocumentOps};
use crate::tests::common::{
    create_test_campaign, create_test_db, create_test_document, create_test_source,
    insert_test_chunk,
};
use crate::tests::mocks::RecordingFileStore;

fn manager(db: &Database, files: Arc<RecordingFileStore>) -> LifecycleManager {
    LifecycleManager::new(db.clone(), Arc::new(LockRegistry::new()), files)
}

async fn table_count(db: &Database, table: &str) -> i64 {
    sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table))
        .fetch_one(db.pool())
        .await
        .unwrap()
        .get("n")
}

#[tokio::test]
async fn test_full_cascade_leaves_no_orphans() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Doomed").await;

    // 2 sources, 5 documents with saved history.
    let source_a = create_test_source(&db, &campaign.id, "a.md", "alpha", Some("files/a")).await;
    let source_b = create_test_source(&db, &campaign.id, "b.md", "beta", Some("files/b")).await;
    insert_test_chunk(&db, &source_a.id, "chunk a", &[1.0, 0.0]).await;
    insert_test_chunk(&db, &source_b.id, "chunk b", &[0.0, 1.0]).await;

    for i in 0..5 {
        let doc = create_test_document(&db, &campaign.id, &format!("Doc {}", i), "v1").await;
        db.save_document_revision(&doc.id, "v2").await.unwrap();
    }

    let files = Arc::new(RecordingFileStore::new());
    let outcome = manager(&db, files.clone())
        .delete_campaign(&campaign.id)
        .await
        .unwrap();

    assert!(outcome.deleted);
    assert_eq!(outcome.counts.chunks, 2);
    assert_eq!(outcome.counts.sources, 2);
    assert_eq!(outcome.counts.history_entries, 5);
    assert_eq!(outcome.counts.documents, 5);

    for table in ["campaigns", "documents", "document_history", "sources", "chunks"] {
        assert_eq!(table_count(&db, table).await, 0, "orphans left in {}", table);
    }

    let log = db.list_audit(10).await.unwrap();
    assert_eq!(log.len(), 1);
    assert!(log[0].details.as_deref().unwrap().contains("Doomed"));
}

#[tokio::test]
async fn test_missing_campaign_is_idempotent_success() {
    let db = create_test_db().await;
    let files = Arc::new(RecordingFileStore::new());

    let outcome = manager(&db, files).delete_campaign("never-existed").await.unwrap();

    assert!(!outcome.deleted);
    assert!(db.list_audit(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_double_delete_audits_once() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Once").await;
    let files = Arc::new(RecordingFileStore::new());
    let lifecycle = manager(&db, files);

    let first = lifecycle.delete_campaign(&campaign.id).await.unwrap();
    let second = lifecycle.delete_campaign(&campaign.id).await.unwrap();

    assert!(first.deleted);
    assert!(!second.deleted);
    assert_eq!(db.list_audit(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_backing_files_are_removed() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;

    let mut source = create_test_source(&db, &campaign.id, "a.md", "alpha", None).await;
    source.file_path = Some("/uploads/a.bin".to_string());
    sqlx::query("UPDATE sources SET file_path = ? WHERE id = ?")
        .bind(&source.file_path)
        .bind(&source.id)
        .execute(db.pool())
        .await
        .unwrap();

    let files = Arc::new(RecordingFileStore::new());
    manager(&db, files.clone())
        .delete_campaign(&campaign.id)
        .await
        .unwrap();

    assert_eq!(files.removed_paths(), vec!["/uploads/a.bin".to_string()]);
}

#[tokio::test]
async fn test_missing_backing_file_does_not_abort() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;

    let source = create_test_source(&db, &campaign.id, "a.md", "alpha", None).await;
    sqlx::query("UPDATE sources SET file_path = ? WHERE id = ?")
        .bind("/uploads/gone.bin")
        .bind(&source.id)
        .execute(db.pool())
        .await
        .unwrap();

    let files = Arc::new(RecordingFileStore::with_missing(["/uploads/gone.bin".to_string()]));
    let outcome = manager(&db, files)
        .delete_campaign(&campaign.id)
        .await
        .unwrap();

    assert!(outcome.deleted);
    assert!(db.get_campaign(&campaign.id).await.unwrap().is_none());
}
