//! Version Store Unit Tests
//!
//! Save/restore semantics: restore is read-only, saves are serialized
//! per document, and the history cap holds under repeated saves.

use std::sync::Arc;

use crate::core::locks::LockRegistry;
use crate::core::versioning::{VersionError, VersionStore};
use crate::database::{DocumentOps, MAX_DOCUMENT_HISTORY};
use crate::tests::common::{create_test_campaign, create_test_db, create_test_document};

fn store(db: &crate::database::Database) -> VersionStore {
    VersionStore::new(db.clone(), Arc::new(LockRegistry::new()))
}

#[tokio::test]
async fn test_save_increments_version_and_snapshots() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let document = create_test_document(&db, &campaign.id, "Doc", "draft one").await;
    let versions = store(&db);

    let v2 = versions.save(&document.id, "draft two").await.unwrap();
    let v3 = versions.save(&document.id, "draft three").await.unwrap();
    assert_eq!((v2, v3), (2, 3));

    let history = versions.history(&document.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, 2);
    assert_eq!(history[1].version, 1);
}

#[tokio::test]
async fn test_save_missing_document_is_not_found() {
    let db = create_test_db().await;
    let versions = store(&db);

    let result = versions.save("ghost", "content").await;
    assert!(matches!(result, Err(VersionError::NotFound(_))));
}

#[tokio::test]
async fn test_restore_returns_snapshot_without_writing() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let document = create_test_document(&db, &campaign.id, "Doc", "original").await;
    let versions = store(&db);

    versions.save(&document.id, "rewritten").await.unwrap();
    let history = versions.history(&document.id).await.unwrap();
    let snapshot_id = history[0].id.clone();

    let restored = versions.restore(&snapshot_id).await.unwrap();
    assert_eq!(restored, "original");

    // A restore followed by no save leaves document and history
    // exactly as they were.
    let document_after = db.get_document(&document.id).await.unwrap().unwrap();
    assert_eq!(document_after.content, "rewritten");
    assert_eq!(document_after.version, 2);

    let history_after = versions.history(&document.id).await.unwrap();
    assert_eq!(history_after.len(), 1);
    assert_eq!(history_after[0].id, snapshot_id);
}

#[tokio::test]
async fn test_restore_missing_entry_is_not_found() {
    let db = create_test_db().await;
    let versions = store(&db);

    let result = versions.restore("ghost").await;
    assert!(matches!(result, Err(VersionError::NotFound(_))));
}

#[tokio::test]
async fn test_restore_then_save_persists_as_new_version() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let document = create_test_document(&db, &campaign.id, "Doc", "original").await;
    let versions = store(&db);

    versions.save(&document.id, "rewritten").await.unwrap();
    let history = versions.history(&document.id).await.unwrap();
    let restored = versions.restore(&history[0].id).await.unwrap();

    let v3 = versions.save(&document.id, &restored).await.unwrap();
    assert_eq!(v3, 3);

    let document_after = db.get_document(&document.id).await.unwrap().unwrap();
    assert_eq!(document_after.content, "original");
}

#[tokio::test]
async fn test_concurrent_saves_serialize_per_document() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let document = create_test_document(&db, &campaign.id, "Doc", "base").await;
    let versions = store(&db);

    let mut handles = Vec::new();
    for i in 0..8 {
        let versions = versions.clone();
        let id = document.id.clone();
        handles.push(tokio::spawn(async move {
            versions.save(&id, &format!("concurrent {}", i)).await
        }));
    }

    let mut new_versions: Vec<i64> = Vec::new();
    for handle in handles {
        new_versions.push(handle.await.unwrap().unwrap());
    }
    new_versions.sort_unstable();

    // Every save observed a distinct predecessor: no duplicate version
    // numbers, no gaps.
    assert_eq!(new_versions, (2..=9).collect::<Vec<i64>>());
    assert_eq!(db.count_history(&document.id).await.unwrap(), 8);

    let final_doc = db.get_document(&document.id).await.unwrap().unwrap();
    assert_eq!(final_doc.version, 9);
}

#[tokio::test]
async fn test_long_edit_session_respects_cap() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let document = create_test_document(&db, &campaign.id, "Doc", "v1").await;
    let versions = store(&db);

    for i in 2..=30 {
        versions
            .save(&document.id, &format!("v{}", i))
            .await
            .unwrap();
    }

    assert_eq!(
        db.count_history(&document.id).await.unwrap(),
        MAX_DOCUMENT_HISTORY
    );
}
