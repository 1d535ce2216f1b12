//! Source Database Tests
//!
//! Campaign sources, the global library, chunk scoping, and the cascade
//! rules between them.

use crate::database::{ChunkOps, GlobalSourceRecord, SourceOps};
use crate::tests::common::{
    create_test_campaign, create_test_db, create_test_source, insert_test_chunk,
};

#[tokio::test]
async fn test_insert_and_list_sources() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;

    create_test_source(&db, &campaign.id, "phb.md", "player rules", Some("files/a")).await;
    create_test_source(&db, &campaign.id, "dmg.md", "gm rules", Some("files/b")).await;

    let sources = db.list_sources(&campaign.id).await.unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].name, "phb.md");
}

#[tokio::test]
async fn test_find_source_by_uri() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    create_test_source(&db, &campaign.id, "phb.md", "rules", Some("files/a")).await;

    assert!(db
        .find_source_by_uri(&campaign.id, "files/a")
        .await
        .unwrap()
        .is_some());
    assert!(db
        .find_source_by_uri(&campaign.id, "files/other")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_delete_source_cascades_to_chunks() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let source = create_test_source(&db, &campaign.id, "phb.md", "rules", Some("files/a")).await;
    insert_test_chunk(&db, &source.id, "chunk one", &[1.0, 0.0]).await;
    insert_test_chunk(&db, &source.id, "chunk two", &[0.0, 1.0]).await;

    db.delete_source_cascade(&source.id).await.unwrap();

    assert!(db.get_source(&source.id).await.unwrap().is_none());
    assert_eq!(db.count_chunks_for_source(&source.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_chunks_are_campaign_scoped() {
    let db = create_test_db().await;
    let camp_a = create_test_campaign(&db, "A").await;
    let camp_b = create_test_campaign(&db, "B").await;
    let source_a = create_test_source(&db, &camp_a.id, "a.md", "alpha", None).await;
    let source_b = create_test_source(&db, &camp_b.id, "b.md", "beta", None).await;

    insert_test_chunk(&db, &source_a.id, "alpha chunk", &[1.0]).await;
    insert_test_chunk(&db, &source_b.id, "beta chunk", &[2.0]).await;

    let chunks = db.chunks_for_campaign(&camp_a.id).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "alpha chunk");
}

#[tokio::test]
async fn test_global_sources_list_newest_first() {
    let db = create_test_db().await;

    for (name, created_at) in [
        ("old.md", "2026-01-01T00:00:00+00:00"),
        ("new.md", "2026-06-01T00:00:00+00:00"),
    ] {
        let mut source = GlobalSourceRecord::new(
            name.to_string(),
            "text".to_string(),
            None,
            "text/markdown".to_string(),
        );
        source.created_at = created_at.to_string();
        db.insert_global_source(&source).await.unwrap();
    }

    let listing = db.list_global_sources().await.unwrap();
    assert_eq!(listing[0].name, "new.md");
    assert_eq!(listing[1].name, "old.md");
}

#[tokio::test]
async fn test_delete_global_source_removes_campaign_copies() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;

    let global = GlobalSourceRecord::new(
        "bestiary.md".to_string(),
        "monsters".to_string(),
        Some("files/shared".to_string()),
        "text/markdown".to_string(),
    );
    db.insert_global_source(&global).await.unwrap();

    // Assign a copy into the campaign and embed it.
    let copy = global.to_campaign_source(campaign.id.clone());
    db.insert_source(&copy).await.unwrap();
    insert_test_chunk(&db, &copy.id, "monster chunk", &[1.0, 2.0]).await;

    db.delete_global_source_cascade(&global.id).await.unwrap();

    assert!(db.get_global_source(&global.id).await.unwrap().is_none());
    assert!(db.get_source(&copy.id).await.unwrap().is_none());
    assert_eq!(db.count_chunks_for_source(&copy.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sources_without_chunks_finds_only_orphans() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let embedded = create_test_source(&db, &campaign.id, "done.md", "text", None).await;
    let orphan = create_test_source(&db, &campaign.id, "pending.md", "text", None).await;
    insert_test_chunk(&db, &embedded.id, "chunk", &[1.0]).await;

    let orphans = db.sources_without_chunks().await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].id, orphan.id);
}
