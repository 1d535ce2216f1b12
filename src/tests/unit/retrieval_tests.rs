//! Retriever Unit Tests
//!
//! Ranking, scoping, the k bound, and degraded behavior when the query
//! embedding fails.

use std::sync::Arc;

use crate::core::retrieval::Retriever;
use crate::tests::common::{create_test_campaign, create_test_db, create_test_source, insert_test_chunk};
use crate::tests::mocks::{BrokenEmbedder, MockEmbedder, StaticEmbedder};

#[tokio::test]
async fn test_retrieve_ranks_by_similarity() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let source = create_test_source(&db, &campaign.id, "lore.md", "text", None).await;

    insert_test_chunk(&db, &source.id, "weak match", &[0.1, 1.0]).await;
    insert_test_chunk(&db, &source.id, "strong match", &[1.0, 0.0]).await;
    insert_test_chunk(&db, &source.id, "medium match", &[1.0, 0.5]).await;

    let retriever = Retriever::new(db, Arc::new(StaticEmbedder::new(vec![1.0, 0.0])));
    let results = retriever
        .retrieve(&campaign.id, &[1.0, 0.0], 5)
        .await
        .unwrap();

    assert_eq!(results, vec!["strong match", "medium match", "weak match"]);
}

#[tokio::test]
async fn test_retrieve_returns_at_most_k() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let source = create_test_source(&db, &campaign.id, "lore.md", "text", None).await;

    for i in 0..8 {
        insert_test_chunk(&db, &source.id, &format!("chunk {}", i), &[1.0, i as f32]).await;
    }

    let retriever = Retriever::new(db, Arc::new(StaticEmbedder::new(vec![1.0, 0.0])));
    let results = retriever
        .retrieve(&campaign.id, &[1.0, 0.0], 3)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn test_retrieve_is_campaign_scoped() {
    let db = create_test_db().await;
    let camp_a = create_test_campaign(&db, "A").await;
    let camp_b = create_test_campaign(&db, "B").await;
    let source_a = create_test_source(&db, &camp_a.id, "a.md", "text", None).await;
    let source_b = create_test_source(&db, &camp_b.id, "b.md", "text", None).await;

    insert_test_chunk(&db, &source_a.id, "mine", &[1.0, 0.0]).await;
    insert_test_chunk(&db, &source_b.id, "theirs", &[1.0, 0.0]).await;

    let retriever = Retriever::new(db, Arc::new(StaticEmbedder::new(vec![1.0, 0.0])));
    let results = retriever
        .retrieve(&camp_a.id, &[1.0, 0.0], 5)
        .await
        .unwrap();

    assert_eq!(results, vec!["mine"]);
}

#[tokio::test]
async fn test_empty_store_yields_empty_result() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;

    let retriever = Retriever::new(db, Arc::new(StaticEmbedder::new(vec![1.0, 0.0])));
    let results = retriever
        .retrieve(&campaign.id, &[1.0, 0.0], 5)
        .await
        .unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn test_zero_magnitude_chunk_is_excluded() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let source = create_test_source(&db, &campaign.id, "lore.md", "text", None).await;

    insert_test_chunk(&db, &source.id, "degenerate", &[0.0, 0.0]).await;
    insert_test_chunk(&db, &source.id, "valid", &[1.0, 0.0]).await;

    let retriever = Retriever::new(db, Arc::new(StaticEmbedder::new(vec![1.0, 0.0])));
    let results = retriever
        .retrieve(&campaign.id, &[1.0, 0.0], 5)
        .await
        .unwrap();

    assert_eq!(results, vec!["valid"]);
}

#[tokio::test]
async fn test_ties_keep_insertion_order() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let source = create_test_source(&db, &campaign.id, "lore.md", "text", None).await;

    // Identical vectors: identical scores.
    insert_test_chunk(&db, &source.id, "first", &[1.0, 1.0]).await;
    insert_test_chunk(&db, &source.id, "second", &[1.0, 1.0]).await;
    insert_test_chunk(&db, &source.id, "third", &[1.0, 1.0]).await;

    let retriever = Retriever::new(db, Arc::new(StaticEmbedder::new(vec![1.0, 1.0])));
    let results = retriever
        .retrieve(&campaign.id, &[1.0, 1.0], 5)
        .await
        .unwrap();

    assert_eq!(results, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_retrieve_context_embeds_the_query() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let source = create_test_source(&db, &campaign.id, "lore.md", "text", None).await;
    insert_test_chunk(&db, &source.id, "the answer", &[1.0, 0.0]).await;

    let mut embedder = MockEmbedder::new();
    embedder
        .expect_embed()
        .withf(|text| text == "who rules the city?")
        .times(1)
        .returning(|_| Ok(vec![1.0, 0.0]));

    let retriever = Retriever::new(db, Arc::new(embedder));
    let results = retriever
        .retrieve_context(&campaign.id, "who rules the city?", 5)
        .await
        .unwrap();

    assert_eq!(results, vec!["the answer"]);
}

#[tokio::test]
async fn test_failed_query_embedding_degrades_to_no_context() {
    let db = create_test_db().await;
    let campaign = create_test_campaign(&db, "Camp").await;
    let source = create_test_source(&db, &campaign.id, "lore.md", "text", None).await;
    insert_test_chunk(&db, &source.id, "unreachable", &[1.0, 0.0]).await;

    let retriever = Retriever::new(db, Arc::new(BrokenEmbedder));
    let results = retriever
        .retrieve_context(&campaign.id, "anything", 5)
        .await
        .unwrap();

    assert!(results.is_empty());
}
