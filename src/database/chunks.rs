//! Chunk database operations
//!
//! The persistence half of the embedding store: chunk/vector pairs are
//! written per source and read back per campaign for retrieval.

use sqlx::Row;

use super::models::{ChunkRecord, SourceRecord};
use super::Database;

/// Extension trait for chunk-related database operations
pub trait ChunkOps {
    fn insert_chunk(&self, chunk: &ChunkRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    /// All chunks belonging to any source of the campaign, in insertion
    /// order so retrieval tie-breaks are reproducible.
    fn chunks_for_campaign(&self, campaign_id: &str) -> impl std::future::Future<Output = Result<Vec<ChunkRecord>, sqlx::Error>> + Send;

    fn count_chunks_for_source(&self, source_id: &str) -> impl std::future::Future<Output = Result<i64, sqlx::Error>> + Send;
    fn delete_chunks_for_source(&self, source_id: &str) -> impl std::future::Future<Output = Result<u64, sqlx::Error>> + Send;

    /// Sources with no chunks at all, across every campaign. Input to
    /// the backfill reconciliation sweep.
    fn sources_without_chunks(&self) -> impl std::future::Future<Output = Result<Vec<SourceRecord>, sqlx::Error>> + Send;
}

impl ChunkOps for Database {
    async fn insert_chunk(&self, chunk: &ChunkRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO chunks (id, source_id, content, embedding, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.source_id)
        .bind(&chunk.content)
        .bind(&chunk.embedding)
        .bind(&chunk.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn chunks_for_campaign(&self, campaign_id: &str) -> Result<Vec<ChunkRecord>, sqlx::Error> {
        sqlx::query_as::<_, ChunkRecord>(
            r#"
            SELECT c.id, c.source_id, c.content, c.embedding, c.created_at
            FROM chunks c
            JOIN sources s ON c.source_id = s.id
            WHERE s.campaign_id = ?
            ORDER BY c.rowid ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(self.pool())
        .await
    }

    async fn count_chunks_for_source(&self, source_id: &str) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM chunks WHERE source_id = ?")
            .bind(source_id)
            .fetch_one(self.pool())
            .await?;
        Ok(row.get("n"))
    }

    async fn delete_chunks_for_source(&self, source_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM chunks WHERE source_id = ?")
            .bind(source_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn sources_without_chunks(&self) -> Result<Vec<SourceRecord>, sqlx::Error> {
        sqlx::query_as::<_, SourceRecord>(
            r#"
            SELECT s.* FROM sources s
            LEFT JOIN chunks c ON c.source_id = s.id
            WHERE c.id IS NULL
            ORDER BY s.created_at ASC
            "#,
        )
        .fetch_all(self.pool())
        .await
    }
}
