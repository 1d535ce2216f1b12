//! Source database operations
//!
//! Campaign-scoped sources, the global source library, and the cascade
//! rules between them: deleting a source removes its chunks in the same
//! transaction; deleting a global source also removes every campaign
//! copy sharing its file handle.

use super::models::{GlobalSourceRecord, SourceRecord};
use super::Database;

/// Extension trait for source-related database operations
pub trait SourceOps {
    fn insert_source(&self, source: &SourceRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_source(&self, id: &str) -> impl std::future::Future<Output = Result<Option<SourceRecord>, sqlx::Error>> + Send;
    fn list_sources(&self, campaign_id: &str) -> impl std::future::Future<Output = Result<Vec<SourceRecord>, sqlx::Error>> + Send;

    /// Look up a campaign source by provider file handle. Used to detect
    /// double assignment of a global source.
    fn find_source_by_uri(&self, campaign_id: &str, file_uri: &str) -> impl std::future::Future<Output = Result<Option<SourceRecord>, sqlx::Error>> + Send;

    /// Delete a source and its chunks in one transaction.
    fn delete_source_cascade(&self, id: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn insert_global_source(&self, source: &GlobalSourceRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_global_source(&self, id: &str) -> impl std::future::Future<Output = Result<Option<GlobalSourceRecord>, sqlx::Error>> + Send;
    fn list_global_sources(&self) -> impl std::future::Future<Output = Result<Vec<GlobalSourceRecord>, sqlx::Error>> + Send;

    /// Delete a global source together with every campaign copy that
    /// references its file handle (and those copies' chunks), in one
    /// transaction.
    fn delete_global_source_cascade(&self, id: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
}

impl SourceOps for Database {
    async fn insert_source(&self, source: &SourceRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sources (id, campaign_id, name, file_path, text_content, file_uri, mime_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&source.id)
        .bind(&source.campaign_id)
        .bind(&source.name)
        .bind(&source.file_path)
        .bind(&source.text_content)
        .bind(&source.file_uri)
        .bind(&source.mime_type)
        .bind(&source.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_source(&self, id: &str) -> Result<Option<SourceRecord>, sqlx::Error> {
        sqlx::query_as::<_, SourceRecord>("SELECT * FROM sources WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    async fn list_sources(&self, campaign_id: &str) -> Result<Vec<SourceRecord>, sqlx::Error> {
        sqlx::query_as::<_, SourceRecord>(
            "SELECT * FROM sources WHERE campaign_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(campaign_id)
        .fetch_all(self.pool())
        .await
    }

    async fn find_source_by_uri(&self, campaign_id: &str, file_uri: &str) -> Result<Option<SourceRecord>, sqlx::Error> {
        sqlx::query_as::<_, SourceRecord>(
            "SELECT * FROM sources WHERE campaign_id = ? AND file_uri = ?",
        )
        .bind(campaign_id)
        .bind(file_uri)
        .fetch_optional(self.pool())
        .await
    }

    async fn delete_source_cascade(&self, id: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM chunks WHERE source_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_global_source(&self, source: &GlobalSourceRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO global_sources (id, name, file_path, text_content, file_uri, mime_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&source.id)
        .bind(&source.name)
        .bind(&source.file_path)
        .bind(&source.text_content)
        .bind(&source.file_uri)
        .bind(&source.mime_type)
        .bind(&source.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_global_source(&self, id: &str) -> Result<Option<GlobalSourceRecord>, sqlx::Error> {
        sqlx::query_as::<_, GlobalSourceRecord>("SELECT * FROM global_sources WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    async fn list_global_sources(&self) -> Result<Vec<GlobalSourceRecord>, sqlx::Error> {
        sqlx::query_as::<_, GlobalSourceRecord>(
            "SELECT * FROM global_sources ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(self.pool())
        .await
    }

    async fn delete_global_source_cascade(&self, id: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let uri: Option<String> = sqlx::query_scalar("SELECT file_uri FROM global_sources WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .flatten();

        if let Some(uri) = uri {
            sqlx::query(
                "DELETE FROM chunks WHERE source_id IN (SELECT id FROM sources WHERE file_uri = ?)",
            )
            .bind(&uri)
            .execute(&mut *tx)
            .await?;
            sqlx::query("DELETE FROM sources WHERE file_uri = ?")
                .bind(&uri)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM global_sources WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
