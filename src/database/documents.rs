//! Document database operations
//!
//! CRUD for lore documents plus the versioned save path: every save
//! snapshots the content being replaced into `document_history`, keeping
//! at most [`MAX_DOCUMENT_HISTORY`] entries per document (oldest evicted
//! first).

use sqlx::Row;
use uuid::Uuid;

use super::models::{DocumentHistoryRecord, DocumentRecord, HistorySummary};
use super::Database;

/// Retained history snapshots per document.
pub const MAX_DOCUMENT_HISTORY: i64 = 20;

/// Extension trait for document-related database operations
pub trait DocumentOps {
    fn create_document(&self, document: &DocumentRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_document(&self, id: &str) -> impl std::future::Future<Output = Result<Option<DocumentRecord>, sqlx::Error>> + Send;
    fn list_documents(&self, campaign_id: &str) -> impl std::future::Future<Output = Result<Vec<DocumentRecord>, sqlx::Error>> + Send;
    fn rename_document(&self, id: &str, title: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn delete_document(&self, id: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    /// Snapshot-then-overwrite save. Returns the new version number, or
    /// `None` if the document does not exist. The snapshot holds the
    /// content being replaced, under the pre-save version number.
    fn save_document_revision(&self, id: &str, new_content: &str) -> impl std::future::Future<Output = Result<Option<i64>, sqlx::Error>> + Send;

    fn count_history(&self, document_id: &str) -> impl std::future::Future<Output = Result<i64, sqlx::Error>> + Send;
    fn list_history(&self, document_id: &str) -> impl std::future::Future<Output = Result<Vec<HistorySummary>, sqlx::Error>> + Send;
    fn get_history_entry(&self, history_id: &str) -> impl std::future::Future<Output = Result<Option<DocumentHistoryRecord>, sqlx::Error>> + Send;
}

impl DocumentOps for Database {
    async fn create_document(&self, document: &DocumentRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, campaign_id, title, content, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.campaign_id)
        .bind(&document.title)
        .bind(&document.content)
        .bind(document.version)
        .bind(&document.created_at)
        .bind(&document.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>, sqlx::Error> {
        sqlx::query_as::<_, DocumentRecord>("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    async fn list_documents(&self, campaign_id: &str) -> Result<Vec<DocumentRecord>, sqlx::Error> {
        sqlx::query_as::<_, DocumentRecord>(
            "SELECT * FROM documents WHERE campaign_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(campaign_id)
        .fetch_all(self.pool())
        .await
    }

    async fn rename_document(&self, id: &str, title: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE documents SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<(), sqlx::Error> {
        // History rows reference the document; remove them in the same
        // transaction, leaves first.
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM document_history WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn save_document_revision(&self, id: &str, new_content: &str) -> Result<Option<i64>, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let Some(current) = sqlx::query("SELECT content, version FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        let old_content: String = current.get("content");
        let old_version: i64 = current.get("version");

        let history_count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM document_history WHERE document_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?
                .get("n");

        if history_count >= MAX_DOCUMENT_HISTORY {
            // Evict the single oldest snapshot; rowid breaks timestamp ties
            // in insertion order.
            sqlx::query(
                r#"
                DELETE FROM document_history WHERE id = (
                    SELECT id FROM document_history
                    WHERE document_id = ?
                    ORDER BY created_at ASC, rowid ASC
                    LIMIT 1
                )
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO document_history (id, document_id, content, version, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id)
        .bind(&old_content)
        .bind(old_version)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE documents SET content = ?, version = version + 1, updated_at = ? WHERE id = ?")
            .bind(new_content)
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(old_version + 1))
    }

    async fn count_history(&self, document_id: &str) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM document_history WHERE document_id = ?")
            .bind(document_id)
            .fetch_one(self.pool())
            .await?;
        Ok(row.get("n"))
    }

    async fn list_history(&self, document_id: &str) -> Result<Vec<HistorySummary>, sqlx::Error> {
        sqlx::query_as::<_, HistorySummary>(
            r#"
            SELECT id, version, created_at FROM document_history
            WHERE document_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(document_id)
        .fetch_all(self.pool())
        .await
    }

    async fn get_history_entry(&self, history_id: &str) -> Result<Option<DocumentHistoryRecord>, sqlx::Error> {
        sqlx::query_as::<_, DocumentHistoryRecord>("SELECT * FROM document_history WHERE id = ?")
            .bind(history_id)
            .fetch_optional(self.pool())
            .await
    }
}
