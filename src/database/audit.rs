//! Audit log database operations

use super::models::AuditRecord;
use super::Database;

/// Extension trait for audit log operations
pub trait AuditOps {
    fn append_audit(&self, record: &AuditRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn list_audit(&self, limit: i64) -> impl std::future::Future<Output = Result<Vec<AuditRecord>, sqlx::Error>> + Send;
}

impl AuditOps for Database {
    async fn append_audit(&self, record: &AuditRecord) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO audit_logs (id, action, details, created_at) VALUES (?, ?, ?, ?)")
            .bind(&record.id)
            .bind(&record.action)
            .bind(&record.details)
            .bind(&record.created_at)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn list_audit(&self, limit: i64) -> Result<Vec<AuditRecord>, sqlx::Error> {
        sqlx::query_as::<_, AuditRecord>(
            "SELECT * FROM audit_logs ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
    }
}
