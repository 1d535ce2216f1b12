//! Campaign database operations
//!
//! CRUD for campaigns plus the atomic cascading delete used by the
//! lifecycle manager.

use super::models::{AuditRecord, CampaignOverview, CampaignRecord};
use super::Database;

/// Row counts removed by a cascading campaign delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeCounts {
    pub chunks: u64,
    pub sources: u64,
    pub history_entries: u64,
    pub documents: u64,
}

/// Extension trait for campaign-related database operations
pub trait CampaignOps {
    fn create_campaign(&self, campaign: &CampaignRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_campaign(&self, id: &str) -> impl std::future::Future<Output = Result<Option<CampaignRecord>, sqlx::Error>> + Send;
    fn list_campaigns(&self) -> impl std::future::Future<Output = Result<Vec<CampaignOverview>, sqlx::Error>> + Send;
    fn rename_campaign(&self, id: &str, name: &str, setting: Option<&str>) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn set_remote_brain(&self, id: &str, brain_id: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn set_remote_chat(&self, id: &str, chat_id: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    /// Delete a campaign and everything under it in one transaction:
    /// chunks of campaign sources, the sources, document history, the
    /// documents, the campaign row, and finally the audit record. Any
    /// failure rolls the whole transaction back.
    fn delete_campaign_cascade(&self, id: &str, audit: &AuditRecord) -> impl std::future::Future<Output = Result<CascadeCounts, sqlx::Error>> + Send;
}

impl CampaignOps for Database {
    async fn create_campaign(&self, campaign: &CampaignRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO campaigns (id, name, setting, remote_brain_id, remote_chat_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&campaign.id)
        .bind(&campaign.name)
        .bind(&campaign.setting)
        .bind(&campaign.remote_brain_id)
        .bind(&campaign.remote_chat_id)
        .bind(&campaign.created_at)
        .bind(&campaign.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<CampaignRecord>, sqlx::Error> {
        sqlx::query_as::<_, CampaignRecord>("SELECT * FROM campaigns WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    async fn list_campaigns(&self) -> Result<Vec<CampaignOverview>, sqlx::Error> {
        sqlx::query_as::<_, CampaignOverview>(
            r#"
            SELECT c.id, c.name, c.setting, COUNT(s.id) AS source_count,
                   c.created_at, c.updated_at
            FROM campaigns c
            LEFT JOIN sources s ON c.id = s.campaign_id
            GROUP BY c.id
            ORDER BY c.updated_at DESC
            "#,
        )
        .fetch_all(self.pool())
        .await
    }

    async fn rename_campaign(&self, id: &str, name: &str, setting: Option<&str>) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET name = ?, setting = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(setting)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn set_remote_brain(&self, id: &str, brain_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET remote_brain_id = ? WHERE id = ?")
            .bind(brain_id)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn set_remote_chat(&self, id: &str, chat_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET remote_chat_id = ? WHERE id = ?")
            .bind(chat_id)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn delete_campaign_cascade(&self, id: &str, audit: &AuditRecord) -> Result<CascadeCounts, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        // Order matters for referential consistency: leaves first.
        let chunks = sqlx::query(
            "DELETE FROM chunks WHERE source_id IN (SELECT id FROM sources WHERE campaign_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let sources = sqlx::query("DELETE FROM sources WHERE campaign_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let history_entries = sqlx::query(
            "DELETE FROM document_history WHERE document_id IN (SELECT id FROM documents WHERE campaign_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let documents = sqlx::query("DELETE FROM documents WHERE campaign_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM campaigns WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO audit_logs (id, action, details, created_at) VALUES (?, ?, ?, ?)")
            .bind(&audit.id)
            .bind(&audit.action)
            .bind(&audit.details)
            .bind(&audit.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CascadeCounts {
            chunks,
            sources,
            history_entries,
            documents,
        })
    }
}
