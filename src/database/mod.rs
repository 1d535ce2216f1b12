//! Database Layer
//!
//! SQLite-backed persistence for campaigns, documents, version history,
//! source material, chunk embeddings, and the audit log. Operations are
//! grouped into extension traits implemented on [`Database`].

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub mod audit;
pub mod campaigns;
pub mod chunks;
pub mod documents;
pub mod migrations;
pub mod models;
pub mod sources;

pub use audit::AuditOps;
pub use campaigns::{CampaignOps, CascadeCounts};
pub use chunks::ChunkOps;
pub use documents::{DocumentOps, MAX_DOCUMENT_HISTORY};
pub use models::{
    AuditAction, AuditRecord, CampaignOverview, CampaignRecord, ChunkRecord,
    DocumentHistoryRecord, DocumentRecord, GlobalSourceRecord, HistorySummary, SourceRecord,
};
pub use sources::SourceOps;

/// Database file name within the data directory.
const DB_FILE: &str = "loreforge.db";

/// Shared handle to the SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database under `data_dir` and run migrations.
    pub async fn new(data_dir: &Path) -> Result<Self, sqlx::Error> {
        std::fs::create_dir_all(data_dir).map_err(|e| {
            sqlx::Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create data directory {}: {}", data_dir.display(), e),
            ))
        })?;

        let options = SqliteConnectOptions::new()
            .filename(data_dir.join(DB_FILE))
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Open an in-memory database (tests and ephemeral use).
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        // A single connection keeps the in-memory database alive and shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Access the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
