//! Embedding Ingestion Pipeline
//!
//! Background worker that turns uploaded source text into embedded
//! chunks. Uploads enqueue and return immediately; the worker drains a
//! bounded queue, embedding chunk by chunk with a small delay between
//! provider calls. A failed chunk is logged and skipped, never aborting
//! the rest of the source.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::IngestionConfig;
use crate::core::embeddings::EmbeddingProvider;
use crate::database::{ChunkOps, ChunkRecord, Database, SourceOps};
use crate::ingestion::chunker::Chunker;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Ingestion queue is full")]
    QueueFull,

    #[error("Ingestion pipeline is shut down")]
    Shutdown,

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;

// ============================================================================
// Ingestion Report
// ============================================================================

/// Outcome of ingesting one source.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestReport {
    pub chunks: usize,
    pub embedded: usize,
    pub skipped: usize,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Handle to the background ingestion worker.
pub struct IngestionPipeline {
    db: Database,
    tx: Mutex<Option<mpsc::Sender<String>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl IngestionPipeline {
    /// Spawn the worker task and return the pipeline handle.
    pub fn start(
        db: Database,
        embedder: Arc<dyn EmbeddingProvider>,
        chunker: Chunker,
        config: &IngestionConfig,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(config.queue_depth.max(1));
        let delay = Duration::from_millis(config.embed_delay_ms);

        let worker_db = db.clone();
        let worker = tokio::spawn(async move {
            while let Some(source_id) = rx.recv().await {
                match ingest_source(&worker_db, embedder.as_ref(), &chunker, &source_id, delay).await
                {
                    Ok(report) => info!(
                        %source_id,
                        chunks = report.chunks,
                        embedded = report.embedded,
                        skipped = report.skipped,
                        "Source ingested"
                    ),
                    Err(e) => warn!(%source_id, error = %e, "Source ingestion failed"),
                }
            }
        });

        Self {
            db,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue a source for background ingestion. Returns as soon as the
    /// job is accepted; a full queue is surfaced as back-pressure.
    pub async fn enqueue(&self, source_id: &str) -> Result<()> {
        let tx = self.tx.lock().await;
        let Some(tx) = tx.as_ref() else {
            return Err(IngestError::Shutdown);
        };

        tx.try_send(source_id.to_string()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => IngestError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => IngestError::Shutdown,
        })
    }

    /// Idempotent reconciliation sweep: re-enqueue every source that has
    /// no chunks (upload crashed, every embedding failed, or the process
    /// died mid-ingest). Returns how many sources were queued.
    pub async fn backfill(&self) -> Result<usize> {
        let orphaned = self.db.sources_without_chunks().await?;
        let mut queued = 0;

        for source in &orphaned {
            match self.enqueue(&source.id).await {
                Ok(()) => queued += 1,
                Err(IngestError::QueueFull) => {
                    warn!(source_id = %source.id, "Backfill queue full; remaining sources wait for the next sweep");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        if queued > 0 {
            info!(queued, "Backfill sweep queued sources for re-ingestion");
        }
        Ok(queued)
    }

    /// Close the queue and wait for the worker to drain it.
    pub async fn shutdown(&self) {
        self.tx.lock().await.take();
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(error = %e, "Ingestion worker terminated abnormally");
            }
        }
    }
}

/// Chunk and embed one source, persisting each successful chunk. Embeds
/// sequentially with `delay` between provider calls; per-chunk failures
/// are skipped so partial ingestion remains recoverable via backfill.
pub async fn ingest_source(
    db: &Database,
    embedder: &dyn EmbeddingProvider,
    chunker: &Chunker,
    source_id: &str,
    delay: Duration,
) -> Result<IngestReport> {
    let source = db
        .get_source(source_id)
        .await?
        .ok_or_else(|| IngestError::SourceNotFound(source_id.to_string()))?;

    let chunks = chunker.chunk(&source.text_content);
    let mut report = IngestReport {
        chunks: chunks.len(),
        ..Default::default()
    };

    for (index, text) in chunks.into_iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match embedder.embed(&text).await {
            Ok(vector) => {
                let chunk = ChunkRecord::new(source_id.to_string(), text, &vector);
                db.insert_chunk(&chunk).await?;
                report.embedded += 1;
            }
            Err(e) => {
                warn!(source_id, chunk = index, error = %e, "Chunk embedding failed; skipping");
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}
