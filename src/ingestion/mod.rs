//! Source Ingestion
//!
//! Upload-time processing of source material: text extraction, chunking,
//! and the background embedding pipeline.

pub mod chunker;
pub mod extract;
pub mod pipeline;

pub use chunker::{ChunkError, Chunker};
pub use extract::{ExtractError, ExtractedText, PlainTextExtractor, TextExtractor};
pub use pipeline::{ingest_source, IngestError, IngestReport, IngestionPipeline};
