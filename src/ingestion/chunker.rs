//! Sliding-Window Chunker
//!
//! Splits extracted source text into fixed-size overlapping windows, the
//! unit of embedding and retrieval. Chunking is a pure function of
//! `(text, size, overlap)` so re-ingesting a source always yields the
//! same chunks.

use thiserror::Error;

use crate::config::ChunkingConfig;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Chunk size must be greater than zero")]
    ZeroSize,

    #[error("Overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

pub type Result<T> = std::result::Result<T, ChunkError>;

// ============================================================================
// Chunker
// ============================================================================

/// Fixed-window text chunker.
#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
            .expect("default chunking config is valid")
    }
}

impl Chunker {
    /// Create a chunker with explicit window parameters.
    ///
    /// Fails fast when `overlap >= size`: a stride of zero or less would
    /// never advance through the text.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    /// Create a chunker from configuration.
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Window size in characters.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Overlap between consecutive windows, in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered overlapping windows.
    ///
    /// Windows are `size` characters long and start `size - overlap`
    /// characters apart. The final window may be shorter than `size`; it
    /// is kept as-is. Empty input yields no chunks. Offsets are measured
    /// in `char`s, so multi-byte text is never split inside a code point.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let stride = self.size - self.overlap;
        let mut chunks = Vec::with_capacity(chars.len() / stride + 1);

        let mut start = 0;
        while start < chars.len() {
            let end = usize::min(start + self.size, chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }

        chunks
    }
}
