use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub data: DataConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub cache: CacheConfig,
    pub ingestion: IngestionConfig,
}

/// Data directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

/// Text chunking parameters for source ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive windows, in characters. Must be
    /// smaller than `chunk_size`.
    pub chunk_overlap: usize,
}

/// Retrieval parameters for context assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks returned per query.
    pub top_k: usize,
}

/// Remote context cache parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Requested provider-side TTL in seconds.
    pub ttl_secs: u64,
    /// Local expiry is tracked this many seconds before the provider's
    /// own expiry, so we never hand out a handle the provider has
    /// already dropped.
    pub safety_margin_secs: u64,
    /// How long a chat turn waits for remote cache creation before
    /// falling back to inline content.
    pub create_timeout_secs: u64,
}

/// Background embedding ingestion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Capacity of the ingestion queue.
    pub queue_depth: usize,
    /// Delay between consecutive embedding calls for one source, in
    /// milliseconds. Keeps us under provider rate limits.
    pub embed_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            cache: CacheConfig::default(),
            ingestion: IngestionConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { data_dir: None }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            safety_margin_secs: 100,
            create_timeout_secs: 10,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            embed_delay_ms: 200,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `~/.config/loreforge/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Resolve the config file path, if a config directory exists.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("loreforge").join("config.toml"))
    }

    /// Resolve the data directory, honoring the override.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data
            .data_dir
            .clone()
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("loreforge")
            })
    }
}
