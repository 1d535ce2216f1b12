//! Context Cache Manager
//!
//! Maintains TTL-bound handles to provider-side pre-loaded contexts so
//! consecutive chat turns over the same source set do not retransmit the
//! full source material. Keys are derived from the campaign and the
//! sorted set of source handles: any change to the source set changes
//! the key and forces fresh creation.
//!
//! Creation is serialized per key: the first cold-cache turn runs the
//! remote call (bounded by a timeout), concurrent turns observe the
//! in-flight attempt and fall back to inline content immediately. A slow
//! creation keeps running detached and is adopted on a later turn.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Context caching not supported by this provider")]
    Unsupported,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

// ============================================================================
// Remote Cache Provider Trait
// ============================================================================

/// A provider-side file reference that participates in a cached context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHandle {
    pub uri: String,
    pub mime_type: String,
}

/// Trait for provider-side context cache operations. Both calls are
/// best-effort from the engine's point of view: failure degrades to
/// inline content, never to a user-visible error.
#[async_trait]
pub trait RemoteCacheProvider: Send + Sync {
    /// Create a pre-loaded context over the given sources, valid for
    /// roughly `ttl`. Returns the provider's cache handle.
    async fn create_cache(&self, sources: &[SourceHandle], ttl: Duration) -> Result<String>;

    /// Delete a previously created cache handle.
    async fn delete_cache(&self, handle: &str) -> Result<()>;
}

/// Provider stub for backends without context caching. Every chat turn
/// falls back to inline content.
pub struct NoopCacheProvider;

#[async_trait]
impl RemoteCacheProvider for NoopCacheProvider {
    async fn create_cache(&self, _sources: &[SourceHandle], _ttl: Duration) -> Result<String> {
        Err(CacheError::Unsupported)
    }

    async fn delete_cache(&self, _handle: &str) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Cache Key
// ============================================================================

/// Derive the cache key for a campaign's source set. Handles are sorted
/// so the key is independent of upload order.
pub fn cache_key(campaign_id: &str, sources: &[SourceHandle]) -> String {
    let mut uris: Vec<&str> = sources.iter().map(|s| s.uri.as_str()).collect();
    uris.sort_unstable();
    format!("{}:{}", campaign_id, uris.join("|"))
}

// ============================================================================
// Cache Manager
// ============================================================================

/// A live cache entry. `expires_at` is tracked slightly before the
/// provider's own expiry so a handle is never used past its real TTL.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub remote_handle: String,
    pub expires_at: DateTime<Utc>,
}

enum CacheSlot {
    /// Creation in flight; concurrent readers fall back to inline.
    Pending,
    Live(CacheEntry),
}

struct CacheState {
    provider: Arc<dyn RemoteCacheProvider>,
    entries: Mutex<HashMap<String, CacheSlot>>,
    ttl: Duration,
    safety_margin: Duration,
    create_timeout: Duration,
}

/// Process-wide manager for provider-side context caches.
#[derive(Clone)]
pub struct ContextCacheManager {
    state: Arc<CacheState>,
}

impl ContextCacheManager {
    pub fn new(provider: Arc<dyn RemoteCacheProvider>, config: &CacheConfig) -> Self {
        Self {
            state: Arc::new(CacheState {
                provider,
                entries: Mutex::new(HashMap::new()),
                ttl: Duration::from_secs(config.ttl_secs),
                safety_margin: Duration::from_secs(config.safety_margin_secs),
                create_timeout: Duration::from_secs(config.create_timeout_secs),
            }),
        }
    }

    /// Return a live cache handle for the campaign's source set,
    /// creating one if needed. `None` means "send source material
    /// inline this turn": the source set is empty, creation is already
    /// in flight, the provider refused, or creation outran the timeout
    /// (in which case it continues detached and is adopted later).
    pub async fn get_or_create(
        &self,
        campaign_id: &str,
        sources: &[SourceHandle],
    ) -> Option<String> {
        if sources.is_empty() {
            return None;
        }

        let key = cache_key(campaign_id, sources);
        let mut expired_handle = None;

        {
            let mut entries = self.state.entries.lock().await;
            match entries.get(&key) {
                Some(CacheSlot::Live(entry)) if Utc::now() < entry.expires_at => {
                    return Some(entry.remote_handle.clone());
                }
                Some(CacheSlot::Live(entry)) => {
                    expired_handle = Some(entry.remote_handle.clone());
                    entries.remove(&key);
                }
                Some(CacheSlot::Pending) => {
                    debug!(%key, "Cache creation in flight; using inline content");
                    return None;
                }
                None => {}
            }
            entries.insert(key.clone(), CacheSlot::Pending);
        }

        if let Some(handle) = expired_handle {
            let state = self.state.clone();
            tokio::spawn(async move {
                if let Err(e) = state.provider.delete_cache(&handle).await {
                    debug!(%handle, error = %e, "Ignoring failure to delete expired cache");
                }
            });
        }

        let state = self.state.clone();
        let task_key = key.clone();
        let task_sources = sources.to_vec();
        let create_task =
            tokio::spawn(async move { create_entry(state, task_key, task_sources).await });

        match timeout(self.state.create_timeout, create_task).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                warn!(%key, error = %e, "Cache creation task failed");
                None
            }
            Err(_) => {
                debug!(%key, "Cache creation slow; using inline content this turn");
                None
            }
        }
    }

    /// Drop every expired entry, best-effort deleting the remote
    /// handles. Returns the number of entries removed. Safe to run on a
    /// timer; lazy expiry in `get_or_create` does not depend on it.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let stale: Vec<String> = {
            let mut entries = self.state.entries.lock().await;
            let keys: Vec<String> = entries
                .iter()
                .filter_map(|(key, slot)| match slot {
                    CacheSlot::Live(entry) if now >= entry.expires_at => Some(key.clone()),
                    _ => None,
                })
                .collect();

            keys.iter()
                .filter_map(|key| match entries.remove(key) {
                    Some(CacheSlot::Live(entry)) => Some(entry.remote_handle),
                    _ => None,
                })
                .collect()
        };

        let purged = stale.len();
        for handle in stale {
            if let Err(e) = self.state.provider.delete_cache(&handle).await {
                debug!(%handle, error = %e, "Ignoring failure to delete expired cache");
            }
        }
        purged
    }

    /// Number of live (unexpired) entries.
    pub async fn live_entries(&self) -> usize {
        let now = Utc::now();
        self.state
            .entries
            .lock()
            .await
            .values()
            .filter(|slot| matches!(slot, CacheSlot::Live(entry) if now < entry.expires_at))
            .count()
    }
}

async fn create_entry(
    state: Arc<CacheState>,
    key: String,
    sources: Vec<SourceHandle>,
) -> Option<String> {
    match state.provider.create_cache(&sources, state.ttl).await {
        Ok(handle) => {
            let lifetime = state.ttl.saturating_sub(state.safety_margin);
            let expires_at = Utc::now()
                + chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::zero());

            let mut entries = state.entries.lock().await;
            entries.insert(
                key.clone(),
                CacheSlot::Live(CacheEntry {
                    remote_handle: handle.clone(),
                    expires_at,
                }),
            );
            info!(%key, %handle, "Remote context cache created");
            Some(handle)
        }
        Err(e) => {
            warn!(%key, error = %e, "Cache creation failed; falling back to inline content");
            state.entries.lock().await.remove(&key);
            None
        }
    }
}

// ============================================================================
// Gemini Cache Provider
// ============================================================================

/// Context cache provider backed by Google's cachedContents API.
pub struct GeminiCacheProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiCacheProvider {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(api_key: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl RemoteCacheProvider for GeminiCacheProvider {
    async fn create_cache(&self, sources: &[SourceHandle], ttl: Duration) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(CacheError::NotConfigured("missing API key".to_string()));
        }

        let parts: Vec<serde_json::Value> = sources
            .iter()
            .map(|s| {
                json!({ "file_data": { "file_uri": s.uri, "mime_type": s.mime_type } })
            })
            .collect();

        let request = json!({
            "model": format!("models/{}", self.model),
            "contents": [{ "role": "user", "parts": parts }],
            "ttl": format!("{}s", ttl.as_secs()),
        });

        let url = format!("{}/cachedContents?key={}", self.base_url, self.api_key);
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CacheError::ApiError(format!("{}: {}", status, body)));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CacheError::InvalidResponse(e.to_string()))?;

        parsed["name"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CacheError::InvalidResponse("missing cache name".to_string()))
    }

    async fn delete_cache(&self, handle: &str) -> Result<()> {
        let url = format!("{}/{}?key={}", self.base_url, handle, self.api_key);
        let response = self.client.delete(&url).send().await?;

        if !response.status().is_success() {
            return Err(CacheError::ApiError(response.status().to_string()));
        }
        Ok(())
    }
}
