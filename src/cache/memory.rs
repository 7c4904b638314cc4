//! In-memory cache backed by moka

use super::CacheProvider;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    body: Arc<str>,
    expires_at: Instant,
}

/// Bounded in-memory cache with per-entry expiry
#[derive(Clone)]
pub struct MemoryCacheProvider {
    cache: Cache<String, Entry>,
}

impl MemoryCacheProvider {
    /// Create a cache holding at most `max_entries`; nothing outlives `max_ttl`
    pub fn new(max_entries: u64, max_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(max_ttl)
            .build();
        Self { cache }
    }

    /// Number of entries (approximate until pending maintenance runs)
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> Option<String> {
        let entry = self.cache.get(key).await?;
        if entry.expires_at <= Instant::now() {
            self.cache.invalidate(key).await;
            return None;
        }
        Some(entry.body.to_string())
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let entry = Entry {
            body: Arc::from(value),
            expires_at: Instant::now() + ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
    }

    async fn remove(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    async fn remove_prefix(&self, prefix: &str) {
        let keys: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k)
            .collect();
        debug!(prefix, evicted = keys.len(), "Evicting cached responses");
        for key in keys {
            self.cache.invalidate(key.as_str()).await;
        }
    }

    async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for MemoryCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheProvider")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
