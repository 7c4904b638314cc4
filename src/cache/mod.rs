//! Response cache
//!
//! Optional read-through cache for GET responses, keyed by endpoint and
//! rendered query string. Values are raw response bodies so any response
//! type can be served from the cache.

mod memory;

pub use memory::MemoryCacheProvider;

use async_trait::async_trait;
use std::time::Duration;

/// Storage backend for cached responses
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Fetch a live entry
    async fn get(&self, key: &str) -> Option<String>;

    /// Store an entry for `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration);

    /// Remove one entry
    async fn remove(&self, key: &str);

    /// Remove every entry whose key starts with `prefix`
    async fn remove_prefix(&self, prefix: &str);

    /// Remove everything
    async fn clear(&self);
}

/// Cache key for an endpoint and query string
pub fn cache_key(endpoint: &str, query: &str) -> String {
    if query.is_empty() {
        endpoint.to_string()
    } else {
        format!("{endpoint}?{query}")
    }
}
