//! Response caching.
//!
//! Datasets routinely contain duplicate reviews; an identical (model,
//! review) pair scores identically, so re-asking the endpoint only burns
//! quota. The cache stores raw response text; extraction still runs on
//! every hit, keeping cached and uncached paths behaviorally identical.

use moka::future::Cache;
use std::time::Duration;

use sentimeter_core::Review;

/// Cache key: hash of model id and review text.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct CacheKey {
    model_hash: u64,
    review_hash: u64,
}

impl CacheKey {
    /// Create a key for a (model, review) pair.
    pub fn new(model: &str, review: &Review) -> Self {
        Self {
            model_hash: hash_str(model),
            review_hash: hash_str(review.text()),
        }
    }
}

/// In-memory cache of raw scoring responses.
pub struct ResponseCache {
    cache: Cache<CacheKey, String>,
}

impl ResponseCache {
    /// Create a cache with the given capacity and entry TTL.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Get a cached raw response.
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        self.cache.get(key).await
    }

    /// Store a raw response.
    pub async fn insert(&self, key: CacheKey, raw_response: String) {
        self.cache.insert(key, raw_response).await;
    }

    /// Drop all entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}

fn hash_str(text: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
