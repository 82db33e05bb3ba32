//! Usage tracking for batch runs.
//!
//! Counters only; cost control lives with the retry ceiling and the
//! per-call timeout, not here.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Accumulated usage for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringUsage {
    /// Reviews whose scores were folded into the aggregate
    pub reviews_scored: u32,

    /// Completion calls issued to the endpoint (including retried ones)
    pub llm_calls: u32,

    /// Backoff sleeps performed
    pub retries: u32,

    /// Throttling responses observed
    pub rate_limit_hits: u32,

    /// Responses served from the cache instead of the endpoint
    pub cache_hits: u32,
}

/// Shared, thread-safe usage accumulator.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: RwLock<ScoringUsage>,
}

impl UsageTracker {
    /// Create a zeroed tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completion call.
    pub fn record_call(&self) {
        self.usage.write().llm_calls += 1;
    }

    /// Record one backoff sleep.
    pub fn record_retry(&self) {
        self.usage.write().retries += 1;
    }

    /// Record one throttling response.
    pub fn record_rate_limit(&self) {
        self.usage.write().rate_limit_hits += 1;
    }

    /// Record one cache hit.
    pub fn record_cache_hit(&self) {
        self.usage.write().cache_hits += 1;
    }

    /// Record one successfully scored review.
    pub fn record_review(&self) {
        self.usage.write().reviews_scored += 1;
    }

    /// Current usage snapshot.
    pub fn snapshot(&self) -> ScoringUsage {
        self.usage.read().clone()
    }

    /// Zero all counters.
    pub fn reset(&self) {
        *self.usage.write() = ScoringUsage::default();
    }
}
