//! # sentimeter-runtime
//!
//! Everything between a reviews file and the aggregate sentiment totals:
//! dataset decoding, prompt construction, the inference provider, retry
//! with exponential backoff, response caching, and batch aggregation.
//!
//! The deterministic pieces (score model, response extraction) live in
//! `sentimeter-core`; this crate owns every side effect.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sentimeter_runtime::{
//!     aggregate::SentimentAggregator, config::RuntimeConfig, dataset,
//!     providers::GroqProvider,
//! };
//!
//! let config = RuntimeConfig::default();
//! let provider = Arc::new(GroqProvider::from_env()?);
//! let aggregator = SentimentAggregator::from_config(provider, &config)?;
//!
//! let reviews = dataset::load_reviews("reviews.csv")?;
//! let totals = aggregator.run_batch(&reviews).await?;
//! println!("{}", serde_json::to_string(&totals)?);
//! ```

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod metrics;
pub mod prompts;
pub mod providers;
pub mod retry;

// Re-export main types at crate root
pub use aggregate::{BatchError, SentimentAggregator};
pub use cache::ResponseCache;
pub use config::{ConfigError, RuntimeConfig};
pub use dataset::{load_reviews, DatasetError, REVIEW_COLUMN};
pub use metrics::{ScoringUsage, UsageTracker};
pub use providers::{GroqProvider, InferenceProvider, ProviderError};
pub use retry::{ErrorClass, InferenceError, RetryClassifier, RetryPolicy, ScoringClient};
