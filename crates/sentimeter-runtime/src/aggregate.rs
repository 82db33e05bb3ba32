//! Batch aggregation.
//!
//! Drives the per-review pipeline (score, extract, accumulate) across a
//! whole dataset. The batch contract is all-or-nothing: the first
//! unrecoverable review invalidates the run, and partial totals are
//! never reported.

use futures::stream::{self, StreamExt};
use thiserror::Error;

use sentimeter_core::{extract_scores, BatchResult, ExtractError, Review, SentimentScore};

use crate::cache::{CacheKey, ResponseCache};
use crate::config::{ConfigError, RuntimeConfig};
use crate::metrics::ScoringUsage;
use crate::providers::InferenceProvider;
use crate::retry::{InferenceError, ScoringClient};

use std::sync::Arc;

/// Why a batch was aborted.
///
/// Both variants carry the 0-based index of the review that failed; the
/// extraction variant also preserves the raw response for diagnosis.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Scoring the review failed after retry handling.
    #[error("scoring review {index} failed")]
    InferenceFailed {
        index: usize,
        #[source]
        source: InferenceError,
    },

    /// The endpoint answered, but the response held no readable scores.
    #[error("no readable scores in the response for review {index}")]
    ExtractionFailed {
        index: usize,
        raw_response: String,
        #[source]
        source: ExtractError,
    },
}

/// Runs review batches against the inference endpoint and accumulates
/// sentiment totals.
pub struct SentimentAggregator {
    client: ScoringClient,
    cache: Option<ResponseCache>,
    max_concurrency: usize,
}

impl SentimentAggregator {
    /// Create an aggregator over a scoring client, sequential, uncached.
    pub fn new(client: ScoringClient) -> Self {
        Self {
            client,
            cache: None,
            max_concurrency: 1,
        }
    }

    /// Build an aggregator from a runtime configuration.
    pub fn from_config(
        provider: Arc<dyn InferenceProvider>,
        config: &RuntimeConfig,
    ) -> Result<Self, ConfigError> {
        let client = ScoringClient::new(provider, config.completion_config())
            .with_policy(config.retry.clone())
            .with_classifier(config.classifier()?);

        Ok(Self {
            client,
            cache: config.cache_responses.then(ResponseCache::default),
            max_concurrency: config.max_concurrency.max(1),
        })
    }

    /// Enable response caching.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Allow up to `max_concurrency` reviews in flight at once.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Usage counters accumulated so far.
    pub fn usage(&self) -> ScoringUsage {
        self.client.tracker().snapshot()
    }

    /// Score every review and return the aggregate totals.
    ///
    /// Reviews are processed in input order at the default concurrency of
    /// one. The first fatal failure aborts the batch: the partial totals
    /// are discarded and any in-flight work is cancelled.
    pub async fn run_batch(&self, reviews: &[Review]) -> Result<BatchResult, BatchError> {
        let mut result = BatchResult::new(reviews.len());
        tracing::debug!(total_reviews = reviews.len(), "starting batch");

        if self.max_concurrency <= 1 {
            for (index, review) in reviews.iter().enumerate() {
                result.accumulate(self.score_one(index, review).await?);
            }
        } else {
            // Each review still owns an independent retry state machine;
            // only the number in flight changes. Accumulation order is
            // completion order, which is fine: addition commutes. An
            // error return drops the stream, cancelling in-flight calls.
            let mut scored = stream::iter(
                reviews
                    .iter()
                    .enumerate()
                    .map(|(index, review)| self.score_one(index, review)),
            )
            .buffer_unordered(self.max_concurrency);

            while let Some(outcome) = scored.next().await {
                result.accumulate(outcome?);
            }
        }

        tracing::debug!(
            positive = result.positive,
            negative = result.negative,
            neutral = result.neutral,
            "batch complete"
        );
        Ok(result)
    }

    /// Score a single review, consulting the cache first.
    async fn score_one(
        &self,
        index: usize,
        review: &Review,
    ) -> Result<SentimentScore, BatchError> {
        let raw = if let Some(cache) = &self.cache {
            let key = CacheKey::new(&self.client.completion().model, review);
            match cache.get(&key).await {
                Some(hit) => {
                    tracing::debug!(index, "serving cached response");
                    self.client.tracker().record_cache_hit();
                    hit
                }
                None => {
                    let raw = self
                        .client
                        .score(review)
                        .await
                        .map_err(|source| BatchError::InferenceFailed { index, source })?;
                    cache.insert(key, raw.clone()).await;
                    raw
                }
            }
        } else {
            self.client
                .score(review)
                .await
                .map_err(|source| BatchError::InferenceFailed { index, source })?
        };

        let score = extract_scores(&raw).map_err(|source| BatchError::ExtractionFailed {
            index,
            raw_response: raw,
            source,
        })?;

        self.client.tracker().record_review();
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        ChatMessage, CompletionConfig, CompletionResponse, ProviderError,
    };
    use crate::retry::RetryPolicy;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Provider returning a scripted sequence of outcomes.
    struct ScriptedProvider {
        outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
            })
        }
    }

    #[async_trait]
    impl InferenceProvider for ScriptedProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            let outcome = self
                .outcomes
                .lock()
                .pop_front()
                .expect("provider called more times than scripted");
            outcome.map(|content| CompletionResponse {
                content,
                model: config.model.clone(),
                total_tokens: None,
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn aggregator(outcomes: Vec<Result<String, ProviderError>>) -> SentimentAggregator {
        let client = ScoringClient::new(
            ScriptedProvider::new(outcomes),
            CompletionConfig::default(),
        );
        SentimentAggregator::new(client)
    }

    #[tokio::test]
    async fn test_fenced_and_bare_payloads_sum() {
        let aggregator = aggregator(vec![
            Ok("```json\n{\"scores\":{\"positive\":0.9,\"negative\":0.05,\"neutral\":0.05}}\n```"
                .to_string()),
            Ok(r#"{"scores":{"positive":0.1,"negative":0.8,"neutral":0.1}}"#.to_string()),
        ]);

        let reviews = vec![Review::new("Great product!"), Review::new("Terrible service")];
        let result = aggregator.run_batch(&reviews).await.unwrap();

        assert_eq!(result.total_reviews, 2);
        assert!((result.positive - 1.0).abs() < 1e-9);
        assert!((result.negative - 0.85).abs() < 1e-9);
        assert!((result.neutral - 0.15).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let aggregator = aggregator(vec![]);
        let result = aggregator.run_batch(&[]).await.unwrap();
        assert_eq!(result, BatchResult::new(0));
    }

    #[tokio::test]
    async fn test_inference_failure_aborts_with_index() {
        let aggregator = aggregator(vec![
            Ok(r#"{"scores":{"positive":1.0}}"#.to_string()),
            Err(ProviderError::AuthError),
        ]);

        let reviews = vec![Review::new("fine"), Review::new("also fine")];
        let err = aggregator.run_batch(&reviews).await.unwrap_err();

        match err {
            BatchError::InferenceFailed { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(source, InferenceError::Unrecoverable(_)));
            }
            other => panic!("expected InferenceFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_abort_with_index() {
        let rate_limited = || ProviderError::RateLimited { retry_after: None };
        let client = ScoringClient::new(
            ScriptedProvider::new(vec![
                Ok(r#"{"scores":{"neutral":1.0}}"#.to_string()),
                Err(rate_limited()),
                Err(rate_limited()),
            ]),
            CompletionConfig::default(),
        )
        .with_policy(RetryPolicy {
            max_attempts: 2,
            ..Default::default()
        });
        let aggregator = SentimentAggregator::new(client);

        let reviews = vec![Review::new("ok"), Review::new("throttled")];
        let err = aggregator.run_batch(&reviews).await.unwrap_err();

        match err {
            BatchError::InferenceFailed { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(
                    source,
                    InferenceError::RetriesExhausted { attempts: 2, .. }
                ));
            }
            other => panic!("expected InferenceFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_prose_response_aborts_and_preserves_raw() {
        let prose = "The review reads as mildly enthusiastic overall.";
        let aggregator = aggregator(vec![Ok(prose.to_string())]);

        let reviews = vec![Review::new("Great product!")];
        let err = aggregator.run_batch(&reviews).await.unwrap_err();

        match err {
            BatchError::ExtractionFailed {
                index,
                raw_response,
                source,
            } => {
                assert_eq!(index, 0);
                assert_eq!(raw_response, prose);
                assert!(matches!(source, ExtractError::MalformedPayload(_)));
            }
            other => panic!("expected ExtractionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cache_serves_duplicate_reviews() {
        // One scripted outcome only: the second call must come from cache
        // or the mock panics.
        let client = ScoringClient::new(
            ScriptedProvider::new(vec![Ok(r#"{"scores":{"positive":0.5}}"#.to_string())]),
            CompletionConfig::default(),
        );
        let aggregator = SentimentAggregator::new(client).with_cache(ResponseCache::default());

        let reviews = vec![Review::new("same review"), Review::new("same review")];
        let result = aggregator.run_batch(&reviews).await.unwrap();

        assert!((result.positive - 1.0).abs() < 1e-9);
        let usage = aggregator.usage();
        assert_eq!(usage.llm_calls, 1);
        assert_eq!(usage.cache_hits, 1);
        assert_eq!(usage.reviews_scored, 2);
    }

    #[tokio::test]
    async fn test_concurrent_mode_sums_match() {
        let payload = |p: f64| Ok(format!(r#"{{"scores":{{"positive":{p}}}}}"#));
        let aggregator = aggregator(vec![
            payload(0.1),
            payload(0.2),
            payload(0.3),
            payload(0.4),
        ])
        .with_max_concurrency(4);

        let reviews: Vec<Review> = (0..4).map(|i| Review::new(format!("review {i}"))).collect();
        let result = aggregator.run_batch(&reviews).await.unwrap();

        assert_eq!(result.total_reviews, 4);
        assert!((result.positive - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_concurrent_mode_aborts_on_failure() {
        let aggregator = aggregator(vec![
            Ok(r#"{"scores":{"positive":0.1}}"#.to_string()),
            Err(ProviderError::AuthError),
            Ok(r#"{"scores":{"positive":0.3}}"#.to_string()),
        ])
        .with_max_concurrency(2);

        let reviews: Vec<Review> = (0..3).map(|i| Review::new(format!("review {i}"))).collect();
        assert!(aggregator.run_batch(&reviews).await.is_err());
    }
}
