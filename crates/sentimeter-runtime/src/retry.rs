//! Bounded exponential-backoff retry around single-review scoring.
//!
//! Throttling is the only error class worth retrying: it is transient and
//! endpoint-imposed, and waiting out the window usually clears it.
//! Everything else (auth, malformed request, connectivity) would fail the
//! same way on attempt two, so it fails the call immediately.
//!
//! The retry loop is an explicit state machine: which state a call is in
//! and how long each backoff lasts are part of the observable contract.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use sentimeter_core::Review;

use crate::metrics::UsageTracker;
use crate::prompts;
use crate::providers::{ChatMessage, CompletionConfig, InferenceProvider, ProviderError};

/// Retry configuration, applied per review independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per review, including the first (must be >= 1)
    pub max_attempts: u32,

    /// Backoff before the second attempt
    #[serde(with = "duration_str")]
    pub initial_backoff: Duration,

    /// Growth factor applied per subsequent backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff duration after the given (1-based) failed attempt:
    /// `initial_backoff * multiplier^(attempt-1)`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .mul_f64(self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32))
    }
}

/// Serde support for humantime-style duration strings ("1s", "500ms").
pub(crate) mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

/// How a provider error should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Endpoint-imposed throttling; worth waiting out
    Transient,

    /// Retrying will not change the outcome
    Fatal,
}

/// Classifies provider errors as transient (retryable) or fatal.
///
/// Classification is structural first: a [`ProviderError::RateLimited`]
/// or an HTTP 429 is throttling by definition. On top of that, an
/// optional message pattern catches endpoints that report throttling
/// inside a generic error body instead of a status code.
#[derive(Debug, Clone)]
pub struct RetryClassifier {
    message_pattern: Option<Regex>,
}

/// Default pattern for throttling reported in error message bodies.
const DEFAULT_RATE_LIMIT_PATTERN: &str = "(?i)rate limit";

impl Default for RetryClassifier {
    fn default() -> Self {
        // DEFAULT_RATE_LIMIT_PATTERN is a valid regex; ok() never
        // discards an error here.
        Self {
            message_pattern: Regex::new(DEFAULT_RATE_LIMIT_PATTERN).ok(),
        }
    }
}

impl RetryClassifier {
    /// Build a classifier with a custom message pattern, or none.
    pub fn with_pattern(pattern: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            message_pattern: pattern.map(Regex::new).transpose()?,
        })
    }

    /// Classify a provider error.
    pub fn classify(&self, error: &ProviderError) -> ErrorClass {
        match error {
            ProviderError::RateLimited { .. } => ErrorClass::Transient,
            ProviderError::ApiError { status: 429, .. } => ErrorClass::Transient,
            ProviderError::ApiError { message, .. } => {
                let throttled = self
                    .message_pattern
                    .as_ref()
                    .is_some_and(|p| p.is_match(message));
                if throttled {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Fatal
                }
            }
            _ => ErrorClass::Fatal,
        }
    }
}

/// Terminal failure of a single-review scoring call.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Throttling persisted through every allowed attempt.
    #[error("rate limited on all {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: ProviderError,
    },

    /// A non-transient provider error; retrying would not help.
    #[error("inference call failed")]
    Unrecoverable(#[source] ProviderError),
}

/// Retry loop state. One machine per scoring call; never shared.
#[derive(Debug)]
enum RetryState {
    /// Issuing attempt number `attempt` (1-based)
    Attempting { attempt: u32 },

    /// Attempt `attempt` was throttled; waiting before the next one
    Backoff { attempt: u32 },
}

/// Scores single reviews against the inference endpoint, retrying
/// through rate limits.
///
/// Returns the raw response text verbatim on success; extracting a score
/// from it is the caller's concern. That split keeps "the call failed"
/// and "the payload is unreadable" in separate failure domains.
pub struct ScoringClient {
    provider: Arc<dyn InferenceProvider>,
    completion: CompletionConfig,
    policy: RetryPolicy,
    classifier: RetryClassifier,
    tracker: Arc<UsageTracker>,
}

impl ScoringClient {
    /// Create a client with default policy and classifier.
    pub fn new(provider: Arc<dyn InferenceProvider>, completion: CompletionConfig) -> Self {
        Self {
            provider,
            completion,
            policy: RetryPolicy::default(),
            classifier: RetryClassifier::default(),
            tracker: Arc::new(UsageTracker::new()),
        }
    }

    /// Set the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the error classifier.
    pub fn with_classifier(mut self, classifier: RetryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Share a usage tracker with the caller.
    pub fn with_tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// The usage tracker this client records into.
    pub fn tracker(&self) -> Arc<UsageTracker> {
        Arc::clone(&self.tracker)
    }

    /// The completion configuration in use.
    pub fn completion(&self) -> &CompletionConfig {
        &self.completion
    }

    /// Score one review, returning the raw response text.
    pub async fn score(&self, review: &Review) -> Result<String, InferenceError> {
        self.score_with_policy(review, &self.policy).await
    }

    /// Score one review under an explicit policy.
    ///
    /// Retry state is created fresh here and dropped on return; nothing
    /// carries over between reviews.
    pub async fn score_with_policy(
        &self,
        review: &Review,
        policy: &RetryPolicy,
    ) -> Result<String, InferenceError> {
        let messages = vec![
            ChatMessage::system(prompts::SCORING_SYSTEM_PROMPT),
            ChatMessage::user(prompts::build_scoring_prompt(review)),
        ];

        let mut state = RetryState::Attempting { attempt: 1 };

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    self.tracker.record_call();
                    match self
                        .provider
                        .complete(messages.clone(), &self.completion)
                        .await
                    {
                        Ok(response) => {
                            tracing::debug!(
                                attempt,
                                model = %response.model,
                                tokens = ?response.total_tokens,
                                "scoring call succeeded"
                            );
                            return Ok(response.content);
                        }
                        Err(error) => match self.classifier.classify(&error) {
                            ErrorClass::Transient => {
                                self.tracker.record_rate_limit();
                                if attempt < policy.max_attempts {
                                    RetryState::Backoff { attempt }
                                } else {
                                    tracing::warn!(
                                        attempts = policy.max_attempts,
                                        "rate limiting outlasted the retry ceiling"
                                    );
                                    return Err(InferenceError::RetriesExhausted {
                                        attempts: policy.max_attempts,
                                        last: error,
                                    });
                                }
                            }
                            ErrorClass::Fatal => {
                                tracing::warn!(attempt, error = %error, "unrecoverable scoring error");
                                return Err(InferenceError::Unrecoverable(error));
                            }
                        },
                    }
                }
                RetryState::Backoff { attempt } => {
                    let wait = policy.backoff_for(attempt);
                    tracing::debug!(attempt, wait = ?wait, "rate limited, backing off");
                    self.tracker.record_retry();
                    tokio::time::sleep(wait).await;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                    }
                }
            };
        }
    }
}
