//! Runtime configuration.
//!
//! Everything an operator can tune lives here: model selection, request
//! shaping, the retry policy, the throttle-detection pattern, batch
//! concurrency, and caching. Loadable from YAML; every field has a
//! default so a partial file works.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::providers::CompletionConfig;
use crate::retry::{duration_str, RetryClassifier, RetryPolicy};

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid rate-limit pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Batch runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Model identifier sent to the endpoint
    pub model: String,

    /// Maximum tokens per completion
    pub max_tokens: u32,

    /// Sampling temperature (0.0 for deterministic scoring)
    pub temperature: f32,

    /// Per-call request timeout
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,

    /// Retry policy applied per review
    pub retry: RetryPolicy,

    /// Regex matched against API error messages to detect throttling
    /// that hides behind a generic status. `null` disables message
    /// matching; structural detection (429) always applies.
    pub rate_limit_pattern: Option<String>,

    /// In-flight scoring requests. 1 = strictly sequential.
    pub max_concurrency: usize,

    /// Serve repeated (model, review) pairs from an in-memory cache
    pub cache_responses: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model: "llama3-groq-8b-8192-tool-use-preview".to_string(),
            max_tokens: 512,
            temperature: 0.0,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            rate_limit_pattern: Some("(?i)rate limit".to_string()),
            max_concurrency: 1,
            cache_responses: false,
        }
    }
}

impl RuntimeConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// The per-call completion configuration this config describes.
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.request_timeout,
        }
    }

    /// Build the error classifier this config describes.
    pub fn classifier(&self) -> Result<RetryClassifier, ConfigError> {
        Ok(RetryClassifier::with_pattern(
            self.rate_limit_pattern.as_deref(),
        )?)
    }
}
