//! Inference provider abstraction.
//!
//! A provider turns one prompt into one raw text completion over the
//! wire. Whether that text contains a usable score payload is not its
//! concern: "did the call succeed" and "was the payload parseable" are
//! deliberately separate failure domains, handled by separate layers.
//!
//! ## Security
//!
//! Providers use the [`secrets`] module for credential handling. See
//! [`ApiCredential`] for the patterns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod groq;
pub mod secrets;

pub use groq::{GroqProvider, GROQ_API_KEY_ENV};
pub use secrets::{ApiCredential, CredentialSource};

/// Errors from inference providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("response decode error: {0}")]
    ParseError(String),

    #[error("authentication failed")]
    AuthError,

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Configuration for a single completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 for deterministic)
    pub temperature: f32,

    /// Per-call request timeout
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "llama3-groq-8b-8192-tool-use-preview".to_string(),
            max_tokens: 512,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A chat message for completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system" or "user"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from a completion call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content, verbatim
    pub content: String,

    /// Model that produced it
    pub model: String,

    /// Total tokens billed, when the endpoint reports them
    pub total_tokens: Option<u32>,
}

/// Provider abstraction allows swapping inference backends.
///
/// This is the ONLY place where network calls to the inference endpoint
/// are made. The retry and aggregation layers never touch the wire.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Check if the provider is usable (credential present, etc).
    async fn health_check(&self) -> bool;

    /// Provider name for logs and metrics.
    fn name(&self) -> &str;
}
