//! Groq provider implementation.
//!
//! Speaks the OpenAI-compatible chat-completions API hosted at
//! `api.groq.com`.
//!
//! ## Security
//!
//! This provider uses the centralized [`ApiCredential`] system for secure
//! credential handling. See the [`secrets`](super::secrets) module for
//! details.

use super::{
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, InferenceProvider, ProviderError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable name for the Groq API key.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq inference provider.
///
/// # Security
///
/// The API key is stored using [`ApiCredential`] which:
/// - Cannot be accidentally printed via `Debug`
/// - Is zeroed on drop
/// - Must be explicitly exposed via `.expose()` when needed
pub struct GroqProvider {
    credential: ApiCredential,
    base_url: String,
}

impl std::fmt::Debug for GroqProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GroqProvider {
    /// Create a new Groq provider from an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            credential: ApiCredential::new(api_key, CredentialSource::Programmatic, "Groq API key"),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from the `GROQ_API_KEY` environment variable.
    ///
    /// The environment variable value is never logged.
    pub fn from_env() -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_env(GROQ_API_KEY_ENV, "Groq API key")?;
        Ok(Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Set a custom base URL (e.g., a proxy or a test server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn get_client(&self) -> &reqwest::Client {
        static CLIENT: std::sync::OnceLock<reqwest::Client> = std::sync::OnceLock::new();
        CLIENT.get_or_init(|| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default()
        })
    }
}

/// Chat-completions request format.
#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat-completions response format.
#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
    model: String,
    usage: Option<GroqUsage>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct GroqChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroqUsage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GroqErrorBody {
    error: GroqErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GroqErrorDetail {
    message: String,
}

#[async_trait]
impl InferenceProvider for GroqProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let client = self.get_client();

        let request = GroqRequest {
            model: config.model.clone(),
            messages,
            max_tokens: config.max_tokens,
            temperature: if config.temperature == 0.0 {
                None
            } else {
                Some(config.temperature)
            },
        };

        // SECURITY: only expose the credential here, at the point of use
        let response = client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.credential.expose()),
            )
            .header("content-type", "application/json")
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let message = match response.json::<GroqErrorBody>().await {
                Ok(body) => body.error.message,
                Err(e) => format!("undecodable error body: {e}"),
            };
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: GroqResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::ParseError("no completion content".to_string()))?;

        Ok(CompletionResponse {
            content,
            model: body.model,
            total_tokens: body.usage.map(|u| u.total_tokens),
        })
    }

    async fn health_check(&self) -> bool {
        // Verify the API key is set, without logging the value
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "groq"
    }
}
