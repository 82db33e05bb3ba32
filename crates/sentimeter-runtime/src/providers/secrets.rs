//! Secure credential handling for inference providers.
//!
//! API keys pass through several layers on their way to a request header,
//! and any of them might log. This module makes that impossible by
//! construction:
//!
//! - **No accidental logging**: credentials cannot appear in Debug output
//! - **Memory safety**: credentials are zeroed on drop
//! - **Explicit exposure**: the raw value only leaves via `.expose()`
//!
//! ## Usage
//!
//! ```ignore
//! let cred = ApiCredential::from_env("GROQ_API_KEY", "Groq API key")?;
//! request.header("Authorization", format!("Bearer {}", cred.expose()));
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ProviderError;

/// Where a credential was loaded from.
///
/// Useful for debugging configuration issues without exposing the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Create a credential from a string value.
    ///
    /// The value is immediately wrapped in [`SecretString`] and cannot be
    /// accidentally logged after this point.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load a credential from an environment variable.
    ///
    /// # Arguments
    /// * `env_var` - Name of the environment variable
    /// * `name` - Human-readable name for error messages (e.g., "Groq API key")
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ProviderError> {
        std::env::var(env_var)
            .map(|v| Self::new(v, CredentialSource::Environment, name))
            .map_err(|_| {
                ProviderError::NotConfigured(format!(
                    "{name} not set: configure '{env_var}' environment variable"
                ))
            })
    }

    /// Expose the raw credential value.
    ///
    /// Call this only at the point of use (an HTTP header), never to
    /// build log lines or error messages.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Whether the credential is an empty string.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    /// Where this credential came from.
    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}
