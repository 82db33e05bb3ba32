//! The review input type.

use serde::{Deserialize, Serialize};

/// A single free-text review.
///
/// Reviews are opaque to this crate: nothing inspects or normalizes the
/// text. Whatever the dataset column held is what gets scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Review(String);

impl Review {
    /// Wrap review text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The review text.
    pub fn text(&self) -> &str {
        &self.0
    }
}

impl From<String> for Review {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Review {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl std::fmt::Display for Review {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
