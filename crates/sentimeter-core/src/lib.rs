//! # sentimeter-core
//!
//! Deterministic data model and response extraction for review sentiment
//! aggregation.
//!
//! This crate answers one question: given the raw text an inference
//! endpoint returned for a review, what sentiment magnitudes did it
//! report? Everything here is pure: no I/O, no network, no clocks.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No LLM calls**: Scoring requests live in `sentimeter-runtime`
//! 3. **Strict extraction**: A payload either yields a valid
//!    [`SentimentScore`] or a [`MalformedPayload`](ExtractError::MalformedPayload)
//!    error; there is no best-effort parse
//!
//! ## Example
//!
//! ```rust
//! use sentimeter_core::{extract_scores, BatchResult};
//!
//! let raw = r#"```json
//! {"scores": {"positive": 0.9, "negative": 0.05, "neutral": 0.05}}
//! ```"#;
//!
//! let score = extract_scores(raw).unwrap();
//! let mut totals = BatchResult::new(1);
//! totals.accumulate(score);
//! assert_eq!(totals.positive, 0.9);
//! ```

pub mod extract;
pub mod review;
pub mod score;

// Re-export main types at crate root
pub use extract::{extract_scores, ExtractError};
pub use review::Review;
pub use score::{BatchResult, SentimentScore};
