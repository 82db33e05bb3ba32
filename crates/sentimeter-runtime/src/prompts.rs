//! Scoring prompts.
//!
//! The request shape is fixed: one system prompt establishing the output
//! contract, one user message embedding the review text. Keeping the
//! format instructions in the cacheable system prompt also keeps the
//! per-review message as small as possible.

use sentimeter_core::Review;

/// System prompt establishing the score output contract.
///
/// The response format mirrors what the extraction layer accepts: a JSON
/// object with a `scores` sub-object, optionally fenced. Magnitudes are
/// additive contributions, not a probability distribution.
pub const SCORING_SYSTEM_PROMPT: &str = r#"
You are a sentiment scoring service for customer reviews.

For each review you receive, respond with a JSON object of this exact shape:

{
  "scores": {
    "positive": <non-negative number>,
    "negative": <non-negative number>,
    "neutral": <non-negative number>
  }
}

Rules:
- Respond with the JSON object only, no commentary
- Each magnitude reflects how strongly that sentiment is present
- Omit nothing; use 0 for absent sentiments
"#;

/// Build the per-review scoring instruction.
pub fn build_scoring_prompt(review: &Review) -> String {
    format!(
        "Analyze the sentiment of the following review and return the scores as a JSON object: {}",
        review.text()
    )
}
