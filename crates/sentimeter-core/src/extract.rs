//! Score extraction from raw model responses.
//!
//! Inference endpoints answer a scoring prompt with free text. Usually
//! that text is a JSON object, often wrapped in a ```` ```json ```` code
//! fence, sometimes surrounded by prose. This module carves out the
//! payload, parses it, and validates the `scores` object.
//!
//! The extraction contract is strict: a response either yields a valid
//! [`SentimentScore`] or fails as malformed. There is no best-effort
//! fallback. A response we cannot read invalidates the review it belongs
//! to, and the caller decides what that means for the batch.

use thiserror::Error;

use crate::score::SentimentScore;

/// Opening marker of a JSON code fence.
const FENCE_OPEN: &str = "```json";

/// Bare closing fence marker.
const FENCE_CLOSE: &str = "```";

/// Extraction failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The response did not contain a readable score payload.
    #[error("malformed score payload: {0}")]
    MalformedPayload(String),
}

/// Extract sentiment scores from a raw model response.
///
/// The candidate payload is the content of the first ```` ```json ````
/// fence when one is present, otherwise the whole trimmed response. The
/// payload must be a JSON object; a `scores` sub-object carries the three
/// magnitudes, each defaulting to zero when absent.
///
/// # Errors
///
/// [`ExtractError::MalformedPayload`] when the payload is not a JSON
/// object, when `scores` is present but not an object, or when a score
/// field is present but not a non-negative finite number.
pub fn extract_scores(raw: &str) -> Result<SentimentScore, ExtractError> {
    let payload = fenced_payload(raw);
    tracing::debug!(payload_len = payload.len(), "extracted candidate payload");

    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| ExtractError::MalformedPayload(format!("invalid JSON: {e}")))?;

    let object = value.as_object().ok_or_else(|| {
        ExtractError::MalformedPayload("top-level payload is not a JSON object".to_string())
    })?;

    let scores = match object.get("scores") {
        None => return Ok(SentimentScore::default()),
        Some(serde_json::Value::Object(scores)) => scores,
        Some(other) => {
            return Err(ExtractError::MalformedPayload(format!(
                "'scores' is not an object (found {})",
                json_kind(other)
            )))
        }
    };

    Ok(SentimentScore {
        positive: score_field(scores, "positive")?,
        negative: score_field(scores, "negative")?,
        neutral: score_field(scores, "neutral")?,
    })
}

/// Slice out the first fenced JSON block, or return the trimmed input.
///
/// Only the first fence pair is honored. A missing closing fence yields
/// everything after the opening marker.
fn fenced_payload(raw: &str) -> &str {
    match raw.find(FENCE_OPEN) {
        Some(open) => {
            let body = &raw[open + FENCE_OPEN.len()..];
            match body.find(FENCE_CLOSE) {
                Some(close) => body[..close].trim(),
                None => body.trim(),
            }
        }
        None => raw.trim(),
    }
}

/// Read one score field, defaulting to zero when absent.
fn score_field(
    scores: &serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> Result<f64, ExtractError> {
    let Some(value) = scores.get(name) else {
        return Ok(0.0);
    };

    let number = value.as_f64().ok_or_else(|| {
        ExtractError::MalformedPayload(format!(
            "score '{name}' is not a number (found {})",
            json_kind(value)
        ))
    })?;

    if !number.is_finite() || number < 0.0 {
        return Err(ExtractError::MalformedPayload(format!(
            "score '{name}' must be a non-negative finite number, got {number}"
        )));
    }

    Ok(number)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bare_json_payload() {
        let raw = r#"{"scores": {"positive": 0.1, "negative": 0.8, "neutral": 0.1}}"#;
        let score = extract_scores(raw).unwrap();
        assert_eq!(score.positive, 0.1);
        assert_eq!(score.negative, 0.8);
        assert_eq!(score.neutral, 0.1);
    }

    #[test]
    fn test_fenced_payload_with_prose() {
        let raw = "Here is my analysis:\n\n```json\n{\"scores\": {\"positive\": 0.9, \"negative\": 0.05, \"neutral\": 0.05}}\n```\n\nOverall quite positive.";
        let score = extract_scores(raw).unwrap();
        assert_eq!(score.positive, 0.9);
        assert_eq!(score.negative, 0.05);
        assert_eq!(score.neutral, 0.05);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let score = extract_scores(r#"{"scores": {"positive": 0.7}}"#).unwrap();
        assert_eq!(score.positive, 0.7);
        assert_eq!(score.negative, 0.0);
        assert_eq!(score.neutral, 0.0);
    }

    #[test]
    fn test_missing_scores_object_defaults_to_zero() {
        let score = extract_scores(r#"{"sentiment": "positive"}"#).unwrap();
        assert_eq!(score, SentimentScore::default());
    }

    #[test]
    fn test_scores_not_an_object_fails() {
        for raw in [
            r#"{"scores": "very positive"}"#,
            r#"{"scores": [0.9, 0.05, 0.05]}"#,
            r#"{"scores": 1}"#,
        ] {
            let err = extract_scores(raw).unwrap_err();
            assert!(matches!(err, ExtractError::MalformedPayload(_)), "{raw}");
        }
    }

    #[test]
    fn test_non_numeric_score_field_fails() {
        let raw = r#"{"scores": {"positive": "high", "negative": 0.1}}"#;
        let err = extract_scores(raw).unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_negative_score_field_fails() {
        let raw = r#"{"scores": {"negative": -0.3}}"#;
        assert!(extract_scores(raw).is_err());
    }

    #[test]
    fn test_empty_response_fails() {
        assert!(extract_scores("").is_err());
        assert!(extract_scores("   \n  ").is_err());
    }

    #[test]
    fn test_plain_prose_fails() {
        let raw = "The review sounds fairly positive to me, leaning favorable.";
        let err = extract_scores(raw).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedPayload(_)));
    }

    #[test]
    fn test_non_object_json_fails() {
        assert!(extract_scores("0.9").is_err());
        assert!(extract_scores("[1, 2, 3]").is_err());
        assert!(extract_scores("\"positive\"").is_err());
    }

    #[test]
    fn test_only_first_fence_pair_is_honored() {
        let raw = "```json\n{\"scores\": {\"positive\": 0.5}}\n```\n```json\n{\"scores\": {\"positive\": 0.9}}\n```";
        let score = extract_scores(raw).unwrap();
        assert_eq!(score.positive, 0.5);
    }

    #[test]
    fn test_unclosed_fence_uses_remainder() {
        let raw = "```json\n{\"scores\": {\"neutral\": 1.0}}";
        let score = extract_scores(raw).unwrap();
        assert_eq!(score.neutral, 1.0);
    }

    proptest! {
        // Fence-stripping is content-neutral: wrapping any valid payload
        // in a fence yields the same scores as the bare payload.
        #[test]
        fn prop_fence_wrapping_is_neutral(
            positive in 0.0f64..10.0,
            negative in 0.0f64..10.0,
            neutral in 0.0f64..10.0,
        ) {
            let payload = format!(
                r#"{{"scores": {{"positive": {positive}, "negative": {negative}, "neutral": {neutral}}}}}"#
            );
            let fenced = format!("Sure, here you go:\n```json\n{payload}\n```\nDone.");

            let bare = extract_scores(&payload).unwrap();
            let wrapped = extract_scores(&fenced).unwrap();
            prop_assert_eq!(bare, wrapped);
        }
    }
}
