//! Sentiment score types.
//!
//! Scores are additive magnitudes, not probabilities: the endpoint is not
//! required to make the three fields sum to 1, and the batch total is the
//! plain pointwise sum over all reviews.

use serde::{Deserialize, Serialize};

/// Sentiment magnitudes reported for a single review.
///
/// Each field is a non-negative magnitude. Missing fields in the source
/// payload default to zero during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentScore {
    /// Positive magnitude
    pub positive: f64,

    /// Negative magnitude
    pub negative: f64,

    /// Neutral magnitude
    pub neutral: f64,
}

impl SentimentScore {
    /// Create a score from the three magnitudes.
    pub fn new(positive: f64, negative: f64, neutral: f64) -> Self {
        Self {
            positive,
            negative,
            neutral,
        }
    }
}

/// Aggregate sentiment over a whole dataset.
///
/// `total_reviews` is fixed at batch start to the input length; the three
/// totals grow as each review's score is folded in. A batch that aborts
/// discards its partially-filled value; partial sums are never reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Number of reviews in the input
    pub total_reviews: usize,

    /// Sum of per-review positive magnitudes
    pub positive: f64,

    /// Sum of per-review negative magnitudes
    pub negative: f64,

    /// Sum of per-review neutral magnitudes
    pub neutral: f64,
}

impl BatchResult {
    /// Create an all-zero result for a batch of `total_reviews` inputs.
    pub fn new(total_reviews: usize) -> Self {
        Self {
            total_reviews,
            positive: 0.0,
            negative: 0.0,
            neutral: 0.0,
        }
    }

    /// Fold one review's score into the running totals.
    ///
    /// Addition is commutative, so accumulation order does not affect the
    /// final value (modulo float rounding).
    pub fn accumulate(&mut self, score: SentimentScore) {
        self.positive += score.positive;
        self.negative += score.negative;
        self.neutral += score.neutral;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_batch_is_zeroed() {
        let result = BatchResult::new(7);
        assert_eq!(result.total_reviews, 7);
        assert_eq!(result.positive, 0.0);
        assert_eq!(result.negative, 0.0);
        assert_eq!(result.neutral, 0.0);
    }

    #[test]
    fn test_accumulate_sums_pointwise() {
        let mut result = BatchResult::new(2);
        result.accumulate(SentimentScore::new(0.9, 0.05, 0.05));
        result.accumulate(SentimentScore::new(0.1, 0.8, 0.1));

        assert!((result.positive - 1.0).abs() < 1e-9);
        assert!((result.negative - 0.85).abs() < 1e-9);
        assert!((result.neutral - 0.15).abs() < 1e-9);
        assert_eq!(result.total_reviews, 2);
    }

    #[test]
    fn test_serialized_field_names() {
        let result = BatchResult::new(3);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["total_reviews"], 3);
        assert!(json.get("positive").is_some());
        assert!(json.get("negative").is_some());
        assert!(json.get("neutral").is_some());
    }
}
