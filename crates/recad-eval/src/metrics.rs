// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use recad_core::{RecadError, ensure_same_len, validate_binary};

/// Binary classification metrics with class `1` as the positive class.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl DetectionMetrics {
    /// One-line rendering used on the console and in the results log.
    pub fn summary_line(&self) -> String {
        format!(
            "Accuracy : {:0.4}, Precision : {:0.4}, Recall : {:0.4}, F-score : {:0.4} ",
            self.accuracy, self.precision, self.recall, self.f1
        )
    }
}

/// Computes accuracy/precision/recall/F1 of `predictions` against
/// `ground_truth`.
///
/// Ratios with a zero denominator are reported as `0.0`.
pub fn report(ground_truth: &[u8], predictions: &[u8]) -> Result<DetectionMetrics, RecadError> {
    if ground_truth.is_empty() || predictions.is_empty() {
        return Err(RecadError::empty_input(format!(
            "metrics require non-empty inputs; got ground_truth={}, predictions={}",
            ground_truth.len(),
            predictions.len()
        )));
    }
    ensure_same_len(
        "ground_truth",
        ground_truth.len(),
        "predictions",
        predictions.len(),
    )?;
    validate_binary(ground_truth, "ground_truth")?;
    validate_binary(predictions, "predictions")?;

    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    let mut true_negatives = 0usize;
    let mut false_negatives = 0usize;
    for (&truth, &predicted) in ground_truth.iter().zip(predictions) {
        match (truth, predicted) {
            (1, 1) => true_positives += 1,
            (0, 1) => false_positives += 1,
            (1, 0) => false_negatives += 1,
            _ => true_negatives += 1,
        }
    }

    let accuracy = ratio(true_positives + true_negatives, ground_truth.len());
    let precision = ratio(true_positives, true_positives + false_positives);
    let recall = ratio(true_positives, true_positives + false_negatives);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    Ok(DetectionMetrics {
        accuracy,
        precision,
        recall,
        f1,
        true_positives,
        false_positives,
        true_negatives,
        false_negatives,
    })
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::report;
    use recad_core::RecadError;

    fn assert_approx_eq(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta <= 1e-12,
            "expected {expected}, got {actual} (delta={delta})"
        );
    }

    #[test]
    fn perfect_predictions_score_exactly_one() {
        let gt = [0, 1, 1, 0, 1];
        let metrics = report(&gt, &gt).expect("metrics should compute");
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.f1, 1.0);
    }

    #[test]
    fn metrics_match_hand_computed_counts() {
        let gt = [1, 1, 1, 0, 0, 0, 0, 1];
        let pred = [1, 1, 0, 1, 0, 0, 0, 0];

        let metrics = report(&gt, &pred).expect("metrics should compute");
        assert_eq!(metrics.true_positives, 2);
        assert_eq!(metrics.false_positives, 1);
        assert_eq!(metrics.false_negatives, 2);
        assert_eq!(metrics.true_negatives, 3);
        assert_approx_eq(metrics.accuracy, 5.0 / 8.0);
        assert_approx_eq(metrics.precision, 2.0 / 3.0);
        assert_approx_eq(metrics.recall, 0.5);
        assert_approx_eq(metrics.f1, 4.0 / 7.0);
    }

    #[test]
    fn no_positive_predictions_yield_zero_precision() {
        let metrics = report(&[1, 0, 0], &[0, 0, 0]).expect("metrics should compute");
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.f1, 0.0);
        assert_approx_eq(metrics.accuracy, 2.0 / 3.0);
    }

    #[test]
    fn summary_line_uses_four_decimals() {
        let metrics = report(&[1, 1, 0, 0], &[1, 0, 0, 0]).expect("metrics should compute");
        assert_eq!(
            metrics.summary_line(),
            "Accuracy : 0.7500, Precision : 1.0000, Recall : 0.5000, F-score : 0.6667 "
        );
    }

    #[test]
    fn empty_and_mismatched_inputs_are_rejected() {
        let err = report(&[], &[]).expect_err("empty input");
        assert!(matches!(err, RecadError::EmptyInput(_)));
        let err = report(&[0, 1], &[0]).expect_err("length mismatch");
        assert!(matches!(err, RecadError::ShapeMismatch(_)));
    }
}
