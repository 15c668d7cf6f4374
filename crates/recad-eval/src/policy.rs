// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::adjust::{adjust, predictions_from_scores};
use crate::metrics::{DetectionMetrics, report};
use crate::threshold::{BestF1, combine_scores, find_best_threshold, percentile_threshold};
use recad_core::{Direction, RecadError, binarize_labels, ensure_same_len, validate_finite};

/// Default expected anomaly prevalence, in percent.
pub const DEFAULT_ANOMALY_RATIO: f64 = 1.0;

/// How the detection threshold is chosen for a run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThresholdPolicy {
    /// Search the test labels for the best segment-adjusted F1.
    BestF1 { direction: Direction },
    /// Fixed percentile of the combined train+test scores.
    AnomalyRatio { ratio_percent: f64 },
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::AnomalyRatio {
            ratio_percent: DEFAULT_ANOMALY_RATIO,
        }
    }
}

impl ThresholdPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BestF1 { .. } => "best_f1",
            Self::AnomalyRatio { .. } => "anomaly_ratio",
        }
    }
}

/// Threshold chosen by a [`ThresholdPolicy`], plus the search summary when
/// the best-F1 policy produced it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdDecision {
    pub policy: ThresholdPolicy,
    pub threshold: f64,
    pub search: Option<BestF1>,
}

impl ThresholdDecision {
    /// Turns scores into 0/1 predictions.
    ///
    /// Both policies flag strictly: above the threshold for the percentile
    /// policy and the upper direction, below it for the lower direction.
    pub fn predict(&self, scores: &[f64]) -> Vec<u8> {
        let threshold = self.threshold;
        match self.policy {
            ThresholdPolicy::BestF1 { direction } => {
                predictions_from_scores(scores, |score| direction.flags(score, threshold))
            }
            ThresholdPolicy::AnomalyRatio { .. } => {
                predictions_from_scores(scores, |score| score > threshold)
            }
        }
    }
}

/// Chooses the threshold for `policy`.
///
/// `train_scores` only feed the percentile policy; `test_labels` only feed
/// the best-F1 search.
pub fn select_threshold(
    policy: ThresholdPolicy,
    train_scores: &[f64],
    test_scores: &[f64],
    test_labels: &[f64],
) -> Result<ThresholdDecision, RecadError> {
    let decision = match policy {
        ThresholdPolicy::BestF1 { direction } => {
            let (search, threshold) = find_best_threshold(test_scores, test_labels, direction)?;
            ThresholdDecision {
                policy,
                threshold,
                search: Some(search),
            }
        }
        ThresholdPolicy::AnomalyRatio { ratio_percent } => {
            let combined = combine_scores(train_scores, test_scores);
            ThresholdDecision {
                policy,
                threshold: percentile_threshold(&combined, ratio_percent)?,
                search: None,
            }
        }
    };
    tracing::info!(
        policy = policy.name(),
        threshold = decision.threshold,
        "selected threshold"
    );
    Ok(decision)
}

/// Everything an evaluation pass produces.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationOutcome {
    pub decision: ThresholdDecision,
    pub raw_positive: usize,
    pub adjusted_positive: usize,
    pub metrics: DetectionMetrics,
}

/// Threshold, predict, point-adjust and score one test split.
pub fn evaluate(
    policy: ThresholdPolicy,
    train_scores: &[f64],
    test_scores: &[f64],
    test_labels: &[f64],
) -> Result<EvaluationOutcome, RecadError> {
    if test_scores.is_empty() {
        return Err(RecadError::empty_input("test score series is empty"));
    }
    ensure_same_len(
        "test_scores",
        test_scores.len(),
        "test_labels",
        test_labels.len(),
    )?;
    validate_finite(test_scores, "test_scores")?;
    validate_finite(train_scores, "train_scores")?;

    let decision = select_threshold(policy, train_scores, test_scores, test_labels)?;
    let predictions = decision.predict(test_scores);
    let ground_truth = binarize_labels(test_labels);
    let raw_positive = predictions.iter().filter(|&&flag| flag == 1).count();

    let (ground_truth, adjusted) = adjust(&ground_truth, &predictions)?;
    let adjusted_positive = adjusted.iter().filter(|&&flag| flag == 1).count();
    let metrics = report(&ground_truth, &adjusted)?;
    tracing::info!(
        accuracy = metrics.accuracy,
        precision = metrics.precision,
        recall = metrics.recall,
        f1 = metrics.f1,
        raw_positive,
        adjusted_positive,
        "evaluated test split"
    );

    Ok(EvaluationOutcome {
        decision,
        raw_positive,
        adjusted_positive,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::{ThresholdDecision, ThresholdPolicy, evaluate, select_threshold};
    use recad_core::{Direction, RecadError};

    #[test]
    fn best_f1_predictions_leave_the_threshold_point_normal() {
        let scores = [1.0, 2.0, 3.0, 10.0, 4.0, 1.0, 1.0, 9.0, 1.0];
        let labels = [0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let policy = ThresholdPolicy::BestF1 {
            direction: Direction::Upper,
        };

        let outcome = evaluate(policy, &[], &scores, &labels).expect("evaluation should run");
        assert_eq!(outcome.decision.threshold, 9.0);
        // Only the 10.0 clears `score > 9`; the segment holding 9.0 is missed.
        assert_eq!(outcome.raw_positive, 1);
        assert_eq!(outcome.adjusted_positive, 3);
        assert_eq!(outcome.metrics.true_positives, 3);
        assert_eq!(outcome.metrics.false_negatives, 1);
        assert_eq!(outcome.metrics.precision, 1.0);
        assert_eq!(outcome.metrics.recall, 0.75);
        assert!((outcome.metrics.f1 - 6.0 / 7.0).abs() < 1e-12);
        assert!((outcome.metrics.accuracy - 8.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn lower_best_f1_mirrors_the_upper_result() {
        let scores = [-1.0, -2.0, -3.0, -10.0, -4.0, -1.0, -1.0, -9.0, -1.0];
        let labels = [0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let policy = ThresholdPolicy::BestF1 {
            direction: Direction::Lower,
        };

        let outcome = evaluate(policy, &[], &scores, &labels).expect("evaluation should run");
        assert_eq!(outcome.decision.threshold, -9.0);
        assert_eq!(outcome.raw_positive, 1);
        assert_eq!(outcome.adjusted_positive, 3);
        assert_eq!(outcome.metrics.recall, 0.75);
    }

    #[test]
    fn anomaly_ratio_uses_train_and_test_scores() {
        let train = (1..=50).map(f64::from).collect::<Vec<_>>();
        let test = (51..=100).map(f64::from).collect::<Vec<_>>();
        let policy = ThresholdPolicy::AnomalyRatio {
            ratio_percent: 10.0,
        };

        let decision =
            select_threshold(policy, &train, &test, &[0.0; 50]).expect("threshold should compute");
        assert!((decision.threshold - 90.1).abs() < 1e-9);
        assert!(decision.search.is_none());

        let flagged = decision.predict(&test).iter().filter(|&&f| f == 1).count();
        assert_eq!(flagged, 10);
    }

    #[test]
    fn percentile_predictions_are_strict() {
        let decision = ThresholdDecision {
            policy: ThresholdPolicy::AnomalyRatio { ratio_percent: 1.0 },
            threshold: 2.0,
            search: None,
        };
        assert_eq!(decision.predict(&[1.0, 2.0, 3.0]), vec![0, 0, 1]);
    }

    #[test]
    fn lower_direction_flags_low_scores() {
        let decision = ThresholdDecision {
            policy: ThresholdPolicy::BestF1 {
                direction: Direction::Lower,
            },
            threshold: 2.0,
            search: None,
        };
        assert_eq!(decision.predict(&[1.0, 2.0, 3.0]), vec![1, 0, 0]);
    }

    #[test]
    fn evaluate_rejects_empty_and_non_finite_scores() {
        let err = evaluate(ThresholdPolicy::default(), &[1.0], &[], &[])
            .expect_err("empty test split");
        assert!(matches!(err, RecadError::EmptyInput(_)));

        let err = evaluate(ThresholdPolicy::default(), &[1.0], &[f64::INFINITY], &[0.0])
            .expect_err("non-finite score");
        assert!(matches!(err, RecadError::NumericalIssue(_)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn policy_serde_uses_kind_tag() {
        let policy = ThresholdPolicy::BestF1 {
            direction: Direction::Lower,
        };
        let encoded = serde_json::to_string(&policy).expect("policy should serialize");
        assert_eq!(encoded, r#"{"kind":"best_f1","direction":"lower"}"#);
        let decoded: ThresholdPolicy =
            serde_json::from_str(r#"{"kind":"anomaly_ratio","ratio_percent":0.5}"#)
                .expect("policy should deserialize");
        assert_eq!(
            decoded,
            ThresholdPolicy::AnomalyRatio { ratio_percent: 0.5 }
        );
    }
}
