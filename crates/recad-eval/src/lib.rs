// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Threshold selection, point adjustment and detection metrics.

mod adjust;
mod metrics;
mod policy;
mod threshold;

pub use adjust::{adjust, predictions_from_scores};
pub use metrics::{DetectionMetrics, report};
pub use policy::{
    DEFAULT_ANOMALY_RATIO, EvaluationOutcome, ThresholdDecision, ThresholdPolicy, evaluate,
    select_threshold,
};
pub use threshold::{
    BestF1, DEFAULT_THRESHOLD, F1_SMOOTHING, combine_scores, find_best_threshold, percentile,
    percentile_threshold,
};
