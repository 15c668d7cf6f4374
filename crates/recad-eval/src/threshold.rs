// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use recad_core::{Direction, RecadError, count_anomalies, ensure_same_len, segments_from_labels};

/// Smoothing constant added to every denominator of the sweep metrics.
///
/// It biases precision/recall/F1 slightly downward; results must keep it to
/// stay comparable with previously reported numbers.
pub const F1_SMOOTHING: f64 = 1e-5;

/// Threshold reported when there is nothing to sweep over.
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Segment-adjusted confusion summary at the best sweep position.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct BestF1 {
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// Unit of the threshold sweep: one normal point, or one whole anomaly
/// segment represented by its hardest-to-reach score.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SearchPoint {
    score: f64,
    weight: usize,
    is_anomaly: bool,
}

impl SearchPoint {
    fn normal(score: f64) -> Self {
        Self {
            score,
            weight: 1,
            is_anomaly: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SweepBest {
    f1: f64,
    predicted: usize,
    true_positives: usize,
    threshold: f64,
}

/// Finds the threshold that maximizes segment-adjusted F1.
///
/// Anomaly segments enter the predicted-positive set all at once, at the
/// score of their least extreme member for `direction`, so a segment is
/// either fully caught or fully missed at every threshold. Ties keep the
/// first maximum met in sweep order.
///
/// Soft labels are accepted and counted as anomalous when `> 0.5`.
pub fn find_best_threshold(
    score: &[f64],
    label: &[f64],
    direction: Direction,
) -> Result<(BestF1, f64), RecadError> {
    ensure_same_len("score", score.len(), "label", label.len())?;

    let n = score.len();
    let total_anomalies = count_anomalies(label);
    if n > 0 && total_anomalies == 0 {
        tracing::warn!(n, "label series has no anomalies; best f1 degenerates to 0");
    }

    let mut points = search_points(score, label, direction);
    // Stable sort: equal scores keep their series order.
    points.sort_by(|left, right| direction.sweep_cmp(left.score, right.score));

    let mut predicted = 0usize;
    let mut true_positives = 0usize;
    let mut best: Option<SweepBest> = None;
    for point in &points {
        predicted += point.weight;
        if point.is_anomaly {
            true_positives += point.weight;
        }
        let f1 = smoothed_f1(true_positives, predicted, total_anomalies);
        if best.is_none_or(|current| f1 > current.f1) {
            best = Some(SweepBest {
                f1,
                predicted,
                true_positives,
                threshold: point.score,
            });
        }
    }

    let Some(best) = best else {
        return Ok((
            BestF1 {
                f1: 0.0,
                precision: 0.0,
                recall: 0.0,
                true_positives: 0,
                true_negatives: 0,
                false_positives: 0,
                false_negatives: 0,
            },
            DEFAULT_THRESHOLD,
        ));
    };

    let result = BestF1 {
        f1: best.f1,
        precision: smoothed_ratio(best.true_positives, best.predicted),
        recall: smoothed_ratio(best.true_positives, total_anomalies),
        true_positives: best.true_positives,
        true_negatives: n - best.predicted - (total_anomalies - best.true_positives),
        false_positives: best.predicted - best.true_positives,
        false_negatives: total_anomalies - best.true_positives,
    };
    tracing::debug!(
        %direction,
        best_f1 = result.f1,
        threshold = best.threshold,
        search_points = points.len(),
        "computed best f1"
    );

    Ok((result, best.threshold))
}

fn search_points(score: &[f64], label: &[f64], direction: Direction) -> Vec<SearchPoint> {
    let segments = segments_from_labels(label);
    let mut points = Vec::with_capacity(score.len());
    let mut cursor = 0usize;

    for segment in &segments {
        points.extend(score[cursor..segment.start].iter().copied().map(SearchPoint::normal));
        let representative = score[segment.start + 1..segment.end]
            .iter()
            .fold(score[segment.start], |current, &candidate| {
                direction.representative(current, candidate)
            });
        points.push(SearchPoint {
            score: representative,
            weight: segment.len(),
            is_anomaly: true,
        });
        cursor = segment.end;
    }
    points.extend(score[cursor..].iter().copied().map(SearchPoint::normal));

    points
}

fn smoothed_ratio(numerator: usize, denominator: usize) -> f64 {
    numerator as f64 / (denominator as f64 + F1_SMOOTHING)
}

fn smoothed_f1(true_positives: usize, predicted: usize, total_anomalies: usize) -> f64 {
    let precision = smoothed_ratio(true_positives, predicted);
    let recall = smoothed_ratio(true_positives, total_anomalies);
    2.0 * precision * recall / (precision + recall + F1_SMOOTHING)
}

/// Linear-interpolation percentile (`q` in `[0, 100]`), matching the
/// default estimator of common numeric libraries.
pub fn percentile(values: &[f64], q: f64) -> Result<f64, RecadError> {
    if values.is_empty() {
        return Err(RecadError::empty_input(
            "percentile requires at least one value",
        ));
    }
    if !q.is_finite() || !(0.0..=100.0).contains(&q) {
        return Err(RecadError::invalid_input(format!(
            "percentile q must be within [0, 100]; got {q}"
        )));
    }
    if let Some((idx, value)) = values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(RecadError::invalid_input(format!(
            "percentile input must be finite; values[{idx}]={value}"
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Threshold at the `(100 - ratio_percent)`-th percentile of the combined
/// train+test scores, where `ratio_percent` is the expected anomaly
/// prevalence in percent.
pub fn percentile_threshold(combined_scores: &[f64], ratio_percent: f64) -> Result<f64, RecadError> {
    if !ratio_percent.is_finite() || !(0.0..=100.0).contains(&ratio_percent) {
        return Err(RecadError::invalid_input(format!(
            "anomaly ratio must be a percentage within [0, 100]; got {ratio_percent}"
        )));
    }
    percentile(combined_scores, 100.0 - ratio_percent)
}

/// Concatenates train and test scores in that order.
pub fn combine_scores(train: &[f64], test: &[f64]) -> Vec<f64> {
    let mut combined = Vec::with_capacity(train.len() + test.len());
    combined.extend_from_slice(train);
    combined.extend_from_slice(test);
    combined
}
