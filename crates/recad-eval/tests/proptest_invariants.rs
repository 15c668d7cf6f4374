// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use recad_core::{Direction, RecadError, binarize_labels, count_anomalies};
use recad_eval::{F1_SMOOTHING, adjust, find_best_threshold, percentile, report};

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn scored_labels(max_len: usize) -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    prop::collection::vec((-100.0f64..100.0, 0u8..2), 0..max_len).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(score, label)| (score, f64::from(label)))
            .unzip()
    })
}

fn distinct_scored_labels(max_len: usize) -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    prop::collection::btree_set(0u32..100_000, 1..max_len)
        .prop_map(|set| set.into_iter().map(f64::from).collect::<Vec<_>>())
        .prop_shuffle()
        .prop_flat_map(|scores| {
            let n = scores.len();
            (
                Just(scores),
                prop::collection::vec(0u8..2, n).prop_map(|labels| {
                    labels.into_iter().map(f64::from).collect::<Vec<_>>()
                }),
            )
        })
}

fn binary_pair(max_len: usize) -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    prop::collection::vec((0u8..2, 0u8..2), 1..max_len).prop_map(|pairs| pairs.into_iter().unzip())
}

/// Best smoothed F1 over every threshold equal to one of the scores, scored
/// through point adjustment instead of the segment sweep. A point counts once
/// the sweep has reached its score.
fn brute_force_best_f1(score: &[f64], label: &[f64], direction: Direction) -> f64 {
    let ground_truth = binarize_labels(label);
    let total = count_anomalies(label) as f64;
    let mut best = 0.0f64;

    for &threshold in score {
        let predictions = score
            .iter()
            .map(|&value| u8::from(direction.sweep_cmp(value, threshold).is_le()))
            .collect::<Vec<_>>();
        let (_, adjusted) = adjust(&ground_truth, &predictions).expect("adjust should run");
        let predicted = adjusted.iter().filter(|&&flag| flag == 1).count() as f64;
        let true_positives = adjusted
            .iter()
            .zip(&ground_truth)
            .filter(|&(&flag, &truth)| flag == 1 && truth == 1)
            .count() as f64;

        let precision = true_positives / (predicted + F1_SMOOTHING);
        let recall = true_positives / (total + F1_SMOOTHING);
        let f1 = 2.0 * precision * recall / (precision + recall + F1_SMOOTHING);
        best = best.max(f1);
    }

    best
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Lower), Just(Direction::Upper)]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 1024,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn best_threshold_f1_is_bounded_and_counts_partition_the_series(
        (score, label) in scored_labels(160),
        direction in direction_strategy(),
    ) {
        let (best, threshold) = find_best_threshold(&score, &label, direction)
            .expect("equal-length search should not fail");

        prop_assert!((0.0..=1.0).contains(&best.f1), "f1={}", best.f1);
        prop_assert!((0.0..=1.0).contains(&best.precision));
        prop_assert!((0.0..=1.0).contains(&best.recall));
        prop_assert!(threshold.is_finite());
        prop_assert_eq!(
            best.true_positives + best.true_negatives + best.false_positives + best.false_negatives,
            score.len()
        );
        prop_assert_eq!(best.true_positives + best.false_negatives, count_anomalies(&label));
        if count_anomalies(&label) == 0 {
            prop_assert_eq!(best.recall, 0.0);
        }
    }

    #[test]
    fn sweep_matches_brute_force_point_adjusted_search(
        (score, label) in distinct_scored_labels(80),
        direction in direction_strategy(),
    ) {
        let (best, _) = find_best_threshold(&score, &label, direction)
            .expect("search should run");
        let expected = brute_force_best_f1(&score, &label, direction);
        prop_assert!(
            (best.f1 - expected).abs() <= 1e-12,
            "sweep f1={}, brute-force f1={}", best.f1, expected
        );
    }

    #[test]
    fn lower_and_upper_searches_mirror_each_other(
        (score, label) in scored_labels(120),
    ) {
        let negated = score.iter().map(|value| -value).collect::<Vec<_>>();

        let (upper, upper_threshold) = find_best_threshold(&score, &label, Direction::Upper)
            .expect("upper search should run");
        let (lower, lower_threshold) = find_best_threshold(&negated, &label, Direction::Lower)
            .expect("lower search should run");

        prop_assert_eq!(&upper, &lower);
        if !score.is_empty() {
            prop_assert_eq!(upper_threshold, -lower_threshold);
        }
    }

    #[test]
    fn isolated_anomalies_behave_like_points(
        score in prop::collection::vec(-10.0f64..10.0, 1..80),
        stride in 2usize..6,
        direction in direction_strategy(),
    ) {
        // Anomalies never touch, so every segment has length one and the
        // representative score is the point's own score.
        let label = (0..score.len())
            .map(|idx| if idx % stride == 0 { 1.0 } else { 0.0 })
            .collect::<Vec<_>>();
        let (best, threshold) = find_best_threshold(&score, &label, direction)
            .expect("search should run");

        prop_assert!(score.contains(&threshold));
        let flagged = score
            .iter()
            .filter(|&&value| direction.sweep_cmp(value, threshold).is_le())
            .count();
        prop_assert!(best.true_positives + best.false_positives <= flagged);
    }

    #[test]
    fn mismatched_lengths_are_shape_errors(
        score in prop::collection::vec(-1.0f64..1.0, 0..40),
        extra in 1usize..5,
        direction in direction_strategy(),
    ) {
        let label = vec![0.0; score.len() + extra];
        let err = find_best_threshold(&score, &label, direction)
            .expect_err("length mismatch must fail");
        prop_assert!(matches!(err, RecadError::ShapeMismatch(_)));
    }

    #[test]
    fn adjust_is_monotone_bounded_and_idempotent(
        (ground_truth, predictions) in binary_pair(200),
    ) {
        let (gt_once, once) = adjust(&ground_truth, &predictions).expect("adjust should run");
        let (_, twice) = adjust(&gt_once, &once).expect("adjust should run");

        prop_assert_eq!(&gt_once, &ground_truth);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.len(), predictions.len());
        for idx in 0..once.len() {
            if predictions[idx] == 1 {
                prop_assert_eq!(once[idx], 1);
            }
            if ground_truth[idx] == 0 {
                prop_assert_eq!(once[idx], predictions[idx]);
            }
        }
    }

    #[test]
    fn perfect_predictions_report_exactly_one(
        mut ground_truth in prop::collection::vec(0u8..2, 1..200),
        anomaly_at in any::<prop::sample::Index>(),
    ) {
        let idx = anomaly_at.index(ground_truth.len());
        ground_truth[idx] = 1;

        let (gt, adjusted) = adjust(&ground_truth, &ground_truth).expect("adjust should run");
        let metrics = report(&gt, &adjusted).expect("metrics should compute");
        prop_assert_eq!(metrics.accuracy, 1.0);
        prop_assert_eq!(metrics.precision, 1.0);
        prop_assert_eq!(metrics.recall, 1.0);
        prop_assert_eq!(metrics.f1, 1.0);
    }

    #[test]
    fn percentile_stays_within_observed_range(
        values in prop::collection::vec(-1.0e6f64..1.0e6, 1..200),
        q in 0.0f64..=100.0,
    ) {
        let value = percentile(&values, q).expect("percentile should compute");
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(value >= min && value <= max, "value={value}, min={min}, max={max}");
    }
}
