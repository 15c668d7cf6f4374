// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use libfuzzer_sys::fuzz_target;
use recad_core::Direction;
use recad_eval::{ThresholdPolicy, adjust, evaluate, find_best_threshold};

fn build_score(mode_seed: u8, raw_seed: i16) -> f64 {
    match mode_seed % 9 {
        0 => f64::NAN,
        1 => f64::INFINITY,
        2 => f64::NEG_INFINITY,
        3 => 0.0,
        _ => f64::from(raw_seed) / 64.0,
    }
}

fn build_label(seed: u8) -> f64 {
    match seed % 6 {
        0 => 1.0,
        1 => 0.5,
        2 => f64::NAN,
        _ => 0.0,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);
    let n_scores = common::bounded(cursor.next_u8(), 0, 128);
    let n_labels = if cursor.next_u8() % 16 == 0 {
        common::bounded(cursor.next_u8(), 0, 128)
    } else {
        n_scores
    };
    let direction = if cursor.next_u8() & 1 == 0 {
        Direction::Upper
    } else {
        Direction::Lower
    };

    let scores = (0..n_scores)
        .map(|_| build_score(cursor.next_u8(), cursor.next_i16()))
        .collect::<Vec<_>>();
    let labels = (0..n_labels)
        .map(|_| build_label(cursor.next_u8()))
        .collect::<Vec<_>>();

    if let Ok((best, _threshold)) = find_best_threshold(&scores, &labels, direction) {
        assert!((0.0..=1.0).contains(&best.f1));
    }

    let ground_truth = labels.iter().map(|&l| u8::from(l > 0.5)).collect::<Vec<_>>();
    let predictions = scores.iter().map(|&s| u8::from(s > 0.0)).collect::<Vec<_>>();
    if let Ok((_, adjusted)) = adjust(&ground_truth, &predictions) {
        assert!(adjusted.iter().zip(&predictions).all(|(&a, &p)| a >= p));
    }

    let ratio = f64::from(cursor.next_u8() % 101);
    let policy = if cursor.next_u8() & 1 == 0 {
        ThresholdPolicy::BestF1 { direction }
    } else {
        ThresholdPolicy::AnomalyRatio {
            ratio_percent: ratio,
        }
    };
    let _ = evaluate(policy, &scores, &scores, &labels);
});
