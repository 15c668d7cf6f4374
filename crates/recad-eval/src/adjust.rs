// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use recad_core::{RecadError, ensure_same_len, segments_from_binary, validate_binary};

/// Point adjustment: a true anomaly segment that is flagged anywhere is
/// credited as flagged everywhere.
///
/// Only `0 -> 1` flips inside true anomaly segments are ever made; normal
/// points and undetected segments pass through unchanged. Returns the ground
/// truth alongside the adjusted predictions so callers can feed both
/// straight into [`crate::report`].
pub fn adjust(ground_truth: &[u8], predictions: &[u8]) -> Result<(Vec<u8>, Vec<u8>), RecadError> {
    ensure_same_len(
        "ground_truth",
        ground_truth.len(),
        "predictions",
        predictions.len(),
    )?;
    validate_binary(ground_truth, "ground_truth")?;
    validate_binary(predictions, "predictions")?;

    let mut adjusted = predictions.to_vec();
    let mut flipped = 0usize;
    for segment in segments_from_binary(ground_truth) {
        let span = &mut adjusted[segment.start..segment.end];
        if span.contains(&1) {
            flipped += span.iter().filter(|&&flag| flag == 0).count();
            span.fill(1);
        }
    }
    tracing::debug!(n = ground_truth.len(), flipped, "applied point adjustment");

    Ok((ground_truth.to_vec(), adjusted))
}

/// Thresholds scores into 0/1 predictions with `flags(score)`.
pub fn predictions_from_scores(scores: &[f64], mut flags: impl FnMut(f64) -> bool) -> Vec<u8> {
    scores
        .iter()
        .map(|&score| u8::from(flags(score)))
        .collect()
}
