// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::dataset::WindowDataset;
use recad_core::{RecadError, Reconstructor, WindowBatch};

/// Per-timestep anomaly scores of one split, with the labels of the same
/// timesteps when the split is labelled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoredSplit {
    pub scores: Vec<f64>,
    pub labels: Option<Vec<f64>>,
}

impl ScoredSplit {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Mean over all features of the squared reconstruction error, one value per
/// timestep in window order.
pub fn timestep_scores(input: &WindowBatch, output: &WindowBatch) -> Result<Vec<f64>, RecadError> {
    input.ensure_same_shape(output)?;
    let d = input.d() as f64;
    Ok((0..input.timesteps())
        .map(|t| {
            input
                .row(t)
                .iter()
                .zip(output.row(t))
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                / d
        })
        .collect())
}

/// Reconstructs every window of `dataset` in order and concatenates the
/// per-timestep scores.
pub fn score_series<M: Reconstructor + ?Sized>(
    model: &M,
    dataset: &WindowDataset,
    batch_size: usize,
) -> Result<ScoredSplit, RecadError> {
    let mut scores = Vec::with_capacity(dataset.len() * dataset.seq_len());
    let mut labels = dataset
        .has_labels()
        .then(|| Vec::with_capacity(dataset.len() * dataset.seq_len()));

    for batch in dataset.batches(batch_size, None)? {
        let batch = batch?;
        let output = model.reconstruct(&batch.inputs)?;
        scores.extend(timestep_scores(&batch.inputs, &output)?);
        if let (Some(out), Some(batch_labels)) = (labels.as_mut(), batch.labels) {
            out.extend(batch_labels);
        }
    }
    tracing::debug!(
        windows = dataset.len(),
        timesteps = scores.len(),
        "scored split"
    );

    Ok(ScoredSplit { scores, labels })
}
