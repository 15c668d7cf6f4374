// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{FeatureMode, RecadError, WindowBatch};

/// Sequence-to-sequence reconstruction capability.
///
/// Output must have the same shape as the input batch.
pub trait Reconstructor {
    fn reconstruct(&self, batch: &WindowBatch) -> Result<WindowBatch, RecadError>;
}

/// Reconstruction loss together with its gradient over the flat parameter vector.
#[derive(Clone, Debug, PartialEq)]
pub struct LossGradient {
    pub loss: f64,
    pub gradient: Vec<f64>,
}

/// Serializable parameter snapshot of a trainable model.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ModelState {
    pub tag: String,
    pub shape: Vec<usize>,
    pub parameters: Vec<f64>,
}

/// A reconstruction model the training loop can optimize.
///
/// Parameters are exposed as one flat vector so that optimizers stay
/// independent of the architecture.
pub trait TrainableModel: Reconstructor {
    /// Registry tag the model was built from.
    fn tag(&self) -> &str;

    /// Architecture dimensions recorded in checkpoints.
    fn shape(&self) -> Vec<usize>;

    fn parameters(&self) -> &[f64];

    fn parameters_mut(&mut self) -> &mut [f64];

    /// Mean squared reconstruction loss over the features selected by `mode`
    /// and its gradient with respect to [`TrainableModel::parameters`].
    fn loss_and_gradient(
        &self,
        batch: &WindowBatch,
        mode: FeatureMode,
    ) -> Result<LossGradient, RecadError>;

    fn state(&self) -> ModelState {
        ModelState {
            tag: self.tag().to_string(),
            shape: self.shape(),
            parameters: self.parameters().to_vec(),
        }
    }

    /// Restores parameters after checking the snapshot was taken from the
    /// same architecture.
    fn load_state(&mut self, state: &ModelState) -> Result<(), RecadError> {
        if state.tag != self.tag() {
            return Err(RecadError::checkpoint_load(format!(
                "model tag mismatch: expected='{}', found='{}'",
                self.tag(),
                state.tag
            )));
        }
        let shape = self.shape();
        if state.shape != shape {
            return Err(RecadError::checkpoint_load(format!(
                "model shape mismatch: expected={:?}, found={:?}",
                shape, state.shape
            )));
        }
        let parameters = self.parameters_mut();
        if state.parameters.len() != parameters.len() {
            return Err(RecadError::checkpoint_load(format!(
                "parameter count mismatch: expected={}, found={}",
                parameters.len(),
                state.parameters.len()
            )));
        }
        parameters.copy_from_slice(&state.parameters);
        Ok(())
    }
}

/// Mean squared error over the features selected by `mode`.
pub fn reconstruction_loss(
    input: &WindowBatch,
    output: &WindowBatch,
    mode: FeatureMode,
) -> Result<f64, RecadError> {
    input.ensure_same_shape(output)?;
    let d = input.d();
    let first = mode.first_feature(d);
    let width = d - first;

    let mut total = 0.0;
    for t in 0..input.timesteps() {
        let x = &input.row(t)[first..];
        let y = &output.row(t)[first..];
        total += x
            .iter()
            .zip(y)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>();
    }
    Ok(total / (input.timesteps() * width) as f64)
}
