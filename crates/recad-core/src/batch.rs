// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::RecadError;
use std::fmt;
use std::str::FromStr;

/// Which output dimensions count towards the training loss.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeatureMode {
    /// Multivariate in, multivariate out.
    #[default]
    M,
    /// Univariate in, univariate out.
    S,
    /// Multivariate in, loss on the last feature only.
    MS,
}

impl FeatureMode {
    /// First feature index included in the loss for a `d`-feature window.
    pub fn first_feature(self, d: usize) -> usize {
        match self {
            Self::MS => d.saturating_sub(1),
            Self::M | Self::S => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::M => "M",
            Self::S => "S",
            Self::MS => "MS",
        }
    }
}

impl fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureMode {
    type Err = RecadError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_uppercase().as_str() {
            "M" => Ok(Self::M),
            "S" => Ok(Self::S),
            "MS" => Ok(Self::MS),
            _ => Err(RecadError::invalid_input(format!(
                "invalid features mode '{raw}'; expected one of: M, S, MS"
            ))),
        }
    }
}

/// Owned `[batch, seq_len, d]` buffer in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowBatch {
    values: Vec<f64>,
    batch: usize,
    seq_len: usize,
    d: usize,
}

impl WindowBatch {
    /// Constructs a validated batch.
    pub fn new(values: Vec<f64>, batch: usize, seq_len: usize, d: usize) -> Result<Self, RecadError> {
        if batch == 0 {
            return Err(RecadError::empty_input("batch must be >= 1"));
        }
        if seq_len == 0 {
            return Err(RecadError::invalid_input("seq_len must be >= 1"));
        }
        if d == 0 {
            return Err(RecadError::invalid_input("d must be >= 1"));
        }

        let expected_len = batch
            .checked_mul(seq_len)
            .and_then(|rows| rows.checked_mul(d))
            .ok_or_else(|| RecadError::invalid_input("batch*seq_len*d overflow"))?;
        if values.len() != expected_len {
            return Err(RecadError::shape_mismatch(format!(
                "value length mismatch: got {}, expected {expected_len} (batch={batch}, seq_len={seq_len}, d={d})",
                values.len()
            )));
        }

        Ok(Self {
            values,
            batch,
            seq_len,
            d,
        })
    }

    /// Builds a batch whose shape matches `self`, e.g. for a reconstruction.
    pub fn with_same_shape(&self, values: Vec<f64>) -> Result<Self, RecadError> {
        Self::new(values, self.batch, self.seq_len, self.d)
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn d(&self) -> usize {
        self.d
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.batch, self.seq_len, self.d)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Number of timesteps across all windows.
    pub fn timesteps(&self) -> usize {
        self.batch * self.seq_len
    }

    /// Feature vector of one timestep, indexed over the flattened
    /// `batch * seq_len` rows.
    pub fn row(&self, timestep: usize) -> &[f64] {
        let start = timestep * self.d;
        &self.values[start..start + self.d]
    }

    /// All timesteps of one window, flattened to `seq_len * d` values.
    pub fn window(&self, index: usize) -> &[f64] {
        let width = self.seq_len * self.d;
        let start = index * width;
        &self.values[start..start + width]
    }

    /// Fails with [`RecadError::ShapeMismatch`] unless `other` has the same shape.
    pub fn ensure_same_shape(&self, other: &Self) -> Result<(), RecadError> {
        if self.shape() != other.shape() {
            return Err(RecadError::shape_mismatch(format!(
                "batch shapes differ: {:?} vs {:?}",
                self.shape(),
                other.shape()
            )));
        }
        Ok(())
    }
}
