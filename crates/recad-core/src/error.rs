// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Error taxonomy shared by every recad crate.
///
/// None of these are retried: thresholding and metric computation are
/// deterministic, and training failures must reach the caller instead of
/// turning into degenerate metrics.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecadError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("empty input: {0}")]
    EmptyInput(String),
    #[error("checkpoint load failed: {0}")]
    CheckpointLoad(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
    #[error("io error: {0}")]
    Io(String),
}

impl RecadError {
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    pub fn checkpoint_load(msg: impl Into<String>) -> Self {
        Self::CheckpointLoad(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Stable machine-readable code used in structured error output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ShapeMismatch(_) => "shape_mismatch",
            Self::EmptyInput(_) => "empty_input",
            Self::CheckpointLoad(_) => "checkpoint_load",
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::Io(_) => "io_error",
        }
    }
}

/// Fails with [`RecadError::ShapeMismatch`] unless both lengths agree.
pub fn ensure_same_len(
    left_name: &str,
    left: usize,
    right_name: &str,
    right: usize,
) -> Result<(), RecadError> {
    if left != right {
        return Err(RecadError::shape_mismatch(format!(
            "{left_name} and {right_name} must share length; got {left_name}={left}, {right_name}={right}"
        )));
    }
    Ok(())
}
