// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types and traits for recad.

pub mod batch;
pub mod direction;
pub mod error;
pub mod model;
pub mod segments;

pub use batch::{FeatureMode, WindowBatch};
pub use direction::Direction;
pub use error::{RecadError, ensure_same_len};
pub use model::{LossGradient, ModelState, Reconstructor, TrainableModel, reconstruction_loss};
pub use segments::{
    ANOMALY_LABEL_CUTOFF, Segment, binarize_labels, count_anomalies, is_anomalous,
    segments_from_binary, segments_from_labels, validate_binary, validate_finite,
};
