// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Windowed datasets, reconstruction models, checkpoints and the training
//! loop that produces anomaly scores for `recad-eval`.

pub mod checkpoint;
pub mod dataset;
pub mod early_stopping;
pub mod models;
pub mod optimizer;
pub mod registry;
pub mod schedule;
pub mod scoring;
pub mod trainer;

pub use checkpoint::{
    CHECKPOINT_FILE_NAME, CURRENT_CHECKPOINT_SCHEMA_VERSION, CheckpointEnvelope, load_checkpoint,
    read_checkpoint, save_checkpoint,
};
pub use dataset::{
    AnomalyData, LabelledBatch, SeriesMatrix, SplitConfig, StandardScaler, VALIDATION_FRACTION,
    WindowDataset,
};
pub use early_stopping::{EarlyStopping, StoppingStep};
pub use models::{DenseAutoencoder, Granularity, ModelSpec};
pub use optimizer::Adam;
pub use registry::{DENSE_AE_TAG, ModelConstructor, ModelRegistry, WINDOW_AE_TAG};
pub use schedule::LrSchedule;
pub use scoring::{ScoredSplit, score_series, timestep_scores};
pub use trainer::{
    EpochSummary, Trainer, TrainerConfig, TrainingPhase, TrainingReport, evaluate_loss,
};
