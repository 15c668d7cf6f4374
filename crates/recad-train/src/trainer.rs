// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::checkpoint::{load_checkpoint, save_checkpoint};
use crate::dataset::{AnomalyData, WindowDataset};
use crate::early_stopping::{EarlyStopping, StoppingStep};
use crate::optimizer::Adam;
use crate::schedule::LrSchedule;
use recad_core::{FeatureMode, RecadError, TrainableModel, reconstruction_loss};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Iterations between progress log lines.
pub const DEFAULT_LOG_EVERY: usize = 100;

/// Knobs of one training run.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainerConfig {
    pub train_epochs: usize,
    pub batch_size: usize,
    pub patience: usize,
    pub learning_rate: f64,
    pub lradj: LrSchedule,
    pub features: FeatureMode,
    /// Base seed of the per-epoch training shuffle.
    pub seed: u64,
    pub log_every: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            train_epochs: 10,
            batch_size: 128,
            patience: 3,
            learning_rate: 1e-4,
            lradj: LrSchedule::Type1,
            features: FeatureMode::M,
            seed: 2021,
            log_every: DEFAULT_LOG_EVERY,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<(), RecadError> {
        if self.train_epochs == 0 {
            return Err(RecadError::invalid_input(
                "train_epochs must be >= 1; got train_epochs=0",
            ));
        }
        if self.batch_size == 0 {
            return Err(RecadError::invalid_input(
                "batch_size must be >= 1; got batch_size=0",
            ));
        }
        if self.patience == 0 {
            return Err(RecadError::invalid_input(
                "patience must be >= 1; got patience=0",
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(RecadError::invalid_input(format!(
                "learning_rate must be finite and > 0; got learning_rate={}",
                self.learning_rate
            )));
        }
        if self.log_every == 0 {
            return Err(RecadError::invalid_input(
                "log_every must be >= 1; got log_every=0",
            ));
        }
        Ok(())
    }
}

/// Where the training loop currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingPhase {
    Training,
    Validating,
    EarlyStopCheck,
    Stopped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    /// 1-based.
    pub epoch: usize,
    pub steps: usize,
    pub train_loss: f64,
    pub validation_loss: f64,
    pub test_loss: f64,
    /// Learning rate used during this epoch.
    pub learning_rate: f64,
    pub improved: bool,
    pub elapsed_secs: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs: Vec<EpochSummary>,
    pub best_validation_loss: f64,
    pub stopped_early: bool,
    pub checkpoint_path: PathBuf,
}

/// Mean of the per-batch reconstruction losses over `dataset`, without
/// updating the model.
pub fn evaluate_loss(
    model: &dyn TrainableModel,
    dataset: &WindowDataset,
    batch_size: usize,
    mode: FeatureMode,
) -> Result<f64, RecadError> {
    let mut total = 0.0;
    let mut batches = 0usize;
    for batch in dataset.batches(batch_size, None)? {
        let batch = batch?;
        let output = model.reconstruct(&batch.inputs)?;
        total += reconstruction_loss(&batch.inputs, &output, mode)?;
        batches += 1;
    }
    if batches == 0 {
        return Err(RecadError::empty_input("loss evaluation needs at least one batch"));
    }
    Ok(total / batches as f64)
}

fn ensure_finite_loss(loss: f64, what: &str, epoch: usize) -> Result<(), RecadError> {
    if !loss.is_finite() {
        return Err(RecadError::numerical_issue(format!(
            "{what} loss is not finite at epoch {epoch}; got loss={loss}"
        )));
    }
    Ok(())
}

/// Adam + early-stopping training loop that keeps the best checkpoint.
#[derive(Clone, Debug)]
pub struct Trainer {
    config: TrainerConfig,
    phase: TrainingPhase,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Result<Self, RecadError> {
        config.validate()?;
        Ok(Self {
            config,
            phase: TrainingPhase::Training,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    /// Trains `model` on `data.train`, checkpointing to `checkpoint_path`
    /// whenever validation loss improves, and finally reloads the best
    /// checkpoint into `model`.
    pub fn fit(
        &mut self,
        model: &mut dyn TrainableModel,
        data: &AnomalyData,
        checkpoint_path: &Path,
    ) -> Result<TrainingReport, RecadError> {
        let cfg = self.config.clone();
        if let Some(parent) = checkpoint_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                RecadError::io(format!(
                    "failed creating checkpoint directory '{}': {err}",
                    parent.display()
                ))
            })?;
        }

        let mut optimizer = Adam::new(cfg.learning_rate, model.parameters().len())?;
        let mut stopping = EarlyStopping::new(cfg.patience)?;
        let mut epochs = Vec::with_capacity(cfg.train_epochs);
        let mut stopped_early = false;
        let train_steps = data.train.batch_count(cfg.batch_size);
        let mut time_now = Instant::now();

        tracing::info!(
            model = model.tag(),
            parameters = model.parameters().len(),
            train_steps,
            train_epochs = cfg.train_epochs,
            "training started"
        );

        for epoch in 1..=cfg.train_epochs {
            self.phase = TrainingPhase::Training;
            let epoch_time = Instant::now();
            let learning_rate = optimizer.learning_rate();
            let mut train_losses = Vec::with_capacity(train_steps);
            let mut iter_count = 0usize;

            let shuffle_seed = cfg.seed.wrapping_add(epoch as u64);
            for (i, batch) in data
                .train
                .batches(cfg.batch_size, Some(shuffle_seed))?
                .enumerate()
            {
                let batch = batch?;
                iter_count += 1;
                let step = model.loss_and_gradient(&batch.inputs, cfg.features)?;
                ensure_finite_loss(step.loss, "training", epoch)?;
                train_losses.push(step.loss);

                if (i + 1) % cfg.log_every == 0 {
                    let speed = time_now.elapsed().as_secs_f64() / iter_count as f64;
                    let remaining = (cfg.train_epochs - epoch + 1) * train_steps - i;
                    tracing::info!(
                        iters = i + 1,
                        epoch,
                        loss = step.loss,
                        speed_secs_per_iter = speed,
                        left_secs = speed * remaining as f64,
                        "training progress"
                    );
                    iter_count = 0;
                    time_now = Instant::now();
                }

                optimizer.step(model.parameters_mut(), &step.gradient)?;
            }
            let train_loss = train_losses.iter().sum::<f64>() / train_losses.len().max(1) as f64;

            self.phase = TrainingPhase::Validating;
            let validation_loss =
                evaluate_loss(&*model, &data.validation, cfg.batch_size, cfg.features)?;
            ensure_finite_loss(validation_loss, "validation", epoch)?;
            let test_loss = evaluate_loss(&*model, &data.test, cfg.batch_size, cfg.features)?;

            self.phase = TrainingPhase::EarlyStopCheck;
            let decision = stopping.observe(validation_loss);
            let improved = matches!(decision, StoppingStep::Improved { .. });
            if let StoppingStep::Improved { previous_best } = decision {
                tracing::info!(
                    previous_best = previous_best.unwrap_or(f64::INFINITY),
                    validation_loss,
                    "validation loss improved; saving checkpoint"
                );
                save_checkpoint(checkpoint_path, &model.state(), epoch, validation_loss)?;
            } else if let StoppingStep::Waiting { counter } = decision {
                tracing::info!(counter, patience = cfg.patience, "early stopping counter");
            }

            let summary = EpochSummary {
                epoch,
                steps: train_losses.len(),
                train_loss,
                validation_loss,
                test_loss,
                learning_rate,
                improved,
                elapsed_secs: epoch_time.elapsed().as_secs_f64(),
            };
            tracing::info!(
                epoch,
                steps = summary.steps,
                train_loss,
                validation_loss,
                test_loss,
                elapsed_secs = summary.elapsed_secs,
                "epoch finished"
            );
            epochs.push(summary);

            if stopping.should_stop() {
                tracing::info!(epoch, "early stopping");
                stopped_early = true;
                break;
            }

            if let Some(next) = cfg.lradj.learning_rate(cfg.learning_rate, epoch, cfg.train_epochs)
            {
                optimizer.set_learning_rate(next)?;
                tracing::info!(learning_rate = next, "updated learning rate");
            }
        }

        self.phase = TrainingPhase::Stopped;
        let best = load_checkpoint(checkpoint_path, model.tag())?;
        model.load_state(&best)?;
        let best_validation_loss = stopping.best().ok_or_else(|| {
            RecadError::numerical_issue("training finished without a validation loss")
        })?;

        Ok(TrainingReport {
            epochs,
            best_validation_loss,
            stopped_early,
            checkpoint_path: checkpoint_path.to_path_buf(),
        })
    }
}
