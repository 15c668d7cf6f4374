// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::ExperimentConfig;
use crate::error::CliError;
use crate::input::{read_csv_last_column, read_csv_matrix};
use crate::results::{EvaluationSummary, RunReport, append_results_log, write_report};
use recad_core::{RecadError, TrainableModel};
use recad_eval::evaluate;
use recad_train::{
    AnomalyData, ModelRegistry, Trainer, TrainingReport, load_checkpoint, score_series,
};

/// Train/test orchestration for one [`ExperimentConfig`].
pub struct Experiment {
    config: ExperimentConfig,
    registry: ModelRegistry,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Result<Self, CliError> {
        Self::with_registry(config, ModelRegistry::default())
    }

    /// Fails early when the configured model tag is not registered.
    pub fn with_registry(
        config: ExperimentConfig,
        registry: ModelRegistry,
    ) -> Result<Self, CliError> {
        config.validate()?;
        if !registry.contains(&config.model) {
            return Err(RecadError::invalid_input(format!(
                "unknown model '{}'; expected one of: {}",
                config.model,
                registry.tags().collect::<Vec<_>>().join(", ")
            ))
            .into());
        }
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn setting(&self) -> String {
        self.config.setting()
    }

    pub fn load_data(&self) -> Result<AnomalyData, CliError> {
        let cfg = &self.config;
        let train = read_csv_matrix(&cfg.train_path(), cfg.timestamp_column)?;
        let test = read_csv_matrix(&cfg.test_path(), cfg.timestamp_column)?;
        let labels = read_csv_last_column(&cfg.test_label_path(), cfg.timestamp_column)?;
        Ok(AnomalyData::from_splits(
            &train,
            &test,
            labels,
            &cfg.split_config(),
        )?)
    }

    fn build_model(&self, data: &AnomalyData) -> Result<Box<dyn TrainableModel>, CliError> {
        let spec = self.config.model_spec(data.train.d());
        Ok(self.registry.build(&self.config.model, &spec)?)
    }

    fn train_model(
        &self,
        data: &AnomalyData,
        model: &mut dyn TrainableModel,
    ) -> Result<TrainingReport, CliError> {
        let setting = self.setting();
        tracing::info!(setting = %setting, ">>>>>>> start training");
        let mut trainer = Trainer::new(self.config.trainer_config())?;
        Ok(trainer.fit(model, data, &self.config.checkpoint_path())?)
    }

    fn evaluate_model(
        &self,
        data: &AnomalyData,
        model: &dyn TrainableModel,
    ) -> Result<EvaluationSummary, CliError> {
        let setting = self.setting();
        tracing::info!(setting = %setting, ">>>>>>> testing");
        let batch_size = self.config.batch_size;

        let train = score_series(model, &data.train, batch_size)?;
        let test = score_series(model, &data.test, batch_size)?;
        let labels = test
            .labels
            .as_deref()
            .ok_or_else(|| RecadError::invalid_input("test split carries no labels"))?;

        let outcome = evaluate(
            self.config.threshold_policy(),
            &train.scores,
            &test.scores,
            labels,
        )?;
        tracing::info!(
            threshold = outcome.decision.threshold,
            summary = %outcome.metrics.summary_line(),
            "test finished"
        );
        append_results_log(&self.config.results_path, &setting, &outcome.metrics)?;

        Ok(EvaluationSummary {
            train_timesteps: train.len(),
            test_timesteps: test.len(),
            outcome,
        })
    }

    /// Trains and keeps the best checkpoint under the setting directory.
    pub fn train(&self) -> Result<RunReport, CliError> {
        let data = self.load_data()?;
        let mut model = self.build_model(&data)?;
        let training = self.train_model(&data, &mut *model)?;
        Ok(RunReport {
            setting: self.setting(),
            training: Some(training),
            evaluation: None,
        })
    }

    /// Loads the setting's checkpoint, scores both splits, thresholds,
    /// adjusts, reports and appends to the results log.
    pub fn test(&self) -> Result<RunReport, CliError> {
        let data = self.load_data()?;
        let mut model = self.build_model(&data)?;
        let checkpoint = self.config.checkpoint_path();
        tracing::info!(path = %checkpoint.display(), "loading model");
        let state = load_checkpoint(&checkpoint, model.tag())?;
        model.load_state(&state)?;

        let report = RunReport {
            setting: self.setting(),
            training: None,
            evaluation: Some(self.evaluate_model(&data, &*model)?),
        };
        write_report(&self.config.report_path(), &report)?;
        Ok(report)
    }

    /// Trains, then tests the restored best model.
    pub fn run(&self) -> Result<RunReport, CliError> {
        let data = self.load_data()?;
        let mut model = self.build_model(&data)?;
        let training = self.train_model(&data, &mut *model)?;
        let report = RunReport {
            setting: self.setting(),
            training: Some(training),
            evaluation: Some(self.evaluate_model(&data, &*model)?),
        };
        write_report(&self.config.report_path(), &report)?;
        Ok(report)
    }
}
