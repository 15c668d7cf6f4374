// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::error::CliError;
use crate::input::read_json_value;
use clap::{Args, ValueEnum};
use recad_core::{Direction, FeatureMode};
use recad_eval::ThresholdPolicy;
use recad_train::{CHECKPOINT_FILE_NAME, LrSchedule, ModelSpec, SplitConfig, TrainerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_RESULTS_PATH: &str = "result_anomaly_detection.txt";
pub const REPORT_FILE_NAME: &str = "report.json";
pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";
pub const TEST_LABEL_FILE_NAME: &str = "test_label.csv";

/// Which threshold policy an experiment uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    #[value(name = "best-f1", alias = "best_f1")]
    BestF1,
    #[default]
    #[value(name = "anomaly-ratio", alias = "anomaly_ratio")]
    AnomalyRatio,
}

/// One experiment, loaded from JSON; every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub model_id: String,
    pub model: String,
    pub data: String,
    /// Directory holding `train.csv`, `test.csv` and `test_label.csv`.
    pub root_path: PathBuf,
    pub features: FeatureMode,
    pub seq_len: usize,
    pub d_model: usize,
    pub batch_size: usize,
    pub train_epochs: usize,
    pub patience: usize,
    pub learning_rate: f64,
    pub lradj: LrSchedule,
    /// Expected anomaly prevalence in percent.
    pub anomaly_ratio: f64,
    pub threshold: ThresholdKind,
    pub direction: Direction,
    /// Stride between test windows; defaults to `seq_len`.
    pub test_stride: Option<usize>,
    pub seed: u64,
    pub checkpoints: PathBuf,
    pub results_path: PathBuf,
    pub test_results: PathBuf,
    /// Every CSV starts with a timestamp column that is dropped on load.
    pub timestamp_column: bool,
    pub des: String,
    pub itr: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            model_id: "recad".to_string(),
            model: recad_train::DENSE_AE_TAG.to_string(),
            data: "custom".to_string(),
            root_path: PathBuf::from("./dataset"),
            features: FeatureMode::M,
            seq_len: 100,
            d_model: 64,
            batch_size: 128,
            train_epochs: 10,
            patience: 3,
            learning_rate: 1e-4,
            lradj: LrSchedule::Type1,
            anomaly_ratio: recad_eval::DEFAULT_ANOMALY_RATIO,
            threshold: ThresholdKind::AnomalyRatio,
            direction: Direction::Upper,
            test_stride: None,
            seed: 2021,
            checkpoints: PathBuf::from("./checkpoints"),
            results_path: PathBuf::from(DEFAULT_RESULTS_PATH),
            test_results: PathBuf::from("./test_results"),
            timestamp_column: false,
            des: "exp".to_string(),
            itr: 0,
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, CliError> {
        let value = read_json_value(path)?;
        serde_json::from_value(value).map_err(|source| {
            CliError::json(
                format!("invalid experiment config in '{}'", path.display()),
                source,
            )
        })
    }

    /// Loads `path` when given, otherwise starts from defaults, then applies
    /// command-line overrides and validates.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, CliError> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CliError> {
        let sizes = [
            ("seq_len", self.seq_len),
            ("d_model", self.d_model),
            ("batch_size", self.batch_size),
            ("train_epochs", self.train_epochs),
            ("patience", self.patience),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(CliError::invalid_input(format!(
                    "{name} must be >= 1; got {name}=0"
                )));
            }
        }
        if self.test_stride == Some(0) {
            return Err(CliError::invalid_input(
                "test_stride must be >= 1; got test_stride=0",
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(CliError::invalid_input(format!(
                "learning_rate must be finite and > 0; got learning_rate={}",
                self.learning_rate
            )));
        }
        if !self.anomaly_ratio.is_finite() || !(0.0..=100.0).contains(&self.anomaly_ratio) {
            return Err(CliError::invalid_input(format!(
                "anomaly_ratio must be within [0, 100]; got anomaly_ratio={}",
                self.anomaly_ratio
            )));
        }
        for (name, value) in [
            ("model_id", &self.model_id),
            ("model", &self.model),
            ("data", &self.data),
        ] {
            if value.trim().is_empty() {
                return Err(CliError::invalid_input(format!("{name} must be non-empty")));
            }
        }
        Ok(())
    }

    /// Key shared by the checkpoint directory, the report directory and the
    /// results log entry.
    pub fn setting(&self) -> String {
        format!(
            "{}_{}_{}_ft{}_sl{}_dm{}_{}_{}",
            self.model_id,
            self.model,
            self.data,
            self.features,
            self.seq_len,
            self.d_model,
            self.des,
            self.itr
        )
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoints
            .join(self.setting())
            .join(CHECKPOINT_FILE_NAME)
    }

    pub fn report_path(&self) -> PathBuf {
        self.test_results.join(self.setting()).join(REPORT_FILE_NAME)
    }

    pub fn train_path(&self) -> PathBuf {
        self.root_path.join(TRAIN_FILE_NAME)
    }

    pub fn test_path(&self) -> PathBuf {
        self.root_path.join(TEST_FILE_NAME)
    }

    pub fn test_label_path(&self) -> PathBuf {
        self.root_path.join(TEST_LABEL_FILE_NAME)
    }

    pub fn threshold_policy(&self) -> ThresholdPolicy {
        match self.threshold {
            ThresholdKind::BestF1 => ThresholdPolicy::BestF1 {
                direction: self.direction,
            },
            ThresholdKind::AnomalyRatio => ThresholdPolicy::AnomalyRatio {
                ratio_percent: self.anomaly_ratio,
            },
        }
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            train_epochs: self.train_epochs,
            batch_size: self.batch_size,
            patience: self.patience,
            learning_rate: self.learning_rate,
            lradj: self.lradj,
            features: self.features,
            seed: self.seed,
            ..TrainerConfig::default()
        }
    }

    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            seq_len: self.seq_len,
            test_stride: self.test_stride,
        }
    }

    pub fn model_spec(&self, features: usize) -> ModelSpec {
        ModelSpec {
            seq_len: self.seq_len,
            features,
            d_model: self.d_model,
            seed: self.seed,
        }
    }
}

/// Command-line overrides for [`ExperimentConfig`] fields.
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigOverrides {
    #[arg(long)]
    pub model_id: Option<String>,
    /// Model tag (dense_ae, window_ae)
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub data: Option<String>,
    #[arg(long)]
    pub root_path: Option<PathBuf>,
    /// Feature mode (M, S, MS)
    #[arg(long)]
    pub features: Option<FeatureMode>,
    #[arg(long)]
    pub seq_len: Option<usize>,
    #[arg(long)]
    pub d_model: Option<usize>,
    #[arg(long)]
    pub batch_size: Option<usize>,
    #[arg(long)]
    pub train_epochs: Option<usize>,
    #[arg(long)]
    pub patience: Option<usize>,
    #[arg(long)]
    pub learning_rate: Option<f64>,
    /// Learning-rate schedule (type1, type2, type3, cosine, constant)
    #[arg(long)]
    pub lradj: Option<LrSchedule>,
    /// Expected anomaly prevalence in percent
    #[arg(long)]
    pub anomaly_ratio: Option<f64>,
    #[arg(long, value_enum)]
    pub threshold: Option<ThresholdKind>,
    /// Score direction for the best-F1 search (upper, lower)
    #[arg(long)]
    pub direction: Option<Direction>,
    #[arg(long)]
    pub test_stride: Option<usize>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub checkpoints: Option<PathBuf>,
    #[arg(long)]
    pub results_path: Option<PathBuf>,
    #[arg(long)]
    pub test_results: Option<PathBuf>,
    /// Drop the first CSV column as a timestamp
    #[arg(long)]
    pub timestamp_column: bool,
    #[arg(long)]
    pub des: Option<String>,
    #[arg(long)]
    pub itr: Option<usize>,
}

macro_rules! override_fields {
    ($source:expr, $target:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = $source.$field.clone() {
                $target.$field = value;
            }
        )*
    };
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ExperimentConfig) {
        override_fields!(
            self,
            config,
            [
                model_id,
                model,
                data,
                root_path,
                features,
                seq_len,
                d_model,
                batch_size,
                train_epochs,
                patience,
                learning_rate,
                lradj,
                anomaly_ratio,
                threshold,
                direction,
                seed,
                checkpoints,
                results_path,
                test_results,
                des,
                itr,
            ]
        );
        if self.test_stride.is_some() {
            config.test_stride = self.test_stride;
        }
        if self.timestamp_column {
            config.timestamp_column = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigOverrides, ExperimentConfig, ThresholdKind};
    use recad_core::{Direction, FeatureMode};
    use recad_eval::ThresholdPolicy;
    use std::path::PathBuf;

    #[test]
    fn partial_json_documents_fill_defaults() {
        let config: ExperimentConfig = serde_json::from_str(
            r#"{"model_id": "psm", "features": "MS", "threshold": "best_f1", "direction": "lower"}"#,
        )
        .expect("partial config should parse");
        assert_eq!(config.model_id, "psm");
        assert_eq!(config.features, FeatureMode::MS);
        assert_eq!(config.seq_len, 100);
        assert_eq!(
            config.threshold_policy(),
            ThresholdPolicy::BestF1 {
                direction: Direction::Lower
            }
        );
        assert!(config.test_stride.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_json::from_str::<ExperimentConfig>(r#"{"seq_length": 5}"#)
            .expect_err("typo should fail");
        assert!(err.to_string().contains("seq_length"));
    }

    #[test]
    fn setting_string_keys_paths() {
        let config = ExperimentConfig {
            model_id: "PSM".to_string(),
            model: "dense_ae".to_string(),
            data: "PSM".to_string(),
            seq_len: 100,
            d_model: 8,
            des: "Exp".to_string(),
            itr: 0,
            checkpoints: PathBuf::from("ckpt"),
            test_results: PathBuf::from("out"),
            ..ExperimentConfig::default()
        };
        let setting = "PSM_dense_ae_PSM_ftM_sl100_dm8_Exp_0";
        assert_eq!(config.setting(), setting);
        assert_eq!(
            config.checkpoint_path(),
            PathBuf::from("ckpt").join(setting).join("checkpoint.json")
        );
        assert_eq!(
            config.report_path(),
            PathBuf::from("out").join(setting).join("report.json")
        );
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad = [
            ExperimentConfig {
                seq_len: 0,
                ..ExperimentConfig::default()
            },
            ExperimentConfig {
                anomaly_ratio: 120.0,
                ..ExperimentConfig::default()
            },
            ExperimentConfig {
                learning_rate: f64::INFINITY,
                ..ExperimentConfig::default()
            },
            ExperimentConfig {
                test_stride: Some(0),
                ..ExperimentConfig::default()
            },
        ];
        for config in bad {
            let err = config.validate().expect_err("invalid config");
            assert_eq!(err.code(), "invalid_input");
        }
        ExperimentConfig::default()
            .validate()
            .expect("defaults should be valid");
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut config = ExperimentConfig::default();
        let overrides = ConfigOverrides {
            seq_len: Some(16),
            threshold: Some(ThresholdKind::BestF1),
            test_stride: Some(4),
            timestamp_column: true,
            ..ConfigOverrides::default()
        };
        overrides.apply(&mut config);
        assert_eq!(config.seq_len, 16);
        assert_eq!(config.threshold, ThresholdKind::BestF1);
        assert_eq!(config.test_stride, Some(4));
        assert!(config.timestamp_column);
        assert_eq!(config.d_model, 64);
    }
}
