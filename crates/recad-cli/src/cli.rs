// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::{ConfigOverrides, ExperimentConfig, ThresholdKind};
use crate::error::CliError;
use crate::experiment::Experiment;
use crate::input::{read_series, write_json_output};
use clap::{Args, Parser, Subcommand};
use recad_core::Direction;
use recad_eval::{DEFAULT_ANOMALY_RATIO, EvaluationOutcome, ThresholdPolicy, evaluate};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "recad",
    version,
    about = "Reconstruction-based anomaly detection experiments"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train a model and keep the best checkpoint
    Train(ExperimentArgs),
    /// Score the test split with a stored checkpoint and report metrics
    Test(ExperimentArgs),
    /// Train, then test the restored best model
    Run(ExperimentArgs),
    /// Threshold and score precomputed anomaly scores
    Eval(EvalArgs),
}

#[derive(Debug, Args)]
pub struct ExperimentArgs {
    /// JSON experiment config; flags below override its fields
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
    /// Write the JSON summary here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// Test scores (.json array/object or .csv last column)
    #[arg(long)]
    pub scores: PathBuf,
    /// Test labels, same formats as --scores
    #[arg(long)]
    pub labels: PathBuf,
    /// Train scores pooled into the anomaly-ratio percentile
    #[arg(long)]
    pub train_scores: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "best-f1")]
    pub policy: ThresholdKind,
    /// Score direction for the best-F1 search (upper, lower)
    #[arg(long, default_value = "upper")]
    pub direction: Direction,
    /// Expected anomaly prevalence in percent
    #[arg(long, default_value_t = DEFAULT_ANOMALY_RATIO)]
    pub anomaly_ratio: f64,
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
    policy: &'static str,
    n: usize,
    #[serde(flatten)]
    outcome: EvaluationOutcome,
}

impl EvalArgs {
    fn policy(&self) -> ThresholdPolicy {
        match self.policy {
            ThresholdKind::BestF1 => ThresholdPolicy::BestF1 {
                direction: self.direction,
            },
            ThresholdKind::AnomalyRatio => ThresholdPolicy::AnomalyRatio {
                ratio_percent: self.anomaly_ratio,
            },
        }
    }
}

fn load_experiment(args: &ExperimentArgs) -> Result<Experiment, CliError> {
    let config = ExperimentConfig::resolve(args.config.as_deref(), &args.overrides)?;
    Experiment::new(config)
}

fn handle_eval(args: EvalArgs) -> Result<(), CliError> {
    if !args.anomaly_ratio.is_finite() || !(0.0..=100.0).contains(&args.anomaly_ratio) {
        return Err(CliError::invalid_input(format!(
            "--anomaly-ratio must be within [0, 100]; got {}",
            args.anomaly_ratio
        )));
    }
    let scores = read_series(&args.scores, "scores")?;
    let labels = read_series(&args.labels, "labels")?;
    let train_scores = match args.train_scores.as_deref() {
        Some(path) => read_series(path, "scores")?,
        None => Vec::new(),
    };

    let policy = args.policy();
    let outcome = evaluate(policy, &train_scores, &scores, &labels)?;
    let payload = EvalOutput {
        policy: policy.name(),
        n: scores.len(),
        outcome,
    };
    write_json_output(&payload, args.output.as_deref())
}

/// Dispatches one parsed command line.
pub fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Train(args) => {
            let report = load_experiment(&args)?.train()?;
            write_json_output(&report, args.output.as_deref())
        }
        Command::Test(args) => {
            let report = load_experiment(&args)?.test()?;
            write_json_output(&report, args.output.as_deref())
        }
        Command::Run(args) => {
            let report = load_experiment(&args)?.run()?;
            write_json_output(&report, args.output.as_deref())
        }
        Command::Eval(args) => handle_eval(args),
    }
}
