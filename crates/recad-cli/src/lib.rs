// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod experiment;
pub mod input;
pub mod results;

pub use cli::{Cli, Command, EvalArgs, ExperimentArgs, run};
pub use config::{ConfigOverrides, ExperimentConfig, ThresholdKind};
pub use error::{CliError, emit_structured_error};
pub use experiment::Experiment;
pub use results::{EvaluationSummary, RunReport};
