// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::error::CliError;
use recad_eval::{DetectionMetrics, EvaluationOutcome};
use recad_train::TrainingReport;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Entry appended to the results log: the setting line followed by the
/// metrics summary line and a blank separator line.
pub fn results_log_entry(setting: &str, metrics: &DetectionMetrics) -> String {
    format!("{setting}  \n{}\n\n", metrics.summary_line())
}

pub fn append_results_log(
    path: &Path,
    setting: &str,
    metrics: &DetectionMetrics,
) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| {
            CliError::io(format!("failed to create '{}'", parent.display()), source)
        })?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| CliError::io(format!("failed to open '{}'", path.display()), source))?;
    file.write_all(results_log_entry(setting, metrics).as_bytes())
        .map_err(|source| CliError::io(format!("failed to append '{}'", path.display()), source))
}

/// Per-run report written to `<test_results>/<setting>/report.json` and
/// echoed on stdout.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub setting: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EvaluationSummary {
    pub train_timesteps: usize,
    pub test_timesteps: usize,
    pub outcome: EvaluationOutcome,
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| {
            CliError::io(format!("failed to create '{}'", parent.display()), source)
        })?;
    }
    crate::input::write_json_output(report, Some(path))
}

#[cfg(test)]
mod tests {
    use super::{append_results_log, results_log_entry};
    use recad_eval::report;

    #[test]
    fn log_entries_append_in_order() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("nested").join("result_anomaly_detection.txt");
        let metrics = report(&[1, 1, 0, 0], &[1, 0, 0, 0]).expect("metrics should compute");

        append_results_log(&path, "first", &metrics).expect("append should succeed");
        append_results_log(&path, "second", &metrics).expect("append should succeed");

        let content = std::fs::read_to_string(&path).expect("log should be readable");
        let line = "Accuracy : 0.7500, Precision : 1.0000, Recall : 0.5000, F-score : 0.6667 ";
        assert_eq!(
            content,
            format!("first  \n{line}\n\nsecond  \n{line}\n\n")
        );
        assert_eq!(results_log_entry("first", &metrics), format!("first  \n{line}\n\n"));
    }
}
