// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::error::CliError;
use recad_train::SeriesMatrix;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// How blank CSV cells are read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingCells {
    /// Fail on the first blank cell.
    #[default]
    Error,
    /// Read blank cells as `NaN`.
    Nan,
}

/// Parses a rectangular numeric CSV into row-major `(values, n, d)`.
///
/// A single header row is skipped when the first row is entirely
/// non-numeric and the second entirely numeric.
pub fn parse_csv_data(raw: &str) -> Result<(Vec<f64>, usize, usize), CliError> {
    parse_csv_data_with(raw, MissingCells::Error)
}

/// [`parse_csv_data`] with an explicit policy for blank cells.
pub fn parse_csv_data_with(
    raw: &str,
    missing: MissingCells,
) -> Result<(Vec<f64>, usize, usize), CliError> {
    let rows = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();

    if rows.is_empty() {
        return Err(CliError::invalid_input("CSV input is empty"));
    }

    match parse_csv_rows(rows.as_slice(), missing) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            if rows.len() > 1 && first_row_looks_like_header(rows[0], rows[1], missing) {
                if let Ok(without_header) = parse_csv_rows(&rows[1..], missing) {
                    return Ok(without_header);
                }
            }
            Err(err)
        }
    }
}

fn parse_csv_rows(
    rows: &[&str],
    missing: MissingCells,
) -> Result<(Vec<f64>, usize, usize), CliError> {
    let mut values = Vec::<f64>::new();
    let mut expected_cols: Option<usize> = None;

    for (row_idx, row) in rows.iter().enumerate() {
        let cells = row.split(',').map(str::trim).collect::<Vec<_>>();

        match expected_cols {
            Some(cols) if cells.len() != cols => {
                return Err(CliError::invalid_input(format!(
                    "CSV row {} has {} columns but expected {}",
                    row_idx + 1,
                    cells.len(),
                    cols
                )));
            }
            Some(_) => {}
            None => expected_cols = Some(cells.len()),
        }

        for (col_idx, cell) in cells.iter().enumerate() {
            if cell.is_empty() && missing == MissingCells::Nan {
                values.push(f64::NAN);
                continue;
            }
            if cell.is_empty() {
                return Err(CliError::invalid_input(format!(
                    "CSV row {} column {} is empty",
                    row_idx + 1,
                    col_idx + 1
                )));
            }

            let value = cell.parse::<f64>().map_err(|_| {
                CliError::invalid_input(format!(
                    "CSV row {} column {} is not a valid float: '{}'",
                    row_idx + 1,
                    col_idx + 1,
                    cell
                ))
            })?;
            values.push(value);
        }
    }

    let d = expected_cols.ok_or_else(|| CliError::invalid_input("CSV input is empty"))?;
    Ok((values, rows.len(), d))
}

fn first_row_looks_like_header(first_row: &str, second_row: &str, missing: MissingCells) -> bool {
    let first_cells = first_row.split(',').map(str::trim).collect::<Vec<_>>();
    let second_cells = second_row.split(',').map(str::trim).collect::<Vec<_>>();

    if first_cells.len() != second_cells.len()
        || first_cells.iter().any(|cell| cell.is_empty())
        || (missing == MissingCells::Error && second_cells.iter().any(|cell| cell.is_empty()))
    {
        return false;
    }

    let first_all_non_numeric = first_cells.iter().all(|cell| cell.parse::<f64>().is_err());
    let second_all_numeric = second_cells
        .iter()
        .all(|cell| cell.is_empty() || cell.parse::<f64>().is_ok());

    first_all_non_numeric && second_all_numeric
}

fn read_to_string(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase)
}

/// Drops column 0 of a row-major matrix with `d` columns.
fn drop_first_column(values: Vec<f64>, n: usize, d: usize) -> Result<(Vec<f64>, usize), CliError> {
    if d < 2 {
        return Err(CliError::invalid_input(format!(
            "timestamp_column requires at least 2 CSV columns; got {d}"
        )));
    }
    let kept = values
        .chunks_exact(d)
        .flat_map(|row| row[1..].iter().copied())
        .collect::<Vec<_>>();
    debug_assert_eq!(kept.len(), n * (d - 1));
    Ok((kept, d - 1))
}

/// Loads a CSV series; blank and NaN cells are replaced with `0.0`.
pub fn read_csv_matrix(path: &Path, timestamp_column: bool) -> Result<SeriesMatrix, CliError> {
    let raw = read_to_string(path)?;
    let (mut values, n, mut d) = parse_csv_data_with(raw.as_str(), MissingCells::Nan)?;
    if timestamp_column {
        (values, d) = drop_first_column(values, n, d)?;
    }

    let mut replaced = 0usize;
    for value in values.iter_mut().filter(|value| value.is_nan()) {
        *value = 0.0;
        replaced += 1;
    }
    if replaced > 0 {
        tracing::warn!(path = %path.display(), replaced, "replaced NaN cells with 0");
    }

    Ok(SeriesMatrix::new(values, n, d)?)
}

/// Last column of a CSV file.
pub fn read_csv_last_column(path: &Path, timestamp_column: bool) -> Result<Vec<f64>, CliError> {
    let matrix = read_csv_matrix(path, timestamp_column)?;
    let d = matrix.d();
    Ok((0..matrix.n()).map(|t| matrix.row(t)[d - 1]).collect())
}

/// Reads a 1-D series from `.json` (a number array, or an object holding
/// one under `key`) or `.csv` (last column).
pub fn read_series(path: &Path, key: &str) -> Result<Vec<f64>, CliError> {
    match extension(path).as_deref() {
        Some("json") => {
            let value = read_json_value(path)?;
            let array = value
                .as_object()
                .and_then(|obj| obj.get(key))
                .unwrap_or(&value);
            parse_f64_array(array, &format!("{}:{key}", path.display()))
        }
        Some("csv") => read_csv_last_column(path, false),
        _ => Err(CliError::invalid_input(format!(
            "unable to infer input format for '{}'; expected .json or .csv",
            path.display()
        ))),
    }
}

fn parse_f64_array(value: &Value, context: &str) -> Result<Vec<f64>, CliError> {
    let array = value
        .as_array()
        .ok_or_else(|| CliError::invalid_input(format!("{context} must be an array of numbers")))?;
    array
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_f64().ok_or_else(|| {
                CliError::invalid_input(format!("{context}[{idx}] must be a number; got {item}"))
            })
        })
        .collect()
}

pub fn read_json_value(path: &Path) -> Result<Value, CliError> {
    let raw = read_to_string(path)?;
    serde_json::from_str(raw.as_str())
        .map_err(|source| CliError::json(format!("invalid JSON in '{}'", path.display()), source))
}

/// Pretty-prints `payload` to `output_path`, or to stdout when absent.
pub fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}
