// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use recad_core::{RecadError, WindowBatch, ensure_same_len, validate_finite};

/// Share of the training rows held out (from the end) for validation.
pub const VALIDATION_FRACTION: f64 = 0.2;

/// Owned `[n, d]` series in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesMatrix {
    values: Vec<f64>,
    n: usize,
    d: usize,
}

impl SeriesMatrix {
    pub fn new(values: Vec<f64>, n: usize, d: usize) -> Result<Self, RecadError> {
        if n == 0 {
            return Err(RecadError::empty_input("series must have at least one row"));
        }
        if d == 0 {
            return Err(RecadError::invalid_input("series must have at least one feature"));
        }
        let expected = n
            .checked_mul(d)
            .ok_or_else(|| RecadError::invalid_input("n*d overflow"))?;
        if values.len() != expected {
            return Err(RecadError::shape_mismatch(format!(
                "series value length mismatch: got {}, expected {expected} (n={n}, d={d})",
                values.len()
            )));
        }
        validate_finite(&values, "series")?;
        Ok(Self { values, n, d })
    }

    /// Builds a matrix from equally wide rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, RecadError> {
        let Some(first) = rows.first() else {
            return Err(RecadError::empty_input("series must have at least one row"));
        };
        let d = first.len();
        let mut values = Vec::with_capacity(rows.len() * d);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != d {
                return Err(RecadError::shape_mismatch(format!(
                    "row {idx} has {} features; expected {d}",
                    row.len()
                )));
            }
            values.extend_from_slice(row);
        }
        Self::new(values, rows.len(), d)
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn d(&self) -> usize {
        self.d
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.d;
        &self.values[start..start + self.d]
    }

    /// Copies rows `start..self.n()`.
    pub fn tail_from(&self, start: usize) -> Result<Self, RecadError> {
        if start >= self.n {
            return Err(RecadError::empty_input(format!(
                "tail must keep at least one row; got start={start}, n={}",
                self.n
            )));
        }
        Self::new(self.values[start * self.d..].to_vec(), self.n - start, self.d)
    }
}

/// Per-feature standardization fitted on the training split.
#[derive(Clone, Debug, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    /// Population mean/std per feature; a zero std is replaced by 1.
    pub fn fit(series: &SeriesMatrix) -> Self {
        let d = series.d();
        let n = series.n() as f64;
        let mut mean = vec![0.0; d];
        for t in 0..series.n() {
            for (acc, value) in mean.iter_mut().zip(series.row(t)) {
                *acc += value;
            }
        }
        mean.iter_mut().for_each(|acc| *acc /= n);

        let mut var = vec![0.0; d];
        for t in 0..series.n() {
            for ((acc, value), mu) in var.iter_mut().zip(series.row(t)).zip(&mean) {
                *acc += (value - mu) * (value - mu);
            }
        }
        let std = var
            .into_iter()
            .map(|acc| {
                let std = (acc / n).sqrt();
                if std == 0.0 { 1.0 } else { std }
            })
            .collect();

        Self { mean, std }
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    pub fn transform(&self, series: &SeriesMatrix) -> Result<SeriesMatrix, RecadError> {
        ensure_same_len("scaler features", self.mean.len(), "series features", series.d())?;
        let d = series.d();
        let values = series
            .values()
            .iter()
            .enumerate()
            .map(|(idx, value)| (value - self.mean[idx % d]) / self.std[idx % d])
            .collect();
        SeriesMatrix::new(values, series.n(), d)
    }
}

/// One batch of windows with the per-timestep labels they cover, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelledBatch {
    pub inputs: WindowBatch,
    pub labels: Option<Vec<f64>>,
}

/// Sliding windows of `seq_len` rows over a series.
#[derive(Clone, Debug)]
pub struct WindowDataset {
    series: SeriesMatrix,
    labels: Option<Vec<f64>>,
    seq_len: usize,
    starts: Vec<usize>,
}

impl WindowDataset {
    pub fn new(
        series: SeriesMatrix,
        labels: Option<Vec<f64>>,
        seq_len: usize,
        stride: usize,
    ) -> Result<Self, RecadError> {
        if seq_len == 0 {
            return Err(RecadError::invalid_input("seq_len must be >= 1; got seq_len=0"));
        }
        if stride == 0 {
            return Err(RecadError::invalid_input("stride must be >= 1; got stride=0"));
        }
        if series.n() < seq_len {
            return Err(RecadError::empty_input(format!(
                "series is shorter than one window; got n={}, seq_len={seq_len}",
                series.n()
            )));
        }
        if let Some(labels) = &labels {
            ensure_same_len("labels", labels.len(), "series rows", series.n())?;
        }

        let starts = (0..=series.n() - seq_len).step_by(stride).collect();
        Ok(Self {
            series,
            labels,
            seq_len,
            starts,
        })
    }

    /// Number of windows.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn d(&self) -> usize {
        self.series.d()
    }

    pub fn has_labels(&self) -> bool {
        self.labels.is_some()
    }

    pub fn series(&self) -> &SeriesMatrix {
        &self.series
    }

    pub fn batch_count(&self, batch_size: usize) -> usize {
        if batch_size == 0 {
            0
        } else {
            self.len().div_ceil(batch_size)
        }
    }

    /// Gathers the windows at `indices` into one batch.
    pub fn gather(&self, indices: &[usize]) -> Result<LabelledBatch, RecadError> {
        let d = self.series.d();
        let width = self.seq_len * d;
        let mut values = Vec::with_capacity(indices.len() * width);
        let mut labels = self
            .labels
            .as_ref()
            .map(|_| Vec::with_capacity(indices.len() * self.seq_len));

        for &index in indices {
            let start = *self.starts.get(index).ok_or_else(|| {
                RecadError::invalid_input(format!(
                    "window index out of range; got index={index}, windows={}",
                    self.len()
                ))
            })?;
            values.extend_from_slice(&self.series.values()[start * d..(start + self.seq_len) * d]);
            if let (Some(out), Some(source)) = (labels.as_mut(), self.labels.as_ref()) {
                out.extend_from_slice(&source[start..start + self.seq_len]);
            }
        }

        Ok(LabelledBatch {
            inputs: WindowBatch::new(values, indices.len(), self.seq_len, d)?,
            labels,
        })
    }

    /// Iterates batches of `batch_size` windows; the last batch may be
    /// partial. With `shuffle_seed` the window order is permuted
    /// deterministically.
    pub fn batches(
        &self,
        batch_size: usize,
        shuffle_seed: Option<u64>,
    ) -> Result<Batches<'_>, RecadError> {
        if batch_size == 0 {
            return Err(RecadError::invalid_input(
                "batch_size must be >= 1; got batch_size=0",
            ));
        }
        let mut order = (0..self.len()).collect::<Vec<_>>();
        if let Some(seed) = shuffle_seed {
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }
        Ok(Batches {
            dataset: self,
            order,
            batch_size,
            cursor: 0,
        })
    }
}

/// Iterator returned by [`WindowDataset::batches`].
pub struct Batches<'a> {
    dataset: &'a WindowDataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Result<LabelledBatch, RecadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.dataset.gather(&self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }
}

/// How raw splits become window datasets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitConfig {
    pub seq_len: usize,
    /// Stride between test windows; `None` means `seq_len`.
    pub test_stride: Option<usize>,
}

/// Scaled train/validation/test windows of one experiment.
#[derive(Clone, Debug)]
pub struct AnomalyData {
    pub scaler: StandardScaler,
    pub train: WindowDataset,
    pub validation: WindowDataset,
    pub test: WindowDataset,
}

impl AnomalyData {
    /// Fits the scaler on `train`, holds out the last
    /// [`VALIDATION_FRACTION`] of the scaled training rows for validation and
    /// windows every split.
    ///
    /// Training windows span the full training split with stride 1; test
    /// windows use `cfg.test_stride`.
    pub fn from_splits(
        train: &SeriesMatrix,
        test: &SeriesMatrix,
        test_labels: Vec<f64>,
        cfg: &SplitConfig,
    ) -> Result<Self, RecadError> {
        ensure_same_len("train features", train.d(), "test features", test.d())?;
        ensure_same_len("test_labels", test_labels.len(), "test rows", test.n())?;

        let scaler = StandardScaler::fit(train);
        let scaled_train = scaler.transform(train)?;
        let scaled_test = scaler.transform(test)?;

        let validation_start = (train.n() as f64 * (1.0 - VALIDATION_FRACTION)) as usize;
        let validation_rows = scaled_train.tail_from(validation_start)?;
        let test_stride = cfg.test_stride.unwrap_or(cfg.seq_len);

        let data = Self {
            train: WindowDataset::new(scaled_train, None, cfg.seq_len, 1)?,
            validation: WindowDataset::new(validation_rows, None, cfg.seq_len, 1)?,
            test: WindowDataset::new(scaled_test, Some(test_labels), cfg.seq_len, test_stride)?,
            scaler,
        };
        tracing::info!(
            train_windows = data.train.len(),
            validation_windows = data.validation.len(),
            test_windows = data.test.len(),
            seq_len = cfg.seq_len,
            test_stride,
            "prepared window datasets"
        );
        Ok(data)
    }
}
