// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use recad_core::RecadError;

/// Outcome of observing one validation loss.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StoppingStep {
    /// New best (or tied) loss; the caller should checkpoint.
    Improved { previous_best: Option<f64> },
    /// No improvement yet below the patience limit.
    Waiting { counter: usize },
    /// Patience exhausted.
    Stop,
}

/// Patience-based early stopping on validation loss.
///
/// A loss counts as an improvement when `loss <= best - delta`.
#[derive(Clone, Debug, PartialEq)]
pub struct EarlyStopping {
    patience: usize,
    delta: f64,
    best: Option<f64>,
    counter: usize,
    stopped: bool,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Result<Self, RecadError> {
        Self::with_delta(patience, 0.0)
    }

    pub fn with_delta(patience: usize, delta: f64) -> Result<Self, RecadError> {
        if patience == 0 {
            return Err(RecadError::invalid_input(
                "patience must be >= 1; got patience=0",
            ));
        }
        if !delta.is_finite() || delta < 0.0 {
            return Err(RecadError::invalid_input(format!(
                "delta must be finite and >= 0; got delta={delta}"
            )));
        }
        Ok(Self {
            patience,
            delta,
            best: None,
            counter: 0,
            stopped: false,
        })
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn should_stop(&self) -> bool {
        self.stopped
    }

    pub fn observe(&mut self, loss: f64) -> StoppingStep {
        match self.best {
            Some(best) if loss > best - self.delta => {
                self.counter += 1;
                if self.counter >= self.patience {
                    self.stopped = true;
                    StoppingStep::Stop
                } else {
                    StoppingStep::Waiting {
                        counter: self.counter,
                    }
                }
            }
            previous_best => {
                self.best = Some(loss);
                self.counter = 0;
                StoppingStep::Improved { previous_best }
            }
        }
    }
}
