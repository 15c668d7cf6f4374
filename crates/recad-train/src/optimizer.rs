// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use recad_core::{RecadError, ensure_same_len};

/// Adam with PyTorch defaults (`betas = (0.9, 0.999)`, `eps = 1e-8`).
#[derive(Clone, Debug, PartialEq)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    step: u64,
    m: Vec<f64>,
    v: Vec<f64>,
}

impl Adam {
    pub fn new(learning_rate: f64, n_params: usize) -> Result<Self, RecadError> {
        validate_learning_rate(learning_rate)?;
        Ok(Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            step: 0,
            m: vec![0.0; n_params],
            v: vec![0.0; n_params],
        })
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<(), RecadError> {
        validate_learning_rate(learning_rate)?;
        self.learning_rate = learning_rate;
        Ok(())
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> u64 {
        self.step
    }

    /// Applies one bias-corrected update in place.
    pub fn step(&mut self, params: &mut [f64], gradient: &[f64]) -> Result<(), RecadError> {
        ensure_same_len("params", params.len(), "optimizer state", self.m.len())?;
        ensure_same_len("gradient", gradient.len(), "params", params.len())?;

        self.step += 1;
        let t = self.step as i32;
        let bias1 = 1.0 - self.beta1.powi(t);
        let bias2 = 1.0 - self.beta2.powi(t);

        for (((param, grad), m), v) in params
            .iter_mut()
            .zip(gradient)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * grad;
            *v = self.beta2 * *v + (1.0 - self.beta2) * grad * grad;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *param -= self.learning_rate * m_hat / (v_hat.sqrt() + self.eps);
        }
        Ok(())
    }
}

fn validate_learning_rate(learning_rate: f64) -> Result<(), RecadError> {
    if !learning_rate.is_finite() || learning_rate <= 0.0 {
        return Err(RecadError::invalid_input(format!(
            "learning_rate must be finite and > 0; got learning_rate={learning_rate}"
        )));
    }
    Ok(())
}
