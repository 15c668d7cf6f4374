// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recad_core::{
    FeatureMode, LossGradient, RecadError, Reconstructor, TrainableModel, WindowBatch,
};

/// Architecture dimensions shared by every registered model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub seq_len: usize,
    /// Number of input features per timestep.
    pub features: usize,
    /// Hidden width.
    pub d_model: usize,
    pub seed: u64,
}

impl ModelSpec {
    pub fn validate(&self) -> Result<(), RecadError> {
        if self.seq_len == 0 {
            return Err(RecadError::invalid_input("seq_len must be >= 1; got seq_len=0"));
        }
        if self.features == 0 {
            return Err(RecadError::invalid_input(
                "features must be >= 1; got features=0",
            ));
        }
        if self.d_model == 0 {
            return Err(RecadError::invalid_input("d_model must be >= 1; got d_model=0"));
        }
        Ok(())
    }
}

/// What one autoencoder application sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    /// One timestep's feature vector at a time.
    Timestep,
    /// A whole flattened window at a time.
    Window,
}

/// Single-hidden-layer autoencoder: `y = W2 tanh(W1 x + b1) + b2`.
///
/// Parameters live in one flat vector laid out as `W1 [h, w]`, `b1 [h]`,
/// `W2 [w, h]`, `b2 [w]`, where `w` is the unit width (`d` per timestep or
/// `seq_len * d` per window) and `h = d_model`.
#[derive(Clone, Debug)]
pub struct DenseAutoencoder {
    tag: String,
    granularity: Granularity,
    spec: ModelSpec,
    width: usize,
    params: Vec<f64>,
}

impl DenseAutoencoder {
    /// PyTorch-style init: every weight and bias uniform in
    /// `[-1/sqrt(fan_in), 1/sqrt(fan_in)]`.
    pub fn new(
        tag: impl Into<String>,
        granularity: Granularity,
        spec: &ModelSpec,
    ) -> Result<Self, RecadError> {
        spec.validate()?;
        let width = match granularity {
            Granularity::Timestep => spec.features,
            Granularity::Window => spec.seq_len * spec.features,
        };
        let hidden = spec.d_model;

        let mut rng = StdRng::seed_from_u64(spec.seed);
        let encoder_bound = 1.0 / (width as f64).sqrt();
        let decoder_bound = 1.0 / (hidden as f64).sqrt();
        let mut params = Vec::with_capacity(2 * width * hidden + width + hidden);
        params.extend(
            (0..hidden * width + hidden).map(|_| rng.gen_range(-encoder_bound..encoder_bound)),
        );
        params.extend(
            (0..width * hidden + width).map(|_| rng.gen_range(-decoder_bound..decoder_bound)),
        );

        Ok(Self {
            tag: tag.into(),
            granularity,
            spec: *spec,
            width,
            params,
        })
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn hidden(&self) -> usize {
        self.spec.d_model
    }

    fn check_batch(&self, batch: &WindowBatch) -> Result<(), RecadError> {
        if batch.d() != self.spec.features {
            return Err(RecadError::shape_mismatch(format!(
                "model expects {} features; got batch d={}",
                self.spec.features,
                batch.d()
            )));
        }
        if self.granularity == Granularity::Window && batch.seq_len() != self.spec.seq_len {
            return Err(RecadError::shape_mismatch(format!(
                "window model expects seq_len={}; got batch seq_len={}",
                self.spec.seq_len,
                batch.seq_len()
            )));
        }
        Ok(())
    }

    /// Splits the parameter vector into `(w1, b1, w2, b2)`.
    fn layers(&self) -> (&[f64], &[f64], &[f64], &[f64]) {
        let (w, h) = (self.width, self.hidden());
        let (w1, rest) = self.params.split_at(h * w);
        let (b1, rest) = rest.split_at(h);
        let (w2, b2) = rest.split_at(w * h);
        (w1, b1, w2, b2)
    }

    fn forward_unit(&self, x: &[f64], hidden: &mut [f64], out: &mut [f64]) {
        let (w1, b1, w2, b2) = self.layers();
        let w = self.width;
        for (k, a) in hidden.iter_mut().enumerate() {
            let row = &w1[k * w..(k + 1) * w];
            let z = b1[k] + row.iter().zip(x).map(|(wk, xi)| wk * xi).sum::<f64>();
            *a = z.tanh();
        }
        let h = hidden.len();
        for (j, y) in out.iter_mut().enumerate() {
            let row = &w2[j * h..(j + 1) * h];
            *y = b2[j] + row.iter().zip(hidden.iter()).map(|(wj, ak)| wj * ak).sum::<f64>();
        }
    }
}

impl Reconstructor for DenseAutoencoder {
    fn reconstruct(&self, batch: &WindowBatch) -> Result<WindowBatch, RecadError> {
        self.check_batch(batch)?;
        let mut output = vec![0.0; batch.values().len()];
        let mut hidden = vec![0.0; self.hidden()];
        for (x, y) in batch
            .values()
            .chunks_exact(self.width)
            .zip(output.chunks_exact_mut(self.width))
        {
            self.forward_unit(x, &mut hidden, y);
        }
        batch.with_same_shape(output)
    }
}

impl TrainableModel for DenseAutoencoder {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.spec.seq_len, self.spec.features, self.spec.d_model, self.width]
    }

    fn parameters(&self) -> &[f64] {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut [f64] {
        &mut self.params
    }

    fn loss_and_gradient(
        &self,
        batch: &WindowBatch,
        mode: FeatureMode,
    ) -> Result<LossGradient, RecadError> {
        self.check_batch(batch)?;
        let (w, h) = (self.width, self.hidden());
        let d = batch.d();
        let first = mode.first_feature(d);
        let count = (batch.timesteps() * (d - first)) as f64;

        let (_, _, w2, _) = self.layers();
        let mut gradient = vec![0.0; self.params.len()];
        let (g_w1, rest) = gradient.split_at_mut(h * w);
        let (g_b1, rest) = rest.split_at_mut(h);
        let (g_w2, g_b2) = rest.split_at_mut(w * h);

        let mut hidden = vec![0.0; h];
        let mut out = vec![0.0; w];
        let mut d_out = vec![0.0; w];
        let mut d_hidden = vec![0.0; h];
        let mut loss = 0.0;

        for x in batch.values().chunks_exact(w) {
            self.forward_unit(x, &mut hidden, &mut out);

            for j in 0..w {
                d_out[j] = if j % d >= first {
                    let diff = out[j] - x[j];
                    loss += diff * diff;
                    2.0 * diff / count
                } else {
                    0.0
                };
            }

            d_hidden.iter_mut().for_each(|v| *v = 0.0);
            for j in 0..w {
                let grad = d_out[j];
                if grad == 0.0 {
                    continue;
                }
                g_b2[j] += grad;
                for k in 0..h {
                    g_w2[j * h + k] += grad * hidden[k];
                    d_hidden[k] += w2[j * h + k] * grad;
                }
            }

            for k in 0..h {
                let dz = d_hidden[k] * (1.0 - hidden[k] * hidden[k]);
                g_b1[k] += dz;
                for (g, xi) in g_w1[k * w..(k + 1) * w].iter_mut().zip(x) {
                    *g += dz * xi;
                }
            }
        }

        Ok(LossGradient {
            loss: loss / count,
            gradient,
        })
    }
}
