//! Single-layer Elman recurrent regressor.
//!
//! ```text
//! h[0] = 0
//! h[t] = tanh(w_in * x[t] + W_rec · h[t-1] + b_rec)      t = 1..=window
//! y    = W_out · h[window] + b_out                        (horizon outputs)
//! ```
//!
//! Trained with mini-batch SGD on mean squared error, using backpropagation
//! through time. Per-sample gradients are computed in parallel with rayon and
//! summed in batch order, so results do not depend on the thread count.
//! Each batch gradient is clipped to a global L2 norm before the update.
//! Weight initialisation and the per-epoch shuffle draw from one seeded
//! `StdRng`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{check_shapes, Regressor, RegressorBuilder, RegressorError};
use crate::config::{ArchitectureConfig, TrainingConfig};

#[derive(Debug, Clone)]
pub struct RecurrentRegressor {
    input_len: usize,
    hidden: usize,
    output_len: usize,
    w_in: Array1<f64>,
    w_rec: Array2<f64>,
    b_rec: Array1<f64>,
    w_out: Array2<f64>,
    b_out: Array1<f64>,
    learning_rate: f64,
    gradient_clip: f64,
    rng: StdRng,
}

impl RecurrentRegressor {
    /// Weights are drawn uniformly from `±1/sqrt(hidden)`; biases start at zero.
    pub fn new(
        input_len: usize,
        hidden: usize,
        output_len: usize,
        learning_rate: f64,
        gradient_clip: f64,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let limit = 1.0 / (hidden as f64).sqrt();

        let w_in = Array1::from_shape_fn(hidden, |_| rng.gen_range(-limit..=limit));
        let w_rec = Array2::from_shape_fn((hidden, hidden), |_| rng.gen_range(-limit..=limit));
        let w_out = Array2::from_shape_fn((output_len, hidden), |_| {
            rng.gen_range(-limit..=limit)
        });

        Self {
            input_len,
            hidden,
            output_len,
            w_in,
            w_rec,
            b_rec: Array1::zeros(hidden),
            w_out,
            b_out: Array1::zeros(output_len),
            learning_rate,
            gradient_clip,
            rng,
        }
    }

    pub fn hidden_units(&self) -> usize {
        self.hidden
    }

    /// `h[0..=window]`, including the zero initial state.
    fn hidden_states(&self, window: ArrayView1<'_, f64>) -> Vec<Array1<f64>> {
        let mut states = Vec::with_capacity(window.len() + 1);
        let mut h = Array1::zeros(self.hidden);
        states.push(h.clone());
        for &x in window.iter() {
            let pre = &self.w_in * x + self.w_rec.dot(&h) + &self.b_rec;
            h = pre.mapv(f64::tanh);
            states.push(h.clone());
        }
        states
    }

    fn readout(&self, h: &Array1<f64>) -> Array1<f64> {
        self.w_out.dot(h) + &self.b_out
    }

    fn forward(&self, window: ArrayView1<'_, f64>) -> Array1<f64> {
        let states = self.hidden_states(window);
        self.readout(&states[states.len() - 1])
    }

    /// Gradient of `scale * Σ (y - target)²` for one sample, plus the
    /// unscaled squared error.
    fn sample_gradient(
        &self,
        window: ArrayView1<'_, f64>,
        target: ArrayView1<'_, f64>,
        scale: f64,
    ) -> (Gradients, f64) {
        let states = self.hidden_states(window);
        let last = &states[states.len() - 1];
        let error = self.readout(last) - &target;
        let squared_error = error.iter().map(|e| e * e).sum::<f64>();

        let d_out = error.mapv(|e| 2.0 * e * scale);
        let mut grads = Gradients::zeros(self.hidden, self.output_len);
        add_outer(&mut grads.w_out, &d_out, last);
        grads.b_out += &d_out;

        let mut d_h = self.w_out.t().dot(&d_out);
        for t in (1..states.len()).rev() {
            let d_pre = &d_h * &states[t].mapv(|v| 1.0 - v * v);
            grads.w_in.scaled_add(window[t - 1], &d_pre);
            add_outer(&mut grads.w_rec, &d_pre, &states[t - 1]);
            grads.b_rec += &d_pre;
            d_h = self.w_rec.t().dot(&d_pre);
        }

        (grads, squared_error)
    }

    fn apply(&mut self, grads: &Gradients) {
        let step = -self.learning_rate;
        self.w_in.scaled_add(step, &grads.w_in);
        self.w_rec.scaled_add(step, &grads.w_rec);
        self.b_rec.scaled_add(step, &grads.b_rec);
        self.w_out.scaled_add(step, &grads.w_out);
        self.b_out.scaled_add(step, &grads.b_out);
    }
}

impl Regressor for RecurrentRegressor {
    fn input_len(&self) -> usize {
        self.input_len
    }

    fn output_len(&self) -> usize {
        self.output_len
    }

    fn fit_epoch(
        &mut self,
        inputs: ArrayView2<'_, f64>,
        targets: ArrayView2<'_, f64>,
        batch_size: usize,
    ) -> Result<f64, RegressorError> {
        check_shapes(self.input_len, self.output_len, &inputs, &targets)?;
        let n = inputs.nrows();
        if n == 0 {
            return Err(RegressorError::EmptyInput("training set"));
        }
        let batch_size = batch_size.clamp(1, n);

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut self.rng);

        let mut total_squared_error = 0.0;
        for batch in order.chunks(batch_size) {
            let scale = 1.0 / (batch.len() * self.output_len) as f64;
            let per_sample: Vec<(Gradients, f64)> = batch
                .par_iter()
                .map(|&i| self.sample_gradient(inputs.row(i), targets.row(i), scale))
                .collect();

            let mut grads = Gradients::zeros(self.hidden, self.output_len);
            for (sample, squared_error) in &per_sample {
                grads.add(sample);
                total_squared_error += squared_error;
            }
            grads.clip(self.gradient_clip);
            self.apply(&grads);
        }

        let loss = total_squared_error / (n * self.output_len) as f64;
        if !loss.is_finite() {
            return Err(RegressorError::Diverged { loss });
        }
        Ok(loss)
    }

    fn predict(&self, inputs: ArrayView2<'_, f64>) -> Result<Array2<f64>, RegressorError> {
        if inputs.ncols() != self.input_len {
            return Err(RegressorError::ShapeMismatch {
                expected: (inputs.nrows(), self.input_len),
                actual: inputs.dim(),
            });
        }

        let rows: Vec<Array1<f64>> = (0..inputs.nrows())
            .into_par_iter()
            .map(|i| self.forward(inputs.row(i)))
            .collect();

        let mut out = Array2::zeros((rows.len(), self.output_len));
        for (mut dst, src) in out.rows_mut().into_iter().zip(&rows) {
            dst.assign(src);
        }
        Ok(out)
    }
}

// ─── Gradients ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Gradients {
    w_in: Array1<f64>,
    w_rec: Array2<f64>,
    b_rec: Array1<f64>,
    w_out: Array2<f64>,
    b_out: Array1<f64>,
}

impl Gradients {
    fn zeros(hidden: usize, output_len: usize) -> Self {
        Self {
            w_in: Array1::zeros(hidden),
            w_rec: Array2::zeros((hidden, hidden)),
            b_rec: Array1::zeros(hidden),
            w_out: Array2::zeros((output_len, hidden)),
            b_out: Array1::zeros(output_len),
        }
    }

    fn add(&mut self, other: &Gradients) {
        self.w_in += &other.w_in;
        self.w_rec += &other.w_rec;
        self.b_rec += &other.b_rec;
        self.w_out += &other.w_out;
        self.b_out += &other.b_out;
    }

    fn norm(&self) -> f64 {
        (sum_sq(self.w_in.iter())
            + sum_sq(self.w_rec.iter())
            + sum_sq(self.b_rec.iter())
            + sum_sq(self.w_out.iter())
            + sum_sq(self.b_out.iter()))
        .sqrt()
    }

    /// Rescale so the global L2 norm does not exceed `max_norm`.
    fn clip(&mut self, max_norm: f64) {
        let norm = self.norm();
        if norm > max_norm && norm.is_finite() {
            let factor = max_norm / norm;
            self.w_in.mapv_inplace(|g| g * factor);
            self.w_rec.mapv_inplace(|g| g * factor);
            self.b_rec.mapv_inplace(|g| g * factor);
            self.w_out.mapv_inplace(|g| g * factor);
            self.b_out.mapv_inplace(|g| g * factor);
        }
    }
}

fn sum_sq<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.map(|g| g * g).sum()
}

fn add_outer(acc: &mut Array2<f64>, left: &Array1<f64>, right: &Array1<f64>) {
    Zip::from(acc.rows_mut())
        .and(left)
        .for_each(|mut row, &l| row.scaled_add(l, right));
}

// ─── Builder ────────────────────────────────────────────────────────

/// Builds [`RecurrentRegressor`]s with a fixed optimiser setup.
///
/// The initialisation seed is derived from the configured seed and the model
/// geometry via BLAKE3, so differently shaped models never share a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecurrentBuilder {
    pub learning_rate: f64,
    pub gradient_clip: f64,
    pub seed: u64,
}

impl RecurrentBuilder {
    pub fn from_training(training: &TrainingConfig) -> Self {
        Self {
            learning_rate: training.learning_rate,
            gradient_clip: training.gradient_clip,
            seed: training.seed,
        }
    }

    fn derive_seed(&self, input_len: usize, output_len: usize, hidden: usize) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(&(input_len as u64).to_le_bytes());
        hasher.update(&(output_len as u64).to_le_bytes());
        hasher.update(&(hidden as u64).to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl Default for RecurrentBuilder {
    fn default() -> Self {
        Self::from_training(&TrainingConfig::default())
    }
}

impl RegressorBuilder for RecurrentBuilder {
    fn build(
        &self,
        input_len: usize,
        output_len: usize,
        architecture: &ArchitectureConfig,
    ) -> Result<Box<dyn Regressor>, RegressorError> {
        let hidden = architecture.hidden_units;
        if input_len == 0 || output_len == 0 || hidden == 0 {
            return Err(RegressorError::InvalidArchitecture(format!(
                "input_len={input_len}, output_len={output_len}, hidden_units={hidden} must all be positive"
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(RegressorError::InvalidArchitecture(format!(
                "learning_rate={} must be positive",
                self.learning_rate
            )));
        }

        let seed = self.derive_seed(input_len, output_len, hidden);
        Ok(Box::new(RecurrentRegressor::new(
            input_len,
            hidden,
            output_len,
            self.learning_rate,
            self.gradient_clip,
            seed,
        )))
    }
}
