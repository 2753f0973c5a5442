//! Trainable regressor contract.
//!
//! The engine owns a [`Regressor`] for the lifetime of one built model and
//! drives it one epoch at a time, so it can report progress, honour
//! cancellation and yield between epochs. A [`RegressorBuilder`] constructs
//! fresh regressors for a given input/output geometry.
//!
//! Rows of the input matrix are normalized windows (one scalar feature per
//! timestep); rows of the target matrix are normalized future returns.

pub mod recurrent;

use ndarray::{Array2, ArrayView2, Zip};
use thiserror::Error;

use crate::config::ArchitectureConfig;

pub use recurrent::{RecurrentBuilder, RecurrentRegressor};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegressorError {
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("loss diverged to {loss}")]
    Diverged { loss: f64 },

    #[error("invalid architecture: {0}")]
    InvalidArchitecture(String),
}

/// Loss and error metrics of a regressor over one sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressorEvaluation {
    /// Training objective on this set.
    pub loss: f64,
    pub mean_squared_error: f64,
    pub mean_absolute_error: f64,
}

pub trait Regressor: Send {
    /// Timesteps per input row.
    fn input_len(&self) -> usize;

    /// Values per output row.
    fn output_len(&self) -> usize;

    /// One full pass over the training rows in mini-batches of `batch_size`.
    /// Returns the mean training loss of the epoch.
    fn fit_epoch(
        &mut self,
        inputs: ArrayView2<'_, f64>,
        targets: ArrayView2<'_, f64>,
        batch_size: usize,
    ) -> Result<f64, RegressorError>;

    /// One output row per input row.
    fn predict(&self, inputs: ArrayView2<'_, f64>) -> Result<Array2<f64>, RegressorError>;

    /// Score predictions against `targets`. The default treats MSE as the loss.
    fn evaluate(
        &self,
        inputs: ArrayView2<'_, f64>,
        targets: ArrayView2<'_, f64>,
    ) -> Result<RegressorEvaluation, RegressorError> {
        let predictions = self.predict(inputs)?;
        if predictions.dim() != targets.dim() {
            return Err(RegressorError::ShapeMismatch {
                expected: predictions.dim(),
                actual: targets.dim(),
            });
        }
        let (mse, mae) = error_moments(&predictions, &targets);
        Ok(RegressorEvaluation {
            loss: mse,
            mean_squared_error: mse,
            mean_absolute_error: mae,
        })
    }
}

/// Constructs regressors for a window/horizon geometry.
pub trait RegressorBuilder: Send + Sync {
    fn build(
        &self,
        input_len: usize,
        output_len: usize,
        architecture: &ArchitectureConfig,
    ) -> Result<Box<dyn Regressor>, RegressorError>;
}

/// Mean squared and mean absolute error. Both are 0.0 for empty matrices.
pub fn error_moments(predictions: &Array2<f64>, targets: &ArrayView2<'_, f64>) -> (f64, f64) {
    let n = predictions.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mut sq = 0.0;
    let mut abs = 0.0;
    Zip::from(predictions).and(targets).for_each(|&p, &t| {
        let e = p - t;
        sq += e * e;
        abs += e.abs();
    });
    (sq / n as f64, abs / n as f64)
}

/// Reject input/target matrices whose shapes disagree with the model.
pub(crate) fn check_shapes(
    input_len: usize,
    output_len: usize,
    inputs: &ArrayView2<'_, f64>,
    targets: &ArrayView2<'_, f64>,
) -> Result<(), RegressorError> {
    if inputs.ncols() != input_len {
        return Err(RegressorError::ShapeMismatch {
            expected: (inputs.nrows(), input_len),
            actual: inputs.dim(),
        });
    }
    if targets.dim() != (inputs.nrows(), output_len) {
        return Err(RegressorError::ShapeMismatch {
            expected: (inputs.nrows(), output_len),
            actual: targets.dim(),
        });
    }
    Ok(())
}
