//! Forecast engine: model lifecycle, training loop, evaluation, prediction.
//!
//! ```text
//! Idle ──build──▶ Building ──ok──▶ Built ──train──▶ Training ──ok──▶ Trained
//!   ▲                 │err                ▲              │err/cancel/drop   │
//!   └─────────────────┘                   └──────────────┘                  │
//!                                         ▲──────────── train (retrain) ────┘
//! ```
//!
//! Training runs one epoch at a time on the calling task and yields to the
//! runtime after each epoch, so the UI or CLI stays responsive. A training
//! run that ends any way other than success (error, cancellation, or the
//! future being dropped) leaves the engine `Built`, never half-`Trained`.
//!
//! `train` takes `&mut self`: a second concurrent run on the same engine is
//! rejected at compile time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use forecastlab_core::{
    inverse_transform, project_prices, ForecastResult, NormalizationParams, SampleSet,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ArchitectureConfig;
use crate::model::{Regressor, RegressorBuilder, RegressorError};
use crate::observer::{EpochLogs, TrainingObserver};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("model not built: call build() first")]
    ModelNotBuilt,

    #[error("model not trained: train() must complete successfully first")]
    ModelNotTrained,

    #[error("no training data: the training set is empty")]
    NoTrainingData,

    #[error("no evaluation data: the test set is empty")]
    NoEvaluationData,

    #[error("insufficient history: expected {expected} normalized returns, got {actual}")]
    InsufficientHistory { expected: usize, actual: usize },

    #[error("{what} has {actual} columns, model expects {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid training parameter: {0}")]
    InvalidParameter(String),

    #[error("model build failed: {0}")]
    BuildFailed(RegressorError),

    #[error("training failed at epoch {epoch}: {source}")]
    TrainingFailed {
        epoch: usize,
        source: RegressorError,
    },

    #[error("training cancelled after {epochs_completed} epochs")]
    Cancelled { epochs_completed: usize },

    #[error("inference failed: {0}")]
    InferenceFailed(RegressorError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Building,
    Built,
    Training,
    Trained,
}

/// Outcome of a completed training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs_completed: usize,
    pub final_loss: f64,
    pub final_validation_loss: Option<f64>,
    pub history: Vec<EpochLogs>,
}

/// Scores of the trained model on a sample set, in normalized units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub samples: usize,
    pub loss: f64,
    pub mean_squared_error: f64,
    pub root_mean_squared_error: f64,
    pub mean_absolute_error: f64,
}

/// Owns one regressor and the normalization it was trained under.
pub struct ForecastEngine {
    builder: Arc<dyn RegressorBuilder>,
    params: NormalizationParams,
    state: EngineState,
    model: Option<Box<dyn Regressor>>,
    window_size: usize,
    horizon: usize,
}

impl std::fmt::Debug for ForecastEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastEngine")
            .field("state", &self.state)
            .field("params", &self.params)
            .field("window_size", &self.window_size)
            .field("horizon", &self.horizon)
            .finish_non_exhaustive()
    }
}

impl ForecastEngine {
    pub fn new(builder: Arc<dyn RegressorBuilder>, params: NormalizationParams) -> Self {
        Self {
            builder,
            params,
            state: EngineState::Idle,
            model: None,
            window_size: 0,
            horizon: 0,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_trained(&self) -> bool {
        self.state == EngineState::Trained
    }

    pub fn params(&self) -> &NormalizationParams {
        &self.params
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Construct a fresh regressor for `window_size` inputs and `horizon`
    /// outputs, replacing any previous model. On failure the engine is `Idle`.
    pub fn build(
        &mut self,
        window_size: usize,
        horizon: usize,
        architecture: &ArchitectureConfig,
    ) -> Result<(), EngineError> {
        self.model = None;
        self.state = EngineState::Building;

        match self.builder.build(window_size, horizon, architecture) {
            Ok(model) => {
                self.model = Some(model);
                self.window_size = window_size;
                self.horizon = horizon;
                self.state = EngineState::Built;
                debug!(window_size, horizon, hidden = architecture.hidden_units, "model built");
                Ok(())
            }
            Err(e) => {
                self.state = EngineState::Idle;
                Err(EngineError::BuildFailed(e))
            }
        }
    }

    /// Fit the model for `epochs` epochs.
    ///
    /// `validation` is scored after every epoch when present and non-empty.
    /// `cancel` is polled before each epoch; once set, the run stops with
    /// [`EngineError::Cancelled`].
    pub async fn train(
        &mut self,
        train: &SampleSet,
        validation: Option<&SampleSet>,
        epochs: usize,
        batch_size: usize,
        observer: &mut dyn TrainingObserver,
        cancel: Option<&AtomicBool>,
    ) -> Result<TrainingReport, EngineError> {
        let model = self.model.as_mut().ok_or(EngineError::ModelNotBuilt)?;
        if train.is_empty() {
            return Err(EngineError::NoTrainingData);
        }
        if epochs == 0 || batch_size == 0 {
            return Err(EngineError::InvalidParameter(format!(
                "epochs={epochs} and batch_size={batch_size} must be positive"
            )));
        }
        check_geometry("training set", self.window_size, self.horizon, train)?;
        let validation = validation.filter(|v| !v.is_empty());
        if let Some(v) = validation {
            check_geometry("validation set", self.window_size, self.horizon, v)?;
        }

        let mut guard = TrainingGuard::enter(&mut self.state);
        info!(
            samples = train.len(),
            validation = validation.map_or(0, SampleSet::len),
            epochs,
            batch_size,
            "training started"
        );

        let mut history = Vec::with_capacity(epochs);
        for epoch in 0..epochs {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                warn!(epochs_completed = epoch, "training cancelled");
                return Err(EngineError::Cancelled {
                    epochs_completed: epoch,
                });
            }

            let loss = model
                .fit_epoch(train.inputs.view(), train.targets.view(), batch_size)
                .map_err(|source| EngineError::TrainingFailed { epoch, source })?;
            finite_loss(epoch, loss)?;

            let validation_loss = match validation {
                Some(v) => {
                    let val = model
                        .evaluate(v.inputs.view(), v.targets.view())
                        .map_err(|source| EngineError::TrainingFailed { epoch, source })?
                        .loss;
                    finite_loss(epoch, val)?;
                    Some(val)
                }
                None => None,
            };

            let logs = EpochLogs {
                epoch,
                loss,
                validation_loss,
            };
            observer.on_epoch_end(epoch, &logs);
            history.push(logs);

            tokio::task::yield_now().await;
        }

        guard.complete();
        observer.on_train_end();

        let last = history.last().copied();
        Ok(TrainingReport {
            epochs_completed: history.len(),
            final_loss: last.map_or(f64::NAN, |l| l.loss),
            final_validation_loss: last.and_then(|l| l.validation_loss),
            history,
        })
    }

    /// Score the trained model on `test`.
    pub fn evaluate(&self, test: &SampleSet) -> Result<EvaluationMetrics, EngineError> {
        let model = self.trained_model()?;
        if test.is_empty() {
            return Err(EngineError::NoEvaluationData);
        }
        check_geometry("test set", self.window_size, self.horizon, test)?;

        let eval = model
            .evaluate(test.inputs.view(), test.targets.view())
            .map_err(EngineError::InferenceFailed)?;

        Ok(EvaluationMetrics {
            samples: test.len(),
            loss: eval.loss,
            mean_squared_error: eval.mean_squared_error,
            root_mean_squared_error: eval.mean_squared_error.sqrt(),
            mean_absolute_error: eval.mean_absolute_error,
        })
    }

    /// Forecast `horizon` denormalized returns from the latest window of
    /// normalized returns (oldest first).
    pub fn predict(&self, window: &[f64]) -> Result<ForecastResult, EngineError> {
        let model = self.trained_model()?;
        if window.len() != self.window_size {
            return Err(EngineError::InsufficientHistory {
                expected: self.window_size,
                actual: window.len(),
            });
        }

        let input = Array2::from_shape_fn((1, window.len()), |(_, c)| window[c]);
        let output = model.predict(input.view()).map_err(EngineError::InferenceFailed)?;
        if output.dim() != (1, self.horizon) {
            return Err(EngineError::InferenceFailed(RegressorError::ShapeMismatch {
                expected: (1, self.horizon),
                actual: output.dim(),
            }));
        }

        let returns = output
            .row(0)
            .iter()
            .map(|&v| inverse_transform(v, &self.params))
            .collect();
        Ok(ForecastResult::new(returns))
    }

    /// Compound `forecast` onto `last_price`.
    pub fn project_prices(last_price: f64, forecast: &ForecastResult) -> Vec<f64> {
        project_prices(last_price, forecast)
    }

    /// Release the model. The engine returns to `Idle`.
    pub fn dispose(&mut self) {
        self.model = None;
        self.state = EngineState::Idle;
    }

    fn trained_model(&self) -> Result<&dyn Regressor, EngineError> {
        match (&self.model, self.state) {
            (Some(model), EngineState::Trained) => Ok(model.as_ref()),
            _ => Err(EngineError::ModelNotTrained),
        }
    }
}

/// A regressor that reports a NaN or infinite loss has not trained.
fn finite_loss(epoch: usize, loss: f64) -> Result<(), EngineError> {
    if loss.is_finite() {
        Ok(())
    } else {
        Err(EngineError::TrainingFailed {
            epoch,
            source: RegressorError::Diverged { loss },
        })
    }
}

fn check_geometry(
    what: &'static str,
    window_size: usize,
    horizon: usize,
    set: &SampleSet,
) -> Result<(), EngineError> {
    if set.window_size() != window_size {
        return Err(EngineError::ShapeMismatch {
            what,
            expected: window_size,
            actual: set.window_size(),
        });
    }
    if set.horizon() != horizon {
        return Err(EngineError::ShapeMismatch {
            what,
            expected: horizon,
            actual: set.horizon(),
        });
    }
    Ok(())
}

/// Holds the engine in `Training`; falls back to `Built` unless completed.
struct TrainingGuard<'a> {
    state: &'a mut EngineState,
}

impl<'a> TrainingGuard<'a> {
    fn enter(state: &'a mut EngineState) -> Self {
        *state = EngineState::Training;
        Self { state }
    }

    fn complete(&mut self) {
        *self.state = EngineState::Trained;
    }
}

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        if *self.state == EngineState::Training {
            *self.state = EngineState::Built;
        }
    }
}
