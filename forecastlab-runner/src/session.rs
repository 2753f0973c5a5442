//! Pipeline session: one loaded dataset plus the engine trained on it.
//!
//! Every load produces a fresh [`PreparedDataset`] and a fresh engine bound
//! to that dataset's normalization. A reload replaces both together, or
//! neither when the new data fails to prepare, so a model is never used
//! with parameters fitted to a different series.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::NaiveDate;
use forecastlab_core::{DatasetHash, PipelineError, PreparedDataset, SeriesSummary};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, ForecastConfig};
use crate::engine::{EngineError, EvaluationMetrics, ForecastEngine, TrainingReport};
use crate::fetch::{FetchError, SourceLocator};
use crate::model::RegressorBuilder;
use crate::observer::TrainingObserver;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// One forecast step past the end of the series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// 1-based step after the last observed date.
    pub step: usize,
    pub predicted_return: f64,
    pub projected_price: f64,
}

/// A forecast tagged with the dataset it was produced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub dataset_hash: DatasetHash,
    pub last_date: NaiveDate,
    pub last_price: f64,
    pub days: Vec<ForecastDay>,
}

impl Forecast {
    pub fn returns(&self) -> Vec<f64> {
        self.days.iter().map(|d| d.predicted_return).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.days.iter().map(|d| d.projected_price).collect()
    }
}

/// Everything one end-to-end run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub training: TrainingReport,
    /// `None` when the chronological split left no test samples.
    pub evaluation: Option<EvaluationMetrics>,
    pub forecast: Forecast,
}

pub struct PipelineSession {
    config: ForecastConfig,
    builder: Arc<dyn RegressorBuilder>,
    dataset: PreparedDataset,
    engine: ForecastEngine,
}

impl std::fmt::Debug for PipelineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineSession")
            .field("config", &self.config)
            .field("dataset", &self.dataset.hash())
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl PipelineSession {
    /// Prepare `text` under `config` and bind a fresh engine to it.
    pub fn from_text(
        text: &str,
        config: ForecastConfig,
        builder: Arc<dyn RegressorBuilder>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let dataset = PreparedDataset::from_text(text, config.window_spec())?;
        let engine = ForecastEngine::new(Arc::clone(&builder), *dataset.params());
        Ok(Self {
            config,
            builder,
            dataset,
            engine,
        })
    }

    /// Fetch the series behind `source`, then as [`Self::from_text`].
    pub async fn from_source(
        source: &SourceLocator,
        config: ForecastConfig,
        builder: Arc<dyn RegressorBuilder>,
    ) -> Result<Self, SessionError> {
        let text = source.fetch_text().await?;
        info!(%source, bytes = text.len(), "series fetched");
        Self::from_text(&text, config, builder)
    }

    /// Replace the dataset with `text`. The previous model is discarded.
    ///
    /// On error the session is left exactly as it was.
    pub fn reload(&mut self, text: &str) -> Result<(), SessionError> {
        let dataset = match PreparedDataset::from_text(text, self.config.window_spec()) {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    error = %e,
                    dataset = self.dataset.hash().short(),
                    "reload failed, keeping current dataset"
                );
                return Err(e.into());
            }
        };

        self.engine.dispose();
        self.engine = ForecastEngine::new(Arc::clone(&self.builder), *dataset.params());
        self.dataset = dataset;
        Ok(())
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn dataset(&self) -> &PreparedDataset {
        &self.dataset
    }

    pub fn engine(&self) -> &ForecastEngine {
        &self.engine
    }

    pub fn summary(&self) -> &SeriesSummary {
        self.dataset.summary()
    }

    pub fn build_model(&mut self) -> Result<(), SessionError> {
        let spec = self.dataset.spec();
        self.engine
            .build(spec.window_size, spec.horizon, &self.config.architecture)?;
        Ok(())
    }

    /// Train on the training split, validating on the test split.
    pub async fn train(
        &mut self,
        observer: &mut dyn TrainingObserver,
        cancel: Option<&AtomicBool>,
    ) -> Result<TrainingReport, SessionError> {
        let split = self.dataset.split();
        let report = self
            .engine
            .train(
                &split.train,
                Some(&split.test),
                self.config.training.epochs,
                self.config.training.batch_size,
                observer,
                cancel,
            )
            .await?;
        Ok(report)
    }

    /// Score the trained model on the test split.
    pub fn evaluate(&self) -> Result<EvaluationMetrics, SessionError> {
        Ok(self.engine.evaluate(&self.dataset.split().test)?)
    }

    /// Forecast past the last observed date from the latest window.
    pub fn forecast(&self) -> Result<Forecast, SessionError> {
        let result = self.engine.predict(self.dataset.latest_window())?;
        let last = self.dataset.last_point();
        let prices = ForecastEngine::project_prices(last.price, &result);

        let days = result
            .returns
            .iter()
            .zip(prices)
            .enumerate()
            .map(|(i, (&predicted_return, projected_price))| ForecastDay {
                step: i + 1,
                predicted_return,
                projected_price,
            })
            .collect();

        Ok(Forecast {
            dataset_hash: self.dataset.hash().clone(),
            last_date: last.date,
            last_price: last.price,
            days,
        })
    }

    /// Build, train, evaluate (when there is a test split) and forecast.
    pub async fn run(
        &mut self,
        observer: &mut dyn TrainingObserver,
        cancel: Option<&AtomicBool>,
    ) -> Result<RunOutcome, SessionError> {
        self.build_model()?;
        let training = self.train(observer, cancel).await?;
        let evaluation = if self.dataset.split().test.is_empty() {
            None
        } else {
            Some(self.evaluate()?)
        };
        let forecast = self.forecast()?;

        info!(
            dataset = self.dataset.hash().short(),
            final_loss = training.final_loss,
            horizon = forecast.days.len(),
            "forecast ready"
        );

        Ok(RunOutcome {
            training,
            evaluation,
            forecast,
        })
    }
}
