//! ForecastLab Runner — training and forecasting on prepared datasets.
//!
//! This crate builds on `forecastlab-core` to provide:
//! - Validated TOML configuration
//! - The regressor contract and a recurrent (Elman) implementation
//! - The forecast engine lifecycle: build, train, evaluate, predict
//! - Epoch observers for progress reporting
//! - Pipeline sessions binding one dataset to one engine
//! - Source fetching (HTTP or file) and synthetic series

pub mod config;
pub mod engine;
pub mod fetch;
pub mod model;
pub mod observer;
pub mod session;
pub mod synthetic;

pub use config::{ArchitectureConfig, ConfigError, ForecastConfig, TrainingConfig, WindowConfig};
pub use engine::{EngineError, EngineState, EvaluationMetrics, ForecastEngine, TrainingReport};
pub use fetch::{fetch_text, FetchError, SourceLocator};
pub use model::{
    RecurrentBuilder, RecurrentRegressor, Regressor, RegressorBuilder, RegressorError,
    RegressorEvaluation,
};
pub use observer::{
    EpochLogs, FnObserver, HistoryObserver, LoggingObserver, NoopObserver, TrainingObserver,
};
pub use session::{Forecast, ForecastDay, PipelineSession, RunOutcome, SessionError};
pub use synthetic::{synthetic_csv, synthetic_points};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<ForecastConfig>();
        assert_sync::<ForecastConfig>();
    }

    #[test]
    fn engine_and_session_are_send() {
        assert_send::<ForecastEngine>();
        assert_send::<PipelineSession>();
    }

    #[test]
    fn reports_are_send_sync() {
        assert_send::<TrainingReport>();
        assert_sync::<TrainingReport>();
        assert_send::<Forecast>();
        assert_sync::<Forecast>();
        assert_send::<EvaluationMetrics>();
        assert_sync::<EvaluationMetrics>();
    }

    #[test]
    fn recurrent_regressor_is_send_sync() {
        assert_send::<RecurrentRegressor>();
        assert_sync::<RecurrentRegressor>();
        assert_sync::<RecurrentBuilder>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<SessionError>();
        assert_sync::<SessionError>();
        assert_send::<EngineError>();
        assert_sync::<EngineError>();
    }
}
