//! ForecastLab Core — price series preparation for multi-step return forecasting.
//!
//! This crate contains the data-to-tensor pipeline:
//! - Series parsing (semicolon-delimited `date;price` text, best-effort rows)
//! - Simple returns over adjacent prices
//! - Min/max normalization with an exact inverse
//! - Sliding windows with multi-step targets and a chronological train/test cut
//! - Price projection by compounding forecast returns
//! - The `PreparedDataset` arena that owns every derived buffer of one load
//!
//! Everything here is pure and synchronous. Model training lives in
//! `forecastlab-runner`.

pub mod data;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod normalize;
pub mod returns;
pub mod summary;
pub mod window;

pub use data::{parse_series, ParseReport, ParsedSeries, RowError, MIN_SERIES_LEN};
pub use dataset::PreparedDataset;
pub use domain::{DatasetHash, PricePoint};
pub use error::PipelineError;
pub use forecast::{project_prices, ForecastResult};
pub use normalize::{inverse_transform, transform, NormalizationParams};
pub use returns::compute_returns;
pub use summary::SeriesSummary;
pub use window::{build_windows, SampleSet, WindowSpec, WindowSplit};
