//! Typed failures of the preparation pipeline.
//!
//! Row-level parse problems are not here: they are absorbed by the parser and
//! reported through [`crate::data::ParseReport`].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("insufficient data: {points} valid price points < minimum {min_points}")]
    InsufficientData { points: usize, min_points: usize },

    #[error("empty series: need at least {required} values, got {actual}")]
    EmptySeries { required: usize, actual: usize },

    #[error(
        "insufficient window: {returns} returns cannot fit window_size {window_size} + horizon {horizon}"
    )]
    InsufficientWindow {
        returns: usize,
        window_size: usize,
        horizon: usize,
    },

    #[error("invalid window spec: {0}")]
    InvalidSpec(String),

    #[error("invalid normalization bounds: min {min} > max {max}")]
    InvalidParams { min: f64, max: f64 },

    #[error("invalid series at index {index}: {reason}")]
    InvalidSeries { index: usize, reason: String },
}
