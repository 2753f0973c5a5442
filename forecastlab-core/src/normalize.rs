//! Min/max normalization of returns into [0, 1] and its exact inverse.
//!
//! The functions here are stateless. Whoever prepares a dataset owns the
//! [`NormalizationParams`] and must hand the same instance to
//! [`inverse_transform`] when turning predictions back into returns.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PipelineError;

/// Bounds of the full return series of one dataset load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    min: f64,
    max: f64,
}

impl NormalizationParams {
    /// Explicit bounds. Fails when `min > max` or either bound is not finite.
    pub fn new(min: f64, max: f64) -> Result<Self, PipelineError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(PipelineError::InvalidParams { min, max });
        }
        Ok(Self { min, max })
    }

    /// Min and max over the whole series, computed once per dataset.
    pub fn fit(values: &[f64]) -> Result<Self, PipelineError> {
        if values.is_empty() {
            return Err(PipelineError::EmptySeries {
                required: 1,
                actual: 0,
            });
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let params = Self::new(min, max)?;
        if params.is_degenerate() {
            warn!(value = min, "constant return series, using unit normalization range");
        }
        Ok(params)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// True when every fitted value was identical.
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// `max - min`, or 1.0 for a degenerate series.
    pub fn range(&self) -> f64 {
        if self.is_degenerate() {
            1.0
        } else {
            self.max - self.min
        }
    }

    pub fn transform_value(&self, x: f64) -> f64 {
        (x - self.min) / self.range()
    }

    pub fn inverse_value(&self, v: f64) -> f64 {
        v * self.range() + self.min
    }
}

/// Map every value into [0, 1] with the given bounds.
pub fn transform(values: &[f64], params: &NormalizationParams) -> Vec<f64> {
    values.iter().map(|&x| params.transform_value(x)).collect()
}

/// Exact algebraic inverse of [`transform`] for a single value.
pub fn inverse_transform(value: f64, params: &NormalizationParams) -> f64 {
    params.inverse_value(value)
}
