//! Forecast returns and their projection onto prices.

use serde::{Deserialize, Serialize};

/// Denormalized returns for day+1 … day+horizon, in forecast order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub returns: Vec<f64>,
}

impl ForecastResult {
    pub fn new(returns: Vec<f64>) -> Self {
        Self { returns }
    }

    pub fn horizon(&self) -> usize {
        self.returns.len()
    }

    pub fn project_from(&self, last_price: f64) -> Vec<f64> {
        project_prices(last_price, self)
    }
}

/// Compound the forecast returns onto `last_price`:
/// `price[k] = price[k-1] * (1 + r[k])` with `price[0] = last_price`.
pub fn project_prices(last_price: f64, forecast: &ForecastResult) -> Vec<f64> {
    forecast
        .returns
        .iter()
        .scan(last_price, |price, r| {
            *price *= 1.0 + r;
            Some(*price)
        })
        .collect()
}
