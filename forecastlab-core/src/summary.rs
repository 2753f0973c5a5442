//! Summary statistics of a loaded series for the presentation layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::PricePoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub points: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// (last - first) / first.
    pub total_return: f64,
    pub mean_return: f64,
    /// Sample standard deviation of daily returns (0.0 with fewer than 2 returns).
    pub return_std_dev: f64,
}

impl SeriesSummary {
    /// `None` for an empty series.
    pub fn compute(points: &[PricePoint], returns: &[f64]) -> Option<Self> {
        let first = points.first()?;
        let last = points.last()?;

        let min_price = points.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
        let max_price = points
            .iter()
            .map(|p| p.price)
            .fold(f64::NEG_INFINITY, f64::max);

        let n = returns.len() as f64;
        let mean_return = if returns.is_empty() {
            0.0
        } else {
            returns.iter().sum::<f64>() / n
        };
        let return_std_dev = if returns.len() < 2 {
            0.0
        } else {
            let var = returns
                .iter()
                .map(|r| (r - mean_return).powi(2))
                .sum::<f64>()
                / (n - 1.0);
            var.sqrt()
        };

        Some(Self {
            points: points.len(),
            first_date: first.date,
            last_date: last.date,
            last_price: last.price,
            min_price,
            max_price,
            total_return: (last.price - first.price) / first.price,
            mean_return,
            return_std_dev,
        })
    }
}
