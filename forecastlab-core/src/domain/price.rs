//! PricePoint — one daily observation of the series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closing price for a single calendar day.
///
/// A parsed series holds these sorted strictly ascending by `date`, with
/// `price` finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }

    /// True when the price can take part in a return computation.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}
