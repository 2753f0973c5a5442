use serde::{Deserialize, Serialize};
use std::fmt;

use super::price::PricePoint;

/// Content hash of a price series (BLAKE3 over every date and price).
///
/// A trained model and every forecast carry the hash of the dataset they
/// came from, so results from different loads are never confused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of_series(points: &[PricePoint]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(points.len() as u64).to_le_bytes());
        for point in points {
            hasher.update(point.date.to_string().as_bytes());
            hasher.update(&point.price.to_le_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    /// First 12 hex characters, for log lines and tables.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
