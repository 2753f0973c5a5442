//! Simple returns over adjacent prices.

use crate::domain::PricePoint;
use crate::error::PipelineError;

/// `r[i] = (p[i+1] - p[i]) / p[i]` for every adjacent pair.
///
/// The result has one element fewer than `prices`. Fails with
/// `EmptySeries` when there is no pair to difference.
pub fn compute_returns(prices: &[PricePoint]) -> Result<Vec<f64>, PipelineError> {
    if prices.len() < 2 {
        return Err(PipelineError::EmptySeries {
            required: 2,
            actual: prices.len(),
        });
    }
    Ok(prices
        .windows(2)
        .map(|w| (w[1].price - w[0].price) / w[0].price)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(prices: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint::new(start + chrono::Duration::days(i as i64), p))
            .collect()
    }

    #[test]
    fn returns_are_relative_changes() {
        let r = compute_returns(&series(&[100.0, 110.0, 99.0])).unwrap();
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.10).abs() < 1e-12);
        assert!((r[1] - (-0.10)).abs() < 1e-12);
    }

    #[test]
    fn flat_prices_give_zero_returns() {
        let r = compute_returns(&series(&[50.0; 4])).unwrap();
        assert_eq!(r, vec![0.0; 3]);
    }

    #[test]
    fn single_point_is_empty_series() {
        let err = compute_returns(&series(&[100.0])).unwrap_err();
        assert_eq!(err, PipelineError::EmptySeries { required: 2, actual: 1 });
    }

    #[test]
    fn no_points_is_empty_series() {
        assert!(matches!(
            compute_returns(&[]),
            Err(PipelineError::EmptySeries { actual: 0, .. })
        ));
    }
}
