//! Deterministic synthetic price series for demos and tests.
//!
//! A label seeds a random walk of daily returns in ±3%, starting at 100 and
//! skipping weekends. Same label, start and length always give the same
//! series.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use forecastlab_core::data::DATE_FORMAT;
use forecastlab_core::PricePoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `days` trading days of synthetic prices starting on or after `start`.
pub fn synthetic_points(label: &str, start: NaiveDate, days: usize) -> Vec<PricePoint> {
    let seed = blake3::hash(label.as_bytes());
    let mut rng = StdRng::from_seed(*seed.as_bytes());

    let mut points = Vec::with_capacity(days);
    let mut price = 100.0_f64;
    let mut current = start;

    while points.len() < days {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += Duration::days(1);
            continue;
        }
        points.push(PricePoint::new(current, price));
        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        price *= 1.0 + daily_return;
        current += Duration::days(1);
    }
    points
}

/// Synthetic series rendered as `Date;Price` text with `DD.MM.YYYY` dates.
pub fn synthetic_csv(label: &str, start: NaiveDate, days: usize) -> String {
    let mut out = String::from("Date;Price\n");
    for point in synthetic_points(label, start, days) {
        out.push_str(&format!(
            "{};{:.4}\n",
            point.date.format(DATE_FORMAT),
            point.price
        ));
    }
    out
}
