//! End-to-end scenarios for the preparation pipeline:
//! text → points → returns → normalized → windows → split.

use chrono::NaiveDate;
use forecastlab_core::{
    build_windows, compute_returns, parse_series, transform, NormalizationParams, PipelineError,
    PreparedDataset, RowError, WindowSpec,
};

fn csv_text(prices: &[f64]) -> String {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut text = String::from("Datum;Schlusskurs\n");
    for (i, price) in prices.iter().enumerate() {
        let date = start + chrono::Duration::days(i as i64);
        text.push_str(&format!("{};{}\n", date.format("%d.%m.%Y"), price));
    }
    text
}

fn increasing_prices(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

#[test]
fn seventy_increasing_rows_yield_five_windows_split_four_one() {
    // GIVEN a CSV with a header and 70 strictly increasing prices 100..169
    let text = csv_text(&increasing_prices(70));

    // WHEN the series is parsed
    let parsed = parse_series(&text).unwrap();

    // THEN all 70 points survive in date order
    assert_eq!(parsed.points.len(), 70);
    assert_eq!(parsed.points[0].price, 100.0);
    assert_eq!(parsed.points[69].price, 169.0);

    // AND there are 69 positive returns
    let returns = compute_returns(&parsed.points).unwrap();
    assert_eq!(returns.len(), 69);
    assert!(returns.iter().all(|r| *r > 0.0));

    // AND windowing with W=60, H=5 gives 69 - 60 - 5 + 1 = 5 samples
    let params = NormalizationParams::fit(&returns).unwrap();
    let normalized = transform(&returns, &params);
    let split = build_windows(&normalized, &WindowSpec::new(60, 5, 0.2)).unwrap();
    assert_eq!(split.total_samples, 5);

    // AND the 80/20 cut gives 4 train and 1 test sample
    assert_eq!(split.train.len(), 4);
    assert_eq!(split.test.len(), 1);
    assert_eq!(split.train.inputs.dim(), (4, 60));
    assert_eq!(split.train.targets.dim(), (4, 5));
    assert_eq!(split.test.start_indices, vec![4]);
}

#[test]
fn geometric_prices_give_equal_returns() {
    let prices: Vec<f64> = (0..70).map(|i| 100.0 * 1.01f64.powi(i)).collect();
    let parsed = parse_series(&csv_text(&prices)).unwrap();
    let returns = compute_returns(&parsed.points).unwrap();

    assert_eq!(returns.len(), 69);
    for r in &returns {
        assert!((r - 0.01).abs() < 1e-9);
    }
}

#[test]
fn sixty_four_points_cannot_fit_default_window() {
    // 64 prices → 63 returns, and even 64 returns would give 64 - 60 - 5 + 1 = 0.
    let text = csv_text(&increasing_prices(64));
    let err = parse_series(&text).unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientData { points: 64, .. }));

    let returns: Vec<f64> = vec![0.5; 64];
    let err = build_windows(&returns, &WindowSpec::new(60, 5, 0.2)).unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientWindow { returns: 64, .. }));
}

#[test]
fn malformed_row_in_the_middle_does_not_abort_the_load() {
    let mut text = csv_text(&increasing_prices(70));
    let insert_at = text.find("05.01.2024").unwrap();
    text.insert_str(insert_at, "bad-date;abc\n");

    let parsed = parse_series(&text).unwrap();
    assert_eq!(parsed.points.len(), 70);
    assert_eq!(parsed.report.skipped.len(), 1);
    assert_eq!(parsed.report.skipped[0].error, RowError::BadPrice("abc".into()));
}

#[test]
fn shuffled_input_rows_are_sorted_before_windowing() {
    let text = csv_text(&increasing_prices(80));
    let mut lines: Vec<&str> = text.lines().collect();
    let header = lines.remove(0);
    lines.reverse();
    let reversed = format!("{header}\n{}\n", lines.join("\n"));

    let forward = PreparedDataset::from_text(&text, WindowSpec::default()).unwrap();
    let backward = PreparedDataset::from_text(&reversed, WindowSpec::default()).unwrap();

    assert_eq!(forward.points(), backward.points());
    assert_eq!(forward.hash(), backward.hash());
    assert_eq!(forward.split(), backward.split());
}

#[test]
fn prepared_dataset_reports_skipped_rows() {
    let mut text = csv_text(&increasing_prices(70));
    text.push_str("31.12.2030;-1\n");
    let ds = PreparedDataset::from_text(&text, WindowSpec::default()).unwrap();
    assert_eq!(ds.parse_report().rows_read, 71);
    assert_eq!(ds.parse_report().rows_accepted, 70);
    assert_eq!(ds.summary().last_price, 169.0);
}
