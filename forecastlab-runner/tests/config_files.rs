//! Config loading from disk and source fetching from files.

use std::io::Write;

use chrono::NaiveDate;
use forecastlab_runner::{synthetic_csv, ConfigError, FetchError, ForecastConfig, SourceLocator};

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[window]
window_size = 30
horizon = 4

[training]
epochs = 12
seed = 7

[architecture]
hidden_units = 16
"#
    )
    .unwrap();

    let config = ForecastConfig::from_file(file.path()).unwrap();
    assert_eq!(config.window.window_size, 30);
    assert_eq!(config.window.horizon, 4);
    assert_eq!(config.training.epochs, 12);
    assert_eq!(config.training.seed, 7);
    assert_eq!(config.architecture.hidden_units, 16);
    assert_eq!(config.window.test_fraction, 0.2);
}

#[test]
fn missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ForecastConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn invalid_horizon_in_file_is_out_of_range() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[window]\nhorizon = 0\n").unwrap();
    let err = ForecastConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::OutOfRange {
            field: "window.horizon",
            ..
        }
    ));
}

#[tokio::test]
async fn synthetic_series_round_trips_through_a_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acme.csv");
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let text = synthetic_csv("ACME", start, 70);
    std::fs::write(&path, &text).unwrap();

    let fetched = SourceLocator::File(path).fetch_text().await.unwrap();
    assert_eq!(fetched, text);
}

#[tokio::test]
async fn unreachable_source_is_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SourceLocator::parse(dir.path().join("gone.csv").to_str().unwrap())
        .fetch_text()
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Io { .. }));
}
