//! Validated forecast configuration.
//!
//! Every tunable of a run lives in one serializable struct, loadable from
//! TOML. Missing sections and fields fall back to defaults; every value is
//! range-checked by [`ForecastConfig::validate`] before it reaches the
//! pipeline or the engine.

use std::path::Path;

use forecastlab_core::WindowSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Complete configuration of one forecast run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub window: WindowConfig,
    pub training: TrainingConfig,
    pub architecture: ArchitectureConfig,
}

/// `[window]` — sample geometry and the chronological split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub window_size: usize,
    pub horizon: usize,
    pub test_fraction: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        let spec = WindowSpec::default();
        Self {
            window_size: spec.window_size,
            horizon: spec.horizon,
            test_fraction: spec.test_fraction,
        }
    }
}

/// `[training]` — optimisation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Global gradient-norm ceiling per mini-batch.
    pub gradient_clip: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.01,
            gradient_clip: 1.0,
            seed: 42,
        }
    }
}

/// `[architecture]` — regressor width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchitectureConfig {
    pub hidden_units: usize,
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        Self { hidden_units: 32 }
    }
}

impl ForecastConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec::new(
            self.window.window_size,
            self.window.horizon,
            self.window.test_fraction,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_usize("window.window_size", self.window.window_size, 1, 1_000, "1..=1000")?;
        check_usize("window.horizon", self.window.horizon, 1, 60, "1..=60")?;
        check_f64(
            "window.test_fraction",
            self.window.test_fraction,
            |v| (0.0..=1.0).contains(&v),
            "0.0..=1.0",
        )?;

        check_usize("training.epochs", self.training.epochs, 1, 10_000, "1..=10000")?;
        check_usize("training.batch_size", self.training.batch_size, 1, 4_096, "1..=4096")?;
        check_f64(
            "training.learning_rate",
            self.training.learning_rate,
            |v| v > 0.0 && v <= 10.0,
            "0.0 < lr <= 10.0",
        )?;
        check_f64(
            "training.gradient_clip",
            self.training.gradient_clip,
            |v| v > 0.0,
            "> 0.0",
        )?;

        check_usize(
            "architecture.hidden_units",
            self.architecture.hidden_units,
            1,
            1_024,
            "1..=1024",
        )?;
        Ok(())
    }
}

fn check_usize(
    field: &'static str,
    value: usize,
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        })
    }
}

fn check_f64(
    field: &'static str,
    value: f64,
    ok: impl Fn(f64) -> bool,
    expected: &'static str,
) -> Result<(), ConfigError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_surface() {
        let config = ForecastConfig::default();
        assert_eq!(config.window.window_size, 60);
        assert_eq!(config.window.horizon, 5);
        assert_eq!(config.window.test_fraction, 0.2);
        assert_eq!(config.training.batch_size, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = ForecastConfig::from_toml(
            r#"
[training]
epochs = 5

[window]
horizon = 3
"#,
        )
        .unwrap();

        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.window.horizon, 3);
        assert_eq!(config.window.window_size, 60);
        assert_eq!(config.architecture.hidden_units, 32);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ForecastConfig::from_toml("").unwrap(), ForecastConfig::default());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = ForecastConfig::from_toml("[window]\nwindow_size = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "window.window_size",
                ..
            }
        ));

        let err = ForecastConfig::from_toml("[window]\ntest_fraction = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("window.test_fraction"));

        let err = ForecastConfig::from_toml("[training]\nlearning_rate = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("training.learning_rate"));

        let mut config = ForecastConfig::default();
        config.training.gradient_clip = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = ForecastConfig::from_toml("[training\nepochs = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn window_spec_mirrors_window_section() {
        let mut config = ForecastConfig::default();
        config.window.window_size = 20;
        config.window.horizon = 2;
        config.window.test_fraction = 0.1;
        assert_eq!(config.window_spec(), WindowSpec::new(20, 2, 0.1));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = ForecastConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(ForecastConfig::from_toml(&text).unwrap(), config);
    }
}
