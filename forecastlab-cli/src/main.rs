//! ForecastLab CLI — inspect a price series, train and forecast, generate data.
//!
//! Commands:
//! - `inspect` — load a series and report its summary, skipped rows and split
//! - `forecast` — train the recurrent model and forecast the next days
//! - `synth` — write a deterministic synthetic `Date;Price` series
//!
//! Logs go to stderr (`RUST_LOG` overrides the default `forecastlab=info`);
//! tables and JSON go to stdout.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use forecastlab_core::PreparedDataset;
use forecastlab_runner::{
    fetch_text, synthetic_csv, EpochLogs, ForecastConfig, LoggingObserver, PipelineSession,
    RecurrentBuilder, RunOutcome, SourceLocator, TrainingObserver,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "forecastlab",
    about = "ForecastLab CLI — multi-step price forecasting from daily series"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a series and report its summary without training.
    Inspect {
        /// File path or http(s) URL of a `date;price` series.
        #[arg(long)]
        source: String,

        /// Path to a TOML config file (window settings decide the split).
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Train the model on a series and forecast past its last date.
    Forecast {
        /// File path or http(s) URL of a `date;price` series.
        #[arg(long)]
        source: String,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Also write the full outcome as JSON to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a deterministic synthetic series.
    Synth {
        /// Label that seeds the random walk.
        #[arg(long, default_value = "SYNTH")]
        label: String,

        /// Number of trading days.
        #[arg(long, default_value_t = 500)]
        days: usize,

        /// First calendar date (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01")]
        start: String,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Command-line overrides applied on top of the config file.
#[derive(Args, Debug, Default, Clone)]
struct Overrides {
    #[arg(long)]
    window_size: Option<usize>,
    #[arg(long)]
    horizon: Option<usize>,
    #[arg(long)]
    test_fraction: Option<f64>,
    #[arg(long)]
    epochs: Option<usize>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    learning_rate: Option<f64>,
    #[arg(long)]
    hidden_units: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

impl Overrides {
    fn apply(&self, config: &mut ForecastConfig) {
        if let Some(v) = self.window_size {
            config.window.window_size = v;
        }
        if let Some(v) = self.horizon {
            config.window.horizon = v;
        }
        if let Some(v) = self.test_fraction {
            config.window.test_fraction = v;
        }
        if let Some(v) = self.epochs {
            config.training.epochs = v;
        }
        if let Some(v) = self.batch_size {
            config.training.batch_size = v;
        }
        if let Some(v) = self.learning_rate {
            config.training.learning_rate = v;
        }
        if let Some(v) = self.hidden_units {
            config.architecture.hidden_units = v;
        }
        if let Some(v) = self.seed {
            config.training.seed = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("forecastlab=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            source,
            config,
            overrides,
            json,
        } => run_inspect(&source, config.as_deref(), &overrides, json).await,
        Commands::Forecast {
            source,
            config,
            overrides,
            json,
            output,
        } => run_forecast(&source, config.as_deref(), &overrides, json, output.as_deref()).await,
        Commands::Synth {
            label,
            days,
            start,
            output,
        } => run_synth(&label, days, &start, output.as_deref()),
    }
}

fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<ForecastConfig> {
    let mut config = match path {
        Some(p) => ForecastConfig::from_file(p)
            .with_context(|| format!("loading config {}", p.display()))?,
        None => ForecastConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn run_inspect(
    source: &str,
    config_path: Option<&Path>,
    overrides: &Overrides,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let text = fetch_text(source).await?;
    let dataset = PreparedDataset::from_text(&text, config.window_spec())?;

    if json {
        let value = serde_json::json!({
            "dataset_hash": dataset.hash(),
            "summary": dataset.summary(),
            "parse_report": dataset.parse_report(),
            "normalization": dataset.params(),
            "samples": {
                "total": dataset.split().total_samples,
                "train": dataset.split().train.len(),
                "test": dataset.split().test.len(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let summary = dataset.summary();
    let report = dataset.parse_report();
    let split = dataset.split();
    println!("Source:        {source}");
    println!("Dataset:       {}", dataset.hash().short());
    println!(
        "Rows:          {} read, {} accepted, {} skipped, {} duplicate dates",
        report.rows_read,
        report.rows_accepted,
        report.skipped.len(),
        report.duplicates_dropped
    );
    println!(
        "Range:         {} to {} ({} points)",
        summary.first_date, summary.last_date, summary.points
    );
    println!(
        "Price:         last {:.4}, min {:.4}, max {:.4}, total return {:+.2}%",
        summary.last_price,
        summary.min_price,
        summary.max_price,
        summary.total_return * 100.0
    );
    println!(
        "Daily return:  mean {:+.4}%, std dev {:.4}%",
        summary.mean_return * 100.0,
        summary.return_std_dev * 100.0
    );
    println!(
        "Samples:       {} total, {} train, {} test (window {}, horizon {})",
        split.total_samples,
        split.train.len(),
        split.test.len(),
        config.window.window_size,
        config.window.horizon
    );

    if !report.skipped.is_empty() {
        println!();
        println!("{:<8} Reason", "Line");
        println!("{}", "-".repeat(40));
        for row in report.skipped.iter().take(20) {
            println!("{:<8} {}", row.line, row.error);
        }
        if report.skipped.len() > 20 {
            println!("... and {} more", report.skipped.len() - 20);
        }
    }

    Ok(())
}

async fn run_forecast(
    source: &str,
    config_path: Option<&Path>,
    overrides: &Overrides,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let builder = Arc::new(RecurrentBuilder::from_training(&config.training));
    let epochs = config.training.epochs;

    let mut session =
        PipelineSession::from_source(&SourceLocator::parse(source), config, builder).await?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current epoch");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let mut observer = (
        LoggingObserver::default(),
        ProgressObserver {
            total_epochs: epochs,
            quiet: json,
        },
    );
    let outcome = session.run(&mut observer, Some(cancel.as_ref())).await?;

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&outcome)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "outcome written");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    let forecast = &outcome.forecast;
    println!();
    println!(
        "Dataset {}: last close {:.4} on {}",
        forecast.dataset_hash.short(),
        forecast.last_price,
        forecast.last_date
    );
    println!(
        "Training: {} epochs, final loss {:.6}",
        outcome.training.epochs_completed, outcome.training.final_loss
    );
    match &outcome.evaluation {
        Some(eval) => println!(
            "Test set: {} samples, MSE {:.6}, RMSE {:.6}, MAE {:.6} (normalized)",
            eval.samples,
            eval.mean_squared_error,
            eval.root_mean_squared_error,
            eval.mean_absolute_error
        ),
        None => println!("Test set: empty, no evaluation"),
    }
    println!();
    println!("{:<6} {:>12} {:>14}", "Day", "Return", "Price");
    println!("{}", "-".repeat(34));
    for day in &forecast.days {
        println!(
            "{:<6} {:>+11.4}% {:>14.4}",
            format!("+{}", day.step),
            day.predicted_return * 100.0,
            day.projected_price
        );
    }
}

fn run_synth(label: &str, days: usize, start: &str, output: Option<&Path>) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start '{start}', expected YYYY-MM-DD"))?;
    let text = synthetic_csv(label, start, days);

    match output {
        Some(path) => {
            std::fs::write(path, &text).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {days} days of '{label}' to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Prints one line per epoch to stderr.
struct ProgressObserver {
    total_epochs: usize,
    quiet: bool,
}

impl TrainingObserver for ProgressObserver {
    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs) {
        if self.quiet {
            return;
        }
        match logs.validation_loss {
            Some(val) => eprintln!(
                "epoch {:>4}/{}  loss {:.6}  val_loss {:.6}",
                epoch + 1,
                self.total_epochs,
                logs.loss,
                val
            ),
            None => eprintln!(
                "epoch {:>4}/{}  loss {:.6}",
                epoch + 1,
                self.total_epochs,
                logs.loss
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_replace_config_values() {
        let overrides = Overrides {
            window_size: Some(20),
            horizon: Some(3),
            epochs: Some(7),
            seed: Some(99),
            ..Default::default()
        };
        let config = load_config(None, &overrides).unwrap();
        assert_eq!(config.window.window_size, 20);
        assert_eq!(config.window.horizon, 3);
        assert_eq!(config.training.epochs, 7);
        assert_eq!(config.training.seed, 99);
        assert_eq!(config.training.batch_size, 32);
    }

    #[test]
    fn invalid_override_fails_validation() {
        let overrides = Overrides {
            test_fraction: Some(2.0),
            ..Default::default()
        };
        assert!(load_config(None, &overrides).is_err());
    }

    #[test]
    fn forecast_args_parse() {
        let cli = Cli::try_parse_from([
            "forecastlab",
            "forecast",
            "--source",
            "prices.csv",
            "--epochs",
            "5",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Forecast {
                source,
                overrides,
                json,
                ..
            } => {
                assert_eq!(source, "prices.csv");
                assert_eq!(overrides.epochs, Some(5));
                assert!(json);
            }
            _ => panic!("expected forecast"),
        }
    }
}
