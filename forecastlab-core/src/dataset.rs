//! PreparedDataset — every derived buffer of one load, built in one call.
//!
//! Returns, normalization bounds, the normalized series and the window
//! tensors are computed together from a validated price series and are never
//! patched afterwards. Loading new data means building a new
//! `PreparedDataset` and dropping the old one whole; bounds fitted on one
//! series can therefore never be applied to another.

use tracing::info;

use crate::data::parse::{parse_series, ParseReport};
use crate::domain::{DatasetHash, PricePoint};
use crate::error::PipelineError;
use crate::normalize::{transform, NormalizationParams};
use crate::returns::compute_returns;
use crate::summary::SeriesSummary;
use crate::window::{build_windows, WindowSpec, WindowSplit};

#[derive(Debug, Clone)]
pub struct PreparedDataset {
    spec: WindowSpec,
    points: Vec<PricePoint>,
    returns: Vec<f64>,
    params: NormalizationParams,
    normalized: Vec<f64>,
    split: WindowSplit,
    hash: DatasetHash,
    summary: SeriesSummary,
    report: ParseReport,
}

impl PreparedDataset {
    /// Parse raw `date;price` text and prepare it.
    pub fn from_text(text: &str, spec: WindowSpec) -> Result<Self, PipelineError> {
        let parsed = parse_series(text)?;
        let mut dataset = Self::prepare(parsed.points, spec)?;
        dataset.report = parsed.report;
        Ok(dataset)
    }

    /// Prepare an already parsed series.
    ///
    /// The series must be strictly ascending by date with valid prices.
    pub fn prepare(points: Vec<PricePoint>, spec: WindowSpec) -> Result<Self, PipelineError> {
        spec.validate()?;
        validate_series(&points)?;

        let returns = compute_returns(&points)?;
        let params = NormalizationParams::fit(&returns)?;
        let normalized = transform(&returns, &params);
        let split = build_windows(&normalized, &spec)?;
        let hash = DatasetHash::of_series(&points);
        let summary = SeriesSummary::compute(&points, &returns).ok_or(
            PipelineError::EmptySeries {
                required: 2,
                actual: 0,
            },
        )?;

        info!(
            dataset = hash.short(),
            points = points.len(),
            samples = split.total_samples,
            train = split.train.len(),
            test = split.test.len(),
            "prepared dataset"
        );

        Ok(Self {
            spec,
            points,
            returns,
            params,
            normalized,
            split,
            hash,
            summary,
            report: ParseReport::default(),
        })
    }

    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn params(&self) -> &NormalizationParams {
        &self.params
    }

    pub fn normalized(&self) -> &[f64] {
        &self.normalized
    }

    pub fn split(&self) -> &WindowSplit {
        &self.split
    }

    pub fn hash(&self) -> &DatasetHash {
        &self.hash
    }

    pub fn summary(&self) -> &SeriesSummary {
        &self.summary
    }

    /// Row-level outcome of the parse (empty for [`Self::prepare`]).
    pub fn parse_report(&self) -> &ParseReport {
        &self.report
    }

    pub fn last_point(&self) -> &PricePoint {
        // prepare() rejects series with fewer than two points.
        &self.points[self.points.len() - 1]
    }

    /// The most recent `window_size` normalized returns, the input for a
    /// forecast past the end of the series.
    pub fn latest_window(&self) -> &[f64] {
        let start = self.normalized.len() - self.spec.window_size;
        &self.normalized[start..]
    }
}

fn validate_series(points: &[PricePoint]) -> Result<(), PipelineError> {
    for (index, point) in points.iter().enumerate() {
        if !point.is_valid() {
            return Err(PipelineError::InvalidSeries {
                index,
                reason: format!("price {} is not a positive number", point.price),
            });
        }
        if index > 0 && points[index - 1].date >= point.date {
            return Err(PipelineError::InvalidSeries {
                index,
                reason: format!(
                    "date {} does not follow {}",
                    point.date,
                    points[index - 1].date
                ),
            });
        }
    }
    Ok(())
}
