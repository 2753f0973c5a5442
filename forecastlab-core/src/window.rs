//! Sliding windows with multi-step targets and a chronological train/test cut.
//!
//! Sample `i` uses `series[i .. i+W]` as input and `series[i+W .. i+W+H]` as
//! target. Samples overlap (stride 1). The split is a single cut index: every
//! sample before it trains, every sample from it on tests, and nothing is
//! shuffled, so no test window starts before a train window.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const DEFAULT_WINDOW_SIZE: usize = 60;
pub const DEFAULT_HORIZON: usize = 5;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Window geometry and split fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub window_size: usize,
    pub horizon: usize,
    pub test_fraction: f64,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            horizon: DEFAULT_HORIZON,
            test_fraction: DEFAULT_TEST_FRACTION,
        }
    }
}

impl WindowSpec {
    pub fn new(window_size: usize, horizon: usize, test_fraction: f64) -> Self {
        Self {
            window_size,
            horizon,
            test_fraction,
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window_size == 0 {
            return Err(PipelineError::InvalidSpec("window_size must be >= 1".into()));
        }
        if self.horizon == 0 {
            return Err(PipelineError::InvalidSpec("horizon must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.test_fraction) {
            return Err(PipelineError::InvalidSpec(format!(
                "test_fraction must be in [0, 1], got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }

    /// `max(0, len - W - H + 1)`.
    pub fn sample_count(&self, len: usize) -> usize {
        (len + 1).saturating_sub(self.window_size + self.horizon)
    }

    /// `floor(total * (1 - test_fraction))`, clamped to `total`.
    pub fn split_index(&self, total: usize) -> usize {
        let cut = (total as f64 * (1.0 - self.test_fraction)).floor();
        (cut.max(0.0) as usize).min(total)
    }
}

/// A block of samples: one row per window.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    /// `n × window_size`.
    pub inputs: Array2<f64>,
    /// `n × horizon`.
    pub targets: Array2<f64>,
    /// Index into the source series where each window starts.
    pub start_indices: Vec<usize>,
}

impl SampleSet {
    pub fn empty(window_size: usize, horizon: usize) -> Self {
        Self {
            inputs: Array2::zeros((0, window_size)),
            targets: Array2::zeros((0, horizon)),
            start_indices: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window_size(&self) -> usize {
        self.inputs.ncols()
    }

    pub fn horizon(&self) -> usize {
        self.targets.ncols()
    }
}

/// Train and test partitions of one windowed series.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSplit {
    pub train: SampleSet,
    pub test: SampleSet,
    pub total_samples: usize,
    pub split_index: usize,
}

/// Slice `series` into windows/targets and cut them chronologically.
///
/// Fails with `InsufficientWindow` when not even one sample fits. An empty
/// train or test partition (split at 0 or at `total`) is a valid result.
pub fn build_windows(series: &[f64], spec: &WindowSpec) -> Result<WindowSplit, PipelineError> {
    spec.validate()?;

    let total = spec.sample_count(series.len());
    if total == 0 {
        return Err(PipelineError::InsufficientWindow {
            returns: series.len(),
            window_size: spec.window_size,
            horizon: spec.horizon,
        });
    }

    let split_index = spec.split_index(total);

    Ok(WindowSplit {
        train: slice_samples(series, spec, 0, split_index),
        test: slice_samples(series, spec, split_index, total),
        total_samples: total,
        split_index,
    })
}

fn slice_samples(series: &[f64], spec: &WindowSpec, start: usize, end: usize) -> SampleSet {
    let w = spec.window_size;
    let h = spec.horizon;
    let n = end - start;

    if n == 0 {
        return SampleSet::empty(w, h);
    }

    SampleSet {
        inputs: Array2::from_shape_fn((n, w), |(row, col)| series[start + row + col]),
        targets: Array2::from_shape_fn((n, h), |(row, col)| series[start + row + w + col]),
        start_indices: (start..end).collect(),
    }
}
