//! Tabular reporting of a finished series.
//!
//! Plotting happens elsewhere; this module writes the numbers a plot needs
//! and logs a one-line summary.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::series::SeriesResult;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode report: {0}")]
    Csv(#[from] csv::Error),
}

/// Aggregate figures of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub count: usize,
    pub mean_lag_ms: f64,
    pub min_lag_ms: f64,
    pub max_lag_ms: f64,
    pub mean_correlation: f64,
}

impl SeriesSummary {
    /// Summarize a series. Returns `None` when it holds no samples.
    pub fn of(series: &SeriesResult) -> Option<Self> {
        if series.is_empty() {
            return None;
        }

        let lags: Vec<f64> = series.iter().map(|s| series.lag_ms(s)).collect();
        let count = lags.len();
        let mean_lag_ms = lags.iter().sum::<f64>() / count as f64;
        let min_lag_ms = lags.iter().copied().fold(f64::INFINITY, f64::min);
        let max_lag_ms = lags.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean_correlation = series.iter().map(|s| s.correlation).sum::<f64>() / count as f64;

        Some(Self {
            count,
            mean_lag_ms,
            min_lag_ms,
            max_lag_ms,
            mean_correlation,
        })
    }
}

/// Renders a series under an output name.
pub trait SeriesReporter {
    /// Emit the report, returning the path written (if any).
    fn report(&self, output: &str, series: &SeriesResult) -> Result<Option<PathBuf>, ReportError>;
}

#[derive(Serialize)]
struct Row {
    epoch: f64,
    lag_samples: i64,
    lag_ms: f64,
    correlation: f64,
}

/// Writes `{output}.csv` into a directory.
#[derive(Debug, Clone)]
pub struct CsvReporter {
    dir: PathBuf,
}

impl CsvReporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SeriesReporter for CsvReporter {
    fn report(&self, output: &str, series: &SeriesResult) -> Result<Option<PathBuf>, ReportError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.csv", output));

        let mut writer = csv::Writer::from_path(&path)?;
        for sample in series.iter() {
            writer.serialize(Row {
                epoch: sample.epoch,
                lag_samples: sample.lag_samples,
                lag_ms: series.lag_ms(sample),
                correlation: sample.correlation,
            })?;
        }
        writer.flush()?;

        match SeriesSummary::of(series) {
            Some(summary) => tracing::info!(
                "{}: {} sample(s), lag mean {:.1} ms (min {:.1}, max {:.1}), mean cc {:.3}",
                output,
                summary.count,
                summary.mean_lag_ms,
                summary.min_lag_ms,
                summary.max_lag_ms,
                summary.mean_correlation
            ),
            None => tracing::warn!("{}: series is empty, report has no rows", output),
        }

        Ok(Some(path))
    }
}
