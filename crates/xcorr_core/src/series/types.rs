//! Result series and its persisted form.

use serde::{Deserialize, Serialize};

use super::store::SnapshotError;

/// One accepted window: when, how far apart, how similar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSample {
    /// Fractional year of the window start.
    pub epoch: f64,
    /// Signed lag in samples (positive = channel A lags channel B).
    pub lag_samples: i64,
    /// Normalized correlation at the lag, within [-1, 1].
    pub correlation: f64,
}

/// Chronologically ordered correlation samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesResult {
    sample_rate: f64,
    samples: Vec<CorrelationSample>,
}

impl SeriesResult {
    /// Empty series whose lags are expressed at `sample_rate` Hz.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            samples: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: CorrelationSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[CorrelationSample] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &CorrelationSample> {
        self.samples.iter()
    }

    /// Lag of a sample in milliseconds.
    pub fn lag_ms(&self, sample: &CorrelationSample) -> f64 {
        sample.lag_samples as f64 / self.sample_rate * 1000.0
    }

    pub fn lags(&self) -> Vec<i64> {
        self.samples.iter().map(|s| s.lag_samples).collect()
    }

    pub fn correlations(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.correlation).collect()
    }

    pub fn epochs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.epoch).collect()
    }

    /// Split into the parallel-array form that is written to disk.
    pub fn to_snapshot(&self) -> SeriesSnapshot {
        SeriesSnapshot {
            lags: self.lags(),
            correlations: self.correlations(),
            epochs: self.epochs(),
            sample_rate: self.sample_rate,
        }
    }

    /// Rebuild a series from its persisted form.
    pub fn from_snapshot(snapshot: SeriesSnapshot) -> Result<Self, SnapshotError> {
        snapshot.check_lengths()?;
        let samples = snapshot
            .epochs
            .iter()
            .zip(&snapshot.lags)
            .zip(&snapshot.correlations)
            .map(|((&epoch, &lag_samples), &correlation)| CorrelationSample {
                epoch,
                lag_samples,
                correlation,
            })
            .collect();
        Ok(Self {
            sample_rate: snapshot.sample_rate,
            samples,
        })
    }
}

fn default_sample_rate() -> f64 {
    crate::analysis::DEFAULT_TARGET_RATE
}

/// Three equal-length parallel arrays plus the rate the lags refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub lags: Vec<i64>,
    pub correlations: Vec<f64>,
    pub epochs: Vec<f64>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

impl SeriesSnapshot {
    fn check_lengths(&self) -> Result<(), SnapshotError> {
        if self.lags.len() != self.correlations.len() || self.lags.len() != self.epochs.len() {
            return Err(SnapshotError::Inconsistent {
                lags: self.lags.len(),
                correlations: self.correlations.len(),
                epochs: self.epochs.len(),
            });
        }
        Ok(())
    }
}
