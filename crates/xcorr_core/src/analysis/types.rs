//! Core types for stream alignment and lag estimation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the alignment stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("No trace for location '{location}'")]
    Selection { location: String },

    #[error("Incompatible traces: {0}")]
    IncompatibleTraces(String),
}

impl AlignError {
    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::InsufficientData(message.into())
    }

    pub fn selection(location: impl Into<String>) -> Self {
        Self::Selection {
            location: location.into(),
        }
    }
}

/// Errors from the lag estimator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrelationError {
    #[error("Cannot correlate an empty signal")]
    EmptyInput,

    #[error("Signal has zero energy after demeaning")]
    ZeroEnergy,

    #[error("Signal contains non-finite samples")]
    NonFinite,
}

/// Result type for alignment operations.
pub type AlignResult<T> = Result<T, AlignError>;

/// Two equal-length sample sequences on a shared time base.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    a: Vec<f64>,
    b: Vec<f64>,
    sample_rate: f64,
    start: DateTime<Utc>,
}

impl AlignedPair {
    /// Build a pair. Both sequences must be non-empty and equally long.
    pub fn new(
        a: Vec<f64>,
        b: Vec<f64>,
        sample_rate: f64,
        start: DateTime<Utc>,
    ) -> AlignResult<Self> {
        if a.len() != b.len() {
            return Err(AlignError::insufficient(format!(
                "length mismatch after trim ({} vs {})",
                a.len(),
                b.len()
            )));
        }
        if a.is_empty() {
            return Err(AlignError::insufficient("no overlapping samples"));
        }
        Ok(Self {
            a,
            b,
            sample_rate,
            start,
        })
    }

    pub fn a(&self) -> &[f64] {
        &self.a
    }

    pub fn b(&self) -> &[f64] {
        &self.b
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    /// Always false; construction rejects empty pairs.
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Time of the last shared sample.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + crate::waveform::seconds((self.len() - 1) as f64 / self.sample_rate)
    }
}

/// Outcome of a lag search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagEstimate {
    /// Signed offset in samples (positive = channel A lags channel B).
    pub lag_samples: i64,
    /// Normalized correlation at that lag, within [-1, 1].
    pub correlation: f64,
    /// Sample rate the lag is expressed in.
    pub sample_rate: f64,
}

impl LagEstimate {
    /// Lag in milliseconds.
    pub fn lag_ms(&self) -> f64 {
        self.lag_samples as f64 / self.sample_rate * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_instant;

    #[test]
    fn pair_rejects_length_mismatch() {
        let t = parse_instant("2020-001").unwrap();
        let err = AlignedPair::new(vec![1.0, 2.0], vec![1.0], 1000.0, t).unwrap_err();
        assert!(matches!(err, AlignError::InsufficientData(_)));
    }

    #[test]
    fn pair_rejects_empty() {
        let t = parse_instant("2020-001").unwrap();
        assert!(AlignedPair::new(vec![], vec![], 1000.0, t).is_err());
    }

    #[test]
    fn pair_end_is_last_sample() {
        let t = parse_instant("2020-001").unwrap();
        let pair = AlignedPair::new(vec![0.0; 1001], vec![0.0; 1001], 1000.0, t).unwrap();
        assert_eq!(pair.end(), t + chrono::Duration::seconds(1));
    }

    #[test]
    fn lag_converts_to_milliseconds() {
        let est = LagEstimate {
            lag_samples: -25,
            correlation: 0.9,
            sample_rate: 1000.0,
        };
        assert_eq!(est.lag_ms(), -25.0);
    }
}
