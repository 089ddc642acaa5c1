//! Raw waveform containers returned by a data source.

use chrono::{DateTime, Duration, Utc};

use crate::models::ChannelSpec;

/// A contiguous run of evenly-sampled values from one location.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Location identifier the samples belong to.
    pub location: String,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Time of the first sample.
    pub start: DateTime<Utc>,
    /// Sample values.
    pub samples: Vec<f64>,
}

impl Trace {
    pub fn new(
        location: impl Into<String>,
        sample_rate: f64,
        start: DateTime<Utc>,
        samples: Vec<f64>,
    ) -> Self {
        Self {
            location: location.into(),
            sample_rate,
            start,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample interval in seconds.
    pub fn delta(&self) -> f64 {
        1.0 / self.sample_rate
    }

    /// Time of the last sample (equal to `start` for a single-sample trace).
    pub fn end(&self) -> DateTime<Utc> {
        if self.samples.is_empty() {
            return self.start;
        }
        self.start + seconds((self.samples.len() - 1) as f64 * self.delta())
    }

    /// Time one sample past the last one.
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        self.start + seconds(self.samples.len() as f64 * self.delta())
    }
}

/// All traces returned for one channel over one window.
///
/// May be empty when the source has no coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStream {
    pub channel: ChannelSpec,
    pub traces: Vec<Trace>,
}

impl RawStream {
    pub fn new(channel: ChannelSpec, traces: Vec<Trace>) -> Self {
        Self { channel, traces }
    }

    /// Stream with no traces.
    pub fn empty(channel: ChannelSpec) -> Self {
        Self {
            channel,
            traces: Vec::new(),
        }
    }

    /// True when no trace carries any samples.
    pub fn is_empty(&self) -> bool {
        self.traces.iter().all(Trace::is_empty)
    }

    /// Total number of samples across traces.
    pub fn sample_count(&self) -> usize {
        self.traces.iter().map(Trace::len).sum()
    }
}

/// Convert fractional seconds to a chrono duration at microsecond precision.
pub(crate) fn seconds(secs: f64) -> Duration {
    Duration::microseconds((secs * 1_000_000.0).round() as i64)
}

/// Signed difference `a - b` in fractional seconds.
pub(crate) fn secs_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    let delta = a - b;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}
