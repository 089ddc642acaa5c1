//! Stream alignment: shared preprocessing and trimming onto one time base.
//!
//! Each stream goes through the same steps:
//!
//! 1. Band-pass every trace (after demeaning)
//! 2. Merge traces per location, zero-filling gaps
//! 3. Resample to the common target rate
//! 4. Sort by location, then start time
//!
//! The two selected traces are then trimmed to their overlapping span so
//! both carry the same number of samples.

use chrono::{DateTime, Utc};

use crate::waveform::{secs_between, RawStream, Trace};

use super::filtering::{apply_filter, FilterConfig};
use super::merge::merge_by_location;
use super::resample::resample_trace;
use super::types::{AlignError, AlignResult, AlignedPair};

/// Default common sample rate (Hz).
pub const DEFAULT_TARGET_RATE: f64 = 1000.0;

/// Slack when converting an overlap duration to a sample count.
const COUNT_EPSILON: f64 = 1e-6;

/// Preprocessing applied to both streams.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignConfig {
    pub filter: FilterConfig,
    /// Common rate both streams are resampled to (Hz).
    pub target_rate: f64,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            target_rate: DEFAULT_TARGET_RATE,
        }
    }
}

/// Preprocessed traces of one stream.
#[derive(Debug, Clone, Default)]
pub struct TraceSet {
    traces: Vec<Trace>,
}

impl TraceSet {
    /// The trace recorded at `location`, if any.
    pub fn select(&self, location: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.location == location)
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

/// Filter, merge, resample and sort the traces of a stream.
pub fn prepare(stream: &RawStream, config: &AlignConfig) -> AlignResult<TraceSet> {
    if stream.is_empty() {
        return Err(AlignError::insufficient(format!(
            "no samples for {}",
            stream.channel
        )));
    }

    let filtered = stream
        .traces
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| Trace {
            samples: apply_filter(&t.samples, t.sample_rate, &config.filter),
            ..t.clone()
        })
        .collect();

    let mut traces: Vec<Trace> = merge_by_location(filtered)?
        .iter()
        .map(|t| resample_trace(t, config.target_rate))
        .collect();

    traces.sort_by(|x, y| {
        x.location
            .cmp(&y.location)
            .then_with(|| x.start.cmp(&y.start))
    });

    Ok(TraceSet { traces })
}

/// Pair produced by [`align`], with the pre-trim start offset.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub pair: AlignedPair,
    /// `start_A - start_B` in seconds, measured before trimming.
    pub raw_offset_secs: f64,
}

/// Align two single-channel streams.
///
/// The trace for each stream is looked up by the location of the stream's
/// own channel.
pub fn align(
    stream_a: &RawStream,
    stream_b: &RawStream,
    config: &AlignConfig,
) -> AlignResult<Alignment> {
    let set_a = prepare(stream_a, config)?;
    let set_b = prepare(stream_b, config)?;

    let trace_a = set_a
        .select(stream_a.channel.location())
        .ok_or_else(|| AlignError::selection(stream_a.channel.location()))?;
    let trace_b = set_b
        .select(stream_b.channel.location())
        .ok_or_else(|| AlignError::selection(stream_b.channel.location()))?;

    let raw_offset_secs = secs_between(trace_a.start, trace_b.start);
    let pair = align_traces(trace_a, trace_b)?;

    Ok(Alignment {
        pair,
        raw_offset_secs,
    })
}

/// Trim two equally-sampled traces to their overlap.
pub fn align_traces(a: &Trace, b: &Trace) -> AlignResult<AlignedPair> {
    if a.is_empty() || b.is_empty() {
        return Err(AlignError::insufficient("empty trace"));
    }
    let rate = a.sample_rate;
    if (b.sample_rate - rate).abs() > 1e-9 * rate {
        return Err(AlignError::IncompatibleTraces(format!(
            "sample rates differ ({} Hz vs {} Hz)",
            a.sample_rate, b.sample_rate
        )));
    }

    tracing::debug!(
        "Before trim: A {} .. {}, B {} .. {}",
        a.start,
        a.end(),
        b.start,
        b.end()
    );

    let start = a.start.max(b.start);
    let end = a.end().min(b.end());
    let span = secs_between(end, start);
    if span <= 0.0 {
        return Err(AlignError::insufficient(format!(
            "traces do not overlap (A {} .. {}, B {} .. {})",
            a.start,
            a.end(),
            b.start,
            b.end()
        )));
    }

    let count = (span * rate + COUNT_EPSILON).floor() as usize + 1;
    let slice_a = overlap_slice(a, start, count);
    let slice_b = overlap_slice(b, start, count);

    // Rounding can leave the two slices one sample apart.
    let n = slice_a.len().min(slice_b.len());
    let pair = AlignedPair::new(slice_a[..n].to_vec(), slice_b[..n].to_vec(), rate, start)?;

    tracing::debug!(
        "After trim: {} .. {} ({} samples at {} Hz)",
        pair.start(),
        pair.end(),
        pair.len(),
        rate
    );

    Ok(pair)
}

fn overlap_slice(trace: &Trace, start: DateTime<Utc>, count: usize) -> &[f64] {
    let first = (secs_between(start, trace.start) * trace.sample_rate)
        .round()
        .max(0.0) as usize;
    let first = first.min(trace.len());
    let last = first.saturating_add(count).min(trace.len());
    &trace.samples[first..last]
}

impl AlignedPair {
    /// Run an already aligned pair through the trimming step again.
    pub fn realign(&self) -> AlignResult<AlignedPair> {
        let a = Trace::new("a", self.sample_rate(), self.start(), self.a().to_vec());
        let b = Trace::new("b", self.sample_rate(), self.start(), self.b().to_vec());
        align_traces(&a, &b)
    }
}
