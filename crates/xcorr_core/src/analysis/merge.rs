//! Merging of per-location traces into single contiguous runs.

use std::collections::BTreeMap;

use crate::waveform::{secs_between, Trace};

use super::types::{AlignError, AlignResult};

/// Relative tolerance when comparing sample rates.
const RATE_TOLERANCE: f64 = 1e-9;

/// Merge traces that share a location into one trace each.
///
/// Gaps are zero-filled. Where traces overlap the earlier data is kept.
/// Output is ordered by location.
pub fn merge_by_location(traces: Vec<Trace>) -> AlignResult<Vec<Trace>> {
    let mut groups: BTreeMap<String, Vec<Trace>> = BTreeMap::new();
    for trace in traces.into_iter().filter(|t| !t.is_empty()) {
        groups.entry(trace.location.clone()).or_default().push(trace);
    }

    groups.into_values().map(merge_group).collect()
}

fn merge_group(mut group: Vec<Trace>) -> AlignResult<Trace> {
    group.sort_by_key(|t| t.start);

    let mut pieces = group.into_iter();
    let Some(mut merged) = pieces.next() else {
        return Err(AlignError::insufficient("empty trace group"));
    };

    for piece in pieces {
        if (piece.sample_rate - merged.sample_rate).abs() > RATE_TOLERANCE * merged.sample_rate {
            return Err(AlignError::IncompatibleTraces(format!(
                "location '{}' mixes {} Hz and {} Hz",
                merged.location, merged.sample_rate, piece.sample_rate
            )));
        }

        // Index the piece's first sample would take in the merged run.
        let offset = (secs_between(piece.start, merged.start) * merged.sample_rate).round() as i64;
        let current = merged.samples.len() as i64;

        if offset > current {
            let gap = (offset - current) as usize;
            tracing::debug!(
                "Zero-filling {} sample gap at location '{}'",
                gap,
                merged.location
            );
            merged.samples.resize(merged.samples.len() + gap, 0.0);
            merged.samples.extend_from_slice(&piece.samples);
        } else {
            let overlap = (current - offset) as usize;
            if overlap < piece.samples.len() {
                merged.samples.extend_from_slice(&piece.samples[overlap..]);
            }
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_instant;
    use chrono::Duration;

    #[test]
    fn gap_is_zero_filled() {
        let t0 = parse_instant("2020-001").unwrap();
        let traces = vec![
            Trace::new("00", 1.0, t0 + Duration::seconds(5), vec![4.0, 5.0]),
            Trace::new("00", 1.0, t0, vec![1.0, 2.0, 3.0]),
        ];
        let merged = merge_by_location(traces).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, t0);
        assert_eq!(merged[0].samples, vec![1.0, 2.0, 3.0, 0.0, 0.0, 4.0, 5.0]);
    }

    #[test]
    fn overlap_keeps_earlier_samples() {
        let t0 = parse_instant("2020-001").unwrap();
        let traces = vec![
            Trace::new("10", 1.0, t0, vec![1.0, 2.0, 3.0]),
            Trace::new("10", 1.0, t0 + Duration::seconds(2), vec![9.0, 4.0]),
        ];
        let merged = merge_by_location(traces).unwrap();
        assert_eq!(merged[0].samples, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn locations_are_kept_apart_and_sorted() {
        let t0 = parse_instant("2020-001").unwrap();
        let traces = vec![
            Trace::new("10", 1.0, t0, vec![1.0]),
            Trace::new("00", 1.0, t0, vec![2.0]),
        ];
        let merged = merge_by_location(traces).unwrap();
        let locations: Vec<_> = merged.iter().map(|t| t.location.as_str()).collect();
        assert_eq!(locations, vec!["00", "10"]);
    }

    #[test]
    fn mixed_rates_are_rejected() {
        let t0 = parse_instant("2020-001").unwrap();
        let traces = vec![
            Trace::new("00", 20.0, t0, vec![1.0; 20]),
            Trace::new("00", 40.0, t0 + Duration::seconds(2), vec![1.0; 40]),
        ];
        assert!(matches!(
            merge_by_location(traces),
            Err(AlignError::IncompatibleTraces(_))
        ));
    }

    #[test]
    fn empty_traces_are_dropped() {
        let t0 = parse_instant("2020-001").unwrap();
        let merged = merge_by_location(vec![Trace::new("00", 1.0, t0, vec![])]).unwrap();
        assert!(merged.is_empty());
    }
}
