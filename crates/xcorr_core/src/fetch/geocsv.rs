//! GeoCSV decoding.
//!
//! A response holds one or more segments. Each segment starts with a block
//! of `# key: value` header lines followed by data lines. Both the
//! sample-list layout (one value per line) and the time-series-pair layout
//! (`time, value`) are accepted: the value is always the last field. Data
//! blocks are read with the `csv` crate; the optional column-title row is
//! skipped. Non-finite samples are rejected.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::parse_instant;
use crate::waveform::Trace;

#[derive(Error, Debug)]
pub enum GeoCsvError {
    #[error("Segment {segment}: missing header '{key}'")]
    MissingHeader { segment: usize, key: &'static str },

    #[error("Segment {segment}: invalid header '{key}': {value}")]
    InvalidHeader {
        segment: usize,
        key: &'static str,
        value: String,
    },

    #[error("Line {line}: cannot parse sample '{text}'")]
    InvalidSample { line: usize, text: String },

    #[error("Malformed data block: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Default)]
struct Segment {
    sid: Option<String>,
    sample_rate: Option<String>,
    start_time: Option<String>,
    sample_count: Option<String>,
    samples: Vec<f64>,
}

impl Segment {
    fn has_header(&self) -> bool {
        self.sid.is_some() || self.sample_rate.is_some() || self.start_time.is_some()
    }

    fn into_trace(self, index: usize, default_location: &str) -> Result<Trace, GeoCsvError> {
        let rate_text = self.sample_rate.ok_or(GeoCsvError::MissingHeader {
            segment: index,
            key: "sample_rate_hz",
        })?;
        let sample_rate: f64 = rate_text
            .parse()
            .ok()
            .filter(|r: &f64| r.is_finite() && *r > 0.0)
            .ok_or_else(|| GeoCsvError::InvalidHeader {
                segment: index,
                key: "sample_rate_hz",
                value: rate_text.clone(),
            })?;

        let start_text = self.start_time.ok_or(GeoCsvError::MissingHeader {
            segment: index,
            key: "start_time",
        })?;
        let start: DateTime<Utc> =
            parse_instant(&start_text).map_err(|_| GeoCsvError::InvalidHeader {
                segment: index,
                key: "start_time",
                value: start_text.clone(),
            })?;

        if let Some(expected) = self.sample_count.and_then(|c| c.parse::<usize>().ok()) {
            if expected != self.samples.len() {
                tracing::warn!(
                    "GeoCSV segment {}: header declares {} samples, found {}",
                    index,
                    expected,
                    self.samples.len()
                );
            }
        }

        let location = self
            .sid
            .as_deref()
            .and_then(location_from_sid)
            .unwrap_or_else(|| default_location.to_string());

        Ok(Trace::new(location, sample_rate, start, self.samples))
    }
}

/// Extract the location code from a source identifier.
///
/// Accepts `NET_STA_LOC_CHA` and `FDSN:NET_STA_LOC_B_S_SS`.
pub fn location_from_sid(sid: &str) -> Option<String> {
    let sid = sid.trim();
    let sid = sid.strip_prefix("FDSN:").unwrap_or(sid);
    let parts: Vec<&str> = sid.split('_').collect();
    if parts.len() < 4 {
        return None;
    }
    Some(parts[2].to_string())
}

/// Data lines of one segment, with their 1-based line numbers in the body.
#[derive(Default)]
struct DataBlock<'a> {
    lines: Vec<(usize, &'a str)>,
}

impl DataBlock<'_> {
    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Decode the last field of every row into a finite sample.
    fn read_samples(&self) -> Result<Vec<f64>, GeoCsvError> {
        let text = self
            .lines
            .iter()
            .map(|(_, line)| *line)
            .collect::<Vec<_>>()
            .join("\n");

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut samples = Vec::with_capacity(self.lines.len());
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let field = record.iter().last().unwrap_or("");
            match field.parse::<f64>() {
                Ok(value) if value.is_finite() => samples.push(value),
                // Column titles such as "Sample" or "Time, Sample".
                Err(_) if row == 0 && is_column_title(field) => {}
                _ => {
                    let line = record
                        .position()
                        .and_then(|p| (p.line() as usize).checked_sub(1))
                        .and_then(|i| self.lines.get(i))
                        .map(|(n, _)| *n)
                        .unwrap_or(0);
                    return Err(GeoCsvError::InvalidSample {
                        line,
                        text: field.to_string(),
                    });
                }
            }
        }
        Ok(samples)
    }
}

fn is_column_title(field: &str) -> bool {
    !field.is_empty() && field.chars().all(|c| c.is_alphabetic() || c == '_')
}

/// Decode a GeoCSV body into traces.
///
/// `default_location` is used for segments without a usable `SID` header.
pub fn parse(body: &str, default_location: &str) -> Result<Vec<Trace>, GeoCsvError> {
    let mut traces = Vec::new();
    let mut current = Segment::default();
    let mut block = DataBlock::default();

    for (idx, raw) in body.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('#') {
            // A header after data starts the next segment.
            if !block.is_empty() {
                let mut finished = std::mem::take(&mut current);
                finished.samples = std::mem::take(&mut block).read_samples()?;
                traces.push(finished.into_trace(traces.len(), default_location)?);
            }
            if let Some((key, value)) = header.split_once(':') {
                let value = value.trim().to_string();
                match key.trim() {
                    "SID" => current.sid = Some(value),
                    "sample_rate_hz" => current.sample_rate = Some(value),
                    "start_time" => current.start_time = Some(value),
                    "sample_count" => current.sample_count = Some(value),
                    _ => {}
                }
            }
            continue;
        }

        block.lines.push((idx + 1, line));
    }

    if !block.is_empty() || current.has_header() {
        current.samples = block.read_samples()?;
        traces.push(current.into_trace(traces.len(), default_location)?);
    }

    Ok(traces)
}
