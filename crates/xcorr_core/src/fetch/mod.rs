//! Remote waveform retrieval.
//!
//! # Architecture
//!
//! 1. **Source** ([`WaveformSource`]): one remote request for one channel and
//!    time range. Distinguishes "no data" from every other failure.
//!
//! 2. **Retry** (`retry`): bounded-attempt combinator with a classifier and
//!    exponential backoff, cancellable at any await point.
//!
//! 3. **Fetcher** ([`WindowFetcher`]): applies the retry policy to a source and
//!    degrades no-data and exhausted retries to an empty stream so the scan
//!    loop can continue.
//!
//! [`TimeseriesClient`] is the HTTP implementation of the source; it speaks
//! GeoCSV (`geocsv`).

mod fetcher;
pub mod geocsv;
mod retry;
mod timeseries;

pub use fetcher::{FetchError, FetchOutcome, WindowFetcher};
pub use retry::{retry, ErrorClass, RetryOutcome, RetryPolicy};
pub use timeseries::{TimeseriesClient, DEFAULT_TIMESERIES_URL};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::ChannelSpec;
use crate::waveform::RawStream;

/// Errors raised by a single source request.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source confirmed it holds no samples for the request.
    #[error("No data available for {channel} from {start} to {end}")]
    NoData {
        channel: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Any other failure; worth another attempt.
    #[error("Transient fetch error: {0}")]
    Transient(String),

    /// The response arrived but could not be decoded.
    #[error("Malformed response: {0}")]
    Malformed(#[from] geocsv::GeoCsvError),
}

impl SourceError {
    /// Create a no-data error.
    pub fn no_data(channel: &ChannelSpec, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::NoData {
            channel: channel.to_string(),
            start,
            end,
        }
    }

    /// Create a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// Retry classification: only confirmed absence of data is terminal.
    pub fn class(&self) -> ErrorClass {
        match self {
            SourceError::NoData { .. } => ErrorClass::Terminal,
            SourceError::Transient(_) | SourceError::Malformed(_) => ErrorClass::Retryable,
        }
    }
}

/// A remote service that returns raw samples for a channel and time range.
#[async_trait]
pub trait WaveformSource: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &str;

    /// Fetch all traces for `channel` between `start` and `end`.
    async fn get_waveforms(
        &self,
        channel: &ChannelSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RawStream, SourceError>;
}
