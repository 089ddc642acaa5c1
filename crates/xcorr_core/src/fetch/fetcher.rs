//! Window fetcher: one channel, one window, bounded retries.

use std::sync::Arc;

use thiserror::Error;

use crate::cancel::CancelHandle;
use crate::models::{ChannelSpec, TimeWindow};
use crate::waveform::RawStream;

use super::retry::{retry, RetryOutcome, RetryPolicy};
use super::{SourceError, WaveformSource};

/// The only failure a fetch surfaces to its caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    #[error("Fetch cancelled")]
    Cancelled,
}

/// Tagged result of a fetch, before it is degraded to a stream.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The source returned a stream (possibly with no samples).
    Data(RawStream),
    /// The source confirmed there is no data for the window.
    NoData,
    /// Every attempt failed with a transient error.
    Exhausted { attempts: u32, last_error: SourceError },
}

/// Retrieves fixed-duration sample windows from a [`WaveformSource`].
///
/// Holds no per-window state, so one fetcher serves the whole scan.
#[derive(Clone)]
pub struct WindowFetcher {
    source: Arc<dyn WaveformSource>,
    policy: RetryPolicy,
    cancel: CancelHandle,
}

impl WindowFetcher {
    pub fn new(source: Arc<dyn WaveformSource>, policy: RetryPolicy, cancel: CancelHandle) -> Self {
        Self {
            source,
            policy,
            cancel,
        }
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    /// Fetch a window, reporting how the attempt sequence ended.
    pub async fn fetch_outcome(
        &self,
        channel: &ChannelSpec,
        window: &TimeWindow,
    ) -> Result<FetchOutcome, FetchError> {
        let start = window.start();
        let end = window.end();

        let outcome = retry(&self.policy, &self.cancel, SourceError::class, |attempt| {
            tracing::trace!(
                "{}: requesting {} {} (attempt {})",
                self.source.name(),
                channel,
                window,
                attempt
            );
            self.source.get_waveforms(channel, start, end)
        })
        .await;

        match outcome {
            RetryOutcome::Success(stream) => Ok(FetchOutcome::Data(stream)),
            RetryOutcome::Terminal(_) => Ok(FetchOutcome::NoData),
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => Ok(FetchOutcome::Exhausted {
                attempts,
                last_error,
            }),
            RetryOutcome::Cancelled => Err(FetchError::Cancelled),
        }
    }

    /// Fetch a window, degrading no-data and exhausted retries to an empty stream.
    ///
    /// Only cancellation is returned as an error.
    pub async fn fetch(
        &self,
        channel: &ChannelSpec,
        window: &TimeWindow,
    ) -> Result<RawStream, FetchError> {
        match self.fetch_outcome(channel, window).await? {
            FetchOutcome::Data(stream) => {
                tracing::debug!(
                    "Fetched {} trace(s), {} samples for {} {}",
                    stream.traces.len(),
                    stream.sample_count(),
                    channel,
                    window
                );
                Ok(stream)
            }
            FetchOutcome::NoData => {
                tracing::info!("No data available for {} {}", channel, window);
                Ok(RawStream::empty(channel.clone()))
            }
            FetchOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                tracing::error!(
                    "Giving up on {} {} after {} attempts: {}",
                    channel,
                    window,
                    attempts,
                    last_error
                );
                Ok(RawStream::empty(channel.clone()))
            }
        }
    }
}
