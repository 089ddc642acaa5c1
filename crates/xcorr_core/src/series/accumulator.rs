//! The scan loop: fetch, align and correlate every window of a schedule.

use std::path::PathBuf;

use thiserror::Error;

use crate::analysis::{
    align, estimate_lag, AlignConfig, AlignError, Alignment, CorrelationError, LagEstimate,
};
use crate::fetch::{FetchError, WindowFetcher};
use crate::models::{ChannelPair, TimeWindow, WindowSchedule};
use crate::waveform::RawStream;

use super::store::{SnapshotError, SnapshotStore};
use super::types::{CorrelationSample, SeriesResult};

/// Whether a run computes the series or reuses a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Walk the schedule and persist the result.
    #[default]
    Compute,
    /// Skip the loop and load the snapshot stored under the output key.
    LoadSnapshot,
}

/// Fatal run errors. Per-window failures never reach this type.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Run cancelled after {completed} window(s)")]
    Cancelled { completed: usize },

    #[error("No snapshot for '{key}' at {}", .path.display())]
    MissingSnapshot { key: String, path: PathBuf },

    #[error("Snapshot error for '{key}': {source}")]
    Snapshot {
        key: String,
        #[source]
        source: SnapshotError,
    },
}

impl RunError {
    fn snapshot(key: &str, source: SnapshotError) -> Self {
        match source {
            SnapshotError::NotFound(path) => Self::MissingSnapshot {
                key: key.to_string(),
                path,
            },
            source => Self::Snapshot {
                key: key.to_string(),
                source,
            },
        }
    }
}

/// Why a window produced no sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// One or both channels returned no samples.
    NoData { channels: Vec<String> },
    Alignment(AlignError),
    Correlation(CorrelationError),
    /// The compute task panicked.
    Worker(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoData { channels } => write!(f, "no data for {}", channels.join(", ")),
            SkipReason::Alignment(e) => write!(f, "alignment failed: {}", e),
            SkipReason::Correlation(e) => write!(f, "correlation failed: {}", e),
            SkipReason::Worker(e) => write!(f, "compute task failed: {}", e),
        }
    }
}

/// Result of processing one window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    Appended(CorrelationSample),
    Skipped(SkipReason),
}

/// Bookkeeping for a finished run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub attempted: usize,
    pub appended: usize,
    pub skipped: Vec<(TimeWindow, SkipReason)>,
    /// True when the series came from a snapshot.
    pub loaded: bool,
}

/// Everything a run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub key: String,
    pub series: SeriesResult,
    pub summary: RunSummary,
    pub snapshot_path: PathBuf,
}

/// What to scan and how.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub pair: ChannelPair,
    pub schedule: WindowSchedule,
    pub align: AlignConfig,
    pub max_lag_samples: usize,
    /// Overrides the default `{net}_{sta}_{net}_{sta}` snapshot key.
    pub output_key: Option<String>,
}

impl ScanConfig {
    /// Key the snapshot is stored under.
    pub fn key(&self) -> String {
        self.output_key
            .clone()
            .unwrap_or_else(|| self.pair.default_key())
    }
}

/// Drives the window loop and owns the series being built.
pub struct Accumulator {
    fetcher: WindowFetcher,
    store: SnapshotStore,
    config: ScanConfig,
    mode: RunMode,
}

impl Accumulator {
    pub fn new(
        fetcher: WindowFetcher,
        store: SnapshotStore,
        config: ScanConfig,
        mode: RunMode,
    ) -> Self {
        Self {
            fetcher,
            store,
            config,
            mode,
        }
    }

    /// Execute the run according to the configured mode.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let key = self.config.key();
        match self.mode {
            RunMode::LoadSnapshot => self.load(key),
            RunMode::Compute => self.compute(key).await,
        }
    }

    fn load(&self, key: String) -> Result<RunReport, RunError> {
        let series = self
            .store
            .load(&key)
            .map_err(|e| RunError::snapshot(&key, e))?;
        let snapshot_path = self
            .store
            .path_for(&key)
            .map_err(|e| RunError::snapshot(&key, e))?;

        let summary = RunSummary {
            appended: series.len(),
            loaded: true,
            ..RunSummary::default()
        };
        Ok(RunReport {
            key,
            series,
            summary,
            snapshot_path,
        })
    }

    async fn compute(&self, key: String) -> Result<RunReport, RunError> {
        // Reject a bad key before spending time on the scan.
        self.store
            .path_for(&key)
            .map_err(|e| RunError::snapshot(&key, e))?;

        let schedule = &self.config.schedule;
        if schedule.skip_widened() {
            tracing::warn!(
                "Skip interval is shorter than the window; stepping by {} s instead",
                schedule.step().num_seconds()
            );
        }

        tracing::info!(
            "Scanning {} vs {} over {} window(s) from {} to {}",
            self.config.pair.a,
            self.config.pair.b,
            schedule.len(),
            schedule.start(),
            schedule.end()
        );

        let mut series = SeriesResult::new(self.config.align.target_rate);
        let mut summary = RunSummary::default();
        let cancel = self.fetcher.cancel_handle();

        for window in schedule.windows() {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled {
                    completed: summary.attempted,
                });
            }

            let outcome = self.process_window(&window).await.map_err(|_| {
                RunError::Cancelled {
                    completed: summary.attempted,
                }
            })?;
            summary.attempted += 1;

            match outcome {
                WindowOutcome::Appended(sample) => {
                    series.push(sample);
                    summary.appended += 1;
                }
                WindowOutcome::Skipped(reason) => {
                    tracing::warn!("Skipping {}: {}", window, reason);
                    summary.skipped.push((window, reason));
                }
            }
        }

        let snapshot_path = self
            .store
            .save(&key, &series)
            .map_err(|e| RunError::snapshot(&key, e))?;

        tracing::info!(
            "Scan finished: {} appended, {} skipped of {} window(s)",
            summary.appended,
            summary.skipped.len(),
            summary.attempted
        );

        Ok(RunReport {
            key,
            series,
            summary,
            snapshot_path,
        })
    }

    /// Fetch both channels for one window and reduce them to a sample.
    ///
    /// Only cancellation is returned as an error.
    pub async fn process_window(&self, window: &TimeWindow) -> Result<WindowOutcome, FetchError> {
        let pair = &self.config.pair;
        let (stream_a, stream_b) = tokio::join!(
            self.fetcher.fetch(&pair.a, window),
            self.fetcher.fetch(&pair.b, window)
        );
        let (stream_a, stream_b) = (stream_a?, stream_b?);

        let missing: Vec<String> = [&stream_a, &stream_b]
            .into_iter()
            .filter(|s| s.is_empty())
            .map(|s| s.channel.to_string())
            .collect();
        if !missing.is_empty() {
            return Ok(WindowOutcome::Skipped(SkipReason::NoData { channels: missing }));
        }

        // Filtering, resampling and the FFTs are CPU-bound.
        let align_config = self.config.align.clone();
        let max_lag = self.config.max_lag_samples;
        let reduced = tokio::task::spawn_blocking(move || {
            correlate_streams(&stream_a, &stream_b, &align_config, max_lag)
        })
        .await;

        if self.fetcher.cancel_handle().is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let (alignment, estimate) = match reduced {
            Ok(Ok(result)) => result,
            Ok(Err(reason)) => return Ok(WindowOutcome::Skipped(reason)),
            Err(e) => return Ok(WindowOutcome::Skipped(SkipReason::Worker(e.to_string()))),
        };

        tracing::info!(
            "{} | raw offset {:.3} s | lag {} samples ({:.1} ms) | cc {:.3}",
            window,
            alignment.raw_offset_secs,
            estimate.lag_samples,
            estimate.lag_ms(),
            estimate.correlation
        );

        Ok(WindowOutcome::Appended(CorrelationSample {
            epoch: window.epoch(),
            lag_samples: estimate.lag_samples,
            correlation: estimate.correlation,
        }))
    }
}

/// Align two fetched streams and estimate their lag.
fn correlate_streams(
    stream_a: &RawStream,
    stream_b: &RawStream,
    config: &AlignConfig,
    max_lag_samples: usize,
) -> Result<(Alignment, LagEstimate), SkipReason> {
    let alignment = align(stream_a, stream_b, config).map_err(SkipReason::Alignment)?;
    let estimate =
        estimate_lag(&alignment.pair, max_lag_samples).map_err(SkipReason::Correlation)?;
    Ok((alignment, estimate))
}
