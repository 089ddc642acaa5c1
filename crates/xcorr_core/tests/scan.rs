//! End-to-end scans against an in-memory waveform source.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use tempfile::tempdir;

use xcorr_core::analysis::AlignConfig;
use xcorr_core::fetch::{RetryPolicy, SourceError, WaveformSource, WindowFetcher};
use xcorr_core::models::parse_instant;
use xcorr_core::series::{RunSummary, SkipReason, SnapshotStore};
use xcorr_core::{
    Accumulator, CancelHandle, ChannelPair, ChannelSpec, RawStream, RunError, RunMode, ScanConfig,
    Trace, WindowSchedule,
};

const RATE: f64 = 20.0;
/// Channel 00 records the same ground motion 50 ms after channel 10.
const DELAY_SECS: f64 = 0.05;

#[derive(Clone, Copy)]
enum Fault {
    NoData,
    Transient,
    Empty,
    /// Serve the data, but request cancellation while doing so.
    Cancel,
}

/// Synthetic microseism source with per-(location, day) faults.
struct SyntheticSource {
    origin: DateTime<Utc>,
    faults: HashMap<(String, u32), Fault>,
    calls: Mutex<Vec<(String, u32)>>,
    cancel: CancelHandle,
}

impl SyntheticSource {
    fn new() -> Self {
        Self {
            origin: parse_instant("2020-001").unwrap(),
            faults: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            cancel: CancelHandle::new(),
        }
    }

    fn cancelling(mut self, handle: CancelHandle) -> Self {
        self.cancel = handle;
        self
    }

    fn with_fault(mut self, location: &str, day: u32, fault: Fault) -> Self {
        self.faults.insert((location.to_string(), day), fault);
        self
    }

    fn calls_for(&self, location: &str, day: u32) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, d)| l == location && *d == day)
            .count()
    }

    fn ground_motion(t: f64) -> f64 {
        (2.0 * PI * t / 6.0).sin()
            + 0.6 * (2.0 * PI * t / 5.0 + 1.0).sin()
            + 0.4 * (2.0 * PI * t / 7.3 + 2.0).sin()
    }
}

#[async_trait]
impl WaveformSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn get_waveforms(
        &self,
        channel: &ChannelSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RawStream, SourceError> {
        let location = channel.location().to_string();
        let day = start.ordinal();
        self.calls.lock().unwrap().push((location.clone(), day));

        match self.faults.get(&(location.clone(), day)) {
            Some(Fault::NoData) => return Err(SourceError::no_data(channel, start, end)),
            Some(Fault::Transient) => return Err(SourceError::transient("HTTP 503")),
            Some(Fault::Empty) => return Ok(RawStream::empty(channel.clone())),
            Some(Fault::Cancel) => self.cancel.cancel(),
            None => {}
        }

        let delay = if location == "00" { DELAY_SECS } else { 0.0 };
        let offset = (start - self.origin).num_milliseconds() as f64 / 1000.0;
        let n = ((end - start).num_seconds() as f64 * RATE) as usize;
        let samples = (0..n)
            .map(|i| Self::ground_motion(offset + i as f64 / RATE - delay))
            .collect();

        Ok(RawStream::new(
            channel.clone(),
            vec![Trace::new(location, RATE, start, samples)],
        ))
    }
}

fn scan_config(output_key: Option<&str>) -> ScanConfig {
    ScanConfig {
        pair: ChannelPair::co_located("XX", "YYYY", "BHZ", "00", "10").unwrap(),
        schedule: WindowSchedule::new(
            parse_instant("2020-001").unwrap(),
            parse_instant("2020-031").unwrap(),
            Duration::days(10),
            Duration::seconds(3600),
        )
        .unwrap(),
        align: AlignConfig {
            // Keeps the test fast; the production default is 1000 Hz.
            target_rate: 100.0,
            ..AlignConfig::default()
        },
        max_lag_samples: 50,
        output_key: output_key.map(str::to_string),
    }
}

fn accumulator(
    source: Arc<SyntheticSource>,
    store: SnapshotStore,
    mode: RunMode,
    cancel: CancelHandle,
) -> Accumulator {
    let fetcher = WindowFetcher::new(source, RetryPolicy::immediate(4), cancel);
    Accumulator::new(fetcher, store, scan_config(None), mode)
}

fn skipped_days(summary: &RunSummary) -> Vec<u32> {
    summary
        .skipped
        .iter()
        .map(|(w, _)| w.start().ordinal())
        .collect()
}

#[tokio::test]
async fn three_windows_produce_three_samples() {
    let dir = tempdir().unwrap();
    let source = Arc::new(SyntheticSource::new());
    let acc = accumulator(
        source,
        SnapshotStore::new(dir.path()),
        RunMode::Compute,
        CancelHandle::new(),
    );

    let report = acc.run().await.unwrap();

    assert_eq!(report.key, "XX_YYYY_XX_YYYY");
    assert_eq!(report.summary.attempted, 3);
    assert_eq!(report.series.len(), 3);

    let epochs = report.series.epochs();
    for (epoch, expected) in epochs.iter().zip([2020.003, 2020.030, 2020.057]) {
        assert!((epoch - expected).abs() < 1e-3, "epoch {}", epoch);
    }

    // 50 ms at 100 Hz.
    assert_eq!(report.series.lags(), vec![5, 5, 5]);
    for cc in report.series.correlations() {
        assert!(cc > 0.95 && cc <= 1.0, "correlation {}", cc);
    }

    assert!(report.snapshot_path.exists());
    assert!(report
        .snapshot_path
        .ends_with("XX_YYYY_XX_YYYY.snapshot.json"));
}

#[tokio::test]
async fn no_data_on_one_channel_skips_window_without_retrying() {
    let dir = tempdir().unwrap();
    let source = Arc::new(SyntheticSource::new().with_fault("10", 11, Fault::NoData));
    let acc = accumulator(
        source.clone(),
        SnapshotStore::new(dir.path()),
        RunMode::Compute,
        CancelHandle::new(),
    );

    let report = acc.run().await.unwrap();

    assert_eq!(report.summary.attempted, 3);
    assert_eq!(report.series.len(), 2);
    assert_eq!(skipped_days(&report.summary), vec![11]);
    assert_eq!(
        report.summary.skipped[0].1,
        SkipReason::NoData {
            channels: vec!["XX.YYYY.10.BHZ".to_string()]
        }
    );
    assert_eq!(source.calls_for("10", 11), 1);
    // The window after the skip is still processed.
    assert_eq!(source.calls_for("10", 21), 1);
}

#[tokio::test]
async fn exhausted_retries_skip_window() {
    let dir = tempdir().unwrap();
    let source = Arc::new(SyntheticSource::new().with_fault("00", 21, Fault::Transient));
    let acc = accumulator(
        source.clone(),
        SnapshotStore::new(dir.path()),
        RunMode::Compute,
        CancelHandle::new(),
    );

    let report = acc.run().await.unwrap();

    assert_eq!(report.series.len(), 2);
    assert_eq!(skipped_days(&report.summary), vec![21]);
    assert_eq!(source.calls_for("00", 21), 4);
}

#[tokio::test]
async fn empty_streams_on_both_channels_are_skipped() {
    let dir = tempdir().unwrap();
    let source = Arc::new(
        SyntheticSource::new()
            .with_fault("00", 1, Fault::Empty)
            .with_fault("10", 1, Fault::Empty),
    );
    let acc = accumulator(
        source,
        SnapshotStore::new(dir.path()),
        RunMode::Compute,
        CancelHandle::new(),
    );

    let report = acc.run().await.unwrap();

    assert_eq!(report.series.len(), 2);
    match &report.summary.skipped[0].1 {
        SkipReason::NoData { channels } => assert_eq!(channels.len(), 2),
        other => panic!("unexpected skip reason {:?}", other),
    }
}

#[tokio::test]
async fn load_without_snapshot_is_fatal() {
    let dir = tempdir().unwrap();
    let source = Arc::new(SyntheticSource::new());
    let acc = accumulator(
        source.clone(),
        SnapshotStore::new(dir.path()),
        RunMode::LoadSnapshot,
        CancelHandle::new(),
    );

    let err = acc.run().await.unwrap_err();
    assert!(matches!(err, RunError::MissingSnapshot { ref key, .. } if key == "XX_YYYY_XX_YYYY"));
    assert!(source.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn loaded_snapshot_matches_computed_series() {
    let dir = tempdir().unwrap();
    let source = Arc::new(SyntheticSource::new().with_fault("10", 11, Fault::NoData));

    let computed = accumulator(
        source.clone(),
        SnapshotStore::new(dir.path()),
        RunMode::Compute,
        CancelHandle::new(),
    )
    .run()
    .await
    .unwrap();

    let loaded = accumulator(
        source,
        SnapshotStore::new(dir.path()),
        RunMode::LoadSnapshot,
        CancelHandle::new(),
    )
    .run()
    .await
    .unwrap();

    assert!(loaded.summary.loaded);
    assert_eq!(loaded.summary.attempted, 0);
    assert_eq!(loaded.series.lags(), computed.series.lags());
    assert_eq!(loaded.series.correlations(), computed.series.correlations());
    assert_eq!(loaded.series.epochs(), computed.series.epochs());
}

#[tokio::test]
async fn cancelled_run_writes_no_snapshot() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());
    let cancel = CancelHandle::new();
    cancel.cancel();

    let acc = accumulator(
        Arc::new(SyntheticSource::new()),
        store.clone(),
        RunMode::Compute,
        cancel,
    );

    let err = acc.run().await.unwrap_err();
    assert!(matches!(err, RunError::Cancelled { completed: 0 }));
    assert!(!store.exists("XX_YYYY_XX_YYYY"));
}

#[tokio::test]
async fn explicit_output_key_names_the_snapshot() {
    let dir = tempdir().unwrap();
    let fetcher = WindowFetcher::new(
        Arc::new(SyntheticSource::new()),
        RetryPolicy::immediate(4),
        CancelHandle::new(),
    );
    let acc = Accumulator::new(
        fetcher,
        SnapshotStore::new(dir.path()),
        scan_config(Some("msey_run")),
        RunMode::Compute,
    );

    let report = acc.run().await.unwrap();
    assert!(report.snapshot_path.ends_with("msey_run.snapshot.json"));
}

#[tokio::test]
async fn cancellation_during_window_drops_its_sample() {
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());
    let cancel = CancelHandle::new();
    // Channel 10 is fetched second, so both streams arrive before the
    // cancellation is observed.
    let source = Arc::new(
        SyntheticSource::new()
            .with_fault("10", 1, Fault::Cancel)
            .cancelling(cancel.clone()),
    );

    let acc = accumulator(source.clone(), store.clone(), RunMode::Compute, cancel);

    let err = acc.run().await.unwrap_err();
    assert!(matches!(err, RunError::Cancelled { completed: 0 }));
    assert_eq!(source.calls_for("00", 1), 1);
    assert_eq!(source.calls_for("10", 1), 1);
    assert!(!store.exists("XX_YYYY_XX_YYYY"));
}
