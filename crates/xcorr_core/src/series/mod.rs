//! Series accumulation and persistence.
//!
//! [`Accumulator`] walks a [`WindowSchedule`](crate::models::WindowSchedule),
//! turning each window into at most one [`CorrelationSample`]. Windows that
//! fail to fetch, align or correlate are logged and skipped; only
//! cancellation and snapshot failures end a run early. The finished series
//! is written through [`SnapshotStore`].

mod accumulator;
mod store;
mod types;

pub use accumulator::{
    Accumulator, RunError, RunMode, RunReport, RunSummary, ScanConfig, SkipReason, WindowOutcome,
};
pub use store::{SnapshotError, SnapshotResult, SnapshotStore, SNAPSHOT_EXTENSION};
pub use types::{CorrelationSample, SeriesResult, SeriesSnapshot};
