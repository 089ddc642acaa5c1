//! xcorr core: windowed lag correlation between two co-located channels.
//!
//! This crate holds all scan logic with no command-line concerns: fetching
//! waveform windows, aligning the two streams, estimating their lag,
//! accumulating and persisting the series, and writing reports.

pub mod analysis;
pub mod cancel;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod models;
pub mod report;
pub mod series;
pub mod waveform;

pub use cancel::CancelHandle;
pub use models::{ChannelPair, ChannelSpec, TimeWindow, WindowSchedule};
pub use series::{Accumulator, RunError, RunMode, RunReport, ScanConfig, SeriesResult};
pub use waveform::{RawStream, Trace};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
