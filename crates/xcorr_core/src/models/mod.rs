//! Core data models: channel identifiers and time windows.

mod channel;
mod window;

pub use channel::{ChannelPair, ChannelSpec};
pub use window::{
    duration_from_days, duration_from_secs, fractional_year, parse_instant, TimeWindow,
    WindowSchedule, DEFAULT_SKIP_DAYS,
};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Validation errors for model construction.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Both channels use location '{0}'; two distinct locations are required")]
    SameLocation(String),

    #[error("Window duration must be positive (got {0} ms)")]
    NonPositiveDuration(i64),

    #[error("Skip interval must be positive (got {0} ms)")]
    NonPositiveSkip(i64),

    #[error("End {end} is not after start {start}")]
    EmptyRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("{0} is outside the representable time range")]
    OutOfRange(String),

    #[error("Unrecognized date/time '{0}' (expected YYYY-JJJ, YYYY-MM-DD or RFC 3339)")]
    InvalidInstant(String),
}
