//! Time windows and the schedule that walks them across a date range.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

use super::ModelError;

/// Default interval between successive window starts.
pub const DEFAULT_SKIP_DAYS: i64 = 10;

/// Half-open interval `[start, start + duration)` on the UTC timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    duration: Duration,
}

impl TimeWindow {
    /// Create a window. The duration must be positive.
    pub fn new(start: DateTime<Utc>, duration: Duration) -> Result<Self, ModelError> {
        if duration <= Duration::zero() {
            return Err(ModelError::NonPositiveDuration(duration.num_milliseconds()));
        }
        if start.checked_add_signed(duration).is_none() {
            return Err(ModelError::OutOfRange(format!("window end ({} + {})", start, duration)));
        }
        Ok(Self { start, duration })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Fractional year of the window start (`year + ordinal / 365.25`).
    pub fn epoch(&self) -> f64 {
        fractional_year(self.start)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.end().format("%Y-%m-%dT%H:%M:%S%.3fZ")
        )
    }
}

/// Fractional year used as the x-axis of the series.
///
/// Day-of-year is 1-based, so 2020-001 maps to `2020 + 1/365.25`.
pub fn fractional_year(instant: DateTime<Utc>) -> f64 {
    instant.year() as f64 + instant.ordinal() as f64 / 365.25
}

/// Convert a duration in (possibly fractional) seconds to a chrono duration.
pub fn duration_from_secs(secs: f64) -> Result<Duration, ModelError> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(ModelError::NonPositiveDuration((secs * 1000.0) as i64));
    }
    let micros = (secs * 1_000_000.0).round();
    if micros >= i64::MAX as f64 {
        return Err(ModelError::OutOfRange(format!("duration of {} s", secs)));
    }
    Ok(Duration::microseconds(micros as i64))
}

/// Convert a whole number of days to a chrono duration.
pub fn duration_from_days(days: i64) -> Result<Duration, ModelError> {
    Duration::try_days(days).ok_or_else(|| ModelError::OutOfRange(format!("{} days", days)))
}

/// Parse a UTC instant.
///
/// Accepts `YYYY-JJJ` (day of year), `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.f]`
/// and full RFC 3339 timestamps. Date-only forms resolve to midnight UTC.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, ModelError> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(midnight(date));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%j") {
        return Ok(midnight(date));
    }

    Err(ModelError::InvalidInstant(text.to_string()))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

/// Sequence of windows between `start` (inclusive) and `end` (exclusive).
///
/// Window starts advance by `max(skip, duration)`, so windows never overlap.
/// A skip shorter than the duration is widened rather than honoured.
#[derive(Debug, Clone)]
pub struct WindowSchedule {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    skip: Duration,
    duration: Duration,
}

impl WindowSchedule {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        skip: Duration,
        duration: Duration,
    ) -> Result<Self, ModelError> {
        if duration <= Duration::zero() {
            return Err(ModelError::NonPositiveDuration(duration.num_milliseconds()));
        }
        if skip <= Duration::zero() {
            return Err(ModelError::NonPositiveSkip(skip.num_milliseconds()));
        }
        if end <= start {
            return Err(ModelError::EmptyRange { start, end });
        }
        // Every window start is before `end`, so this bounds all arithmetic
        // done while walking the schedule.
        if end.checked_add_signed(skip.max(duration)).is_none() {
            return Err(ModelError::OutOfRange(format!(
                "schedule end ({} + {})",
                end,
                skip.max(duration)
            )));
        }
        Ok(Self {
            start,
            end,
            skip,
            duration,
        })
    }

    /// Interval actually used between window starts.
    pub fn step(&self) -> Duration {
        self.skip.max(self.duration)
    }

    /// Whether the configured skip had to be widened to avoid overlap.
    pub fn skip_widened(&self) -> bool {
        self.duration > self.skip
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Iterate the window starts in chronological order.
    pub fn windows(&self) -> impl Iterator<Item = TimeWindow> + '_ {
        let step = self.step();
        let duration = self.duration;
        std::iter::successors(Some(self.start), move |prev| prev.checked_add_signed(step))
            .take_while(move |pointer| *pointer < self.end)
            .map(move |start| TimeWindow { start, duration })
    }

    /// Number of windows the schedule produces.
    pub fn len(&self) -> usize {
        self.windows().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
