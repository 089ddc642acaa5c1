//! Logging types.

use serde::{Deserialize, Serialize};

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level debugging (very verbose).
    Trace,
    /// Debug information, including per-window trim diagnostics.
    Debug,
    /// Progress lines and summaries.
    #[default]
    Info,
    /// Skipped windows and retries.
    Warn,
    /// Errors.
    Error,
}

impl LogLevel {
    /// Level selected by a verbosity flag: at least Debug when set.
    pub fn with_verbose(self, verbose: bool) -> Self {
        if verbose {
            self.min(LogLevel::Debug)
        } else {
            self
        }
    }
}
