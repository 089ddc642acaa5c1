//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::analysis::{FilterConfig, FilterType, DEFAULT_MAX_LAG_SAMPLES, DEFAULT_TARGET_RATE};
use crate::fetch::{RetryPolicy, DEFAULT_TIMESERIES_URL};
use crate::logging::LogLevel;
use crate::models::DEFAULT_SKIP_DAYS;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Remote waveform source.
    #[serde(default)]
    pub source: SourceSettings,

    /// Filtering, resampling and lag search.
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Output and log locations.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Remote source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Timeseries service endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per window before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (ms).
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Upper bound on the retry delay (ms).
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_TIMESERIES_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    4
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    8_000
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl SourceSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: std::time::Duration::from_millis(self.backoff_initial_ms),
            max_backoff: std::time::Duration::from_millis(self.backoff_max_ms),
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Filter applied to every trace before merging.
    #[serde(default)]
    pub filter_type: FilterType,

    /// Lower band edge (Hz).
    #[serde(default = "default_band_low")]
    pub band_low_hz: f64,

    /// Upper band edge (Hz).
    #[serde(default = "default_band_high")]
    pub band_high_hz: f64,

    /// Filter corners: Butterworth order applied at each band edge, so the
    /// default of 4 is a 4-pole high-pass followed by a 4-pole low-pass.
    #[serde(default = "default_corners")]
    pub corners: usize,

    /// Common sample rate after resampling (Hz).
    #[serde(default = "default_target_rate")]
    pub target_rate_hz: f64,

    /// Half-width of the lag search (samples at the target rate).
    #[serde(default = "default_max_lag")]
    pub max_lag_samples: usize,

    /// Days between successive window starts.
    #[serde(default = "default_skip_days")]
    pub skip_days: i64,

    /// Window length in seconds when none is given on the command line.
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,

    /// Location code of channel A.
    #[serde(default = "default_location_a")]
    pub location_a: String,

    /// Location code of channel B.
    #[serde(default = "default_location_b")]
    pub location_b: String,
}

fn default_band_low() -> f64 {
    1.0 / 8.0
}

fn default_band_high() -> f64 {
    1.0 / 4.0
}

fn default_corners() -> usize {
    4
}

fn default_target_rate() -> f64 {
    DEFAULT_TARGET_RATE
}

fn default_max_lag() -> usize {
    DEFAULT_MAX_LAG_SAMPLES
}

fn default_skip_days() -> i64 {
    DEFAULT_SKIP_DAYS
}

fn default_window_secs() -> f64 {
    3600.0
}

fn default_location_a() -> String {
    "00".to_string()
}

fn default_location_b() -> String {
    "10".to_string()
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            filter_type: FilterType::default(),
            band_low_hz: default_band_low(),
            band_high_hz: default_band_high(),
            corners: default_corners(),
            target_rate_hz: default_target_rate(),
            max_lag_samples: default_max_lag(),
            skip_days: default_skip_days(),
            window_secs: default_window_secs(),
            location_a: default_location_a(),
            location_b: default_location_b(),
        }
    }
}

impl AnalysisSettings {
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            filter_type: self.filter_type,
            low_cutoff_hz: self.band_low_hz,
            high_cutoff_hz: self.band_high_hz,
            corners: self.corners,
        }
    }
}

/// Path configuration for snapshots, reports and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_snapshot_folder")]
    pub snapshot_folder: String,

    #[serde(default = "default_report_folder")]
    pub report_folder: String,

    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_snapshot_folder() -> String {
    "snapshots".to_string()
}

fn default_report_folder() -> String {
    "reports".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            snapshot_folder: default_snapshot_folder(),
            report_folder: default_report_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is unset.
    #[serde(default)]
    pub level: LogLevel,

    /// Also write a daily log file into the logs folder.
    #[serde(default = "default_true")]
    pub file: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            file: true,
        }
    }
}

/// Config sections for section-level updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Source,
    Analysis,
    Paths,
    Logging,
}

impl ConfigSection {
    /// TOML table name of the section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Source => "source",
            ConfigSection::Analysis => "analysis",
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
        }
    }

    /// All sections in file order.
    pub fn all() -> [ConfigSection; 4] {
        [
            ConfigSection::Source,
            ConfigSection::Analysis,
            ConfigSection::Paths,
            ConfigSection::Logging,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_microseism_band() {
        let analysis = AnalysisSettings::default();
        assert_eq!(analysis.filter_config(), FilterConfig::microseism_bandpass());
        assert_eq!(analysis.max_lag_samples, 500);
        assert_eq!(analysis.target_rate_hz, 1000.0);
        assert_eq!(analysis.skip_days, 10);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str("[source]\nmax_attempts = 2\n").unwrap();
        assert_eq!(settings.source.max_attempts, 2);
        assert_eq!(settings.source.base_url, DEFAULT_TIMESERIES_URL);
        assert_eq!(settings.analysis.location_b, "10");
    }

    #[test]
    fn retry_policy_uses_configured_backoff() {
        let source = SourceSettings {
            max_attempts: 0,
            backoff_initial_ms: 100,
            backoff_max_ms: 400,
            ..SourceSettings::default()
        };
        let policy = source.retry_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.initial_backoff, std::time::Duration::from_millis(100));
    }
}
