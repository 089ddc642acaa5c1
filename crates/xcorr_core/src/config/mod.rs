//! Configuration management.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Unknown sections dropped, missing sections filled in
//! - Defaults for every missing key
//!
//! # Example
//!
//! ```no_run
//! use xcorr_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Snapshots: {}", config.settings().paths.snapshot_folder);
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AnalysisSettings, ConfigSection, LoggingSettings, PathSettings, Settings, SourceSettings,
};
