//! On-disk snapshots of a result series.
//!
//! One JSON file per output key, written atomically (temp file, then
//! rename) so a crash or cancellation never leaves a half-written snapshot.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

use super::types::{SeriesResult, SeriesSnapshot};

/// File name suffix for snapshots.
pub const SNAPSHOT_EXTENSION: &str = "snapshot.json";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("No snapshot at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid output key '{0}'")]
    InvalidKey(String),

    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "Snapshot arrays differ in length (lags {lags}, correlations {correlations}, epochs {epochs})"
    )]
    Inconsistent {
        lags: usize,
        correlations: usize,
        epochs: usize,
    },
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Directory of series snapshots keyed by output identifier.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the snapshot for `key`.
    pub fn path_for(&self, key: &str) -> SnapshotResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.{}", key, SNAPSHOT_EXTENSION)))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.exists()).unwrap_or(false)
    }

    /// Persist `series` under `key`, replacing any previous snapshot.
    pub fn save(&self, key: &str, series: &SeriesResult) -> SnapshotResult<PathBuf> {
        let path = self.path_for(key)?;
        let content = serde_json::to_string(&series.to_snapshot())?;

        fs::create_dir_all(&self.dir)?;
        let temp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &path)?;

        tracing::info!("Saved {} samples to {}", series.len(), path.display());
        Ok(path)
    }

    /// Load the snapshot stored under `key`.
    pub fn load(&self, key: &str) -> SnapshotResult<SeriesResult> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Err(SnapshotError::NotFound(path));
        }

        let content = fs::read_to_string(&path)?;
        let snapshot: SeriesSnapshot = serde_json::from_str(&content)?;
        let series = SeriesResult::from_snapshot(snapshot)?;

        tracing::info!("Loaded {} samples from {}", series.len(), path.display());
        Ok(series)
    }
}

fn validate_key(key: &str) -> SnapshotResult<()> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.chars().any(|c| c == '/' || c == '\\' || c.is_control());
    if bad {
        return Err(SnapshotError::InvalidKey(key.to_string()));
    }
    Ok(())
}
