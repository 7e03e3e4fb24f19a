//! One-generation snapshot store: `Latest_Snapshot/` and `Old_Snapshot/`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use common::TargetKey;
use tracing::debug;

use crate::error::{MonitorError, Result};

pub struct SnapshotStore {
    latest: PathBuf,
    old: PathBuf,
}

impl SnapshotStore {
    /// Directories are created on first write or rotation, not here.
    pub fn new(latest: impl Into<PathBuf>, old: impl Into<PathBuf>) -> Self {
        Self {
            latest: latest.into(),
            old: old.into(),
        }
    }

    pub fn latest_path(&self, key: &TargetKey) -> PathBuf {
        self.latest.join(key.file_name())
    }

    pub fn old_path(&self, key: &TargetKey) -> PathBuf {
        self.old.join(key.file_name())
    }

    pub fn write_latest(&self, key: &TargetKey, page: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.latest).map_err(MonitorError::io(&self.latest))?;
        let path = self.latest_path(key);
        fs::write(&path, page).map_err(MonitorError::io(&path))?;
        Ok(path)
    }

    pub fn read_latest(&self, key: &TargetKey) -> Result<Option<String>> {
        read_optional(&self.latest_path(key))
    }

    /// The previous run's snapshot, if this key was seen before.
    pub fn read_old(&self, key: &TargetKey) -> Result<Option<String>> {
        read_optional(&self.old_path(key))
    }

    /// Copies the old snapshot into latest so a failed fetch does not erase
    /// the key's history at rotation. Returns whether anything was copied.
    pub fn carry_forward(&self, key: &TargetKey) -> Result<bool> {
        let old = self.old_path(key);
        let latest = self.latest_path(key);
        if !old.exists() || latest.exists() {
            return Ok(false);
        }
        fs::create_dir_all(&self.latest).map_err(MonitorError::io(&self.latest))?;
        fs::copy(&old, &latest).map_err(MonitorError::io(&latest))?;
        Ok(true)
    }

    /// Ends a run: `old` is replaced by `latest`, and `latest` starts empty.
    pub fn rotate(&self) -> Result<()> {
        if self.old.exists() {
            fs::remove_dir_all(&self.old).map_err(MonitorError::io(&self.old))?;
        }
        if self.latest.exists() {
            fs::rename(&self.latest, &self.old).map_err(MonitorError::io(&self.latest))?;
        } else {
            fs::create_dir_all(&self.old).map_err(MonitorError::io(&self.old))?;
        }
        fs::create_dir_all(&self.latest).map_err(MonitorError::io(&self.latest))?;
        debug!(old = %self.old.display(), "rotated snapshots");
        Ok(())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(MonitorError::io(path)(err)),
    }
}
