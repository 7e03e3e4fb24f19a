//! Whole-file CSV tables: read everything, write everything back.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{MonitorError, Result};

/// A CSV file holding rows of `R`. There is no locking: the last writer wins.
pub struct CsvTable<R> {
    path: PathBuf,
    _row: PhantomData<R>,
}

impl<R> CsvTable<R>
where
    R: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _row: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every row; a missing file is an empty table.
    pub fn read_all(&self) -> Result<Vec<R>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(MonitorError::csv(&self.path))?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<R>, _>>()
            .map_err(MonitorError::csv(&self.path))
    }

    /// Replaces the file with `rows`.
    pub fn write_all(&self, rows: &[R]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(MonitorError::io(parent))?;
        }
        let mut writer = csv::Writer::from_path(&self.path).map_err(MonitorError::csv(&self.path))?;
        for row in rows {
            writer.serialize(row).map_err(MonitorError::csv(&self.path))?;
        }
        writer.flush().map_err(MonitorError::io(&self.path))?;
        Ok(())
    }
}
