//! The result log (`results.csv`): one row per target per run.

use std::io;
use std::path::PathBuf;

use common::{ResultRow, RunStatus, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MonitorError, Result};
use crate::table::CsvTable;

#[derive(Debug, Serialize, Deserialize)]
struct ResultRecord {
    #[serde(rename = "Company Name")]
    company: String,
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "Role")]
    role: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Visa Sponsorship", default)]
    visa: String,
    #[serde(rename = "Visa Evidence", default)]
    evidence: String,
    #[serde(rename = "Archive", default)]
    archive: Option<String>,
    #[serde(rename = "Detail", default)]
    detail: Option<String>,
}

impl From<&ResultRow> for ResultRecord {
    fn from(row: &ResultRow) -> Self {
        Self {
            company: row.company.clone(),
            url: row.url.clone(),
            role: row.role.clone(),
            date: row.date.clone(),
            status: row.status.to_string(),
            visa: row.visa.to_string(),
            evidence: row.evidence.clone(),
            archive: row.archive.clone(),
            detail: row.detail.clone(),
        }
    }
}

impl TryFrom<ResultRecord> for ResultRow {
    type Error = ValidationError;

    fn try_from(record: ResultRecord) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            status: record.status.parse()?,
            visa: record.visa.parse()?,
            company: record.company,
            url: record.url,
            role: record.role,
            date: record.date,
            evidence: record.evidence,
            archive: record.archive.filter(|a| !a.trim().is_empty()),
            detail: record.detail.filter(|d| !d.trim().is_empty()),
        })
    }
}

/// Which history rows to show. Empty lists mean "all".
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryFilter {
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<RunStatus>,
}

impl HistoryFilter {
    pub fn matches(&self, row: &ResultRow) -> bool {
        (self.companies.is_empty() || self.companies.iter().any(|c| *c == row.company))
            && (self.statuses.is_empty() || self.statuses.contains(&row.status))
    }
}

/// A history row with its position in the log, for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub index: usize,
    #[serde(flatten)]
    pub row: ResultRow,
}

pub struct ResultLog {
    table: CsvTable<ResultRecord>,
}

impl ResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            table: CsvTable::new(path),
        }
    }

    pub fn read_all(&self) -> Result<Vec<ResultRow>> {
        self.table
            .read_all()?
            .into_iter()
            .map(|record| ResultRow::try_from(record).map_err(MonitorError::from))
            .collect()
    }

    /// Appends a run's rows by rewriting the whole log. Returns the new total.
    pub fn append(&self, rows: &[ResultRow]) -> Result<usize> {
        let mut all = self.read_all()?;
        all.extend_from_slice(rows);
        self.write(&all)?;
        info!(appended = rows.len(), total = all.len(), "updated result log");
        Ok(all.len())
    }

    /// Removes one row by its position in the log.
    pub fn delete_row(&self, index: usize) -> Result<ResultRow> {
        let mut all = self.read_all()?;
        if index >= all.len() {
            return Err(MonitorError::RowNotFound(index));
        }
        let removed = all.remove(index);
        self.write(&all)?;
        Ok(removed)
    }

    /// Matching rows, newest first. Rows from the same run keep log order.
    pub fn history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>> {
        let mut entries: Vec<HistoryEntry> = self
            .read_all()?
            .into_iter()
            .enumerate()
            .filter(|(_, row)| filter.matches(row))
            .map(|(index, row)| HistoryEntry { index, row })
            .collect();
        entries.sort_by(|a, b| b.row.date.cmp(&a.row.date));
        Ok(entries)
    }

    fn write(&self, rows: &[ResultRow]) -> Result<()> {
        let records: Vec<ResultRecord> = rows.iter().map(ResultRecord::from).collect();
        self.table.write_all(&records)
    }
}

/// Writes rows as CSV with the log's column headers.
pub fn export_csv<W: io::Write>(rows: &[ResultRow], out: W) -> std::result::Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(ResultRecord::from(row))?;
    }
    writer.flush()?;
    Ok(())
}
