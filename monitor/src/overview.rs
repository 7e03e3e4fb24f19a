use std::collections::HashSet;

use common::{ResultRow, RunStatus, Target, VisaVerdict};
use serde::Serialize;

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub targets: usize,
    /// Distinct run timestamps in the log.
    pub runs: usize,
    pub rows: usize,
    /// Rows that were a change or a first snapshot.
    pub changes: usize,
    pub visa_yes: usize,
    pub errors: usize,
    pub last_run: Option<String>,
}

pub fn overview(targets: &[Target], rows: &[ResultRow]) -> Overview {
    let runs: HashSet<&str> = rows.iter().map(|row| row.date.as_str()).collect();

    Overview {
        targets: targets.len(),
        runs: runs.len(),
        rows: rows.len(),
        changes: rows.iter().filter(|row| row.status.is_change()).count(),
        visa_yes: rows.iter().filter(|row| row.visa == VisaVerdict::Yes).count(),
        errors: rows
            .iter()
            .filter(|row| row.status == RunStatus::Error)
            .count(),
        last_run: rows.iter().map(|row| row.date.clone()).max(),
    }
}
