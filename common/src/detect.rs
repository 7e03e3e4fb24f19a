use crate::model::RunStatus;

/// Compares a freshly fetched page with the previous snapshot of the same target.
///
/// A missing previous snapshot is a first observation. Otherwise the verdict is
/// whole-document byte equality: whitespace or timestamp churn in the page
/// still reports `Changed`.
pub fn detect_change(previous: Option<&str>, current: &str) -> RunStatus {
    match previous {
        None => RunStatus::FirstSnapshot,
        Some(old) if old == current => RunStatus::Unchanged,
        Some(_) => RunStatus::Changed,
    }
}
