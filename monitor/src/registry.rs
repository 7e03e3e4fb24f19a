//! The target registry (`targets.csv`) and its sync with the reference manager.

use std::path::PathBuf;

use common::{validate_targets, Target};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MonitorError, Result};
use crate::external::{RecordDraft, RecordKind, ReferenceManager, RemoteRecord};
use crate::table::CsvTable;

#[derive(Debug, Serialize, Deserialize)]
struct TargetRecord {
    #[serde(rename = "Company Name")]
    company: String,
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "Role")]
    role: String,
    #[serde(rename = "External Key", default)]
    external_key: Option<String>,
}

impl From<&Target> for TargetRecord {
    fn from(target: &Target) -> Self {
        Self {
            company: target.company.clone(),
            url: target.url.clone(),
            role: target.role.clone(),
            external_key: target.external_key.clone(),
        }
    }
}

impl From<TargetRecord> for Target {
    fn from(record: TargetRecord) -> Self {
        let target = Target::new(&record.company, &record.url, &record.role);
        match record.external_key {
            Some(key) => target.with_external_key(key.trim()),
            None => target,
        }
    }
}

/// Counts reported after a sync.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub linked: usize,
    pub skipped: usize,
}

pub struct TargetRegistry {
    table: CsvTable<TargetRecord>,
}

impl TargetRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            table: CsvTable::new(path),
        }
    }

    /// Reads and validates the registry.
    pub fn load(&self) -> Result<Vec<Target>> {
        let targets: Vec<Target> = self
            .table
            .read_all()?
            .into_iter()
            .map(Target::from)
            .collect();
        validate_targets(&targets)?;
        Ok(targets)
    }

    /// Validates and replaces the registry. Nothing is written on failure.
    pub fn save(&self, targets: &[Target]) -> Result<()> {
        validate_targets(targets)?;
        let records: Vec<TargetRecord> = targets.iter().map(TargetRecord::from).collect();
        self.table.write_all(&records)?;
        info!(targets = targets.len(), path = %self.table.path().display(), "saved targets");
        Ok(())
    }

    pub fn add(&self, target: Target) -> Result<Vec<Target>> {
        let mut targets = self.load()?;
        targets.push(target);
        self.save(&targets)?;
        Ok(targets)
    }

    /// Replaces the target in the (company, role) slot. The external key
    /// survives unless the replacement brings its own.
    pub fn edit(&self, company: &str, role: &str, replacement: Target) -> Result<Vec<Target>> {
        let mut targets = self.load()?;
        let slot = find_slot(&targets, company, role)?;
        let mut replacement = replacement;
        if replacement.external_key.is_none() {
            replacement.external_key = targets[slot].external_key.clone();
        }
        targets[slot] = replacement;
        self.save(&targets)?;
        Ok(targets)
    }

    pub fn remove(&self, company: &str, role: &str) -> Result<Target> {
        let mut targets = self.load()?;
        let slot = find_slot(&targets, company, role)?;
        let removed = targets.remove(slot);
        self.save(&targets)?;
        Ok(removed)
    }

    /// Merges the reference-manager collection into the registry. The remote
    /// side is read completely before anything is changed, so a failed sync
    /// leaves `targets.csv` untouched.
    pub fn pull_from(&self, manager: &dyn ReferenceManager) -> Result<SyncSummary> {
        let remote = manager.list_records().map_err(MonitorError::Sync)?;
        let local = self.load()?;
        let (merged, summary) = merge_remote(local, &remote);
        self.save(&merged)?;
        info!(?summary, "pulled targets from reference manager");
        Ok(summary)
    }

    /// Creates remote records for targets that have no external key yet and
    /// stores the returned keys. Any failure aborts before saving.
    pub fn push_to(&self, manager: &dyn ReferenceManager) -> Result<SyncSummary> {
        let mut targets = self.load()?;
        let mut summary = SyncSummary::default();

        for target in targets.iter_mut().filter(|t| t.external_key.is_none()) {
            let draft = RecordDraft {
                title: target.company.clone(),
                url: target.url.clone(),
                note: format!("Monitored career page for {}", target.role),
                role: target.role.clone(),
                kind: RecordKind::Target,
            };
            let record = manager.create_record(&draft).map_err(MonitorError::Sync)?;
            target.external_key = Some(record.key);
            summary.added += 1;
        }

        self.save(&targets)?;
        info!(?summary, "pushed targets to reference manager");
        Ok(summary)
    }
}

fn find_slot(targets: &[Target], company: &str, role: &str) -> Result<usize> {
    targets
        .iter()
        .position(|t| t.same_slot(company, role))
        .ok_or_else(|| MonitorError::TargetNotFound {
            company: company.to_string(),
            role: role.to_string(),
        })
}

/// Merges remote records into local targets: by external key first, then by
/// (company, role) slot; anything else is appended. Archive captures and
/// records without a role never become targets. A slot already linked to a
/// different record keeps its link and the local URL wins.
pub fn merge_remote(mut local: Vec<Target>, remote: &[RemoteRecord]) -> (Vec<Target>, SyncSummary) {
    let mut summary = SyncSummary::default();

    for record in remote {
        if record.kind == RecordKind::Archive {
            summary.skipped += 1;
            continue;
        }
        let Some(role) = record.role.as_deref().filter(|r| !r.trim().is_empty()) else {
            summary.skipped += 1;
            continue;
        };
        let incoming = Target::new(&record.title, &record.url, role).with_external_key(&record.key);

        if let Some(existing) = local
            .iter_mut()
            .find(|t| t.external_key.as_deref() == Some(record.key.as_str()))
        {
            if *existing != incoming {
                *existing = incoming;
                summary.updated += 1;
            }
        } else if let Some(existing) = local
            .iter_mut()
            .find(|t| t.same_slot(&incoming.company, &incoming.role))
        {
            if existing.external_key.is_none() {
                existing.external_key = incoming.external_key;
                summary.linked += 1;
            } else {
                warn!(key = %record.key, company = %incoming.company, role = %incoming.role, "slot already linked to another record");
                summary.skipped += 1;
            }
        } else {
            local.push(incoming);
            summary.added += 1;
        }
    }

    (local, summary)
}
