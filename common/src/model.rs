use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// A career page to monitor.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Target {
    pub company: String,
    pub url: String,
    pub role: String,
    /// Key of the matching record in the external reference manager, if synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_key: Option<String>,
}

impl Target {
    /// Builds a target with surrounding whitespace stripped from every field.
    pub fn new(company: &str, url: &str, role: &str) -> Self {
        Self {
            company: company.trim().to_string(),
            url: url.trim().to_string(),
            role: role.trim().to_string(),
            external_key: None,
        }
    }

    pub fn with_external_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.external_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn key(&self) -> TargetKey {
        TargetKey::new(&self.company, &self.role)
    }

    /// True when both targets point at the same (company, role) slot.
    pub fn same_slot(&self, company: &str, role: &str) -> bool {
        self.company == company.trim() && self.role == role.trim()
    }
}

/// Filesystem-safe `company_role` key naming a target's snapshot files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey(String);

impl TargetKey {
    pub fn new(company: &str, role: &str) -> Self {
        TargetKey(format!("{}_{}", sanitize(company), sanitize(role)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the snapshot file stored for this key.
    pub fn file_name(&self) -> String {
        format!("{}.html", self.0)
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' => '-',
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        })
        .collect()
}

/// Outcome of comparing a fresh fetch against the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    FirstSnapshot,
    Changed,
    Unchanged,
    Error,
}

impl RunStatus {
    pub const ALL: [RunStatus; 4] = [
        RunStatus::FirstSnapshot,
        RunStatus::Changed,
        RunStatus::Unchanged,
        RunStatus::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::FirstSnapshot => "first-snapshot",
            RunStatus::Changed => "changed",
            RunStatus::Unchanged => "unchanged",
            RunStatus::Error => "error",
        }
    }

    /// Human-readable message shown after a run.
    pub fn describe(self) -> &'static str {
        match self {
            RunStatus::FirstSnapshot => "First snapshot taken (treated as change)",
            RunStatus::Changed => "New posting detected!",
            RunStatus::Unchanged => "No change",
            RunStatus::Error => "Error",
        }
    }

    /// First snapshots count as changes for notification and archiving.
    pub fn is_change(self) -> bool {
        matches!(self, RunStatus::FirstSnapshot | RunStatus::Changed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RunStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

/// Whether a page appears to offer visa sponsorship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisaVerdict {
    Yes,
    No,
    /// The page could not be scanned (fetch error).
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl VisaVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            VisaVerdict::Yes => "Yes",
            VisaVerdict::No => "No",
            VisaVerdict::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for VisaVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisaVerdict {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(VisaVerdict::Yes),
            "no" => Ok(VisaVerdict::No),
            "n/a" | "not-applicable" | "" => Ok(VisaVerdict::NotApplicable),
            _ => Err(ValidationError::UnknownVerdict(s.to_string())),
        }
    }
}

/// One line of the result log: a target observed during one run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub company: String,
    pub url: String,
    pub role: String,
    /// Run timestamp, `YYYY-MM-DD HH:MM:SS`. Lexicographic order is chronological.
    pub date: String,
    pub status: RunStatus,
    pub visa: VisaVerdict,
    pub evidence: String,
    pub archive: Option<String>,
    /// Error message for rows with status `error`.
    pub detail: Option<String>,
}

impl ResultRow {
    pub fn for_target(target: &Target, date: &str, status: RunStatus) -> Self {
        Self {
            company: target.company.clone(),
            url: target.url.clone(),
            role: target.role.clone(),
            date: date.to_string(),
            status,
            visa: VisaVerdict::NotApplicable,
            evidence: String::new(),
            archive: None,
            detail: None,
        }
    }

    pub fn error(target: &Target, date: &str, message: impl Into<String>) -> Self {
        Self {
            detail: Some(message.into()),
            ..Self::for_target(target, date, RunStatus::Error)
        }
    }
}

/// Checks the whole registry: required fields, http(s) URLs and unique
/// (company, role) pairs. Row numbers in errors are 1-based.
pub fn validate_targets(targets: &[Target]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    let mut keys: HashMap<TargetKey, usize> = HashMap::new();

    for (idx, target) in targets.iter().enumerate() {
        let row = idx + 1;
        for (field, value) in [
            ("Company Name", &target.company),
            ("URL", &target.url),
            ("Role", &target.role),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField { row, field });
            }
        }

        let url = target.url.trim();
        let has_scheme = ["http://", "https://"].iter().any(|scheme| {
            url.len() > scheme.len()
                && url
                    .get(..scheme.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        });
        if !has_scheme {
            return Err(ValidationError::InvalidUrl {
                row,
                url: target.url.clone(),
            });
        }

        if !seen.insert((target.company.trim(), target.role.trim())) {
            return Err(ValidationError::DuplicateTarget {
                company: target.company.clone(),
                role: target.role.clone(),
            });
        }

        if let Some(&other) = keys.get(&target.key()) {
            let label = |t: &Target| format!("{} / {}", t.company, t.role);
            return Err(ValidationError::KeyCollision {
                first: label(&targets[other]),
                second: label(target),
            });
        }
        keys.insert(target.key(), idx);
    }

    Ok(())
}
