//! Preserving changed pages.
//!
//! Every step is best effort: failures become warnings and the reference
//! falls back, in order, to the reference-manager link, a screenshot file,
//! then the local HTML copy.

use std::fs;
use std::path::{Path, PathBuf};

use common::{Target, VisaVerdict};
use tracing::{info, warn};

use crate::external::{RecordDraft, RecordKind, ReferenceManager, Screenshotter};

/// What to archive for one changed target.
pub struct ArchiveRequest<'a> {
    pub target: &'a Target,
    pub page: &'a str,
    pub verdict: VisaVerdict,
    /// File-name prefix, `YYYYMMDD_HHMMSS`.
    pub stamp: &'a str,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub reference: Option<String>,
    pub warnings: Vec<String>,
}

pub struct Archiver {
    dir: PathBuf,
    reference: Option<Box<dyn ReferenceManager + Send + Sync>>,
    screenshots: Option<Box<dyn Screenshotter + Send + Sync>>,
}

impl Archiver {
    /// Local copies only.
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            reference: None,
            screenshots: None,
        }
    }

    pub fn with_reference_manager(
        mut self,
        manager: Box<dyn ReferenceManager + Send + Sync>,
    ) -> Self {
        self.reference = Some(manager);
        self
    }

    pub fn with_screenshots(mut self, screenshots: Box<dyn Screenshotter + Send + Sync>) -> Self {
        self.screenshots = Some(screenshots);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn reference_manager(&self) -> Option<&(dyn ReferenceManager + Send + Sync)> {
        self.reference.as_deref()
    }

    pub fn archive(&self, request: &ArchiveRequest<'_>) -> ArchiveOutcome {
        let mut outcome = ArchiveOutcome::default();
        let target = request.target;
        let base = format!("{}_{}", request.stamp, target.key());

        let copy = match self.copy_page(&base, request.page) {
            Ok(path) => Some(path),
            Err(err) => {
                outcome.push_warning(format!(
                    "Could not archive HTML for {} - {}: {}",
                    target.company, target.role, err
                ));
                None
            }
        };

        if let (Some(manager), Some(copy)) = (self.reference.as_deref(), copy.as_deref()) {
            match record_page(manager, request, copy) {
                Ok(link) => {
                    info!(company = %target.company, role = %target.role, %link, "archived to reference manager");
                    outcome.reference = Some(link);
                    return outcome;
                }
                Err(message) => outcome.push_warning(format!(
                    "Reference manager failed for {} - {}: {}",
                    target.company, target.role, message
                )),
            }
        }

        if let Some(screenshots) = self.screenshots.as_deref() {
            match self.screenshot(screenshots, &base, &target.url) {
                Ok(path) => {
                    outcome.reference = Some(path.display().to_string());
                    return outcome;
                }
                Err(message) => outcome.push_warning(format!(
                    "Screenshot failed for {} - {}: {}",
                    target.company, target.role, message
                )),
            }
        }

        outcome.reference = copy.map(|path| path.display().to_string());
        outcome
    }

    fn copy_page(&self, base: &str, page: &str) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{base}.html"));
        fs::write(&path, page)?;
        Ok(path)
    }

    fn screenshot(
        &self,
        screenshots: &dyn Screenshotter,
        base: &str,
        url: &str,
    ) -> Result<PathBuf, String> {
        let image = screenshots.capture(url).map_err(|err| err.to_string())?;
        fs::create_dir_all(&self.dir).map_err(|err| err.to_string())?;
        let path = self.dir.join(format!("{base}.png"));
        fs::write(&path, image).map_err(|err| err.to_string())?;
        Ok(path)
    }
}

impl ArchiveOutcome {
    fn push_warning(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

fn record_page(
    manager: &dyn ReferenceManager,
    request: &ArchiveRequest<'_>,
    copy: &Path,
) -> Result<String, String> {
    let target = request.target;
    let draft = RecordDraft {
        title: target.company.clone(),
        url: target.url.clone(),
        note: format!(
            "Role: {}; Visa sponsorship: {}",
            target.role, request.verdict
        ),
        role: target.role.clone(),
        kind: RecordKind::Archive,
    };
    let record = manager.create_record(&draft).map_err(|err| err.to_string())?;
    manager
        .attach_file(&record, copy)
        .map_err(|err| err.to_string())?;
    Ok(record.link)
}
