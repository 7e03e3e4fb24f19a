//! One monitoring run: fetch every target in turn, compare against the
//! previous snapshot, scan for visa evidence, archive changes, log results,
//! rotate snapshots.

use std::time::Duration;

use common::{detect_change, ResultRow, Target, VisaScanner};
use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::archive::{ArchiveRequest, Archiver};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::external::{HttpReferenceManager, HttpScreenshotter};
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::registry::{SyncSummary, TargetRegistry};
use crate::results::ResultLog;
use crate::snapshot::SnapshotStore;
use crate::text::visible_blocks;

/// Timeout for screenshot and reference-manager calls; rendering is slow.
const EXTERNAL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Archive pages whose status is a change or a first snapshot.
    pub archive: bool,
}

/// Everything a run produced, in target order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub date: String,
    pub rows: Vec<ResultRow>,
    /// Per-target problems the user should see.
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn changes(&self) -> usize {
        self.rows.iter().filter(|row| row.status.is_change()).count()
    }

    pub fn errors(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.status == common::RunStatus::Error)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Pull,
    Push,
}

/// Explicit application state: stores, collaborators and the scanner.
pub struct MonitorContext {
    registry: TargetRegistry,
    results: ResultLog,
    snapshots: SnapshotStore,
    fetcher: Box<dyn PageFetcher + Send + Sync>,
    scanner: VisaScanner,
    archiver: Archiver,
}

impl MonitorContext {
    /// Builds the context with HTTP collaborators for whatever is configured.
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.fetch)?;

        let mut archiver = Archiver::local(config.archive_dir());
        if config.reference.is_some() || config.screenshot.is_some() {
            let client = reqwest::blocking::Client::builder()
                .timeout(EXTERNAL_TIMEOUT)
                .build()?;
            if let Some(reference) = &config.reference {
                archiver = archiver.with_reference_manager(Box::new(HttpReferenceManager::new(
                    client.clone(),
                    reference.clone(),
                )));
            }
            if let Some(screenshot) = &config.screenshot {
                archiver = archiver
                    .with_screenshots(Box::new(HttpScreenshotter::new(client, screenshot.clone())));
            }
        }

        Self::new(config, Box::new(fetcher), archiver)
    }

    pub fn new(
        config: &MonitorConfig,
        fetcher: Box<dyn PageFetcher + Send + Sync>,
        archiver: Archiver,
    ) -> Result<Self> {
        Ok(Self {
            registry: TargetRegistry::new(config.targets_path()),
            results: ResultLog::new(config.results_path()),
            snapshots: SnapshotStore::new(config.latest_dir(), config.old_dir()),
            fetcher,
            scanner: VisaScanner::new(config.negation_filter)?,
            archiver,
        })
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn results(&self) -> &ResultLog {
        &self.results
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Runs every registered target.
    pub fn run(&self, options: RunOptions) -> Result<RunReport> {
        let targets = self.registry.load()?;
        self.run_targets(&targets, options, OffsetDateTime::now_utc())
    }

    pub fn run_targets(
        &self,
        targets: &[Target],
        options: RunOptions,
        now: OffsetDateTime,
    ) -> Result<RunReport> {
        let date = now.format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))?;
        let stamp = now.format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))?;

        let mut report = RunReport {
            date,
            rows: Vec::with_capacity(targets.len()),
            warnings: Vec::new(),
        };

        if targets.is_empty() {
            report
                .warnings
                .push("No targets defined. Add some targets first.".to_string());
            return Ok(report);
        }

        info!(targets = targets.len(), archive = options.archive, "starting run");

        for target in targets {
            let row = self.observe(target, &report.date, &stamp, options, &mut report.warnings);
            info!(
                company = %target.company,
                role = %target.role,
                status = %row.status,
                visa = %row.visa,
                "checked target"
            );
            report.rows.push(row);
        }

        self.results.append(&report.rows)?;
        self.snapshots.rotate()?;

        info!(
            changes = report.changes(),
            errors = report.errors(),
            "run complete"
        );
        Ok(report)
    }

    fn observe(
        &self,
        target: &Target,
        date: &str,
        stamp: &str,
        options: RunOptions,
        warnings: &mut Vec<String>,
    ) -> ResultRow {
        let key = target.key();

        let fetched = self
            .fetcher
            .fetch(&target.url)
            .map_err(|err| err.to_string())
            .and_then(|page| {
                self.snapshots
                    .write_latest(&key, &page)
                    .map(|_| page)
                    .map_err(|err| err.to_string())
            })
            .and_then(|page| {
                self.snapshots
                    .read_old(&key)
                    .map(|previous| (page, previous))
                    .map_err(|err| err.to_string())
            });

        let (page, previous) = match fetched {
            Ok(observed) => observed,
            Err(message) => {
                error!(company = %target.company, role = %target.role, url = %target.url, %message, "fetch failed");
                warnings.push(format!(
                    "Error fetching {} - {}: {}",
                    target.company, target.role, message
                ));
                if let Err(err) = self.snapshots.carry_forward(&key) {
                    warn!(%key, error = %err, "could not keep previous snapshot");
                }
                return ResultRow::error(target, date, message);
            }
        };

        let status = detect_change(previous.as_deref(), &page);
        let evidence = self.scanner.scan_blocks(&visible_blocks(&page));

        let mut row = ResultRow::for_target(target, date, status);
        row.visa = evidence.verdict;
        row.evidence = evidence.text();

        if options.archive && status.is_change() {
            let outcome = self.archiver.archive(&ArchiveRequest {
                target,
                page: &page,
                verdict: evidence.verdict,
                stamp,
            });
            row.archive = outcome.reference;
            warnings.extend(outcome.warnings);
        }

        row
    }

    /// Syncs the registry with the configured reference manager.
    pub fn sync_targets(&self, direction: SyncDirection) -> Result<SyncSummary> {
        let manager = self
            .archiver
            .reference_manager()
            .ok_or(MonitorError::NoReferenceManager)?;
        match direction {
            SyncDirection::Pull => self.registry.pull_from(manager),
            SyncDirection::Push => self.registry.push_to(manager),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::FakeReferenceManager;
    use crate::error::FetchError;
    use common::{RunStatus, TargetKey, VisaVerdict};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use time::macros::datetime;

    /// Serves pages from memory; URLs not in the map fail with a 404.
    #[derive(Default)]
    struct FakeFetcher {
        pages: Mutex<HashMap<String, String>>,
    }

    impl FakeFetcher {
        fn serve(&self, url: &str, page: &str) {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), page.to_string());
        }
    }

    impl PageFetcher for std::sync::Arc<FakeFetcher> {
        fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
            self.pages
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or(FetchError::Status(404))
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        fetcher: std::sync::Arc<FakeFetcher>,
        context: MonitorContext,
    }

    fn harness_with(archiver: impl FnOnce(&Path) -> Archiver) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig::default().with_data_dir(dir.path());
        let fetcher = std::sync::Arc::new(FakeFetcher::default());
        let context = MonitorContext::new(
            &config,
            Box::new(fetcher.clone()),
            archiver(&config.archive_dir()),
        )
        .unwrap();
        Harness {
            _dir: dir,
            fetcher,
            context,
        }
    }

    fn harness() -> Harness {
        harness_with(|dir| Archiver::local(dir))
    }

    fn acme() -> Target {
        Target::new("Acme", "https://acme.example/jobs", "Engineer")
    }

    fn globex() -> Target {
        Target::new("Globex", "https://globex.example/careers", "Designer")
    }

    const T1: OffsetDateTime = datetime!(2026-03-01 09:00:00 UTC);
    const T2: OffsetDateTime = datetime!(2026-03-02 09:00:00 UTC);

    #[test]
    fn test_first_run_is_first_snapshot() {
        let h = harness();
        h.fetcher.serve(&acme().url, "<p>anything</p>");

        let report = h
            .context
            .run_targets(&[acme()], RunOptions::default(), T1)
            .unwrap();

        assert_eq!(report.date, "2026-03-01 09:00:00");
        assert_eq!(report.rows[0].status, RunStatus::FirstSnapshot);
        assert_eq!(report.changes(), 1);
    }

    #[test]
    fn test_identical_rerun_is_unchanged_and_old_matches_first_latest() {
        let h = harness();
        let page = "<p>We offer visa sponsorship for all roles.</p>";
        h.fetcher.serve(&acme().url, page);
        let key = acme().key();

        h.context
            .run_targets(&[acme()], RunOptions::default(), T1)
            .unwrap();
        let first_latest = h.context.snapshots().read_old(&key).unwrap();
        let report = h
            .context
            .run_targets(&[acme()], RunOptions::default(), T2)
            .unwrap();

        assert_eq!(report.rows[0].status, RunStatus::Unchanged);
        assert_eq!(h.context.snapshots().read_old(&key).unwrap(), first_latest);
        assert_eq!(first_latest.as_deref(), Some(page));
    }

    #[test]
    fn test_single_character_mutation_is_changed() {
        let h = harness();
        h.fetcher.serve(&acme().url, "<p>3 openings</p>");
        h.context
            .run_targets(&[acme()], RunOptions::default(), T1)
            .unwrap();

        h.fetcher.serve(&acme().url, "<p>4 openings</p>");
        let report = h
            .context
            .run_targets(&[acme()], RunOptions::default(), T2)
            .unwrap();

        assert_eq!(report.rows[0].status, RunStatus::Changed);
    }

    #[test]
    fn test_fetch_error_does_not_block_other_targets() {
        let h = harness();
        h.fetcher.serve(&globex().url, "<p>Careers</p>");

        let report = h
            .context
            .run_targets(&[acme(), globex()], RunOptions::default(), T1)
            .unwrap();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].status, RunStatus::Error);
        assert_eq!(report.rows[0].visa, VisaVerdict::NotApplicable);
        assert_eq!(report.rows[0].detail.as_deref(), Some("HTTP status 404"));
        assert_eq!(report.rows[1].status, RunStatus::FirstSnapshot);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(h.context.results().read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_transient_error_keeps_previous_snapshot() {
        let h = harness();
        h.fetcher.serve(&acme().url, "<p>v1</p>");
        h.context
            .run_targets(&[acme()], RunOptions::default(), T1)
            .unwrap();

        h.fetcher.pages.lock().unwrap().clear();
        h.context
            .run_targets(&[acme()], RunOptions::default(), T2)
            .unwrap();

        h.fetcher.serve(&acme().url, "<p>v1</p>");
        let report = h
            .context
            .run_targets(&[acme()], RunOptions::default(), T2)
            .unwrap();
        assert_eq!(report.rows[0].status, RunStatus::Unchanged);
    }

    #[test]
    fn test_visa_verdicts_flow_into_rows() {
        let h = harness();
        h.fetcher.serve(
            &acme().url,
            "<html><body><p>We offer visa sponsorship for all roles.</p></body></html>",
        );
        h.fetcher.serve(
            &globex().url,
            "<p>We do not offer visa sponsorship.</p><script>visa support</script>",
        );

        let report = h
            .context
            .run_targets(&[acme(), globex()], RunOptions::default(), T1)
            .unwrap();

        assert_eq!(report.rows[0].visa, VisaVerdict::Yes);
        assert_eq!(
            report.rows[0].evidence,
            "We offer visa sponsorship for all roles."
        );
        assert_eq!(report.rows[1].visa, VisaVerdict::No);
        assert_eq!(report.rows[1].evidence, "We do not offer visa sponsorship.");
    }

    #[test]
    fn test_navigation_text_does_not_negate_a_separate_paragraph() {
        let h = harness();
        h.fetcher.serve(
            &acme().url,
            "<nav><a>Home</a> <a>No openings? Subscribe</a></nav>\
             <ul><li>Remote friendly</li><li>Visa sponsorship available</li></ul>",
        );

        let report = h
            .context
            .run_targets(&[acme()], RunOptions::default(), T1)
            .unwrap();

        assert_eq!(report.rows[0].visa, VisaVerdict::Yes);
        assert_eq!(report.rows[0].evidence, "Visa sponsorship available");
    }

    #[test]
    fn test_archive_only_changed_pages_when_enabled() {
        let h = harness();
        h.fetcher.serve(&acme().url, "<p>v1</p>");
        let archive = RunOptions { archive: true };

        let first = h.context.run_targets(&[acme()], archive, T1).unwrap();
        let second = h.context.run_targets(&[acme()], archive, T2).unwrap();

        let reference = first.rows[0].archive.as_deref().unwrap();
        assert!(reference.ends_with("20260301_090000_Acme_Engineer.html"));
        assert_eq!(second.rows[0].archive, None);
    }

    #[test]
    fn test_archive_disabled_records_no_reference() {
        let h = harness();
        h.fetcher.serve(&acme().url, "<p>v1</p>");
        let report = h
            .context
            .run_targets(&[acme()], RunOptions { archive: false }, T1)
            .unwrap();
        assert_eq!(report.rows[0].archive, None);
    }

    #[test]
    fn test_empty_registry_warns_and_skips_rotation() {
        let h = harness();
        let report = h
            .context
            .run_targets(&[], RunOptions::default(), T1)
            .unwrap();
        assert!(report.rows.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(h.context.results().read_all().unwrap().is_empty());
    }

    #[test]
    fn test_sync_without_reference_manager_is_an_error() {
        let h = harness();
        assert!(matches!(
            h.context.sync_targets(SyncDirection::Pull),
            Err(MonitorError::NoReferenceManager)
        ));
    }

    #[test]
    fn test_sync_uses_archiver_reference_manager() {
        let h = harness_with(|dir| {
            Archiver::local(dir).with_reference_manager(Box::new(FakeReferenceManager::default()))
        });
        h.context.registry().save(&[acme()]).unwrap();

        let summary = h.context.sync_targets(SyncDirection::Push).unwrap();

        assert_eq!(summary.added, 1);
        let targets = h.context.registry().load().unwrap();
        assert_eq!(targets[0].external_key.as_deref(), Some("REC1"));
    }

    #[test]
    fn test_pull_after_archiving_and_url_edit_keeps_one_target() {
        let h = harness_with(|dir| {
            Archiver::local(dir).with_reference_manager(Box::new(FakeReferenceManager::default()))
        });
        h.context.registry().save(&[acme()]).unwrap();
        h.fetcher.serve(&acme().url, "<p>v1</p>");

        let report = h.context.run(RunOptions { archive: true }).unwrap();
        assert_eq!(
            report.rows[0].archive.as_deref(),
            Some("https://refs.example/items/REC1")
        );

        h.context
            .registry()
            .edit(
                "Acme",
                "Engineer",
                Target::new("Acme", "https://acme.example/careers", "Engineer"),
            )
            .unwrap();
        let summary = h.context.sync_targets(SyncDirection::Pull).unwrap();

        assert_eq!(summary.added, 0);
        assert_eq!(summary.skipped, 1);
        let targets = h.context.registry().load().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].url, "https://acme.example/careers");
        assert_eq!(targets[0].external_key, None);
    }

    #[test]
    fn test_pushed_target_survives_archive_records_on_pull() {
        let h = harness_with(|dir| {
            Archiver::local(dir).with_reference_manager(Box::new(FakeReferenceManager::default()))
        });
        h.context.registry().save(&[acme()]).unwrap();
        h.context.sync_targets(SyncDirection::Push).unwrap();
        h.fetcher.serve(&acme().url, "<p>v1</p>");
        h.context.run(RunOptions { archive: true }).unwrap();

        h.context.sync_targets(SyncDirection::Pull).unwrap();

        let targets = h.context.registry().load().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].external_key.as_deref(), Some("REC1"));
    }

    #[test]
    fn test_snapshot_file_named_from_key() {
        let h = harness();
        h.fetcher.serve(&acme().url, "<p>v1</p>");
        h.context
            .run_targets(&[acme()], RunOptions::default(), T1)
            .unwrap();
        let key = TargetKey::new("Acme", "Engineer");
        assert!(h.context.snapshots().old_path(&key).ends_with("Old_Snapshot/Acme_Engineer.html"));
    }
}
