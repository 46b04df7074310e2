//! Sync orchestration: fetch -> change check -> identify -> convert -> store.

use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::fetcher::{ChangeCheck, Fetcher};
use crate::pipeline::convert::Transformer;
use crate::pipeline::identify::ComponentIdentifier;
use crate::sources::HttpPageSource;
use crate::stores::FileStore;
use crate::telemetry::{timed, Telemetry};
use crate::traits::{CaptureStore, FingerprintEntry, HashStatistics, PageSource, StorageUsage};
use crate::types::component::{CandidateComponent, ComponentType};
use crate::types::config::SyncConfig;

/// Number of fingerprints listed by [`Orchestrator::stats`].
const RECENT_FINGERPRINTS: usize = 10;

/// Switches for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Convert even when the fingerprint is unchanged
    pub force_sync: bool,

    /// Identify components only; write nothing
    pub dry_run: bool,

    /// Leave expired history in place
    pub skip_cleanup: bool,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_sync(mut self) -> Self {
        self.force_sync = true;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn skip_cleanup(mut self) -> Self {
        self.skip_cleanup = true;
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Fingerprint unchanged and not forced
    Skipped,
    DryRun,
    Completed,
}

/// Fingerprint comparison as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub has_changed: bool,
    pub previous_fingerprint: Option<String>,
    pub current_fingerprint: String,
}

impl From<&ChangeCheck> for ChangeSummary {
    fn from(check: &ChangeCheck) -> Self {
        Self {
            has_changed: check.has_changed,
            previous_fingerprint: check.previous_fingerprint.clone(),
            current_fingerprint: check.current_fingerprint.clone(),
        }
    }
}

/// One identified component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub name: String,
    pub component_type: ComponentType,
    pub confidence: f64,
    pub parameter_count: usize,
}

impl From<&CandidateComponent> for ComponentSummary {
    fn from(component: &CandidateComponent) -> Self {
        Self {
            name: component.name.clone(),
            component_type: component.component_type,
            confidence: component.confidence,
            parameter_count: component.extracted_parameters.len(),
        }
    }
}

/// A component whose conversion failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentFailure {
    pub name: String,
    pub reason: String,
}

/// End-of-run summary.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub outcome: RunOutcome,
    pub change: ChangeSummary,
    pub components: Vec<ComponentSummary>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<ComponentFailure>,

    /// History entries deleted by cleanup
    pub pruned: usize,

    pub usage_before: StorageUsage,
    pub usage_after: Option<StorageUsage>,
    pub elapsed: Duration,
}

impl SyncReport {
    fn new(outcome: RunOutcome, change: ChangeSummary, usage_before: StorageUsage) -> Self {
        Self {
            outcome,
            change,
            components: Vec::new(),
            total: 0,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            pruned: 0,
            usage_before,
            usage_after: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Every converted component succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Output of the `stats` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub statistics: HashStatistics,
    pub recent: Vec<FingerprintEntry>,
    pub usage: StorageUsage,
}

/// Runs the whole pipeline for one configured source.
pub struct Orchestrator {
    config: SyncConfig,
    fetcher: Fetcher,
    identifier: ComponentIdentifier,
    transformer: Transformer,
    store: Arc<dyn CaptureStore>,
    telemetry: Arc<dyn Telemetry>,
}

impl Orchestrator {
    /// Wire the pipeline from explicit collaborators.
    ///
    /// Fails with a configuration error before any I/O if `config` is invalid.
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn PageSource>,
        store: Arc<dyn CaptureStore>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            fetcher: Fetcher::new(&config, source, store.clone(), telemetry.clone())?,
            identifier: ComponentIdentifier::new(&config, telemetry.clone())?,
            transformer: Transformer::new(&config, telemetry.clone()),
            store,
            telemetry,
            config,
        })
    }

    /// Wire the default HTTP source and filesystem store.
    pub fn from_config(config: SyncConfig, telemetry: Arc<dyn Telemetry>) -> Result<Self> {
        config.validate()?;
        let source = HttpPageSource::new(config.fetch.clone(), telemetry.clone())?;
        let store = FileStore::new(&config, telemetry.clone());
        Self::new(config, Arc::new(source), Arc::new(store), telemetry)
    }

    /// Run one sync.
    ///
    /// Component failures are reported in the result; fetch, parse, storage
    /// and configuration failures abort the run.
    pub async fn run(&self, options: RunOptions) -> Result<SyncReport> {
        timed(self.telemetry.as_ref(), "sync", self.run_inner(options)).await
    }

    async fn run_inner(&self, options: RunOptions) -> Result<SyncReport> {
        let started = Instant::now();
        let usage_before = self.store.usage().await?;

        let check = if options.dry_run {
            self.fetcher.check_without_saving().await?
        } else {
            self.fetcher.check_for_changes().await?
        };

        if !check.has_changed && !options.force_sync {
            self.telemetry.info("sync", "no changes detected, skipping conversion");
            let mut report = SyncReport::new(RunOutcome::Skipped, (&check).into(), usage_before);
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let components = timed(self.telemetry.as_ref(), "identify", async {
            self.identifier
                .identify(&check.capture.markup, &check.capture.styles)
        })
        .await?;

        if components.is_empty() {
            self.telemetry.warn("identify", "no components found");
        }

        let outcome = if options.dry_run {
            RunOutcome::DryRun
        } else {
            RunOutcome::Completed
        };
        let mut report = SyncReport::new(outcome, (&check).into(), usage_before);
        report.components = components.iter().map(ComponentSummary::from).collect();
        report.total = components.len();

        if options.dry_run {
            for component in &report.components {
                self.telemetry.info(
                    "dry_run",
                    &format!(
                        "would convert {} ({}, confidence {:.2})",
                        component.name, component.component_type, component.confidence
                    ),
                );
            }
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let artifacts = self.transformer.convert_all(&components).await;
        try_join_all(artifacts.iter().map(|a| self.store.save_artifact(a))).await?;

        report.succeeded = artifacts.iter().filter(|a| a.succeeded).count();
        report.failed = artifacts.len() - report.succeeded;
        report.failures = artifacts
            .iter()
            .filter(|a| !a.succeeded)
            .map(|a| ComponentFailure {
                name: a.target_file_stem.clone(),
                reason: a.failure_reason.clone().unwrap_or_default(),
            })
            .collect();

        if !options.skip_cleanup {
            report.pruned = self
                .store
                .prune_older_than(self.config.retention_days)
                .await?;
        }

        report.usage_after = Some(self.store.usage().await?);
        report.elapsed = started.elapsed();

        self.telemetry.info(
            "sync",
            &format!(
                "{} components: {} succeeded, {} failed",
                report.total, report.succeeded, report.failed
            ),
        );

        Ok(report)
    }

    /// Fingerprint history and storage usage.
    pub async fn stats(&self) -> Result<StatsReport> {
        let (statistics, recent, usage) = tokio::try_join!(
            self.store.hash_statistics(),
            self.store.fingerprint_history(RECENT_FINGERPRINTS),
            self.store.usage(),
        )?;

        Ok(StatsReport {
            statistics,
            recent,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::sources::mock::{MockFailure, MockPageSource};
    use crate::testing::{sample_page, RecordingTelemetry};
    use crate::types::capture::FetchedPage;
    use tempfile::TempDir;
    use tracing::Level;

    const URL: &str = "https://example.com";

    struct Harness {
        source: MockPageSource,
        store: Arc<FileStore>,
        telemetry: RecordingTelemetry,
        orchestrator: Orchestrator,
        config: SyncConfig,
    }

    fn setup(dir: &TempDir) -> Harness {
        let config = SyncConfig::new(URL)
            .with_capture_dir(dir.path().join("captures"))
            .with_component_dir(dir.path().join("components"));
        let telemetry = RecordingTelemetry::new();
        let source = MockPageSource::new().with_page(URL, sample_page());
        let store = Arc::new(FileStore::new(&config, Arc::new(telemetry.clone())));
        let orchestrator = Orchestrator::new(
            config.clone(),
            Arc::new(source.clone()),
            store.clone(),
            Arc::new(telemetry.clone()),
        )
        .unwrap();

        Harness {
            source,
            store,
            telemetry,
            orchestrator,
            config,
        }
    }

    #[tokio::test]
    async fn test_first_run_converts_everything() {
        let dir = TempDir::new().unwrap();
        let h = setup(&dir);

        let report = h.orchestrator.run(RunOptions::new()).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert!(report.change.has_changed);
        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 4);
        assert!(report.is_clean());

        let names: Vec<&str> = report.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["HeaderSiteheader", "HeroIntro", "FeaturesFeatures", "FooterFooter"]
        );

        for name in names {
            let live = h.config.component_dir.join(format!("{}.astro", name));
            assert!(live.exists(), "{} was not written", name);
        }
        assert!(report.usage_after.unwrap().total > 0);
    }

    #[tokio::test]
    async fn test_unchanged_run_is_skipped() {
        let dir = TempDir::new().unwrap();
        let h = setup(&dir);

        h.orchestrator.run(RunOptions::new()).await.unwrap();
        let second = h.orchestrator.run(RunOptions::new()).await.unwrap();

        assert_eq!(second.outcome, RunOutcome::Skipped);
        assert!(!second.change.has_changed);
        assert_eq!(second.total, 0);
        assert!(second.usage_after.is_none());
        assert!(h.store.list_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_force_sync_converts_unchanged_page() {
        let dir = TempDir::new().unwrap();
        let h = setup(&dir);

        h.orchestrator.run(RunOptions::new()).await.unwrap();
        let forced = h
            .orchestrator
            .run(RunOptions::new().force_sync())
            .await
            .unwrap();

        assert_eq!(forced.outcome, RunOutcome::Completed);
        assert!(!forced.change.has_changed);
        assert_eq!(forced.succeeded, 4);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let h = setup(&dir);

        let report = h
            .orchestrator
            .run(RunOptions::new().dry_run())
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::DryRun);
        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 0);
        assert!(h.store.current_fingerprint().await.unwrap().is_none());
        assert!(!h.config.component_dir.exists());
        assert_eq!(h.telemetry.events_for("dry_run").len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_run() {
        let dir = TempDir::new().unwrap();
        let h = setup(&dir);
        h.source.set_failure(Some(MockFailure::Network));

        let err = h.orchestrator.run(RunOptions::new()).await.unwrap_err();

        assert!(matches!(err, SyncError::FetchNetwork { .. }));
        assert!(!h.config.component_dir.exists());
        let sync_errors: Vec<_> = h
            .telemetry
            .events_at(Level::ERROR)
            .into_iter()
            .filter(|e| e.operation == "sync")
            .collect();
        assert_eq!(sync_errors.len(), 1);
    }

    #[tokio::test]
    async fn test_page_without_components_warns() {
        let dir = TempDir::new().unwrap();
        let h = setup(&dir);
        h.source
            .set_page(URL, FetchedPage::new("<div><p>tiny</p></div>", ""));

        let report = h.orchestrator.run(RunOptions::new()).await.unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(h.telemetry.events_at(Level::WARN).len(), 1);
    }

    #[tokio::test]
    async fn test_material_change_rotates_and_reconverts() {
        let dir = TempDir::new().unwrap();
        let h = setup(&dir);

        h.orchestrator.run(RunOptions::new()).await.unwrap();
        let mut page = sample_page();
        page.markup = page.markup.replace("Build faster sites", "Ship faster sites");
        h.source.set_page(URL, page);

        let report = h.orchestrator.run(RunOptions::new()).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert!(report.change.previous_fingerprint.is_some());
        assert_eq!(h.store.list_history().await.unwrap().len(), 1);
        let hero = std::fs::read_to_string(h.config.component_dir.join("HeroIntro.astro")).unwrap();
        assert!(hero.contains("Ship faster sites"));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_io() {
        let dir = TempDir::new().unwrap();
        let config = SyncConfig::new("not a url").with_capture_dir(dir.path());
        let source = MockPageSource::new();

        let result = Orchestrator::new(
            config,
            Arc::new(source.clone()),
            Arc::new(FileStore::new(
                &SyncConfig::new(URL),
                Arc::new(RecordingTelemetry::new()),
            )),
            Arc::new(RecordingTelemetry::new()),
        );

        assert!(matches!(result, Err(SyncError::Configuration(_))));
        assert_eq!(source.fetch_call_count(), 0);
    }

    #[tokio::test]
    async fn test_stats_after_two_changes() {
        let dir = TempDir::new().unwrap();
        let h = setup(&dir);

        h.orchestrator.run(RunOptions::new()).await.unwrap();
        h.source
            .set_page(URL, FetchedPage::new("<h1>Other</h1>", ""));
        h.orchestrator.run(RunOptions::new()).await.unwrap();

        let stats = h.orchestrator.stats().await.unwrap();

        assert_eq!(stats.statistics.total, 2);
        assert_eq!(stats.statistics.unique, 2);
        assert_eq!(stats.recent.len(), 2);
        assert_eq!(stats.recent[0].label, "current");
        assert!(stats.usage.current > 0);
    }
}
