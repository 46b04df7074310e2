//! Filesystem storage for captures and conversion output.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::telemetry::Telemetry;
use crate::traits::store::{CaptureStore, StorageUsage};
use crate::types::artifact::ConversionArtifact;
use crate::types::capture::{
    parse_timestamp_dir_name, short_fingerprint, timestamp_dir_name, Capture, CaptureMetadata,
};
use crate::types::config::SyncConfig;

const MARKUP_FILE: &str = "index.html";
const STYLES_FILE: &str = "styles.css";
const FINGERPRINT_FILE: &str = "hash.txt";
const METADATA_FILE: &str = "metadata.json";

const CAPTURE_FILES: [&str; 4] = [MARKUP_FILE, STYLES_FILE, FINGERPRINT_FILE, METADATA_FILE];

/// Capture store backed by a directory tree.
///
/// Not safe for concurrent runs against the same root; callers serialize.
pub struct FileStore {
    capture_dir: PathBuf,
    component_dir: PathBuf,
    template_extension: String,
    telemetry: Arc<dyn Telemetry>,
}

impl FileStore {
    pub fn new(config: &SyncConfig, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            capture_dir: config.capture_dir.clone(),
            component_dir: config.component_dir.clone(),
            template_extension: config.template_extension.clone(),
            telemetry,
        }
    }

    pub fn current_dir(&self) -> PathBuf {
        self.capture_dir.join("current")
    }

    pub fn history_dir(&self) -> PathBuf {
        self.capture_dir.join("history")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.capture_dir.join("processed")
    }

    pub fn component_dir(&self) -> &Path {
        &self.component_dir
    }

    /// Path of the live template for a component.
    pub fn live_template_path(&self, stem: &str) -> PathBuf {
        self.component_dir
            .join(format!("{}.{}", stem, self.template_extension))
    }

    async fn ensure_layout(&self) -> Result<()> {
        for dir in [self.current_dir(), self.history_dir(), self.processed_dir()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| SyncError::storage("create_layout", e))?;
        }
        Ok(())
    }

    /// Move the current capture files into a history entry.
    ///
    /// Missing files are ignored; a failed move never aborts the save.
    async fn rotate_current(&self) -> Result<String> {
        let current = self.current_dir();

        let captured_at = match read_optional(&current.join(METADATA_FILE)).await {
            Ok(Some(json)) => serde_json::from_str::<CaptureMetadata>(&json)
                .map(|m| m.captured_at)
                .unwrap_or_else(|_| Utc::now()),
            _ => Utc::now(),
        };

        let name = timestamp_dir_name(captured_at);
        let target = self.history_dir().join(&name);
        fs::create_dir_all(&target)
            .await
            .map_err(|e| SyncError::storage("rotate_current", e))?;

        for file in CAPTURE_FILES {
            if let Err(e) = fs::rename(current.join(file), target.join(file)).await {
                debug!(file, error = %e, "Skipping file during rotation");
            }
        }

        Ok(name)
    }

    fn capture_dir_for(&self, timestamp: Option<&str>) -> PathBuf {
        match timestamp {
            Some(name) => self.history_dir().join(name),
            None => self.current_dir(),
        }
    }
}

#[async_trait]
impl CaptureStore for FileStore {
    async fn save_capture(&self, capture: &Capture) -> Result<Option<String>> {
        self.ensure_layout().await?;

        let previous = self.current_fingerprint().await?;
        let rotated = match previous {
            Some(ref previous) if *previous != capture.fingerprint => {
                let name = self.rotate_current().await?;
                self.telemetry.info(
                    "save_capture",
                    &format!(
                        "moved {} to history/{}",
                        short_fingerprint(previous),
                        name
                    ),
                );
                Some(name)
            }
            _ => None,
        };

        let metadata = serde_json::to_string_pretty(&capture.metadata())
            .map_err(|e| SyncError::storage("save_capture", e))?;

        let current = self.current_dir();
        tokio::try_join!(
            fs::write(current.join(MARKUP_FILE), &capture.markup),
            fs::write(current.join(STYLES_FILE), &capture.styles),
            fs::write(current.join(FINGERPRINT_FILE), &capture.fingerprint),
            fs::write(current.join(METADATA_FILE), metadata),
        )
        .map_err(|e| SyncError::storage("save_capture", e))?;

        debug!(
            fingerprint = capture.short_fingerprint(),
            rotated = rotated.is_some(),
            "Saved capture"
        );

        Ok(rotated)
    }

    async fn load_capture(&self, timestamp: Option<&str>) -> Result<Option<Capture>> {
        let dir = self.capture_dir_for(timestamp);
        let markup_path = dir.join(MARKUP_FILE);
        let styles_path = dir.join(STYLES_FILE);
        let metadata_path = dir.join(METADATA_FILE);

        let (markup, styles, metadata) = tokio::try_join!(
            read_optional(&markup_path),
            read_optional(&styles_path),
            read_optional(&metadata_path),
        )
        .map_err(|e| SyncError::storage("load_capture", e))?;

        let (Some(markup), Some(styles), Some(metadata)) = (markup, styles, metadata) else {
            return Ok(None);
        };

        let metadata: CaptureMetadata = serde_json::from_str(&metadata)
            .map_err(|e| SyncError::storage("load_capture", e))?;

        Ok(Some(Capture::from_parts(markup, styles, metadata)))
    }

    async fn current_fingerprint(&self) -> Result<Option<String>> {
        let fingerprint = read_optional(&self.current_dir().join(FINGERPRINT_FILE))
            .await
            .map_err(|e| SyncError::storage("current_fingerprint", e))?;

        Ok(fingerprint
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty()))
    }

    async fn save_artifact(&self, artifact: &ConversionArtifact) -> Result<()> {
        let processed = self.processed_dir();
        fs::create_dir_all(&processed)
            .await
            .map_err(|e| SyncError::storage("save_artifact", e))?;

        let record = processed.join(format!(
            "{}-{}.{}",
            artifact.target_file_stem,
            timestamp_dir_name(Utc::now()),
            self.template_extension
        ));
        fs::write(&record, artifact.processed_record())
            .await
            .map_err(|e| SyncError::storage("save_artifact", e))?;

        if !artifact.succeeded {
            debug!(
                component = %artifact.target_file_stem,
                "Conversion failed, live output left untouched"
            );
            return Ok(());
        }

        fs::create_dir_all(&self.component_dir)
            .await
            .map_err(|e| SyncError::storage("save_artifact", e))?;

        write_atomic(
            &self.live_template_path(&artifact.target_file_stem),
            &artifact.template_text,
        )
        .await
        .map_err(|e| SyncError::storage("save_artifact", e))?;

        let css = self
            .component_dir
            .join(format!("{}.css", artifact.target_file_stem));
        if artifact.style_text.trim().is_empty() {
            // The new template has no styles; drop any sheet from an earlier run
            match fs::remove_file(&css).await {
                Ok(()) => debug!(path = %css.display(), "Removed stale stylesheet"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(SyncError::storage("save_artifact", e)),
            }
        } else {
            write_atomic(&css, &artifact.style_text)
                .await
                .map_err(|e| SyncError::storage("save_artifact", e))?;
        }

        Ok(())
    }

    async fn list_history(&self) -> Result<Vec<String>> {
        let mut entries: Vec<(DateTime<Utc>, String)> = history_entries(&self.history_dir())
            .await
            .map_err(|e| SyncError::storage("list_history", e))?
            .into_iter()
            .filter_map(|name| parse_timestamp_dir_name(&name).map(|ts| (ts, name)))
            .collect();

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries.into_iter().map(|(_, name)| name).collect())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let history = self.history_dir();
        let names = history_entries(&history)
            .await
            .map_err(|e| SyncError::storage("prune_history", e))?;

        let mut deleted = 0;
        for name in names {
            let Some(captured_at) = parse_timestamp_dir_name(&name) else {
                self.telemetry.warn(
                    "prune_history",
                    &format!("skipping history entry with unparsable name {:?}", name),
                );
                continue;
            };

            if captured_at < cutoff {
                fs::remove_dir_all(history.join(&name))
                    .await
                    .map_err(|e| SyncError::storage("prune_history", e))?;
                debug!(entry = %name, "Deleted expired history entry");
                deleted += 1;
            }
        }

        if deleted > 0 {
            self.telemetry.info(
                "prune_history",
                &format!("deleted {} history entries", deleted),
            );
        }

        Ok(deleted)
    }

    async fn usage(&self) -> Result<StorageUsage> {
        let (current, history, processed) = tokio::try_join!(
            dir_size(self.current_dir()),
            dir_size(self.history_dir()),
            dir_size(self.processed_dir()),
        )
        .map_err(|e| SyncError::storage("usage", e))?;

        Ok(StorageUsage::new(current, history, processed))
    }
}

/// Read a file, mapping "not found" to `None`.
async fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write to a temporary sibling, then rename into place.
async fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&tmp, contents).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Names of the directories under `history`. A missing root is empty.
async fn history_entries(history: &Path) -> std::io::Result<Vec<String>> {
    let mut reader = match fs::read_dir(history).await {
        Ok(reader) => reader,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Total size of regular files below `root`. A missing root is zero.
async fn dir_size(root: PathBuf) -> std::io::Result<u64> {
    let mut total = 0;
    let mut pending = vec![root];

    while let Some(dir) = pending.pop() {
        let mut reader = match fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        while let Some(entry) = reader.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                pending.push(entry.path());
            } else {
                total += metadata.len();
            }
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::NoopTelemetry;
    use crate::testing::RecordingTelemetry;
    use crate::types::capture::FetchedPage;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;
    use tracing::Level;

    fn store_in(dir: &TempDir) -> FileStore {
        let config = SyncConfig::new("https://example.com")
            .with_capture_dir(dir.path().join("data"))
            .with_component_dir(dir.path().join("components"));
        FileStore::new(&config, Arc::new(NoopTelemetry))
    }

    fn capture(markup: &str, fingerprint: &str, at: DateTime<Utc>) -> Capture {
        Capture::new(
            FetchedPage::new(markup, ".a { color: red; }"),
            fingerprint,
            "https://example.com",
        )
        .with_captured_at(at)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load_current() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.load_capture(None).await.unwrap().is_none());
        assert!(store.current_fingerprint().await.unwrap().is_none());

        let first = capture("<p>one</p>", "aaaa0000aaaa0000aaaa0000aaaa0000", at(1, 8));
        let rotated = store.save_capture(&first).await.unwrap();
        assert!(rotated.is_none());

        let loaded = store.load_capture(None).await.unwrap().unwrap();
        assert_eq!(loaded, first);
        assert_eq!(
            store.current_fingerprint().await.unwrap().as_deref(),
            Some("aaaa0000aaaa0000aaaa0000aaaa0000")
        );
    }

    #[tokio::test]
    async fn test_new_fingerprint_rotates_previous_by_its_own_timestamp() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let first = capture("<p>one</p>", "a".repeat(32).as_str(), at(1, 8));
        let second = capture("<p>two</p>", "b".repeat(32).as_str(), at(2, 8));

        store.save_capture(&first).await.unwrap();
        let rotated = store.save_capture(&second).await.unwrap();

        assert_eq!(rotated.as_deref(), Some("2026-10-01T08-00-00-000Z"));
        assert_eq!(store.list_history().await.unwrap(), vec!["2026-10-01T08-00-00-000Z"]);

        let archived = store
            .load_capture(Some("2026-10-01T08-00-00-000Z"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(archived, first);
        assert_eq!(store.load_capture(None).await.unwrap().unwrap(), second);
    }

    #[tokio::test]
    async fn test_same_fingerprint_refreshes_without_rotation() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let fingerprint = "c".repeat(32);

        store
            .save_capture(&capture("<p>x</p>", &fingerprint, at(1, 8)))
            .await
            .unwrap();
        let rotated = store
            .save_capture(&capture("<p>x</p>", &fingerprint, at(1, 9)))
            .await
            .unwrap();

        assert!(rotated.is_none());
        assert!(store.list_history().await.unwrap().is_empty());
        let current = store.load_capture(None).await.unwrap().unwrap();
        assert_eq!(current.captured_at, at(1, 9));
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for (i, day) in [3u32, 1, 2, 4].iter().enumerate() {
            let fingerprint = format!("{:032}", i);
            store
                .save_capture(&capture("<p>x</p>", &fingerprint, at(*day, 0)))
                .await
                .unwrap();
        }

        // The last save stays current; the other three rotate
        assert_eq!(
            store.list_history().await.unwrap(),
            vec![
                "2026-10-03T00-00-00-000Z",
                "2026-10-02T00-00-00-000Z",
                "2026-10-01T00-00-00-000Z",
            ]
        );
    }

    #[tokio::test]
    async fn test_prune_boundary_keeps_cutoff_deletes_older() {
        let dir = TempDir::new().unwrap();
        let telemetry = Arc::new(RecordingTelemetry::new());
        let config = SyncConfig::new("https://example.com").with_capture_dir(dir.path());
        let store = FileStore::new(&config, telemetry.clone());

        let cutoff = at(10, 12);
        let at_cutoff = timestamp_dir_name(cutoff);
        let just_before = timestamp_dir_name(cutoff - Duration::seconds(1));

        for name in [at_cutoff.as_str(), just_before.as_str(), "notes"] {
            let entry = store.history_dir().join(name);
            std::fs::create_dir_all(&entry).unwrap();
            std::fs::write(entry.join(MARKUP_FILE), "<p>old</p>").unwrap();
        }

        let deleted = store.prune_before(cutoff).await.unwrap();

        assert_eq!(deleted, 1);
        assert!(store.history_dir().join(&at_cutoff).exists());
        assert!(!store.history_dir().join(&just_before).exists());
        assert!(store.history_dir().join("notes").exists());

        let warnings = telemetry.events_at(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("notes"));
    }

    #[tokio::test]
    async fn test_prune_older_than_days() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let old = timestamp_dir_name(Utc::now() - Duration::days(40));
        let recent = timestamp_dir_name(Utc::now() - Duration::days(1));
        for name in [&old, &recent] {
            std::fs::create_dir_all(store.history_dir().join(name)).unwrap();
        }

        assert_eq!(store.prune_older_than(30).await.unwrap(), 1);
        assert_eq!(store.list_history().await.unwrap(), vec![recent]);
    }

    #[tokio::test]
    async fn test_prune_with_out_of_range_window_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let kept = timestamp_dir_name(Utc::now() - Duration::days(400));
        std::fs::create_dir_all(store.history_dir().join(&kept)).unwrap();

        let err = store.prune_older_than(u32::MAX).await.unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert_eq!(store.list_history().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_prune_without_history_dir() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.prune_older_than(30).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_artifact_success_overwrites_live_output() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let artifact = ConversionArtifact::success("Hero", "---\n---\n<section></section>\n", ".hero {}");
        store.save_artifact(&artifact).await.unwrap();

        let live = std::fs::read_to_string(store.live_template_path("Hero")).unwrap();
        assert_eq!(live, artifact.template_text);
        let css = std::fs::read_to_string(store.component_dir().join("Hero.css")).unwrap();
        assert_eq!(css, ".hero {}");

        let records: Vec<_> = std::fs::read_dir(store.processed_dir()).unwrap().collect();
        assert_eq!(records.len(), 1);

        // No temporary files left behind
        let leftovers: Vec<_> = std::fs::read_dir(store.component_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_artifact_without_styles_removes_previous_sheet() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let css = store.component_dir().join("Hero.css");

        let styled = ConversionArtifact::success("Hero", "<section>v1</section>", ".hero {}");
        store.save_artifact(&styled).await.unwrap();
        assert!(css.exists());

        let plain = ConversionArtifact::success("Hero", "<section>v2</section>", "  \n");
        store.save_artifact(&plain).await.unwrap();
        assert!(!css.exists());
        assert_eq!(
            std::fs::read_to_string(store.live_template_path("Hero")).unwrap(),
            "<section>v2</section>"
        );

        // Nothing to remove the second time
        store.save_artifact(&plain).await.unwrap();
    }

    #[tokio::test]
    async fn test_artifact_failure_keeps_previous_live_output() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let good = ConversionArtifact::success("Hero", "<section>good</section>", "");
        store.save_artifact(&good).await.unwrap();

        let bad = ConversionArtifact::failure("Hero", "malformed markup");
        store.save_artifact(&bad).await.unwrap();

        let live = std::fs::read_to_string(store.live_template_path("Hero")).unwrap();
        assert_eq!(live, "<section>good</section>");
        assert!(!store.component_dir().join("Hero.css").exists());

        let failure_record = std::fs::read_dir(store.processed_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| std::fs::read_to_string(e.path()).unwrap())
            .any(|text| text.contains("conversion failed: malformed markup"));
        assert!(failure_record);
    }

    #[tokio::test]
    async fn test_usage_reports_partition_sizes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let empty = store.usage().await.unwrap();
        assert_eq!(empty, StorageUsage::default());

        store
            .save_capture(&capture("<p>x</p>", &"d".repeat(32), at(1, 0)))
            .await
            .unwrap();
        let usage = store.usage().await.unwrap();

        assert!(usage.current > 0);
        assert_eq!(usage.history, 0);
        assert_eq!(usage.total, usage.current + usage.history + usage.processed);
    }

    #[tokio::test]
    async fn test_fingerprint_history_and_statistics() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let a = "a".repeat(32);
        let b = "b".repeat(32);
        store.save_capture(&capture("<p>1</p>", &a, at(1, 0))).await.unwrap();
        store.save_capture(&capture("<p>2</p>", &b, at(2, 0))).await.unwrap();
        store.save_capture(&capture("<p>3</p>", &a, at(3, 0))).await.unwrap();

        let entries = store.fingerprint_history(10).await.unwrap();
        let labels: Vec<_> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["current", "2026-10-02T00-00-00-000Z", "2026-10-01T00-00-00-000Z"]
        );
        assert_eq!(store.fingerprint_history(2).await.unwrap().len(), 2);

        let stats = store.hash_statistics().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unique, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.most_recent_change.as_deref(), Some("current"));
    }
}
