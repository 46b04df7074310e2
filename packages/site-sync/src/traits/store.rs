//! Storage trait for captures, history and conversion output.
//!
//! Layout under the capture root:
//! - `current/`: the most recent capture
//! - `history/<timestamp>/`: superseded captures, keyed by their own capture time
//! - `processed/<component>-<timestamp>.<ext>`: one record per conversion attempt
//!
//! Successful artifacts are additionally written to the live component directory.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Result, SyncError};
use crate::types::artifact::ConversionArtifact;
use crate::types::capture::Capture;

/// Byte sizes of the store partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub total: u64,
    pub current: u64,
    pub history: u64,
    pub processed: u64,
}

impl StorageUsage {
    pub fn new(current: u64, history: u64, processed: u64) -> Self {
        Self {
            total: current + history + processed,
            current,
            history,
            processed,
        }
    }
}

/// One fingerprint in the capture timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    /// `"current"` or the history directory name
    pub label: String,
    pub fingerprint: String,
}

/// Aggregate view over the fingerprint timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashStatistics {
    pub total: usize,
    pub unique: usize,
    pub duplicates: usize,

    /// Label of the newest entry whose fingerprint differs from its predecessor
    pub most_recent_change: Option<String>,
}

impl HashStatistics {
    /// Derive statistics from entries ordered newest first.
    pub fn from_entries(entries: &[FingerprintEntry]) -> Self {
        let unique: HashSet<&str> = entries.iter().map(|e| e.fingerprint.as_str()).collect();

        let most_recent_change = entries
            .windows(2)
            .find(|pair| pair[0].fingerprint != pair[1].fingerprint)
            .map(|pair| pair[0].label.clone())
            .or_else(|| {
                // A single entry (or an unbroken run) changed when it was first captured
                entries.last().map(|e| e.label.clone())
            });

        Self {
            total: entries.len(),
            unique: unique.len(),
            duplicates: entries.len() - unique.len(),
            most_recent_change,
        }
    }
}

/// Persistence for captures and conversion artifacts.
#[async_trait]
pub trait CaptureStore: Send + Sync {
    /// Make `capture` the current one.
    ///
    /// The previous current capture is moved to history first, unless it has
    /// the same fingerprint, in which case `current` is refreshed in place.
    /// Returns the history entry name when a rotation happened.
    async fn save_capture(&self, capture: &Capture) -> Result<Option<String>>;

    /// Load the current capture (`None`) or a history entry by name.
    async fn load_capture(&self, timestamp: Option<&str>) -> Result<Option<Capture>>;

    /// Fingerprint of the current capture, if any.
    async fn current_fingerprint(&self) -> Result<Option<String>> {
        Ok(self.load_capture(None).await?.map(|c| c.fingerprint))
    }

    /// Persist the processed record and, on success, the live component files.
    async fn save_artifact(&self, artifact: &ConversionArtifact) -> Result<()>;

    /// History entry names, newest first.
    async fn list_history(&self) -> Result<Vec<String>>;

    /// Delete history entries captured before `cutoff`. An entry captured
    /// exactly at `cutoff` is kept.
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Delete history entries older than `days`.
    async fn prune_older_than(&self, days: u32) -> Result<usize> {
        let cutoff = Utc::now()
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| {
                SyncError::Configuration(format!(
                    "retention window of {} days reaches before the earliest supported date",
                    days
                ))
            })?;
        self.prune_before(cutoff).await
    }

    /// Byte sizes of `current`, `history` and `processed`.
    async fn usage(&self) -> Result<StorageUsage>;

    /// Current fingerprint followed by history fingerprints, newest first.
    async fn fingerprint_history(&self, limit: usize) -> Result<Vec<FingerprintEntry>> {
        let mut entries = Vec::new();

        if let Some(fingerprint) = self.current_fingerprint().await? {
            entries.push(FingerprintEntry {
                label: "current".to_string(),
                fingerprint,
            });
        }

        for name in self.list_history().await? {
            if entries.len() >= limit {
                break;
            }
            if let Some(capture) = self.load_capture(Some(&name)).await? {
                entries.push(FingerprintEntry {
                    label: name,
                    fingerprint: capture.fingerprint,
                });
            }
        }

        entries.truncate(limit);
        Ok(entries)
    }

    /// Statistics over the full fingerprint timeline.
    async fn hash_statistics(&self) -> Result<HashStatistics> {
        let entries = self.fingerprint_history(usize::MAX).await?;
        Ok(HashStatistics::from_entries(&entries))
    }
}

/// Format a byte count with one decimal, e.g. `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, fingerprint: &str) -> FingerprintEntry {
        FingerprintEntry {
            label: label.to_string(),
            fingerprint: fingerprint.to_string(),
        }
    }

    #[test]
    fn test_statistics_count_duplicates() {
        let entries = vec![
            entry("current", "bbb"),
            entry("2026-10-18T00-00-00-000Z", "bbb"),
            entry("2026-10-17T00-00-00-000Z", "aaa"),
            entry("2026-10-16T00-00-00-000Z", "aaa"),
        ];

        let stats = HashStatistics::from_entries(&entries);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.unique, 2);
        assert_eq!(stats.duplicates, 2);
        assert_eq!(
            stats.most_recent_change.as_deref(),
            Some("2026-10-18T00-00-00-000Z")
        );
    }

    #[test]
    fn test_statistics_empty_timeline() {
        let stats = HashStatistics::from_entries(&[]);
        assert_eq!(stats, HashStatistics::default());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(512), "512.0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_usage_total_is_sum() {
        let usage = StorageUsage::new(10, 20, 30);
        assert_eq!(usage.total, 60);
    }
}
