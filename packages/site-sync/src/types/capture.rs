//! Capture types - one snapshot of the remote page.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Raw output of a page source, before fingerprinting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    /// Full document markup
    pub markup: String,

    /// Concatenated stylesheet text (inline and linked)
    pub styles: String,
}

impl FetchedPage {
    pub fn new(markup: impl Into<String>, styles: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            styles: styles.into(),
        }
    }
}

/// An immutable snapshot of the remote page.
///
/// `captured_at` is truncated to millisecond precision so that it survives
/// the round trip through `metadata.json` and history directory names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub markup: String,
    pub styles: String,

    /// 32 hex char content fingerprint
    pub fingerprint: String,

    pub captured_at: DateTime<Utc>,
    pub source_url: String,
}

impl Capture {
    /// Create a capture stamped with the current time.
    pub fn new(
        page: FetchedPage,
        fingerprint: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            markup: page.markup,
            styles: page.styles,
            fingerprint: fingerprint.into(),
            captured_at: Utc::now().trunc_subsecs(3),
            source_url: source_url.into(),
        }
    }

    /// Override the capture timestamp.
    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at.trunc_subsecs(3);
        self
    }

    /// First eight hex chars of the fingerprint, for log lines.
    pub fn short_fingerprint(&self) -> &str {
        short_fingerprint(&self.fingerprint)
    }

    pub fn metadata(&self) -> CaptureMetadata {
        CaptureMetadata {
            captured_at: self.captured_at,
            source_url: self.source_url.clone(),
            fingerprint: self.fingerprint.clone(),
            markup_size: self.markup.len(),
            styles_size: self.styles.len(),
        }
    }

    /// Rebuild a capture from its persisted parts.
    pub fn from_parts(markup: String, styles: String, metadata: CaptureMetadata) -> Self {
        Self {
            markup,
            styles,
            fingerprint: metadata.fingerprint,
            captured_at: metadata.captured_at,
            source_url: metadata.source_url,
        }
    }
}

/// Contents of `metadata.json` next to each persisted capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    pub captured_at: DateTime<Utc>,
    pub source_url: String,
    pub fingerprint: String,
    pub markup_size: usize,
    pub styles_size: usize,
}

/// Truncate a fingerprint for display.
pub fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..8).unwrap_or(fingerprint)
}

/// Filesystem-safe directory name for a timestamp.
///
/// The ISO-8601 form with millisecond precision has `:` and `.` replaced by
/// `-`, e.g. `2026-10-19T08-30-00-000Z`.
pub fn timestamp_dir_name(timestamp: DateTime<Utc>) -> String {
    timestamp
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Inverse of [`timestamp_dir_name`]. Returns `None` for foreign names.
pub fn parse_timestamp_dir_name(name: &str) -> Option<DateTime<Utc>> {
    let (date, time) = name.split_once('T')?;
    let time = time.strip_suffix('Z')?;
    let parts: Vec<&str> = time.split('-').collect();
    if parts.len() != 4 {
        return None;
    }
    let iso = format!(
        "{}T{}:{}:{}.{}Z",
        date, parts[0], parts[1], parts[2], parts[3]
    );
    DateTime::parse_from_rfc3339(&iso)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_dir_name_round_trip() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 5).unwrap()
            + chrono::Duration::milliseconds(123);

        let name = timestamp_dir_name(ts);
        assert_eq!(name, "2026-10-19T08-30-05-123Z");
        assert!(!name.contains(':'));
        assert!(!name.contains('.'));
        assert_eq!(parse_timestamp_dir_name(&name), Some(ts));
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert_eq!(parse_timestamp_dir_name("backup"), None);
        assert_eq!(parse_timestamp_dir_name("2026-10-19"), None);
        assert_eq!(parse_timestamp_dir_name("2026-10-19Tnot-a-time-Z"), None);
    }

    #[test]
    fn test_metadata_reports_byte_sizes() {
        let capture = Capture::new(
            FetchedPage::new("<p>héllo</p>", "p{}"),
            "0123456789abcdef0123456789abcdef",
            "https://example.com",
        );
        let meta = capture.metadata();

        assert_eq!(meta.markup_size, "<p>héllo</p>".len());
        assert_eq!(meta.styles_size, 3);
        assert_eq!(capture.short_fingerprint(), "01234567");
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let capture = Capture::new(FetchedPage::new("a", "b"), "f", "https://example.com");
        let json = serde_json::to_string(&capture.metadata()).unwrap();

        assert!(json.contains("\"capturedAt\""));
        assert!(json.contains("\"sourceUrl\""));
        assert!(json.contains("\"markupSize\""));
    }
}
