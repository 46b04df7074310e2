//! Capture acquisition and change detection.
//!
//! The fetcher pulls the remote page through a [`PageSource`], fingerprints
//! it and writes it through the [`CaptureStore`]. Change detection compares
//! fingerprints textually against the current capture; it never diffs raw
//! content.

use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::fingerprint::Fingerprinter;
use crate::telemetry::{timed, Telemetry};
use crate::traits::{CaptureStore, PageSource};
use crate::types::capture::{short_fingerprint, Capture};
use crate::types::config::SyncConfig;

/// Outcome of a change check.
#[derive(Debug, Clone)]
pub struct ChangeCheck {
    pub has_changed: bool,
    pub previous_fingerprint: Option<String>,
    pub current_fingerprint: String,

    /// The capture produced by the check
    pub capture: Capture,
}

/// Fetches, fingerprints and persists captures.
pub struct Fetcher {
    source: Arc<dyn PageSource>,
    store: Arc<dyn CaptureStore>,
    fingerprinter: Fingerprinter,
    source_url: String,
    telemetry: Arc<dyn Telemetry>,
}

impl Fetcher {
    pub fn new(
        config: &SyncConfig,
        source: Arc<dyn PageSource>,
        store: Arc<dyn CaptureStore>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Result<Self> {
        Ok(Self {
            source,
            store,
            fingerprinter: Fingerprinter::new(&config.vendor.fingerprint_attribute_prefix)?,
            source_url: config.source_url.clone(),
            telemetry,
        })
    }

    /// Fetch and fingerprint without persisting anything.
    pub async fn fetch_only(&self) -> Result<Capture> {
        let page = timed(
            self.telemetry.as_ref(),
            "fetch",
            self.source.fetch(&self.source_url),
        )
        .await?;

        let fingerprint = self.fingerprinter.fingerprint(&page.markup, &page.styles);
        let capture = Capture::new(page, fingerprint, self.source_url.clone());

        debug!(
            source = self.source.name(),
            fingerprint = capture.short_fingerprint(),
            markup_bytes = capture.markup.len(),
            styles_bytes = capture.styles.len(),
            "Fetched page"
        );

        Ok(capture)
    }

    /// Fetch the page and make it the current capture.
    pub async fn capture(&self) -> Result<Capture> {
        let capture = self.fetch_only().await?;
        timed(
            self.telemetry.as_ref(),
            "save_capture",
            self.store.save_capture(&capture),
        )
        .await?;
        Ok(capture)
    }

    /// Fetch, compare against the stored fingerprint, then save.
    ///
    /// A missing previous capture counts as a change.
    pub async fn check_for_changes(&self) -> Result<ChangeCheck> {
        let previous = self.store.current_fingerprint().await?;
        let capture = self.capture().await?;
        let check = compare(previous, capture);
        self.report(&check);
        Ok(check)
    }

    /// Like [`check_for_changes`](Self::check_for_changes) but writes nothing.
    pub async fn check_without_saving(&self) -> Result<ChangeCheck> {
        let previous = self.store.current_fingerprint().await?;
        let capture = self.fetch_only().await?;
        let check = compare(previous, capture);
        self.report(&check);
        Ok(check)
    }

    fn report(&self, check: &ChangeCheck) {
        let previous = check
            .previous_fingerprint
            .as_deref()
            .map(short_fingerprint)
            .unwrap_or("none");
        self.telemetry.info(
            "check_for_changes",
            &format!(
                "previous={} current={} changed={}",
                previous,
                short_fingerprint(&check.current_fingerprint),
                check.has_changed
            ),
        );
    }
}

fn compare(previous: Option<String>, capture: Capture) -> ChangeCheck {
    let has_changed = previous.as_deref() != Some(capture.fingerprint.as_str());
    ChangeCheck {
        has_changed,
        previous_fingerprint: previous,
        current_fingerprint: capture.fingerprint.clone(),
        capture,
    }
}
