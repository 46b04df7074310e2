//! Site Component Sync
//!
//! Keeps a local component library in sync with a page built by a hosted
//! site builder. Each run fetches the published page, fingerprints it,
//! and when the content materially changed, segments the markup into
//! semantic components and converts each one into a parameterized
//! template with translated styles.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use site_sync::{Orchestrator, RunOptions, SyncConfig, TracingTelemetry};
//!
//! let config = SyncConfig::new("https://landing.example.com")
//!     .with_capture_dir("./scraped-data");
//! let orchestrator = Orchestrator::from_config(config, Arc::new(TracingTelemetry))?;
//!
//! let report = orchestrator.run(RunOptions::new()).await?;
//! println!("{} of {} components converted", report.succeeded, report.total);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams for page acquisition and persistence
//! - [`types`] - Captures, components, artifacts and configuration
//! - [`fetcher`] - Capture acquisition and change detection
//! - [`pipeline`] - Identification, conversion and run orchestration
//! - [`sources`] - Page source implementations (HTTP, mock)
//! - [`stores`] - Filesystem capture store
//! - [`testing`] - Recording telemetry and sample pages

pub mod error;
pub mod fetcher;
pub mod fingerprint;
pub mod pipeline;
pub mod sources;
pub mod stores;
pub mod telemetry;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{Result, SyncError};
pub use fetcher::{ChangeCheck, Fetcher};
pub use fingerprint::{fingerprint, Fingerprinter};
pub use pipeline::{
    ChangeSummary, ComponentFailure, ComponentIdentifier, ComponentSummary, Orchestrator,
    RunOptions, RunOutcome, StatsReport, SyncReport, Transformer,
};
pub use sources::{HttpPageSource, MockPageSource};
pub use stores::FileStore;
pub use telemetry::{NoopTelemetry, Telemetry, TracingTelemetry};
pub use traits::{
    format_bytes, CaptureStore, FingerprintEntry, HashStatistics, PageSource, StorageUsage,
};
pub use types::{
    artifact::ConversionArtifact,
    capture::{Capture, CaptureMetadata, FetchedPage},
    component::{CandidateComponent, ComponentParameters, ComponentType},
    config::{FetchSettings, SyncConfig, VendorRules},
};
