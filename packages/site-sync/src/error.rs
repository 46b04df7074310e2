//! Typed errors for the sync pipeline.
//!
//! Run-level failures (fetch, parse, storage, configuration) abort a run.
//! `Conversion` is scoped to one component and is recorded in that
//! component's artifact instead of being propagated.

use thiserror::Error;

/// Errors that can occur during a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote page did not answer within the configured timeout
    #[error("fetch timed out after {timeout_ms}ms: {url}")]
    FetchTimeout { url: String, timeout_ms: u64 },

    /// Transport or HTTP-level failure while fetching the remote page
    #[error("network error fetching {url}: {source}")]
    FetchNetwork {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Input markup cannot be trusted for segmentation
    #[error("parse error: {reason}")]
    Parse { reason: String },

    /// A single component could not be converted
    #[error("conversion failed for {component}: {reason}")]
    Conversion { component: String, reason: String },

    /// Filesystem failure while persisting or loading state
    #[error("storage error during {operation}: {source}")]
    Storage {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Missing or invalid settings
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SyncError {
    /// Build a storage error from any underlying failure.
    pub fn storage(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Storage {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Build a network error for a URL.
    pub fn network(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::FetchNetwork {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Build a parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Fetch failures may be retried by the invoker; nothing retries internally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchTimeout { .. } | Self::FetchNetwork { .. })
    }

    /// Stable label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchTimeout { .. } => "fetch_timeout",
            Self::FetchNetwork { .. } => "fetch_network_error",
            Self::Parse { .. } => "parse_error",
            Self::Conversion { .. } => "conversion_error",
            Self::Storage { .. } => "storage_error",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
