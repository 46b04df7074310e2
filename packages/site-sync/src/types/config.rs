//! Configuration for the sync pipeline.
//!
//! One explicit `SyncConfig` is built at startup and handed to each
//! component's constructor.

use scraper::Selector;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SyncError};

/// Longest accepted history retention window, in days.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Settings for acquiring the remote page.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Hard bound on the whole round trip
    pub timeout: Duration,

    pub user_agent: String,

    /// Also download `link[rel=stylesheet]` targets
    pub include_linked_styles: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "SiteSync-Bot/1.0".to_string(),
            include_linked_styles: true,
        }
    }
}

/// Site-builder scaffolding that is stripped before segmentation and hashing.
#[derive(Debug, Clone)]
pub struct VendorRules {
    /// Elements matching any of these selectors are removed
    pub remove_selectors: Vec<String>,

    /// Attributes whose name starts with any of these are removed
    pub strip_attribute_prefixes: Vec<String>,

    /// Attribute prefix treated as noise by the fingerprint
    pub fingerprint_attribute_prefix: String,
}

impl Default for VendorRules {
    fn default() -> Self {
        Self {
            remove_selectors: vec![
                "[data-ready-ai]".to_string(),
                "script[src*=\"ready\"]".to_string(),
                ".ready-watermark".to_string(),
                ".ready-branding".to_string(),
                "[class*=\"ready-\"]".to_string(),
            ],
            strip_attribute_prefixes: vec![
                "data-ready".to_string(),
                "data-component-id".to_string(),
            ],
            fingerprint_attribute_prefix: "data-ready-".to_string(),
        }
    }
}

/// Configuration for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote page to mirror
    pub source_url: String,

    /// Root holding `current/`, `history/` and `processed/`
    pub capture_dir: PathBuf,

    /// Live component output directory
    pub component_dir: PathBuf,

    /// History entries older than this many days are deleted. Default: 30.
    pub retention_days: u32,

    /// Minimum log level for the binary. Default: "info".
    pub log_level: String,

    pub fetch: FetchSettings,
    pub vendor: VendorRules,

    /// Visible text a leftover section needs before it becomes a component.
    /// Default: 50.
    pub min_section_text_len: usize,

    /// Extension of generated templates. Default: "astro".
    pub template_extension: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            capture_dir: PathBuf::from("./scraped-data"),
            component_dir: PathBuf::from("./src/components/synced"),
            retention_days: 30,
            log_level: "info".to_string(),
            fetch: FetchSettings::default(),
            vendor: VendorRules::default(),
            min_section_text_len: 50,
            template_extension: "astro".to_string(),
        }
    }
}

impl SyncConfig {
    /// Create a config for a source URL with default settings.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source_url = lookup("SITE_SYNC_SOURCE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| SyncError::Configuration("SITE_SYNC_SOURCE_URL must be set".into()))?;

        let mut config = Self::new(source_url);

        if let Some(dir) = lookup("SITE_SYNC_CAPTURE_DIR") {
            config.capture_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("SITE_SYNC_COMPONENT_DIR") {
            config.component_dir = PathBuf::from(dir);
        }
        if let Some(days) = lookup("SITE_SYNC_RETENTION_DAYS") {
            config.retention_days = days.trim().parse().map_err(|_| {
                SyncError::Configuration(format!(
                    "SITE_SYNC_RETENTION_DAYS must be a whole number of days, got {:?}",
                    days
                ))
            })?;
        }
        if let Some(level) = lookup("SITE_SYNC_LOG_LEVEL") {
            config.log_level = level.trim().to_lowercase();
        }
        if let Some(secs) = lookup("SITE_SYNC_FETCH_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                SyncError::Configuration(format!(
                    "SITE_SYNC_FETCH_TIMEOUT_SECS must be a number of seconds, got {:?}",
                    secs
                ))
            })?;
            config.fetch.timeout = Duration::from_secs(secs);
        }
        if let Some(agent) = lookup("SITE_SYNC_USER_AGENT") {
            config.fetch.user_agent = agent;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = dir.into();
        self
    }

    pub fn with_component_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.component_dir = dir.into();
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch.timeout = timeout;
        self
    }

    pub fn with_vendor_rules(mut self, vendor: VendorRules) -> Self {
        self.vendor = vendor;
        self
    }

    /// Check settings before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.source_url).map_err(|e| {
            SyncError::Configuration(format!("invalid source URL {:?}: {}", self.source_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::Configuration(format!(
                "source URL must be http(s), got scheme {:?}",
                url.scheme()
            )));
        }

        if self.retention_days == 0 {
            return Err(SyncError::Configuration(
                "retention window must be at least one day".into(),
            ));
        }
        if self.retention_days > MAX_RETENTION_DAYS {
            return Err(SyncError::Configuration(format!(
                "retention window must be at most {} days, got {}",
                MAX_RETENTION_DAYS, self.retention_days
            )));
        }

        if self.fetch.timeout.is_zero() {
            return Err(SyncError::Configuration("fetch timeout must be non-zero".into()));
        }

        for selector in &self.vendor.remove_selectors {
            Selector::parse(selector).map_err(|e| {
                SyncError::Configuration(format!(
                    "invalid vendor selector {:?}: {:?}",
                    selector, e
                ))
            })?;
        }

        Ok(())
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
}
