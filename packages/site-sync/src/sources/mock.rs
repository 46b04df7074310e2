//! Mock page source for testing.
//!
//! Serves canned pages by URL, can be told to fail, and records every call.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Result, SyncError};
use crate::traits::source::PageSource;
use crate::types::capture::FetchedPage;

/// Failure to inject on the next fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Timeout,
    Network,
}

/// Mock page source.
///
/// ```rust
/// use site_sync::sources::MockPageSource;
/// use site_sync::types::capture::FetchedPage;
///
/// let source = MockPageSource::new()
///     .with_page("https://example.com", FetchedPage::new("<h1>Hi</h1>", ""));
/// assert_eq!(source.fetch_call_count(), 0);
/// ```
#[derive(Default, Clone)]
pub struct MockPageSource {
    pages: Arc<RwLock<HashMap<String, FetchedPage>>>,
    failure: Arc<RwLock<Option<MockFailure>>>,
    fetch_calls: Arc<RwLock<Vec<String>>>,
}

impl MockPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` for `url`, replacing any previous page.
    pub fn set_page(&self, url: impl Into<String>, page: FetchedPage) {
        self.pages.write().unwrap().insert(url.into(), page);
    }

    /// Builder form of [`set_page`](Self::set_page).
    pub fn with_page(self, url: impl Into<String>, page: FetchedPage) -> Self {
        self.set_page(url, page);
        self
    }

    /// Make every fetch fail until cleared with `None`.
    pub fn set_failure(&self, failure: Option<MockFailure>) {
        *self.failure.write().unwrap() = failure;
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.read().unwrap().len()
    }

    /// URLs requested, in call order.
    pub fn fetch_calls(&self) -> Vec<String> {
        self.fetch_calls.read().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for MockPageSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.fetch_calls.write().unwrap().push(url.to_string());

        let failure = *self.failure.read().unwrap();
        match failure {
            Some(MockFailure::Timeout) => Err(SyncError::FetchTimeout {
                url: url.to_string(),
                timeout_ms: 0,
            }),
            Some(MockFailure::Network) => Err(SyncError::network(url, "mock network failure")),
            None => self
                .pages
                .read()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| SyncError::network(url, "HTTP 404 Not Found")),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
