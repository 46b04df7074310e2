//! Page source trait for pluggable acquisition of the remote page.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::capture::FetchedPage;

/// Acquires the markup and style text of a remote page.
///
/// Implementations must enforce their own time bound and map transport
/// failures to `FetchTimeout` or `FetchNetwork`.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page at `url` together with its stylesheet text.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;

    /// Short name for log lines.
    fn name(&self) -> &str {
        "unknown"
    }
}
