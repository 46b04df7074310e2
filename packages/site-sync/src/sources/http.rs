//! HTTP page source.
//!
//! Fetches the document, then collects inline `<style>` blocks and the
//! targets of `link[rel=stylesheet]`. The whole round trip, stylesheets
//! included, is bounded by the configured timeout.

use async_trait::async_trait;
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::error::{Result, SyncError};
use crate::telemetry::Telemetry;
use crate::traits::source::PageSource;
use crate::types::capture::FetchedPage;
use crate::types::config::FetchSettings;

lazy_static! {
    static ref STYLE_BLOCK: Selector = Selector::parse("style").unwrap();
    static ref STYLESHEET_LINK: Selector = Selector::parse("link[rel=\"stylesheet\"][href]").unwrap();
}

/// Page source that fetches over HTTP with `reqwest`.
pub struct HttpPageSource {
    client: reqwest::Client,
    settings: FetchSettings,
    telemetry: Arc<dyn Telemetry>,
}

impl HttpPageSource {
    pub fn new(settings: FetchSettings, telemetry: Arc<dyn Telemetry>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| SyncError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings,
            telemetry,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        debug!(url = %url, "HTTP fetch starting");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::network(url, format!("HTTP {}", status)));
        }

        let base = response.url().clone();
        let markup = response
            .text()
            .await
            .map_err(|e| SyncError::network(url, e))?;

        let (inline, linked) = collect_styles(&markup, &base);

        let mut parts = Vec::with_capacity(inline.len() + linked.len());
        if self.settings.include_linked_styles {
            for href in linked {
                parts.push(self.fetch_stylesheet(&href).await);
            }
        }
        parts.extend(inline);

        debug!(
            url = %url,
            markup_bytes = markup.len(),
            stylesheets = parts.len(),
            "HTTP fetch complete"
        );

        Ok(FetchedPage::new(markup, parts.join("\n\n")))
    }

    /// Fetch one linked stylesheet. Failures become a marker comment.
    async fn fetch_stylesheet(&self, href: &str) -> String {
        let result = async {
            let response = self.client.get(href).send().await?.error_for_status()?;
            Ok::<_, reqwest::Error>(response.text().await?)
        }
        .await;

        match result {
            Ok(css) => format!("/* From: {} */\n{}", href, css),
            Err(e) => {
                self.telemetry.warn(
                    "fetch_stylesheet",
                    &format!("failed to fetch {}: {}", href, e),
                );
                format!("/* Failed to fetch: {} */", href)
            }
        }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        match tokio::time::timeout(self.settings.timeout, self.fetch_page(url)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::FetchTimeout {
                url: url.to_string(),
                timeout_ms: self.settings.timeout.as_millis() as u64,
            }),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Inline style text and absolute stylesheet URLs, in document order.
///
/// Kept synchronous: the parsed document must not live across an await.
fn collect_styles(markup: &str, base: &Url) -> (Vec<String>, Vec<String>) {
    let document = Html::parse_document(markup);

    let inline = document
        .select(&STYLE_BLOCK)
        .map(|el| el.text().collect::<String>())
        .filter(|css| !css.trim().is_empty())
        .collect();

    let linked = document
        .select(&STYLESHEET_LINK)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| !href.starts_with("data:"))
        .filter_map(|href| base.join(href).ok())
        .map(|url| url.to_string())
        .collect();

    (inline, linked)
}
