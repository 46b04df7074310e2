//! Testing utilities including a recording telemetry sink and sample pages.
//!
//! These are useful for exercising the pipeline without a real site or a
//! global tracing subscriber.

use std::sync::{Arc, RwLock};

use tracing::Level;

use crate::telemetry::Telemetry;
use crate::types::capture::FetchedPage;

/// One event captured by [`RecordingTelemetry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    pub level: Level,
    pub operation: String,
    pub message: String,
}

/// Telemetry sink that keeps every event for assertions.
#[derive(Debug, Default, Clone)]
pub struct RecordingTelemetry {
    events: Arc<RwLock<Vec<TelemetryEvent>>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in arrival order.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.read().unwrap().clone()
    }

    /// Events recorded at exactly `level`.
    pub fn events_at(&self, level: Level) -> Vec<TelemetryEvent> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Events recorded for one operation.
    pub fn events_for(&self, operation: &str) -> Vec<TelemetryEvent> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.operation == operation)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.write().unwrap().clear();
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, level: Level, operation: &str, message: &str) {
        self.events.write().unwrap().push(TelemetryEvent {
            level,
            operation: operation.to_string(),
            message: message.to_string(),
        });
    }
}

/// A small landing page with a header, hero, features grid and footer.
pub fn sample_page() -> FetchedPage {
    let markup = r#"<!DOCTYPE html>
<html>
<head><title>Sample</title></head>
<body>
  <header class="site-header">
    <nav><a href="/">Home</a><a href="/about">About</a></nav>
  </header>
  <section class="hero" id="intro">
    <h1>Build faster sites</h1>
    <p>Everything you need to ship a landing page in an afternoon.</p>
    <img src="/img/hero.png" alt="Product screenshot">
  </section>
  <section class="features">
    <h2>Features</h2>
    <div class="feature"><h3>Fast</h3><p>Pages load in milliseconds.</p></div>
    <div class="feature"><h3>Simple</h3><p>No build step to learn.</p></div>
  </section>
  <footer class="footer"><p>Copyright 2026 Example Inc.</p></footer>
  <div class="ready-watermark">Made with Ready</div>
</body>
</html>"#;

    let styles = r#".site-header {
  display: flex;
  justify-content: space-between;
  padding: 20px;
}
.hero {
  background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
  padding: 80px;
}
.hero h1 {
  font-size: 48px;
  color: #f5f7fa;
}
.features {
  display: grid;
  grid-template-columns: repeat(3, 1fr);
  gap: 20px;
}
.footer {
  margin: 40px;
}"#;

    FetchedPage::new(markup, styles)
}
