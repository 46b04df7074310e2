//! Injected logging capability.
//!
//! Components receive an `Arc<dyn Telemetry>` instead of reaching for a
//! global logger, so tests can swap in `NoopTelemetry` or the recording
//! implementation from [`crate::testing`].

use std::future::Future;
use std::time::Instant;

use tracing::Level;

use crate::error::Result;

/// Sink for operation-scoped log events.
pub trait Telemetry: Send + Sync {
    /// Record one event for an operation.
    fn record(&self, level: Level, operation: &str, message: &str);

    fn info(&self, operation: &str, message: &str) {
        self.record(Level::INFO, operation, message);
    }

    fn warn(&self, operation: &str, message: &str) {
        self.record(Level::WARN, operation, message);
    }

    fn error(&self, operation: &str, message: &str) {
        self.record(Level::ERROR, operation, message);
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record(&self, level: Level, operation: &str, message: &str) {
        if level == Level::ERROR {
            tracing::error!(operation, "{}", message);
        } else if level == Level::WARN {
            tracing::warn!(operation, "{}", message);
        } else if level == Level::INFO {
            tracing::info!(operation, "{}", message);
        } else {
            tracing::debug!(operation, "{}", message);
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _level: Level, _operation: &str, _message: &str) {}
}

/// Run a fallible future as a timed scope.
///
/// Success is recorded at info level with the elapsed time; failure is
/// recorded at error level with the elapsed time, the error's kind label
/// and its message, then returned unchanged.
pub async fn timed<T, F>(telemetry: &dyn Telemetry, operation: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = future.await;
    let elapsed_ms = started.elapsed().as_millis();

    match &result {
        Ok(_) => telemetry.info(operation, &format!("completed in {}ms", elapsed_ms)),
        Err(e) => telemetry.error(
            operation,
            &format!("failed after {}ms [{}]: {}", elapsed_ms, e.kind(), e),
        ),
    }

    result
}
