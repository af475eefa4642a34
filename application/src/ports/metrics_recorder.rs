//! Port for persisting run metrics.
//!
//! Separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port keeps one machine-readable
//! record per form-filling run.

use async_trait::async_trait;
use docfiller_domain::RunMetrics;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait MetricsRecorder: Send + Sync {
    /// Persist the metrics of a finished run
    async fn record(&self, metrics: &RunMetrics) -> Result<(), MetricsError>;
}

/// No-op implementation for tests and when metrics are disabled.
pub struct NoMetrics;

#[async_trait]
impl MetricsRecorder for NoMetrics {
    async fn record(&self, _metrics: &RunMetrics) -> Result<(), MetricsError> {
        Ok(())
    }
}
