//! Logging infrastructure: run metrics persistence.
//!
//! Provides [`JsonlMetricsRecorder`], a JSONL file writer that implements
//! the [`MetricsRecorder`](docfiller_application::MetricsRecorder) port.

mod jsonl_metrics;

pub use jsonl_metrics::JsonlMetricsRecorder;
