//! JSONL file writer for run metrics.
//!
//! Each finished run is serialized as a single JSON line with a `type`
//! field and `timestamp`, appended to the file via a buffered writer.

use async_trait::async_trait;
use docfiller_application::{MetricsError, MetricsRecorder};
use docfiller_domain::RunMetrics;
use serde_json::json;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// JSONL metrics recorder that appends one JSON object per run.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every record
/// and on `Drop`.
pub struct JsonlMetricsRecorder {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlMetricsRecorder {
    /// Open the metrics file for appending.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MetricsError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the metrics file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn record_line(metrics: &RunMetrics) -> serde_json::Value {
    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    json!({
        "type": "run",
        "timestamp": timestamp,
        "started_at": metrics.started_at.to_rfc3339(),
        "finished_at": metrics.finished_at.map(|t| t.to_rfc3339()),
        "model": metrics.model,
        "total_questions": metrics.total_questions,
        "to_be_filled": metrics.to_be_filled,
        "successful": metrics.successful,
        "failed": metrics.failed(),
        "response_times": metrics.response_times,
        "average_response_time": metrics.average_response_time(),
        "duration_seconds": metrics.duration_seconds(),
    })
}

#[async_trait]
impl MetricsRecorder for JsonlMetricsRecorder {
    async fn record(&self, metrics: &RunMetrics) -> Result<(), MetricsError> {
        let line = serde_json::to_string(&record_line(metrics))?;

        let mut writer = self.writer.lock().unwrap_or_else(|poisoned| {
            warn!(
                "Metrics writer for {} was poisoned, recovering",
                self.path.display()
            );
            poisoned.into_inner()
        });
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        drop(writer);

        debug!("Run metrics appended to {}", self.path.display());
        Ok(())
    }
}

impl Drop for JsonlMetricsRecorder {
    fn drop(&mut self) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = writer.flush();
    }
}
