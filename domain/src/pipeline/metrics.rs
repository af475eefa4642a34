//! Run-level counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters and samples collected over one form-filling run.
///
/// Fields are processed strictly one after another, so a run owns its
/// metrics exclusively and needs no synchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Fields found on the form
    pub total_questions: usize,
    /// Fields that reached a provider call
    pub to_be_filled: usize,
    /// Fields whose answer was written back
    pub successful: usize,
    /// Provider response times in seconds
    #[serde(default)]
    pub response_times: Vec<f64>,
    /// Provider, or "consensus", that answered the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl RunMetrics {
    pub fn start(total_questions: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            total_questions,
            to_be_filled: 0,
            successful: 0,
            response_times: Vec::new(),
            model: None,
        }
    }

    pub fn increment_to_be_filled(&mut self) {
        self.to_be_filled += 1;
    }

    pub fn increment_successful(&mut self) {
        self.successful += 1;
    }

    /// Record a response time; negative and non-finite samples are ignored
    pub fn record_response_time(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds >= 0.0 {
            self.response_times.push(seconds);
        }
    }

    pub fn finish(&mut self, model: impl Into<String>) {
        self.finished_at = Some(Utc::now());
        self.model = Some(model.into());
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Fields attempted but not written back
    pub fn failed(&self) -> usize {
        self.to_be_filled.saturating_sub(self.successful)
    }

    pub fn average_response_time(&self) -> Option<f64> {
        if self.response_times.is_empty() {
            return None;
        }
        Some(self.response_times.iter().sum::<f64>() / self.response_times.len() as f64)
    }

    /// Wall-clock run duration in seconds, up to now if still running
    pub fn duration_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }
}
