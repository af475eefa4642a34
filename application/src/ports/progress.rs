//! Progress notification port
//!
//! Defines the interface for reporting progress during a form-filling run.

use docfiller_domain::{FieldHandle, FieldType, RunMetrics, RunPhase};

/// Why a field was not sent to any provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The classifier did not recognize the widget
    Unclassifiable,
    /// The user already answered it and skipping is enabled
    AlreadyAnswered,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Unclassifiable => "unclassifiable",
            SkipReason::AlreadyAnswered => "already answered",
        }
    }
}

/// Callback for progress updates during a run
///
/// Implementations live in the host and can display progress in various
/// ways (console, extension badge, etc.)
pub trait PipelineProgress: Send + Sync {
    /// Called when the run enters a phase
    fn on_phase(&self, _phase: RunPhase) {}

    /// Called once the fields are known
    fn on_run_start(&self, _total_fields: usize) {}

    fn on_field_skipped(&self, _handle: &FieldHandle, _reason: SkipReason) {}

    /// Called after the provider round for a field; `answered` is false when
    /// no valid answer came back
    fn on_field_answered(&self, _handle: &FieldHandle, _field_type: FieldType, _answered: bool) {}

    /// Called after the answer was written (or the write was refused)
    fn on_field_filled(&self, _handle: &FieldHandle, _success: bool) {}

    fn on_field_failed(&self, _handle: &FieldHandle, _error: &str) {}

    fn on_run_finished(&self, _metrics: &RunMetrics) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl PipelineProgress for NoProgress {}
