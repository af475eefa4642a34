//! Progress reporting for form-filling runs

use colored::Colorize;
use docfiller_application::{PipelineProgress, SkipReason};
use docfiller_domain::{FieldHandle, FieldType, RunMetrics, RunPhase};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::sync::Mutex;

/// Reports progress with a single bar over the form's fields.
///
/// Each field advances the bar once, on whichever event finishes it first.
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
    done: Mutex<HashSet<String>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            done: Mutex::new(HashSet::new()),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn advance(&self, handle: &FieldHandle, message: String) {
        let first = self
            .done
            .lock()
            .map(|mut done| done.insert(handle.to_string()))
            .unwrap_or(false);

        if let Ok(guard) = self.bar.lock()
            && let Some(pb) = guard.as_ref()
        {
            pb.set_message(message);
            if first {
                pb.inc(1);
            }
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineProgress for ProgressReporter {
    fn on_phase(&self, phase: RunPhase) {
        if let Ok(guard) = self.bar.lock()
            && let Some(pb) = guard.as_ref()
        {
            pb.set_prefix(phase.display_name().to_string());
        }
    }

    fn on_run_start(&self, total_fields: usize) {
        let pb = ProgressBar::new(total_fields as u64);
        pb.set_style(Self::style());
        pb.set_prefix(RunPhase::ProfileResolution.display_name().to_string());
        pb.set_message("Starting...");

        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(pb);
        }
    }

    fn on_field_skipped(&self, handle: &FieldHandle, reason: SkipReason) {
        self.advance(handle, format!("{} {} ({})", "-".yellow(), handle, reason.as_str()));
    }

    fn on_field_answered(&self, handle: &FieldHandle, _field_type: FieldType, answered: bool) {
        let mark = if answered { "?".cyan() } else { "x".red() };
        self.advance(handle, format!("{} {}", mark, handle));
    }

    fn on_field_filled(&self, handle: &FieldHandle, success: bool) {
        let mark = if success { "v".green() } else { "x".red() };
        self.advance(handle, format!("{} {}", mark, handle));
    }

    fn on_field_failed(&self, handle: &FieldHandle, error: &str) {
        self.advance(handle, format!("{} {} ({})", "x".red(), handle, error));
    }

    fn on_run_finished(&self, metrics: &RunMetrics) {
        if let Ok(mut guard) = self.bar.lock()
            && let Some(pb) = guard.take()
        {
            pb.finish_with_message(format!(
                "{} {}/{} filled",
                "done".green(),
                metrics.successful,
                metrics.to_be_filled
            ));
        }
    }
}
