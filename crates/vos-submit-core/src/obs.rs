//! Structured lifecycle events for packaging and scoring runs.
//!
//! Every event carries an `event` field so log pipelines can filter on it,
//! e.g. `event=packaging.task_failed`.

use std::path::Path;

use tracing::{info, warn};

/// Span covering a whole run. Attach it to async work with
/// `tracing::Instrument`.
pub fn run_span(command: &str, run_id: &str) -> tracing::Span {
    tracing::info_span!("vos_submit.run", command = %command, run_id = %run_id)
}

/// RAII guard that keeps a task-scoped span entered on a blocking thread.
///
/// ```ignore
/// let _span = TaskSpan::enter("y18-val");
/// // archive-level debug events now carry alias = y18-val
/// ```
pub struct TaskSpan {
    _span: tracing::span::EnteredSpan,
}

impl TaskSpan {
    pub fn enter(alias: &str) -> Self {
        let span = tracing::info_span!("vos_submit.task", alias = %alias);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_task_started(alias: &str, target: &Path) {
    info!(event = "packaging.task_started", alias = %alias, target = %target.display());
}

/// `completed` is the run-wide count of finished tasks, including this one.
pub fn emit_task_finished(
    alias: &str,
    members: usize,
    skipped: usize,
    completed: usize,
    total: usize,
) {
    info!(
        event = "packaging.task_finished",
        alias = %alias,
        members = members,
        skipped = skipped,
        progress = %format!("{completed}/{total}"),
    );
}

pub fn emit_task_failed(
    alias: &str,
    error: &dyn std::fmt::Display,
    completed: usize,
    total: usize,
) {
    warn!(
        event = "packaging.task_failed",
        alias = %alias,
        error = %error,
        progress = %format!("{completed}/{total}"),
    );
}

pub fn emit_packaging_finished(succeeded: usize, failed: usize, duration_ms: u64) {
    info!(
        event = "packaging.run_finished",
        succeeded = succeeded,
        failed = failed,
        duration_ms = duration_ms,
    );
}

pub fn emit_dataset_scoring(alias: &str, ground_truth: &Path, prediction: &Path) {
    info!(
        event = "scoring.dataset_started",
        alias = %alias,
        ground_truth = %ground_truth.display(),
        prediction = %prediction.display(),
    );
}

pub fn emit_dataset_scored(alias: &str, success: bool, duration_ms: u64) {
    info!(
        event = "scoring.dataset_finished",
        alias = %alias,
        success = success,
        duration_ms = duration_ms,
    );
}
