//! Parallel packaging dispatch.
//!
//! Tasks run on a bounded pool of blocking workers, one distinct task per
//! slot. Tasks write disjoint archives, so the only shared state is the
//! completion counter. A failing task is recorded in the report and never
//! stops its siblings.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::obs::{self, TaskSpan};
use crate::packaging::PackagingTask;
use crate::report::{PackagingReport, TaskOutcome, TaskReport};

/// Default worker count for the `zip` command.
pub const DEFAULT_WORKERS: usize = 4;

/// Build every task's archive using at most `workers` concurrent workers.
///
/// `workers` below 1 is treated as 1. The returned report lists tasks in
/// the order they were given, whatever order they completed in.
pub async fn run_packaging(tasks: Vec<PackagingTask>, workers: usize) -> PackagingReport {
    let workers = workers.max(1);
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let start = Instant::now();
    let total = tasks.len();
    let completed = Arc::new(AtomicUsize::new(0));

    info!(tasks = total, workers, "Packaging submissions");

    let mut finished: Vec<(usize, TaskReport)> = stream::iter(tasks.into_iter().enumerate())
        .map(|(idx, task)| {
            let completed = Arc::clone(&completed);
            async move {
                let report = run_task(task, &completed, total).await;
                (idx, report)
            }
        })
        .buffer_unordered(workers)
        .collect()
        .instrument(obs::run_span("zip", &run_id.to_string()))
        .await;

    finished.sort_by_key(|(idx, _)| *idx);
    let report = PackagingReport {
        run_id,
        started_at,
        duration_ms: start.elapsed().as_millis() as u64,
        workers,
        tasks: finished.into_iter().map(|(_, report)| report).collect(),
    };

    obs::emit_packaging_finished(
        report.succeeded_count(),
        report.failed_count(),
        report.duration_ms,
    );
    report
}

async fn run_task(task: PackagingTask, completed: &AtomicUsize, total: usize) -> TaskReport {
    let alias = task.alias.clone();
    let target = task.target.clone();
    obs::emit_task_started(&alias, &target);

    let joined = tokio::task::spawn_blocking(move || {
        let _span = TaskSpan::enter(&task.alias);
        task.run()
    })
    .await;

    let outcome = match joined {
        Ok(Ok(archive)) => TaskOutcome::Succeeded { archive },
        Ok(Err(err)) => TaskOutcome::Failed {
            error: err.to_string(),
        },
        Err(err) => TaskOutcome::Failed {
            error: format!("packaging worker aborted: {err}"),
        },
    };

    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
    match &outcome {
        TaskOutcome::Succeeded { archive } => {
            obs::emit_task_finished(&alias, archive.members, archive.skipped, done, total)
        }
        TaskOutcome::Failed { error } => obs::emit_task_failed(&alias, error, done, total),
    }

    TaskReport {
        alias,
        target,
        outcome,
    }
}
