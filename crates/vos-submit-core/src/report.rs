//! Run reports for packaging.
//!
//! A [`PackagingReport`] records one outcome per task in plan order. It can
//! be rendered as a short text summary or written as JSON next to the
//! archives for submission bookkeeping.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::archive::ArchiveSummary;
use crate::error::Result;

/// What happened to one packaging task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded { archive: ArchiveSummary },
    Failed { error: String },
}

/// Outcome of one packaging task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskReport {
    pub alias: String,
    pub target: PathBuf,
    pub outcome: TaskOutcome,
}

impl TaskReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Succeeded { .. })
    }
}

/// Aggregate outcome of a packaging run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackagingReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub workers: usize,
    pub tasks: Vec<TaskReport>,
}

impl PackagingReport {
    pub fn succeeded_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.tasks.len() - self.succeeded_count()
    }

    /// True when every task produced its archive. An empty run succeeds.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Human-readable summary, one line per task.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for task in &self.tasks {
            match &task.outcome {
                TaskOutcome::Succeeded { archive } => out.push_str(&format!(
                    "ok     {:<12} {} ({} files, {} skipped)\n",
                    task.alias,
                    task.target.display(),
                    archive.members,
                    archive.skipped
                )),
                TaskOutcome::Failed { error } => {
                    out.push_str(&format!("FAILED {:<12} {}\n", task.alias, error))
                }
            }
        }
        out.push_str(&format!(
            "{} of {} archives written in {} ms\n",
            self.succeeded_count(),
            self.tasks.len(),
            self.duration_ms
        ));
        out
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(std::io::Error::from)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample() -> PackagingReport {
        PackagingReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_ms: 12,
            workers: 4,
            tasks: vec![
                TaskReport {
                    alias: "y18-val".to_string(),
                    target: PathBuf::from("/o/y18_val_submission.zip"),
                    outcome: TaskOutcome::Succeeded {
                        archive: ArchiveSummary {
                            target: PathBuf::from("/o/y18_val_submission.zip"),
                            members: 3,
                            skipped: 1,
                            bytes: 42,
                            sha256: "ab".repeat(32),
                        },
                    },
                },
                TaskReport {
                    alias: "lvos-test".to_string(),
                    target: PathBuf::from("/o/lvos_test_submission.zip"),
                    outcome: TaskOutcome::Failed {
                        error: "source for 'lvos-test' does not exist".to_string(),
                    },
                },
            ],
        }
    }

    #[test]
    fn test_counts() {
        let report = sample();
        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_render_text_mentions_each_task() {
        let text = sample().render_text();
        assert!(text.contains("ok     y18-val"));
        assert!(text.contains("FAILED lvos-test"));
        assert!(text.contains("1 of 2 archives written"));
    }

    #[test]
    fn test_json_shape() {
        let v: Value = serde_json::to_value(sample()).unwrap();
        let tasks = v["tasks"].as_array().unwrap();
        assert_eq!(tasks[0]["outcome"]["status"], "succeeded");
        assert_eq!(tasks[0]["outcome"]["archive"]["members"], 3);
        assert_eq!(tasks[1]["outcome"]["status"], "failed");
        for key in ["run_id", "started_at", "duration_ms", "workers"] {
            assert!(v.get(key).is_some(), "missing key: {key}");
        }
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = sample();
        report.write_json(&path).unwrap();
        let back: PackagingReport =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_empty_report_is_success() {
        let mut report = sample();
        report.tasks.clear();
        assert!(report.is_success());
    }
}
