//! Scoring collaborator.
//!
//! J, F and J&F are computed by an external metrics program. This module
//! only hands it correctly paired, existing ground-truth and prediction
//! directories and records how each dataset went.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubmitError};
use crate::obs;
use crate::resolve::ScoringPair;

/// External scoring program, as configured under `scorer:`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScorerSettings {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the generated ones.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "python".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-m".to_string(), "vos_benchmark.benchmark".to_string()]
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
        }
    }
}

/// Flags shared by every dataset of a benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringOptions {
    /// Require a prediction for every ground-truth video.
    pub strict: bool,
    /// Worker processes the metrics program may use.
    pub workers: usize,
    pub verbose: bool,
    /// Skip the first and last frame of each sequence (DAVIS semi-supervised
    /// protocol). Unsupervised evaluation should disable this.
    pub skip_first_and_last: bool,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            strict: false,
            workers: 16,
            verbose: true,
            skip_first_and_last: true,
        }
    }
}

/// One call into the metrics program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringRequest {
    pub alias: String,
    pub ground_truth: Vec<PathBuf>,
    pub predictions: Vec<PathBuf>,
    pub options: ScoringOptions,
}

/// Seam to the metrics implementation.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Score one request. Returns whatever the collaborator printed, if it
    /// was captured.
    async fn score(&self, request: &ScoringRequest) -> Result<Option<String>>;
}

/// Runs the configured program once per dataset.
pub struct CommandScorer {
    settings: ScorerSettings,
}

impl CommandScorer {
    pub fn new(settings: ScorerSettings) -> Self {
        Self { settings }
    }

    /// Full argument list for `request`, after the configured prefix.
    pub fn command_args(&self, request: &ScoringRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.settings.args.iter().map(OsString::from).collect();
        args.push("-g".into());
        args.extend(request.ground_truth.iter().map(|p| p.as_os_str().to_owned()));
        args.push("-m".into());
        args.extend(request.predictions.iter().map(|p| p.as_os_str().to_owned()));
        args.push("-n".into());
        args.push(request.options.workers.max(1).to_string().into());
        if request.options.strict {
            args.push("-s".into());
        }
        if !request.options.skip_first_and_last {
            args.push("--do_not_skip_first_and_last_frame".into());
        }
        args
    }
}

#[async_trait]
impl Scorer for CommandScorer {
    async fn score(&self, request: &ScoringRequest) -> Result<Option<String>> {
        let args = self.command_args(request);
        debug!(program = %self.settings.program, ?args, "Invoking scorer");

        let mut command = Command::new(&self.settings.program);
        command.args(&args);

        let failed = |reason: String| SubmitError::Scoring {
            alias: request.alias.clone(),
            reason,
        };

        if request.options.verbose {
            let status = command
                .stdin(Stdio::null())
                .status()
                .await
                .map_err(|e| failed(format!("cannot run {}: {e}", self.settings.program)))?;
            if !status.success() {
                return Err(failed(format!("scorer exited with {status}")));
            }
            return Ok(None);
        }

        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| failed(format!("cannot run {}: {e}", self.settings.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "scorer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

/// Outcome for one dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetScore {
    pub alias: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Score each pair in order. A failing dataset does not stop the rest.
///
/// Pairs whose directories do not exist are reported without calling the
/// scorer.
pub async fn score_datasets(
    scorer: &dyn Scorer,
    pairs: &[ScoringPair],
    options: ScoringOptions,
) -> Vec<DatasetScore> {
    let mut scores = Vec::with_capacity(pairs.len());

    for pair in pairs {
        obs::emit_dataset_scoring(&pair.alias, &pair.ground_truth, &pair.prediction);
        let start = Instant::now();

        let result = match missing_dir(pair) {
            Some(err) => Err(err),
            None => {
                let request = ScoringRequest {
                    alias: pair.alias.clone(),
                    ground_truth: vec![pair.ground_truth.clone()],
                    predictions: vec![pair.prediction.clone()],
                    options,
                };
                scorer.score(&request).await
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        obs::emit_dataset_scored(&pair.alias, result.is_ok(), duration_ms);

        scores.push(match result {
            Ok(output) => DatasetScore {
                alias: pair.alias.clone(),
                success: true,
                duration_ms,
                error: None,
                output,
            },
            Err(err) => DatasetScore {
                alias: pair.alias.clone(),
                success: false,
                duration_ms,
                error: Some(err.to_string()),
                output: None,
            },
        });
    }

    scores
}

fn missing_dir(pair: &ScoringPair) -> Option<SubmitError> {
    [&pair.ground_truth, &pair.prediction]
        .into_iter()
        .find(|p| !p.is_dir())
        .map(|path| SubmitError::MissingSource {
            alias: pair.alias.clone(),
            path: path.clone(),
        })
}
