//! Dataset resolution: which configured datasets have predictions.
//!
//! A predictions root holds one directory per dataset alias a model was run
//! on. Only aliases present both in the config and on disk are scored.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SuiteConfig;
use crate::error::{Result, SubmitError};

/// Subdirectory holding the predicted masks of one dataset.
pub const PREDICTION_SUBDIR: &str = "Annotations";

/// How to treat configured datasets that have no predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Score whatever intersects; never fail.
    #[default]
    Lenient,
    /// Every configured dataset must have a prediction directory.
    Strict,
}

/// Intersection of configured aliases and available directories, sorted.
pub fn resolve(configured: &BTreeSet<String>, available: &BTreeSet<String>) -> Vec<String> {
    configured.intersection(available).cloned().collect()
}

/// [`resolve`] under a [`ResolveMode`].
///
/// In strict mode, configured aliases without a directory are reported as
/// [`SubmitError::ResolutionMismatch`].
pub fn resolve_with_mode(
    configured: &BTreeSet<String>,
    available: &BTreeSet<String>,
    mode: ResolveMode,
) -> Result<Vec<String>> {
    if mode == ResolveMode::Strict {
        let missing: Vec<String> = configured.difference(available).cloned().collect();
        if !missing.is_empty() {
            return Err(SubmitError::ResolutionMismatch { missing });
        }
    }
    Ok(resolve(configured, available))
}

/// Restrict resolved aliases to a user selection.
///
/// An empty selection keeps everything. Selected aliases that did not
/// resolve are logged and ignored.
pub fn select(resolved: Vec<String>, selection: &[String]) -> Vec<String> {
    if selection.is_empty() {
        return resolved;
    }
    let wanted: BTreeSet<&str> = selection.iter().map(String::as_str).collect();
    for alias in &wanted {
        if !resolved.iter().any(|r| r.as_str() == *alias) {
            warn!(alias = %alias, "Selected dataset has no config entry or no predictions");
        }
    }
    resolved
        .into_iter()
        .filter(|alias| wanted.contains(alias.as_str()))
        .collect()
}

/// Names of the immediate subdirectories of `root`.
///
/// Symlinks that resolve to directories count as dataset folders.
pub fn list_prediction_dirs(root: &Path) -> Result<BTreeSet<String>> {
    if !root.is_dir() {
        return Err(SubmitError::PredictionsRootMissing(root.to_path_buf()));
    }

    let mut dirs = BTreeSet::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => {
                dirs.insert(name);
            }
            Err(name) => debug!(?name, "Skipping non UTF-8 directory name"),
        }
    }
    Ok(dirs)
}

/// Ground truth and prediction directory for one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPair {
    pub alias: String,
    pub ground_truth: PathBuf,
    pub prediction: PathBuf,
}

/// Pair each resolved alias with its ground truth and predictions.
pub fn scoring_pairs(
    config: &SuiteConfig,
    predictions_root: &Path,
    resolved: &[String],
) -> Vec<ScoringPair> {
    resolved
        .iter()
        .filter_map(|alias| {
            let ground_truth = config.mask_directory(alias)?;
            Some(ScoringPair {
                alias: alias.clone(),
                ground_truth,
                prediction: predictions_root.join(alias).join(PREDICTION_SUBDIR),
            })
        })
        .collect()
}
