//! Packaging plan: which folders become which submission archives.
//!
//! A [`PackagingTable`] declares, per dataset alias, the subfolder to
//! archive and the archive base name. [`plan`] binds the table to a results
//! root and an output directory, producing one [`PackagingTask`] per entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::archive::{build_archive, ArchiveSummary, ExtensionFilter, ARCHIVE_EXTENSION};
use crate::error::{Result, SubmitError};

/// One row of the packaging table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackagingSpec {
    /// Dataset alias; also the folder name under the results root.
    pub alias: String,

    /// Folder inside the alias folder to archive. Empty archives the alias
    /// folder itself.
    #[serde(default)]
    pub subfolder: PathBuf,

    /// Archive base name, without suffix or extension.
    pub archive: String,
}

impl PackagingSpec {
    pub fn new(alias: &str, subfolder: &str, archive: &str) -> Self {
        Self {
            alias: alias.to_string(),
            subfolder: PathBuf::from(subfolder),
            archive: archive.to_string(),
        }
    }
}

/// Declarative list of archives to build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackagingTable {
    /// Extensions never packaged.
    #[serde(default)]
    pub exclude_extensions: ExtensionFilter,

    pub targets: Vec<PackagingSpec>,
}

impl Default for PackagingTable {
    /// YouTube-VOS 2018/2019 val, LVOS test and MOSE val, as the CodaLab
    /// servers expect them.
    fn default() -> Self {
        Self {
            exclude_extensions: ExtensionFilter::new(["csv"]),
            targets: vec![
                PackagingSpec::new("y18-val", "Annotations", "y18_val_submission"),
                PackagingSpec::new("y19-val", "Annotations", "y19_val_submission"),
                PackagingSpec::new("lvos-test", "Annotations", "lvos_test_submission"),
                PackagingSpec::new("mose-val", "", "mose_val_submission"),
            ],
        }
    }
}

impl PackagingTable {
    pub(crate) fn validate(&self) -> Result<()> {
        for spec in &self.targets {
            if spec.alias.trim().is_empty() {
                return Err(SubmitError::InvalidConfig(
                    "packaging target alias must not be empty".to_string(),
                ));
            }
            if spec.archive.trim().is_empty() || spec.archive.contains(['/', '\\']) {
                return Err(SubmitError::InvalidConfig(format!(
                    "packaging target '{}' has invalid archive name '{}'",
                    spec.alias, spec.archive
                )));
            }
            if spec.subfolder.is_absolute()
                || spec
                    .subfolder
                    .components()
                    .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                return Err(SubmitError::InvalidConfig(format!(
                    "packaging target '{}' subfolder must stay inside the alias folder",
                    spec.alias
                )));
            }
        }
        Ok(())
    }
}

/// Archive file name for `base`, with an optional tag before the extension.
///
/// `archive_file_name("y18_val_submission", Some("xmem"))` is
/// `y18_val_submission_xmem.zip`.
pub fn archive_file_name(base: &str, suffix: Option<&str>) -> String {
    match suffix.map(str::trim).filter(|s| !s.is_empty()) {
        Some(suffix) => format!("{base}_{suffix}.{ARCHIVE_EXTENSION}"),
        None => format!("{base}.{ARCHIVE_EXTENSION}"),
    }
}

/// One archive to build. Tasks share nothing and can run in any order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingTask {
    pub alias: String,
    /// Member names are relative to this folder.
    pub source_root: PathBuf,
    /// Folder walked for files; equal to or inside `source_root`.
    pub walk_root: PathBuf,
    pub target: PathBuf,
    pub exclude: ExtensionFilter,
}

impl PackagingTask {
    /// Build this task's archive.
    ///
    /// A missing source folder is reported as [`SubmitError::MissingSource`]
    /// before anything is written.
    pub fn run(&self) -> Result<ArchiveSummary> {
        for path in [&self.source_root, &self.walk_root] {
            if !path.is_dir() {
                return Err(SubmitError::MissingSource {
                    alias: self.alias.clone(),
                    path: path.clone(),
                });
            }
        }
        build_archive(&self.source_root, &self.walk_root, &self.target, &self.exclude)
    }
}

/// Options for [`plan`].
#[derive(Debug, Clone, Default)]
pub struct PlanOptions<'a> {
    /// Tag inserted into every archive name.
    pub suffix: Option<&'a str>,
    /// Only plan these aliases; empty means every table entry.
    pub only: &'a [String],
}

/// Bind `table` to a results root and output directory.
///
/// Fails if a selected alias is not in the table, or if two entries would
/// write the same archive.
pub fn plan(
    results_root: &Path,
    output_dir: &Path,
    table: &PackagingTable,
    options: &PlanOptions<'_>,
) -> Result<Vec<PackagingTask>> {
    for alias in options.only {
        if !table.targets.iter().any(|spec| &spec.alias == alias) {
            return Err(SubmitError::InvalidConfig(format!(
                "'{alias}' is not in the packaging table"
            )));
        }
    }

    let mut tasks = Vec::new();
    let mut targets: BTreeMap<PathBuf, String> = BTreeMap::new();

    for spec in &table.targets {
        if !options.only.is_empty() && !options.only.contains(&spec.alias) {
            continue;
        }

        let source_root = results_root.join(&spec.alias);
        let walk_root = if spec.subfolder.as_os_str().is_empty() {
            source_root.clone()
        } else {
            source_root.join(&spec.subfolder)
        };
        let target = output_dir.join(archive_file_name(&spec.archive, options.suffix));

        if let Some(first) = targets.insert(target.clone(), spec.alias.clone()) {
            return Err(SubmitError::DuplicateTarget {
                first,
                second: spec.alias.clone(),
                target,
            });
        }

        tasks.push(PackagingTask {
            alias: spec.alias.clone(),
            source_root,
            walk_root,
            target,
            exclude: table.exclude_extensions.clone(),
        });
    }

    Ok(tasks)
}
