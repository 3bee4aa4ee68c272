//! Declarative run configuration.
//!
//! A single YAML file maps dataset aliases to ground-truth mask directories
//! and optionally overrides the packaging table and the scoring program:
//!
//! ```yaml
//! data_root: ..
//! datasets:
//!   d17-val:
//!     name: DAVIS 2017 val
//!     mask_directory: DAVIS/2017/trainval/Annotations/480p
//! packaging:
//!   exclude_extensions: [csv]
//!   targets:
//!     - { alias: y18-val, subfolder: Annotations, archive: y18_val_submission }
//! ```
//!
//! The file is loaded once at startup and never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SubmitError};
use crate::packaging::PackagingTable;
use crate::scoring::ScorerSettings;

/// Ground-truth location of one benchmark dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetEntry {
    /// Human-readable dataset name.
    #[serde(default)]
    pub name: Option<String>,

    /// Directory holding the ground-truth masks.
    pub mask_directory: PathBuf,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SuiteConfig {
    /// Base directory for relative `mask_directory` values.
    #[serde(default)]
    pub data_root: Option<PathBuf>,

    /// Dataset alias -> ground truth.
    #[serde(default)]
    pub datasets: BTreeMap<String, DatasetEntry>,

    /// Packaging table override; the built-in table is used when absent.
    #[serde(default)]
    pub packaging: Option<PackagingTable>,

    /// External scoring program.
    #[serde(default)]
    pub scorer: ScorerSettings,

    /// Directory of the file this config was loaded from.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl SuiteConfig {
    /// Read and validate a config file.
    ///
    /// Any failure here is fatal for the whole run.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SubmitError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: SuiteConfig =
            serde_yaml::from_str(&content).map_err(|source| SubmitError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        config.base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        config.validate()?;

        debug!(
            path = %path.display(),
            datasets = config.datasets.len(),
            "Loaded config"
        );
        Ok(config)
    }

    /// Parse a config from YAML text; relative paths resolve against `base_dir`.
    pub fn from_yaml_str(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: SuiteConfig =
            serde_yaml::from_str(content).map_err(|source| SubmitError::ConfigParse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (alias, entry) in &self.datasets {
            if alias.trim().is_empty() {
                return Err(SubmitError::InvalidConfig(
                    "dataset alias must not be empty".to_string(),
                ));
            }
            if entry.mask_directory.as_os_str().is_empty() {
                return Err(SubmitError::InvalidConfig(format!(
                    "dataset '{alias}' has an empty mask_directory"
                )));
            }
        }
        if let Some(table) = &self.packaging {
            table.validate()?;
        }
        Ok(())
    }

    /// Every configured alias.
    pub fn aliases(&self) -> BTreeSet<String> {
        self.datasets.keys().cloned().collect()
    }

    /// Directory relative mask paths are joined onto.
    pub fn data_root(&self) -> PathBuf {
        match &self.data_root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => self.base_dir.join(root),
            None => self.base_dir.clone(),
        }
    }

    /// Resolved ground-truth directory for `alias`.
    pub fn mask_directory(&self, alias: &str) -> Option<PathBuf> {
        let entry = self.datasets.get(alias)?;
        if entry.mask_directory.is_absolute() {
            Some(entry.mask_directory.clone())
        } else {
            Some(self.data_root().join(&entry.mask_directory))
        }
    }

    /// The configured packaging table, or the built-in one.
    pub fn packaging_table(&self) -> PackagingTable {
        self.packaging.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
datasets:
  d17-val:
    name: DAVIS 2017 val
    mask_directory: DAVIS/2017/Annotations
  y18-val:
    mask_directory: /data/ytvos18/valid/Annotations
"#;

    #[test]
    fn test_parse_datasets() {
        let config = SuiteConfig::from_yaml_str(SAMPLE, "/repo").unwrap();
        assert_eq!(config.datasets.len(), 2);
        assert_eq!(
            config.datasets["d17-val"].name.as_deref(),
            Some("DAVIS 2017 val")
        );
        assert_eq!(
            config.aliases().into_iter().collect::<Vec<_>>(),
            vec!["d17-val", "y18-val"]
        );
    }

    #[test]
    fn test_relative_mask_directory_resolves_against_config_dir() {
        let config = SuiteConfig::from_yaml_str(SAMPLE, "/repo").unwrap();
        assert_eq!(
            config.mask_directory("d17-val").unwrap(),
            PathBuf::from("/repo/DAVIS/2017/Annotations")
        );
        assert_eq!(
            config.mask_directory("y18-val").unwrap(),
            PathBuf::from("/data/ytvos18/valid/Annotations")
        );
        assert!(config.mask_directory("mose-val").is_none());
    }

    #[test]
    fn test_data_root_is_relative_to_config_dir() {
        let yaml = "data_root: ..\ndatasets:\n  d17-val:\n    mask_directory: DAVIS\n";
        let config = SuiteConfig::from_yaml_str(yaml, "/repo/configs").unwrap();
        assert_eq!(
            config.mask_directory("d17-val").unwrap(),
            PathBuf::from("/repo/configs/../DAVIS")
        );
    }

    #[test]
    fn test_missing_packaging_uses_builtin_table() {
        let config = SuiteConfig::from_yaml_str(SAMPLE, "/repo").unwrap();
        assert_eq!(config.packaging_table(), PackagingTable::default());
    }

    #[test]
    fn test_malformed_yaml_is_rejected() {
        let err = SuiteConfig::from_yaml_str("datasets: [unclosed", "/repo").unwrap_err();
        assert!(matches!(err, SubmitError::ConfigParse { .. }));
    }

    #[test]
    fn test_entry_without_mask_directory_is_rejected() {
        let err = SuiteConfig::from_yaml_str("datasets:\n  d17-val:\n    name: x\n", "/repo")
            .unwrap_err();
        assert!(matches!(err, SubmitError::ConfigParse { .. }));
    }

    #[test]
    fn test_empty_mask_directory_is_invalid() {
        let err = SuiteConfig::from_yaml_str(
            "datasets:\n  d17-val:\n    mask_directory: ''\n",
            "/repo",
        )
        .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SuiteConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, SubmitError::Config { .. }));
    }

    #[test]
    fn test_load_sets_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = SuiteConfig::load(&path).unwrap();
        assert_eq!(
            config.mask_directory("d17-val").unwrap(),
            dir.path().join("DAVIS/2017/Annotations")
        );
    }
}
