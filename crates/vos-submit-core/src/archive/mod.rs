//! Submission archives.
//!
//! Member names are always computed relative to the *source root*, never
//! the walked subfolder, so `y18-val/Annotations/v1/00000.png` packaged from
//! source root `y18-val` lands in the archive as `Annotations/v1/00000.png`.

pub mod builder;

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubmitError};

pub use builder::build_archive;

/// Archive file extension appended to every target name.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Extension of a file name: the text after its final `.`.
///
/// Names without a `.` have no extension.
pub fn file_extension(file_name: &str) -> Option<&str> {
    file_name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Set of file extensions left out of an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExtensionFilter {
    excluded: BTreeSet<String>,
}

impl ExtensionFilter {
    /// Build a filter. Entries may be written with or without a leading dot;
    /// empty entries are dropped.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let excluded = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { excluded }
    }

    /// Whether a file with this name is left out. Matching is case-sensitive.
    pub fn is_excluded(&self, file_name: &str) -> bool {
        match file_extension(file_name) {
            Some(ext) => self.excluded.contains(ext),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for ExtensionFilter {
    fn from(extensions: Vec<String>) -> Self {
        Self::new(extensions)
    }
}

impl From<ExtensionFilter> for Vec<String> {
    fn from(filter: ExtensionFilter) -> Self {
        filter.excluded.into_iter().collect()
    }
}

/// One file scheduled for an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub path: PathBuf,
    pub name: String,
}

/// Archive-relative name of `path`, `/`-separated, relative to `source_root`.
///
/// Fails when `path` does not live under `source_root`, or when a component
/// is not valid UTF-8 and so has no faithful zip member name.
pub fn member_name(source_root: &Path, path: &Path) -> Result<String> {
    let outside = || {
        SubmitError::InvalidConfig(format!(
            "{} is not inside source root {}",
            path.display(),
            source_root.display()
        ))
    };
    let relative = path.strip_prefix(source_root).map_err(|_| outside())?;

    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part
                .to_str()
                .ok_or_else(|| SubmitError::NonUtf8Path(path.to_path_buf()))?;
            parts.push(part);
        }
    }
    if parts.is_empty() {
        return Err(outside());
    }
    Ok(parts.join("/"))
}

/// Outcome of one successful archive build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    /// Archive written.
    pub target: PathBuf,
    /// Files stored in the archive.
    pub members: usize,
    /// Files left out by the extension filter.
    pub skipped: usize,
    /// Uncompressed bytes stored.
    pub bytes: u64,
    /// SHA-256 of the archive file, hex encoded.
    pub sha256: String,
}
