//! Error taxonomy for dataset resolution, packaging and scoring.

use std::path::PathBuf;

/// Errors produced by vos-submit operations.
///
/// `Config`, `ConfigParse`, `PredictionsRootMissing` and `DuplicateTarget`
/// are whole-run errors raised before any work is dispatched. The rest are
/// scoped to a single packaging task or scored dataset.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("cannot read config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("predictions root does not exist: {}", .0.display())]
    PredictionsRootMissing(PathBuf),

    #[error("source for '{alias}' does not exist: {}", .path.display())]
    MissingSource { alias: String, path: PathBuf },

    #[error("failed writing archive {}: {source}", .target.display())]
    ArchiveWrite {
        target: PathBuf,
        #[source]
        source: Box<SubmitError>,
    },

    #[error("datasets configured but without predictions: {}", .missing.join(", "))]
    ResolutionMismatch { missing: Vec<String> },

    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("aliases '{first}' and '{second}' both target {}", .target.display())]
    DuplicateTarget {
        first: String,
        second: String,
        target: PathBuf,
    },

    #[error("scoring '{alias}' failed: {reason}")]
    Scoring { alias: String, reason: String },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for vos-submit operations.
pub type Result<T> = std::result::Result<T, SubmitError>;
