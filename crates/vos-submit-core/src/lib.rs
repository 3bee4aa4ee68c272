//! vos-submit core library
//!
//! Prepares video object segmentation predictions for evaluation:
//!
//! - [`resolve`]: match prediction folders to configured datasets
//! - [`scoring`]: hand matched pairs to an external metrics program
//! - [`packaging`] / [`archive`]: build CodaLab submission ZIPs
//! - [`dispatch`]: build many archives in parallel

pub mod archive;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod obs;
pub mod packaging;
pub mod report;
pub mod resolve;
pub mod scoring;
pub mod telemetry;

pub use archive::{
    build_archive, file_extension, member_name, ArchiveMember, ArchiveSummary, ExtensionFilter,
};
pub use config::{DatasetEntry, SuiteConfig};
pub use dispatch::{run_packaging, DEFAULT_WORKERS};
pub use error::{Result, SubmitError};
pub use packaging::{
    archive_file_name, plan, PackagingSpec, PackagingTable, PackagingTask, PlanOptions,
};
pub use report::{PackagingReport, TaskOutcome, TaskReport};
pub use resolve::{
    list_prediction_dirs, resolve, resolve_with_mode, scoring_pairs, select, ResolveMode,
    ScoringPair, PREDICTION_SUBDIR,
};
pub use scoring::{
    score_datasets, CommandScorer, DatasetScore, Scorer, ScorerSettings, ScoringOptions,
    ScoringRequest,
};
pub use telemetry::init_tracing;

/// vos-submit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
