//! vos-submit - evaluation and submission helper for VOS predictions
//!
//! ## Commands
//!
//! - `benchmark`: score every dataset that has predictions against its
//!   configured ground truth (J, F, J&F via an external metrics program)
//! - `zip`: package prediction folders into CodaLab submission archives

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

use vos_submit_core::{
    init_tracing, list_prediction_dirs, plan, resolve_with_mode, run_packaging, score_datasets,
    scoring_pairs, select, CommandScorer, PackagingTable, PlanOptions, ResolveMode,
    ScoringOptions, SuiteConfig, DEFAULT_WORKERS,
};

#[derive(Parser)]
#[command(name = "vos-submit")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark and package VOS predictions for submission", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and JSON summaries
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a model's predictions on every configured dataset it covers
    Benchmark {
        /// Folder containing one prediction folder per dataset alias
        #[arg(short, long)]
        predictions: PathBuf,

        /// Config mapping dataset aliases to ground-truth masks
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Worker processes for the metrics program
        #[arg(short = 'n', long, default_value_t = 16)]
        num_processes: usize,

        /// Require a prediction for every ground-truth video
        #[arg(short, long)]
        strict: bool,

        /// Score the first and last frame too (unsupervised evaluation)
        #[arg(long)]
        do_not_skip_first_and_last_frame: bool,

        /// Fail if a configured dataset has no prediction folder
        #[arg(long)]
        strict_datasets: bool,

        /// Only benchmark these dataset aliases (repeatable)
        #[arg(short, long = "dataset")]
        datasets: Vec<String>,
    },

    /// Zip prediction folders into submission archives
    Zip {
        /// Results folder holding one folder per dataset alias
        #[arg(long)]
        path: PathBuf,

        /// Archives built concurrently
        #[arg(short = 'n', long, default_value_t = DEFAULT_WORKERS)]
        num_workers: usize,

        /// Tag appended to every archive name, e.g. the method name
        #[arg(long)]
        suffix: Option<String>,

        /// Where archives are written (default: the results folder)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config whose `packaging` section replaces the built-in table
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only package these dataset aliases (repeatable)
        #[arg(short, long = "dataset")]
        datasets: Vec<String>,

        /// Also write the run report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Benchmark {
            predictions,
            config,
            num_processes,
            strict,
            do_not_skip_first_and_last_frame,
            strict_datasets,
            datasets,
        } => {
            let options = ScoringOptions {
                strict,
                workers: num_processes,
                verbose: !cli.json,
                skip_first_and_last: !do_not_skip_first_and_last_frame,
            };
            let mode = if strict_datasets {
                ResolveMode::Strict
            } else {
                ResolveMode::Lenient
            };
            cmd_benchmark(&predictions, &config, options, mode, &datasets, cli.json).await
        }
        Commands::Zip {
            path,
            num_workers,
            suffix,
            output,
            config,
            datasets,
            report,
        } => {
            cmd_zip(
                &path,
                num_workers,
                suffix.as_deref(),
                output.as_deref(),
                config.as_deref(),
                &datasets,
                report.as_deref(),
                cli.json,
            )
            .await
        }
    }
}

async fn cmd_benchmark(
    predictions: &Path,
    config_path: &Path,
    options: ScoringOptions,
    mode: ResolveMode,
    datasets: &[String],
    json: bool,
) -> Result<()> {
    let config = SuiteConfig::load(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let available = list_prediction_dirs(predictions)
        .with_context(|| format!("Cannot list predictions in {}", predictions.display()))?;

    let resolved = resolve_with_mode(&config.aliases(), &available, mode)
        .context("Dataset resolution failed")?;
    let resolved = select(resolved, datasets);

    if resolved.is_empty() {
        warn!(
            predictions = %predictions.display(),
            "No configured dataset has predictions; nothing to benchmark"
        );
        return Ok(());
    }
    info!(datasets = ?resolved, "Benchmarking");

    let pairs = scoring_pairs(&config, predictions, &resolved);
    let scorer = CommandScorer::new(config.scorer.clone());
    let scores = score_datasets(&scorer, &pairs, options).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
    }

    let failed: Vec<&str> = scores
        .iter()
        .filter(|s| !s.success)
        .map(|s| s.alias.as_str())
        .collect();
    for score in scores.iter().filter(|s| !s.success) {
        warn!(
            alias = %score.alias,
            error = score.error.as_deref().unwrap_or("unknown error"),
            "Benchmark failed"
        );
    }
    if !failed.is_empty() {
        bail!(
            "{} of {} datasets failed: {}",
            failed.len(),
            scores.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_zip(
    results: &Path,
    workers: usize,
    suffix: Option<&str>,
    output: Option<&Path>,
    config_path: Option<&Path>,
    datasets: &[String],
    report_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    if !results.is_dir() {
        bail!("The specified path '{}' does not exist", results.display());
    }

    let table = match config_path {
        Some(path) => SuiteConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .packaging_table(),
        None => PackagingTable::default(),
    };
    let output_dir = output.unwrap_or(results);

    let tasks = plan(
        results,
        output_dir,
        &table,
        &PlanOptions {
            suffix,
            only: datasets,
        },
    )
    .context("Invalid packaging plan")?;

    let report = run_packaging(tasks, workers).await;

    if let Some(path) = report_path {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    if !report.is_success() {
        bail!(
            "{} of {} packaging tasks failed",
            report.failed_count(),
            report.tasks.len()
        );
    }
    info!("All folders successfully zipped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn zip_defaults() {
        let cli = Cli::try_parse_from(["vos-submit", "zip", "--path", "/results"]).unwrap();
        match cli.command {
            Commands::Zip {
                path,
                num_workers,
                suffix,
                output,
                datasets,
                ..
            } => {
                assert_eq!(path, PathBuf::from("/results"));
                assert_eq!(num_workers, DEFAULT_WORKERS);
                assert!(suffix.is_none());
                assert!(output.is_none());
                assert!(datasets.is_empty());
            }
            _ => panic!("expected zip"),
        }
    }

    #[test]
    fn benchmark_flags() {
        let cli = Cli::try_parse_from([
            "vos-submit",
            "--json",
            "benchmark",
            "-p",
            "/preds",
            "-n",
            "8",
            "-s",
            "--do-not-skip-first-and-last-frame",
            "-d",
            "d17-val",
            "-d",
            "y18-val",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Benchmark {
                config,
                num_processes,
                strict,
                do_not_skip_first_and_last_frame,
                strict_datasets,
                datasets,
                ..
            } => {
                assert_eq!(config, PathBuf::from("config.yaml"));
                assert_eq!(num_processes, 8);
                assert!(strict);
                assert!(do_not_skip_first_and_last_frame);
                assert!(!strict_datasets);
                assert_eq!(datasets, vec!["d17-val", "y18-val"]);
            }
            _ => panic!("expected benchmark"),
        }
    }

    #[tokio::test]
    async fn zip_missing_results_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_zip(
            &dir.path().join("absent"),
            2,
            None,
            None,
            None,
            &[],
            None,
            false,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn zip_writes_archives_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path();
        let frame = results.join("y18-val/Annotations/v1/00000.png");
        std::fs::create_dir_all(frame.parent().unwrap()).unwrap();
        std::fs::write(&frame, b"mask").unwrap();

        let report = results.join("report.json");
        cmd_zip(
            results,
            2,
            Some("tag"),
            None,
            None,
            &["y18-val".to_string()],
            Some(&report),
            false,
        )
        .await
        .unwrap();

        assert!(results.join("y18_val_submission_tag.zip").is_file());
        assert!(report.is_file());
    }
}
