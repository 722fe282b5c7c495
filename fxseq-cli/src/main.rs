//! fxseq CLI: build, diagnose and evaluate commands.
//!
//! Commands:
//! - `build`: run the pipeline from a TOML config and write artifacts
//! - `diagnose`: run the pipeline and print the diagnostics report as JSON
//! - `evaluate`: score model predictions against a saved run's test split

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fxseq_core::evaluation::{DEFAULT_CONFIDENCE, DEFAULT_SIGNAL_THRESHOLD};
use fxseq_runner::{
    evaluate_run, load_predictions, run_from_config, save_artifacts, EvaluateOptions,
    PipelineConfig,
};

#[derive(Parser)]
#[command(
    name = "fxseq",
    about = "fxseq: FX, equity and news feature pipeline for sequence models"
)]
struct Cli {
    /// Write logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the feature matrix and sequences, then write artifacts.
    Build {
        /// Path to the pipeline TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Output directory. Defaults to `runs/{run id}`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print normality and stationarity diagnostics for the target's returns.
    Diagnose {
        /// Path to the pipeline TOML config.
        #[arg(long)]
        config: PathBuf,
    },
    /// Score predictions (`timestamp,predicted` CSV) against a built run.
    Evaluate {
        /// Artifact directory written by `build`.
        #[arg(long)]
        artifacts: PathBuf,

        /// Predictions CSV.
        #[arg(long)]
        predictions: PathBuf,

        /// Predictions are in scaled [0, 1] units.
        #[arg(long, default_value_t = false)]
        scaled: bool,

        /// VaR / CVaR confidence level.
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
        confidence: f64,

        /// Relative predicted move that triggers a signal.
        #[arg(long, default_value_t = DEFAULT_SIGNAL_THRESHOLD)]
        threshold: f64,

        /// Write the report here as JSON instead of printing it.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Build { config, output_dir } => run_build(&config, output_dir),
        Commands::Diagnose { config } => run_diagnose(&config),
        Commands::Evaluate {
            artifacts,
            predictions,
            scaled,
            confidence,
            threshold,
            output,
        } => run_evaluate(
            &artifacts,
            &predictions,
            EvaluateOptions {
                confidence,
                signal_threshold: threshold,
                scaled,
            },
            output.as_deref(),
        ),
    }
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    tracing::debug!(path = %path.display(), "loading config");
    PipelineConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

fn run_build(config_path: &Path, output_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let output = run_from_config(&config)?;
    let dir = output_dir.unwrap_or_else(|| PathBuf::from("runs").join(output.run_id.short()));
    let dir = save_artifacts(&output, &config, &dir)?;

    println!("Run {}", output.run_id.short());
    println!("  Dataset hash: {}", output.dataset_hash);
    println!(
        "  Matrix: {} rows x {} features (target {})",
        output.matrix.nrows(),
        output.matrix.ncols() - 1,
        output.matrix.target()
    );
    println!(
        "  Sequences: {} train / {} test, length {}",
        output.train.len(),
        output.test.len(),
        config.sequence_length
    );
    for advisory in output.diagnostics.advisories() {
        println!("  Advisory: {}: {}", advisory.diagnostic, advisory.reason);
    }
    println!("  Artifacts: {}", dir.display());
    Ok(())
}

fn run_diagnose(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let output = run_from_config(&config)?;
    let json = serde_json::to_string_pretty(&output.diagnostics)
        .context("failed to serialize diagnostics")?;
    println!("{json}");
    Ok(())
}

fn run_evaluate(
    artifacts: &Path,
    predictions: &Path,
    opts: EvaluateOptions,
    output: Option<&Path>,
) -> Result<()> {
    let predictions = load_predictions(predictions)?;
    let report = evaluate_run(artifacts, &predictions, &opts)?;
    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            let m = &report.metrics;
            println!(
                "MAE {:.6}  RMSE {:.6}  VaR {:.6}  CVaR {:.6}  ({} points)",
                m.mae, m.rmse, m.var, m.cvar, m.observations
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
