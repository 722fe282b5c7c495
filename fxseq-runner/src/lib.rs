//! fxseq runner: configuration, input loading, pipeline orchestration and
//! artifact export on top of `fxseq-core`.
//!
//! This crate provides:
//! - TOML pipeline configuration with validation and a deterministic run id
//! - CSV and Parquet loaders for fixings, OHLCV quotes, scored news and predictions
//! - The end-to-end pipeline with a per-source rayon fan-out
//! - Artifact export (CSV, Parquet, JSON) and forecast evaluation

pub mod config;
pub mod data_loader;
pub mod evaluate;
pub mod export;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig, SourceConfig};
pub use data_loader::{
    load_fixing, load_news, load_ohlcv, load_predictions, load_source, LoadError, Prediction,
};
pub use evaluate::{evaluate_run, EvaluateError, EvaluateOptions, EvaluationReport};
pub use export::{load_manifest, save_artifacts, ExportError, Manifest, SCHEMA_VERSION};
pub use pipeline::{
    load_inputs, run_from_config, run_pipeline, PipelineError, PipelineInputs, PipelineOutput,
};
