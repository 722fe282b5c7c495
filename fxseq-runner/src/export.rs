//! Artifact export: CSV, Parquet and JSON.
//!
//! A run directory holds:
//! - `features.csv` / `features.parquet`: the assembled matrix, timestamp first
//! - `diagnostics.json`: the statistical diagnostics report
//! - `scalers.json`: fitted feature and target scalers
//! - `train.json` / `test.json`: windowed sequence datasets
//! - `manifest.json`: run id, dataset hash, shapes and the full config
//!
//! The manifest carries a `schema_version`. Unknown versions are rejected on load.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fxseq_core::assemble::FeatureMatrix;
use fxseq_core::sentiment::SentimentScaler;
use fxseq_core::sequence::{FittedScalers, SequenceDataset};

use crate::config::PipelineConfig;
use crate::pipeline::PipelineOutput;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

pub const FEATURES_CSV: &str = "features.csv";
pub const FEATURES_PARQUET: &str = "features.parquet";
pub const DIAGNOSTICS_JSON: &str = "diagnostics.json";
pub const SCALERS_JSON: &str = "scalers.json";
pub const TRAIN_JSON: &str = "train.json";
pub const TEST_JSON: &str = "test.json";
pub const MANIFEST_JSON: &str = "manifest.json";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("parquet: {0}")]
    Polars(#[from] PolarsError),
    #[error("unsupported schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Summary of one run, enough to reproduce and to interpret the other files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub dataset_hash: String,
    pub target: String,
    pub rows: usize,
    pub features: Vec<String>,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    pub sequence_length: usize,
    pub train_sequences: usize,
    pub test_sequences: usize,
    pub sentiment_scaler: Option<SentimentScaler>,
    pub config: PipelineConfig,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Manifest {
    pub fn new(output: &PipelineOutput, config: &PipelineConfig) -> Self {
        let index = output.matrix.index();
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: output.run_id.to_string(),
            dataset_hash: output.dataset_hash.to_string(),
            target: output.matrix.target().to_string(),
            rows: output.matrix.nrows(),
            features: output.matrix.feature_names(),
            first_timestamp: index.first().copied(),
            last_timestamp: index.last().copied(),
            sequence_length: config.sequence_length,
            train_sequences: output.train.len(),
            test_sequences: output.test.len(),
            sentiment_scaler: output.sentiment_scaler,
            config: config.clone(),
        }
    }
}

// ─── CSV / Parquet ──────────────────────────────────────────────────

/// The matrix as CSV: `timestamp` then every column in matrix order.
pub fn features_csv(matrix: &FeatureMatrix) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["timestamp"];
    header.extend(matrix.names());
    wtr.write_record(&header)?;

    for (i, ts) in matrix.index().iter().enumerate() {
        let mut record = Vec::with_capacity(matrix.ncols() + 1);
        record.push(ts.format(TIMESTAMP_FORMAT).to_string());
        record.extend(matrix.row(i).iter().map(f64::to_string));
        wtr.write_record(&record)?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

pub fn write_parquet(matrix: &FeatureMatrix, path: &Path) -> Result<(), ExportError> {
    let mut df = matrix.to_dataframe()?;
    let file = File::create(path).map_err(io_error(path))?;
    ParquetWriter::new(file).finish(&mut df)?;
    Ok(())
}

// ─── JSON ───────────────────────────────────────────────────────────

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(io_error(path))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ExportError> {
    let json = std::fs::read_to_string(path).map_err(io_error(path))?;
    Ok(serde_json::from_str(&json)?)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the full artifact set into `dir`, creating it if needed.
pub fn save_artifacts(
    output: &PipelineOutput,
    config: &PipelineConfig,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(io_error(dir))?;

    let csv_path = dir.join(FEATURES_CSV);
    std::fs::write(&csv_path, features_csv(&output.matrix)?).map_err(io_error(&csv_path))?;
    write_parquet(&output.matrix, &dir.join(FEATURES_PARQUET))?;
    write_json(&output.diagnostics, &dir.join(DIAGNOSTICS_JSON))?;
    write_json(&output.scalers, &dir.join(SCALERS_JSON))?;
    write_json(&output.train, &dir.join(TRAIN_JSON))?;
    write_json(&output.test, &dir.join(TEST_JSON))?;
    write_json(&Manifest::new(output, config), &dir.join(MANIFEST_JSON))?;

    tracing::info!(dir = %dir.display(), run_id = %output.run_id.short(), "artifacts written");
    Ok(dir.to_path_buf())
}

/// Load `manifest.json`, rejecting unknown schema versions.
pub fn load_manifest(dir: &Path) -> Result<Manifest, ExportError> {
    let manifest: Manifest = read_json(&dir.join(MANIFEST_JSON))?;
    if manifest.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: manifest.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(manifest)
}

pub fn load_scalers(dir: &Path) -> Result<FittedScalers, ExportError> {
    read_json(&dir.join(SCALERS_JSON))
}

pub fn load_test_set(dir: &Path) -> Result<SequenceDataset, ExportError> {
    read_json(&dir.join(TEST_JSON))
}
