//! Score external model predictions against a run's test split.
//!
//! Actual values come from the saved `test.json`, un-scaled through the
//! target scaler in `scalers.json`. Predictions are matched to test targets
//! by timestamp; unmatched predictions are ignored with a warning.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fxseq_core::error::ValidationError;
use fxseq_core::evaluation::{
    evaluate, forecast_records, trading_signals, ForecastMetrics, ForecastRecord, TradingSignals,
    DEFAULT_CONFIDENCE, DEFAULT_SIGNAL_THRESHOLD,
};

use crate::data_loader::Prediction;
use crate::export::{load_scalers, load_test_set, ExportError};

#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error(transparent)]
    Artifacts(#[from] ExportError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no prediction matches a test target timestamp")]
    NoOverlap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluateOptions {
    pub confidence: f64,
    pub signal_threshold: f64,
    /// Predictions are in scaled [0, 1] units and need un-scaling.
    pub scaled: bool,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            signal_threshold: DEFAULT_SIGNAL_THRESHOLD,
            scaled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub metrics: ForecastMetrics,
    pub signals: TradingSignals,
    pub records: Vec<ForecastRecord>,
    /// Predictions without a matching test target.
    pub unmatched: usize,
}

/// Evaluate `predictions` against the test split saved in `artifact_dir`.
pub fn evaluate_run(
    artifact_dir: &Path,
    predictions: &[Prediction],
    opts: &EvaluateOptions,
) -> Result<EvaluationReport, EvaluateError> {
    let scalers = load_scalers(artifact_dir)?;
    let test = load_test_set(artifact_dir)?;
    let actual_by_ts: HashMap<NaiveDateTime, f64> = test
        .target_timestamps()
        .iter()
        .copied()
        .zip(scalers.inverse_target(test.y()))
        .collect();

    let mut sorted = predictions.to_vec();
    sorted.sort_by_key(|p| p.timestamp);

    let mut timestamps = Vec::new();
    let mut actual = Vec::new();
    let mut predicted = Vec::new();
    for p in &sorted {
        if let Some(a) = actual_by_ts.get(&p.timestamp) {
            timestamps.push(p.timestamp);
            actual.push(*a);
            predicted.push(p.value);
        }
    }
    let unmatched = sorted.len() - timestamps.len();
    if unmatched > 0 {
        tracing::warn!(unmatched, "predictions without a test target ignored");
    }
    if timestamps.is_empty() {
        return Err(EvaluateError::NoOverlap);
    }
    if opts.scaled {
        predicted = scalers.inverse_target(&predicted);
    }

    let metrics = evaluate(&actual, &predicted, opts.confidence)?;
    tracing::info!(
        observations = metrics.observations,
        mae = metrics.mae,
        rmse = metrics.rmse,
        "forecast evaluated"
    );
    Ok(EvaluationReport {
        metrics,
        signals: trading_signals(&actual, &predicted, opts.signal_threshold)?,
        records: forecast_records(&timestamps, &actual, &predicted)?,
        unmatched,
    })
}
