//! Forecast evaluation against actual values.
//!
//! Predictions come from a model outside this workspace. Both series are in
//! price units (un-scale predictions with `FittedScalers::inverse_target`).
//! `error = predicted - actual` throughout.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::stats::{mean, percentile, population_std};

pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Relative predicted move that triggers a long or short signal.
pub const DEFAULT_SIGNAL_THRESHOLD: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub observations: usize,
    pub mae: f64,
    pub rmse: f64,
    /// `(1 - confidence)` percentile of the errors, linearly interpolated.
    pub var: f64,
    /// Mean of the errors at or below `var`.
    pub cvar: f64,
    /// Population std of the errors.
    pub error_volatility: f64,
    pub confidence: f64,
}

/// One evaluated point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub timestamp: NaiveDateTime,
    pub actual: f64,
    pub predicted: f64,
    pub error: f64,
    /// `error / actual × 100`; NaN when `actual` is 0.
    pub error_pct: f64,
}

/// Signals from the relative change between consecutive predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignals {
    /// `+1` buy, `-1` sell, `0` hold. One shorter than the input.
    pub signals: Vec<i8>,
    pub predicted_changes: Vec<f64>,
    pub actual_returns: Vec<f64>,
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<(), ValidationError> {
    if actual.len() != predicted.len() {
        return Err(ValidationError::LengthMismatch {
            context: "predictions vs actual values".into(),
            expected: actual.len(),
            actual: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(ValidationError::insufficient("forecast evaluation", 1, 0));
    }
    Ok(())
}

/// Point and tail-risk error metrics.
pub fn evaluate(
    actual: &[f64],
    predicted: &[f64],
    confidence: f64,
) -> Result<ForecastMetrics, ValidationError> {
    check_lengths(actual, predicted)?;
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(ValidationError::InvalidParameter(format!(
            "confidence must be in (0, 1), got {confidence}"
        )));
    }

    let errors: Vec<f64> = predicted.iter().zip(actual).map(|(p, a)| p - a).collect();
    let mae = mean(&errors.iter().map(|e| e.abs()).collect::<Vec<_>>());
    let rmse = mean(&errors.iter().map(|e| e * e).collect::<Vec<_>>()).sqrt();
    let var = percentile(&errors, (1.0 - confidence) * 100.0);
    let tail: Vec<f64> = errors.iter().copied().filter(|e| *e <= var).collect();

    Ok(ForecastMetrics {
        observations: errors.len(),
        mae,
        rmse,
        var,
        cvar: mean(&tail),
        error_volatility: population_std(&errors),
        confidence,
    })
}

/// Per-point actual, predicted and error.
pub fn forecast_records(
    timestamps: &[NaiveDateTime],
    actual: &[f64],
    predicted: &[f64],
) -> Result<Vec<ForecastRecord>, ValidationError> {
    check_lengths(actual, predicted)?;
    if timestamps.len() != actual.len() {
        return Err(ValidationError::LengthMismatch {
            context: "timestamps vs actual values".into(),
            expected: actual.len(),
            actual: timestamps.len(),
        });
    }
    Ok(timestamps
        .iter()
        .zip(actual.iter().zip(predicted))
        .map(|(ts, (&actual, &predicted))| {
            let error = predicted - actual;
            ForecastRecord {
                timestamp: *ts,
                actual,
                predicted,
                error,
                error_pct: if actual != 0.0 {
                    error / actual * 100.0
                } else {
                    f64::NAN
                },
            }
        })
        .collect())
}

fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { f64::NAN })
        .collect()
}

pub fn trading_signals(
    actual: &[f64],
    predicted: &[f64],
    threshold: f64,
) -> Result<TradingSignals, ValidationError> {
    check_lengths(actual, predicted)?;
    let predicted_changes = pct_changes(predicted);
    let signals = predicted_changes
        .iter()
        .map(|c| {
            if *c > threshold {
                1
            } else if *c < -threshold {
                -1
            } else {
                0
            }
        })
        .collect();
    Ok(TradingSignals {
        signals,
        predicted_changes,
        actual_returns: pct_changes(actual),
    })
}
