//! Bar: one aligned row of a single price source.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV observation for one source at one timestamp.
///
/// Close-only sources (an FX fixing) carry NaN in open/high/low/volume.
/// A bar produced for a timestamp the source never reported is void: every
/// field is NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// A bar that only knows its close.
    pub fn close_only(timestamp: NaiveDateTime, close: f64) -> Self {
        Self {
            timestamp,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close,
            volume: f64::NAN,
        }
    }

    /// A bar with every field missing.
    pub fn void(timestamp: NaiveDateTime) -> Self {
        Self::close_only(timestamp, f64::NAN)
    }

    /// Returns true if the close is missing.
    pub fn is_void(&self) -> bool {
        self.close.is_nan()
    }

    /// Typical price (H + L + C) / 3, NaN if any leg is missing.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}
