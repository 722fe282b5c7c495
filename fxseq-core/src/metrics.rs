//! Basic per-source metrics: log returns, ranges, gaps and rolling volatility.
//!
//! `returns[t] = ln(p[t] / p[t-1])`, NaN at t = 0 and whenever either price
//! is missing or non-positive.
//! `rolling_volatility[t] = std(returns[t-W+1..=t]) × √252` (sample std).
//! Because `returns[0]` is NaN, the first valid volatility lands on row W.

use crate::domain::SourceKind;
use crate::error::ValidationError;
use crate::frame::{AlignedFrame, FeatureBlock};
use crate::stats::{rolling, sample_std, TRADING_DAYS};

/// Window of the un-annualized `returns_std` column.
pub const RETURNS_STD_WINDOW: usize = 20;

/// Derives the basic metrics block for one price source.
#[derive(Debug, Clone)]
pub struct BasicMetricsCalculator {
    volatility_window: usize,
}

impl Default for BasicMetricsCalculator {
    fn default() -> Self {
        Self {
            volatility_window: 20,
        }
    }
}

impl BasicMetricsCalculator {
    pub fn new(volatility_window: usize) -> Result<Self, ValidationError> {
        if volatility_window < 2 {
            return Err(ValidationError::InvalidParameter(format!(
                "volatility window must be >= 2, got {volatility_window}"
            )));
        }
        Ok(Self { volatility_window })
    }

    pub fn volatility_window(&self) -> usize {
        self.volatility_window
    }

    /// Compute `returns`, `returns_std`, `rolling_volatility` and, for OHLCV
    /// sources, `daily_range` and `gap`. Column names are unqualified.
    pub fn compute(&self, frame: &AlignedFrame, source: &str) -> Result<FeatureBlock, ValidationError> {
        let layout = frame.source(source)?;
        let bars = frame.bars(source)?;
        let close: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let returns = log_returns(&close);
        let returns_std = rolling(&returns, RETURNS_STD_WINDOW, sample_std);
        let volatility = annualized_volatility(&returns, self.volatility_window);

        let mut block = FeatureBlock::new("basic", frame.index().to_vec());
        block.push("returns", returns);
        block.push("returns_std", returns_std);
        block.push("rolling_volatility", volatility);

        if layout.kind == SourceKind::Ohlcv {
            block.push(
                "daily_range",
                bars.iter().map(|b| b.high - b.low).collect(),
            );
            let mut gap = vec![f64::NAN; bars.len()];
            for t in 1..bars.len() {
                gap[t] = bars[t].open - bars[t - 1].close;
            }
            block.push("gap", gap);
        }

        tracing::debug!(source, columns = block.columns().len(), "basic metrics");
        Ok(block)
    }
}

/// Log returns of a price series.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; prices.len()];
    for t in 1..prices.len() {
        let (prev, curr) = (prices[t - 1], prices[t]);
        if prev > 0.0 && curr > 0.0 && prev.is_finite() && curr.is_finite() {
            out[t] = (curr / prev).ln();
        }
    }
    out
}

/// Trailing sample std of `returns` over `window` rows, scaled by √252.
pub fn annualized_volatility(returns: &[f64], window: usize) -> Vec<f64> {
    rolling(returns, window, |w| sample_std(w) * TRADING_DAYS.sqrt())
}
