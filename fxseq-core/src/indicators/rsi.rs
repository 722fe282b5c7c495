//! Relative Strength Index (RSI), two smoothing variants.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! - `RollingRsi` (`rsi_p`): simple mean of gains and losses over the last
//!   `period` changes.
//! - `WilderRsi` (`rsi_wilder_p`): Wilder smoothing (alpha = 1/period),
//!   seeded with the simple mean of the first `period` changes.
//!
//! Lookback: period (changes start at row 1).
//! Edge cases: avg_loss == 0 → 100; avg_gain == 0 → 0; no movement → 50.

use crate::domain::Bar;
use crate::indicator::Indicator;
use crate::indicators::atr::wilder_smooth;
use crate::stats::{mean, rolling};

#[derive(Debug, Clone)]
pub struct RollingRsi {
    period: usize,
    name: String,
}

impl RollingRsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for RollingRsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let (gains, losses) = gains_and_losses(bars);
        let avg_gain = rolling(&gains, self.period, mean);
        let avg_loss = rolling(&losses, self.period, mean);
        combine(&avg_gain, &avg_loss)
    }
}

#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    name: String,
}

impl WilderRsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_wilder_{period}"),
        }
    }
}

impl Indicator for WilderRsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let (gains, losses) = gains_and_losses(bars);
        let avg_gain = wilder_smooth(&gains, self.period);
        let avg_loss = wilder_smooth(&losses, self.period);
        combine(&avg_gain, &avg_loss)
    }
}

/// Positive and negative close-to-close changes. Row 0 and rows touching a
/// missing close are NaN.
fn gains_and_losses(bars: &[Bar]) -> (Vec<f64>, Vec<f64>) {
    let n = bars.len();
    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for i in 1..n {
        let change = bars[i].close - bars[i - 1].close;
        if change.is_nan() {
            continue;
        }
        gains[i] = change.max(0.0);
        losses[i] = (-change).max(0.0);
    }
    (gains, losses)
}

fn combine(avg_gain: &[f64], avg_loss: &[f64]) -> Vec<f64> {
    avg_gain
        .iter()
        .zip(avg_loss)
        .map(|(&g, &l)| {
            if g.is_nan() || l.is_nan() {
                f64::NAN
            } else {
                compute_rsi(g, l)
            }
        })
        .collect()
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
