//! Simple Moving Average (SMA).
//!
//! Rolling mean of the close over `period` rows.
//! Lookback: period - 1 (first valid value at index period-1).

use crate::domain::Bar;
use crate::indicator::Indicator;
use crate::stats::{mean, rolling};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rolling(&closes, self.period, mean)
    }
}
