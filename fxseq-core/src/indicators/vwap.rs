//! Rolling volume-weighted average price.
//!
//! vwap[t] = Σ typical * volume / Σ volume over the last `period` rows,
//! typical = (high + low + close) / 3.
//! Lookback: period - 1. Zero total volume yields NaN.

use crate::domain::Bar;
use crate::indicator::Indicator;

#[derive(Debug, Clone)]
pub struct Vwap {
    period: usize,
    name: String,
}

impl Vwap {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "VWAP period must be >= 1");
        Self {
            period,
            name: format!("vwap_{period}"),
        }
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn requires_ohlcv(&self) -> bool {
        true
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let mut weighted = 0.0;
            let mut volume = 0.0;
            for bar in &bars[i + 1 - self.period..=i] {
                weighted += bar.typical_price() * bar.volume;
                volume += bar.volume;
            }
            if weighted.is_nan() || volume.is_nan() || volume == 0.0 {
                continue;
            }
            result[i] = weighted / volume;
        }

        result
    }
}
