//! Stochastic oscillator %K.
//!
//! %K[t] = 100 * (close[t] - LL) / (HH - LL) over the last `period` rows,
//! where HH / LL are the highest high and lowest low.
//! Lookback: period - 1. A flat window (HH == LL) yields NaN.

use crate::domain::Bar;
use crate::indicator::Indicator;

#[derive(Debug, Clone)]
pub struct Stochastic {
    period: usize,
    name: String,
}

impl Stochastic {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Stochastic period must be >= 1");
        Self {
            period,
            name: format!("stoch_{period}"),
        }
    }
}

impl Indicator for Stochastic {
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
            let window = &bars[i + 1 - self.period..=i];
            if window.iter().any(|b| b.high.is_nan() || b.low.is_nan()) || bars[i].close.is_nan() {
                continue;
            }
            let hh = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
            let ll = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let range = hh - ll;
            if range > 0.0 {
                result[i] = 100.0 * (bars[i].close - ll) / range;
            }
        }

        result
    }
}
