//! Momentum: price ratio over a lookback.
//!
//! momentum[t] = close[t] / close[t-period]
//! Lookback: period. A zero or missing denominator yields NaN.

use crate::domain::Bar;
use crate::indicator::Indicator;

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    name: String,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Momentum period must be >= 1");
        Self {
            period,
            name: format!("momentum_{period}"),
        }
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            let prev = bars[i - self.period].close;
            let curr = bars[i].close;
            if prev != 0.0 && !prev.is_nan() && !curr.is_nan() {
                result[i] = curr / prev;
            }
        }

        result
    }
}
