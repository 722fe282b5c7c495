//! Exponential Moving Average (EMA).
//!
//! EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: SMA of the first `period` closes of each run without gaps.
//! Lookback: period - 1.

use crate::domain::Bar;
use crate::indicator::Indicator;
use crate::indicators::seeded_smooth;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// EMA of an arbitrary series. Used by MACD for its line and signal.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    seeded_smooth(values, period, 2.0 / (period as f64 + 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ema_3_basic() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let result = Ema::new(3).compute(&bars);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        // seed = mean(10, 11, 12) = 11, alpha = 0.5
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_restarts_after_gap() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        bars[3].close = f64::NAN;
        let result = Ema::new(2).compute(&bars);
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
        // fresh seed = mean(14, 15)
        assert_approx(result[5], 14.5, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_lookback() {
        assert_eq!(Ema::new(20).lookback(), 19);
    }
}
