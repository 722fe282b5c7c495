//! MACD histogram.
//!
//! line = EMA(close, fast) - EMA(close, slow)
//! signal = EMA(line, signal)
//! macd_diff = line - signal
//! Named `macd_diff` on the standard 12/26/9 periods, `macd_diff_{fast}_{slow}_{signal}` otherwise.
//! Lookback: (slow - 1) + (signal - 1).

use crate::domain::Bar;
use crate::indicator::Indicator;
use crate::indicators::ema::ema_of_series;

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(slow > fast, "MACD slow period must exceed fast period");
        let name = if (fast, slow, signal) == (12, 26, 9) {
            "macd_diff".to_string()
        } else {
            format!("macd_diff_{fast}_{slow}_{signal}")
        };
        Self {
            fast,
            slow,
            signal,
            name,
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        (self.slow - 1) + (self.signal - 1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = ema_of_series(&line, self.signal);
        line.iter().zip(&signal).map(|(l, s)| l - s).collect()
    }
}
