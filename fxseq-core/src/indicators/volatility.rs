//! Historical volatility: annualized sample std of log returns.
//!
//! volatility[t] = std(returns[t-period+1..=t]) × √252
//! Lookback: period (returns[0] is undefined).

use crate::domain::Bar;
use crate::indicator::Indicator;
use crate::metrics::{annualized_volatility, log_returns};

#[derive(Debug, Clone)]
pub struct RollingVolatility {
    period: usize,
    name: String,
}

impl RollingVolatility {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "volatility period must be >= 2");
        Self {
            period,
            name: format!("volatility_{period}"),
        }
    }
}

impl Indicator for RollingVolatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        annualized_volatility(&log_returns(&closes), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn first_valid_row_is_period() {
        let bars = make_bars(&[100.0, 101.0, 103.0, 102.0, 104.0, 103.0]);
        let result = RollingVolatility::new(3).compute(&bars);
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert!(result[3..].iter().all(|v| v.is_finite() && *v > 0.0));
    }
}
