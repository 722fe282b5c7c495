//! Bollinger Bands: moving average ± k standard deviations.
//!
//! - Upper (`bb_high_p`): SMA(close, p) + k * std(close, p)
//! - Lower (`bb_low_p`): SMA(close, p) - k * std(close, p)
//!
//! With k other than 2 the names gain a suffix rounded to two decimals,
//! e.g. `bb_high_20_k3` or `bb_low_20_k2_5`.
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use crate::domain::Bar;
use crate::indicator::Indicator;
use crate::stats::{mean, population_std, rolling};

/// Which band to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn upper(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self {
            period,
            multiplier,
            band: BollingerBand::Upper,
            name: band_name("bb_high", period, multiplier),
        }
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self {
            period,
            multiplier,
            band: BollingerBand::Lower,
            name: band_name("bb_low", period, multiplier),
        }
    }
}

fn band_name(prefix: &str, period: usize, multiplier: f64) -> String {
    if multiplier == 2.0 {
        format!("{prefix}_{period}")
    } else {
        let k = format!("{multiplier:.2}");
        let k = k.trim_end_matches('0').trim_end_matches('.');
        format!("{prefix}_{period}_k{}", k.replace('.', "_"))
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let sign = match self.band {
            BollingerBand::Upper => 1.0,
            BollingerBand::Lower => -1.0,
        };
        rolling(&closes, self.period, |w| {
            mean(w) + sign * self.multiplier * population_std(w)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn bands_use_population_std() {
        // window [2,4,4,4,5,5,7,9]: mean 5, population std 2
        let bars = make_bars(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let upper = Bollinger::upper(8, 2.0).compute(&bars);
        let lower = Bollinger::lower(8, 2.0).compute(&bars);
        assert!(upper[6].is_nan());
        assert_approx(upper[7], 9.0, DEFAULT_EPSILON);
        assert_approx(lower[7], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn names_carry_non_standard_k() {
        assert_eq!(Bollinger::upper(20, 2.0).name(), "bb_high_20");
        assert_eq!(Bollinger::upper(20, 3.0).name(), "bb_high_20_k3");
        assert_eq!(Bollinger::lower(20, 2.5).name(), "bb_low_20_k2_5");
        assert_eq!(Bollinger::lower(20, 1.25).name(), "bb_low_20_k1_25");
    }

    #[test]
    fn flat_prices_collapse_bands() {
        let bars = make_bars(&[50.0; 5]);
        let upper = Bollinger::upper(3, 2.0).compute(&bars);
        assert_approx(upper[4], 50.0, DEFAULT_EPSILON);
    }
}
