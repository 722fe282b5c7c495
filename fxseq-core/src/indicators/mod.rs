//! Concrete indicator implementations.
//!
//! All indicators implement the `Indicator` trait from `crate::indicator` and
//! are selected through `IndicatorSpec`. Multi-series indicators (Bollinger)
//! are exposed as one instance per band.
//!
//! Recursive smoothers (EMA, Wilder) restart their seed after a missing value
//! instead of leaving the rest of the series empty.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod volatility;
pub mod vwap;

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerBand};
pub use ema::Ema;
pub use macd::Macd;
pub use momentum::Momentum;
pub use rsi::{RollingRsi, WilderRsi};
pub use sma::Sma;
pub use stochastic::Stochastic;
pub use volatility::RollingVolatility;
pub use vwap::Vwap;

/// Exponential smoothing with a fresh SMA seed after every gap.
///
/// The first output of a run of valid values lands on its `period`-th value
/// and equals the mean of those values. Later outputs follow
/// `s[t] = alpha * v[t] + (1 - alpha) * s[t-1]`. A NaN input ends the run.
pub(crate) fn seeded_smooth(values: &[f64], period: usize, alpha: f64) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if period == 0 {
        return result;
    }

    let mut run = 0usize;
    let mut seed_sum = 0.0;
    let mut prev = f64::NAN;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
            seed_sum = 0.0;
            continue;
        }
        run += 1;
        if run < period {
            seed_sum += v;
            continue;
        }
        prev = if run == period {
            (seed_sum + v) / period as f64
        } else {
            alpha * v + (1.0 - alpha) * prev
        };
        result[i] = prev;
    }
    result
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Bars from (open, high, low, close) tuples, volume 1000.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_smooth_reseeds_after_gap() {
        let v = [1.0, 2.0, 3.0, f64::NAN, 4.0, 6.0, 8.0];
        let out = seeded_smooth(&v, 2, 0.5);
        assert!(out[0].is_nan());
        assert_approx(out[1], 1.5, DEFAULT_EPSILON);
        assert_approx(out[2], 2.25, DEFAULT_EPSILON);
        assert!(out[3].is_nan());
        assert!(out[4].is_nan());
        assert_approx(out[5], 5.0, DEFAULT_EPSILON);
        assert_approx(out[6], 6.5, DEFAULT_EPSILON);
    }
}
