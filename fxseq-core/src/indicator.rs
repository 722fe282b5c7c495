//! Indicator trait and the tagged configuration enum that selects indicators.
//!
//! Indicators are pure functions: bar history in, numeric series out. Every
//! implementation is causal. The value at row t may only depend on rows <= t,
//! and each indicator passes the truncated-vs-full series test.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::ValidationError;
use crate::indicators::{
    Adx, Atr, Bollinger, Ema, Macd, Momentum, RollingRsi, RollingVolatility, Sma, Stochastic,
    Vwap, WilderRsi,
};

/// Trait for indicators.
///
/// `compute` returns a series the same length as `bars`. Warmup rows and rows
/// whose window touches a missing value are `f64::NAN`.
pub trait Indicator: Send + Sync {
    /// Column name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of rows needed before the first valid output.
    fn lookback(&self) -> usize;

    /// Whether the indicator reads open/high/low/volume, not just close.
    fn requires_ohlcv(&self) -> bool {
        false
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Indicator family, reported when the engine registers an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorFamily {
    Trend,
    Volatility,
    Momentum,
    Volume,
}

/// Closed set of indicators, selected from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Sma { period: usize },
    Ema { period: usize },
    /// Annualized std of log returns.
    Volatility { period: usize },
    /// Simple-average RSI.
    Rsi { period: usize },
    /// Wilder-smoothed RSI.
    WilderRsi { period: usize },
    /// Price ratio `p[t] / p[t - period]`.
    Momentum { period: usize },
    /// MACD histogram (line minus signal).
    Macd { fast: usize, slow: usize, signal: usize },
    Adx { period: usize },
    /// Upper and lower bands at `k` population standard deviations.
    Bollinger { period: usize, k: f64 },
    Atr { period: usize },
    /// Stochastic %K.
    Stochastic { period: usize },
    /// Rolling volume-weighted typical price.
    Vwap { period: usize },
}

impl IndicatorSpec {
    pub fn family(&self) -> IndicatorFamily {
        match self {
            Self::Sma { .. } | Self::Ema { .. } | Self::Macd { .. } | Self::Adx { .. } => {
                IndicatorFamily::Trend
            }
            Self::Volatility { .. } | Self::Bollinger { .. } | Self::Atr { .. } => {
                IndicatorFamily::Volatility
            }
            Self::Rsi { .. }
            | Self::WilderRsi { .. }
            | Self::Momentum { .. }
            | Self::Stochastic { .. } => IndicatorFamily::Momentum,
            Self::Vwap { .. } => IndicatorFamily::Volume,
        }
    }

    /// Check parameters without building.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let check = |what: &str, value: usize, min: usize| {
            if value < min {
                Err(ValidationError::InvalidParameter(format!(
                    "{what} must be >= {min}, got {value}"
                )))
            } else {
                Ok(())
            }
        };
        match *self {
            Self::Sma { period }
            | Self::Ema { period }
            | Self::Rsi { period }
            | Self::WilderRsi { period }
            | Self::Momentum { period }
            | Self::Adx { period }
            | Self::Atr { period }
            | Self::Stochastic { period }
            | Self::Vwap { period } => check("period", period, 1),
            Self::Volatility { period } => check("volatility period", period, 2),
            Self::Bollinger { period, k } => {
                check("bollinger period", period, 1)?;
                if !k.is_finite() || k <= 0.0 {
                    return Err(ValidationError::InvalidParameter(format!(
                        "bollinger k must be positive, got {k}"
                    )));
                }
                Ok(())
            }
            Self::Macd { fast, slow, signal } => {
                check("macd fast", fast, 1)?;
                check("macd signal", signal, 1)?;
                if slow <= fast {
                    return Err(ValidationError::InvalidParameter(format!(
                        "macd slow ({slow}) must exceed fast ({fast})"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Build the runtime indicator(s). Bollinger yields two: upper then lower.
    pub fn build(&self) -> Result<Vec<Box<dyn Indicator>>, ValidationError> {
        self.validate()?;
        let built: Vec<Box<dyn Indicator>> = match *self {
            Self::Sma { period } => vec![Box::new(Sma::new(period))],
            Self::Ema { period } => vec![Box::new(Ema::new(period))],
            Self::Volatility { period } => vec![Box::new(RollingVolatility::new(period))],
            Self::Rsi { period } => vec![Box::new(RollingRsi::new(period))],
            Self::WilderRsi { period } => vec![Box::new(WilderRsi::new(period))],
            Self::Momentum { period } => vec![Box::new(Momentum::new(period))],
            Self::Macd { fast, slow, signal } => vec![Box::new(Macd::new(fast, slow, signal))],
            Self::Adx { period } => vec![Box::new(Adx::new(period))],
            Self::Bollinger { period, k } => vec![
                Box::new(Bollinger::upper(period, k)),
                Box::new(Bollinger::lower(period, k)),
            ],
            Self::Atr { period } => vec![Box::new(Atr::new(period))],
            Self::Stochastic { period } => vec![Box::new(Stochastic::new(period))],
            Self::Vwap { period } => vec![Box::new(Vwap::new(period))],
        };
        Ok(built)
    }

    /// Per-period indicators: `sma_p`, `volatility_p`, `rsi_p`, `momentum_p`.
    pub fn window_set(periods: &[usize]) -> Vec<IndicatorSpec> {
        periods
            .iter()
            .flat_map(|&period| {
                [
                    Self::Sma { period },
                    Self::Volatility { period },
                    Self::Rsi { period },
                    Self::Momentum { period },
                ]
            })
            .collect()
    }

    /// Trend, volatility, momentum and volume families on their standard windows.
    pub fn default_families() -> Vec<IndicatorSpec> {
        vec![
            Self::Ema { period: 20 },
            Self::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            Self::Adx { period: 14 },
            Self::Bollinger { period: 20, k: 2.0 },
            Self::Atr { period: 14 },
            Self::WilderRsi { period: 14 },
            Self::Stochastic { period: 14 },
            Self::Vwap { period: 14 },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_set_order() {
        let names: Vec<String> = IndicatorSpec::window_set(&[5, 10])
            .iter()
            .flat_map(|s| s.build().unwrap())
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "sma_5",
                "volatility_5",
                "rsi_5",
                "momentum_5",
                "sma_10",
                "volatility_10",
                "rsi_10",
                "momentum_10",
            ]
        );
    }

    #[test]
    fn default_family_names() {
        let names: Vec<String> = IndicatorSpec::default_families()
            .iter()
            .flat_map(|s| s.build().unwrap())
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "ema_20",
                "macd_diff",
                "adx_14",
                "bb_high_20",
                "bb_low_20",
                "atr_14",
                "rsi_wilder_14",
                "stoch_14",
                "vwap_14",
            ]
        );
    }

    #[test]
    fn invalid_parameters_are_validation_errors() {
        assert!(IndicatorSpec::Sma { period: 0 }.build().is_err());
        assert!(IndicatorSpec::Volatility { period: 1 }.build().is_err());
        assert!(IndicatorSpec::Bollinger { period: 20, k: 0.0 }.build().is_err());
        assert!(IndicatorSpec::Macd {
            fast: 26,
            slow: 12,
            signal: 9
        }
        .build()
        .is_err());
    }

    #[test]
    fn spec_round_trips_through_toml() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            indicators: Vec<IndicatorSpec>,
        }
        let text = r#"
            [[indicators]]
            type = "bollinger"
            period = 20
            k = 2.0

            [[indicators]]
            type = "wilder_rsi"
            period = 14
        "#;
        let parsed: Wrapper = toml::from_str(text).unwrap();
        assert_eq!(
            parsed.indicators,
            vec![
                IndicatorSpec::Bollinger { period: 20, k: 2.0 },
                IndicatorSpec::WilderRsi { period: 14 },
            ]
        );
    }

    #[test]
    fn default_families_cover_every_family() {
        let families: Vec<IndicatorFamily> = IndicatorSpec::default_families()
            .iter()
            .map(IndicatorSpec::family)
            .collect();
        for family in [
            IndicatorFamily::Trend,
            IndicatorFamily::Volatility,
            IndicatorFamily::Momentum,
            IndicatorFamily::Volume,
        ] {
            assert!(families.contains(&family), "{family:?} missing");
        }
    }

    #[test]
    fn ohlcv_requirement_by_family() {
        let needs: Vec<bool> = IndicatorSpec::default_families()
            .iter()
            .flat_map(|s| s.build().unwrap())
            .map(|i| i.requires_ohlcv())
            .collect();
        assert_eq!(
            needs,
            vec![false, false, true, false, false, true, false, true, true]
        );
    }
}
