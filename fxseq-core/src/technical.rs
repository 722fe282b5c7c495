//! Technical indicator block for one price source.
//!
//! Indicators are built once from configuration and then evaluated against
//! each source's bars. Indicators that need open/high/low/volume are skipped
//! for close-only sources.

use crate::domain::SourceKind;
use crate::error::ValidationError;
use crate::frame::{AlignedFrame, FeatureBlock};
use crate::indicator::{Indicator, IndicatorSpec};

/// Default lookback periods for the per-period indicators.
pub const DEFAULT_WINDOWS: [usize; 3] = [5, 10, 20];

pub struct TechnicalIndicatorEngine {
    windows: Vec<usize>,
    indicators: Vec<Box<dyn Indicator>>,
}

impl std::fmt::Debug for TechnicalIndicatorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TechnicalIndicatorEngine")
            .field("windows", &self.windows)
            .field("indicators", &self.names())
            .finish()
    }
}

impl TechnicalIndicatorEngine {
    /// Build the engine from a window set and the broader indicator families.
    ///
    /// Windows must be >= 2; repeats are dropped keeping the first. A spec
    /// repeated verbatim is built once. Two different specs that produce the
    /// same column name are a `DuplicateColumn` error.
    pub fn new(windows: &[usize], families: &[IndicatorSpec]) -> Result<Self, ValidationError> {
        if windows.is_empty() {
            return Err(ValidationError::InvalidParameter(
                "indicator window set must not be empty".into(),
            ));
        }
        if let Some(w) = windows.iter().find(|w| **w < 2) {
            return Err(ValidationError::InvalidParameter(format!(
                "indicator window must be >= 2, got {w}"
            )));
        }
        let mut unique = Vec::with_capacity(windows.len());
        for w in windows {
            if !unique.contains(w) {
                unique.push(*w);
            }
        }

        let mut indicators: Vec<Box<dyn Indicator>> = Vec::new();
        let mut origins: Vec<IndicatorSpec> = Vec::new();
        let specs = IndicatorSpec::window_set(&unique)
            .into_iter()
            .chain(families.iter().cloned());
        for spec in specs {
            for indicator in spec.build()? {
                match indicators.iter().position(|i| i.name() == indicator.name()) {
                    Some(at) if origins[at] == spec => {
                        tracing::debug!(name = indicator.name(), "repeated indicator skipped");
                    }
                    Some(_) => {
                        return Err(ValidationError::DuplicateColumn(indicator.name().to_string()));
                    }
                    None => {
                        tracing::debug!(name = indicator.name(), family = ?spec.family(), "indicator");
                        indicators.push(indicator);
                        origins.push(spec.clone());
                    }
                }
            }
        }

        Ok(Self {
            windows: unique,
            indicators,
        })
    }

    pub fn windows(&self) -> &[usize] {
        &self.windows
    }

    pub fn names(&self) -> Vec<&str> {
        self.indicators.iter().map(|i| i.name()).collect()
    }

    /// Longest lookback across all indicators.
    pub fn warmup(&self) -> usize {
        self.indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
    }

    /// Compute the technical block for `source`. Column names are unqualified.
    pub fn compute(&self, frame: &AlignedFrame, source: &str) -> Result<FeatureBlock, ValidationError> {
        let layout = frame.source(source)?;
        let bars = frame.bars(source)?;
        let close_only = layout.kind == SourceKind::Fixing;

        let mut block = FeatureBlock::new("technical", frame.index().to_vec());
        for indicator in &self.indicators {
            if close_only && indicator.requires_ohlcv() {
                tracing::debug!(source, indicator = indicator.name(), "skipped for close-only source");
                continue;
            }
            let series = indicator.compute(&bars);
            debug_assert_eq!(
                series.len(),
                bars.len(),
                "indicator '{}' produced {} values for {} bars (source={})",
                indicator.name(),
                series.len(),
                bars.len(),
                source
            );
            block.push(indicator.name(), series);
        }

        tracing::debug!(source, columns = block.columns().len(), "technical indicators");
        Ok(block)
    }
}

impl Default for TechnicalIndicatorEngine {
    fn default() -> Self {
        let families = IndicatorSpec::default_families();
        let mut indicators: Vec<Box<dyn Indicator>> = Vec::new();
        for spec in IndicatorSpec::window_set(&DEFAULT_WINDOWS)
            .iter()
            .chain(families.iter())
        {
            // Default parameters are always valid.
            if let Ok(built) = spec.build() {
                indicators.extend(built);
            }
        }
        Self {
            windows: DEFAULT_WINDOWS.to_vec(),
            indicators,
        }
    }
}
