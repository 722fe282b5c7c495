//! fxseq core: turns FX fixings, equity OHLCV and scored news into a causal
//! feature matrix and fixed-length training sequences.
//!
//! Stages, leaf first:
//! - `data::SeriesAligner`: union time index, missing cells marked NaN
//! - `metrics::BasicMetricsCalculator`: returns, range, gap, rolling volatility
//! - `technical::TechnicalIndicatorEngine`: per-window and family indicators
//! - `diagnostics::StatisticalDiagnostics`: advisory normality/stationarity report
//! - `sentiment::SentimentFeaturizer`: normalized, bucketed news sentiment
//! - `assemble::FeatureAssembler`: joins blocks, rejects duplicates, drops incomplete rows
//! - `sequence::SequenceBuilder`: train-only scaling, windowing, ordered split
//!
//! Everything here is synchronous and pure. Every derived value at row t
//! depends on rows <= t only.

pub mod assemble;
pub mod data;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod fingerprint;
pub mod frame;
pub mod indicator;
pub mod indicators;
pub mod metrics;
pub mod rollups;
pub mod scaling;
pub mod sentiment;
pub mod sequence;
pub mod session;
pub mod stats;
pub mod technical;

pub use assemble::{DuplicatePolicy, FeatureAssembler, FeatureMatrix};
pub use data::{NewsAlignment, SeriesAligner};
pub use diagnostics::{DiagnosticsReport, NumericAdvisory, StatisticalDiagnostics};
pub use domain::{Bar, NewsItem, SourceKind, TimeSeries};
pub use error::ValidationError;
pub use frame::{AlignedFrame, FeatureBlock};
pub use indicator::{Indicator, IndicatorSpec};
pub use metrics::BasicMetricsCalculator;
pub use rollups::StatisticalRollups;
pub use scaling::FittedMinMax;
pub use sentiment::{SentimentFeaturizer, SentimentScaler};
pub use sequence::{FittedScalers, SequenceBuilder, SequenceConfig, SequenceDataset};
pub use technical::TechnicalIndicatorEngine;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline values can cross to worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<TimeSeries>();
        require_sync::<TimeSeries>();
        require_send::<AlignedFrame>();
        require_sync::<AlignedFrame>();
        require_send::<FeatureBlock>();
        require_sync::<FeatureBlock>();
        require_send::<FeatureMatrix>();
        require_sync::<FeatureMatrix>();
        require_send::<DiagnosticsReport>();
        require_sync::<DiagnosticsReport>();
        require_send::<FittedScalers>();
        require_sync::<FittedScalers>();
        require_send::<SequenceDataset>();
        require_sync::<SequenceDataset>();

        // Engines are shared by reference across the per-source fan-out.
        require_sync::<TechnicalIndicatorEngine>();
        require_sync::<BasicMetricsCalculator>();
        require_sync::<SentimentFeaturizer>();
    }
}
