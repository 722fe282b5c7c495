//! End-to-end pipeline: align, derive per-source blocks, diagnose, attach
//! sentiment, assemble, window.
//!
//! Two entry points:
//! - `run_from_config()`: loads every configured input, then runs. Used by the CLI.
//! - `run_pipeline()`: takes pre-loaded sources and news. No I/O.
//!
//! Per-source blocks are computed in parallel on the rayon pool. Each task
//! reads the shared aligned frame and writes only its own block, and results
//! are collected in source order so the column order is deterministic.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use thiserror::Error;

use fxseq_core::assemble::{FeatureAssembler, FeatureMatrix};
use fxseq_core::data::SeriesAligner;
use fxseq_core::diagnostics::{DiagnosticsReport, StatisticalDiagnostics};
use fxseq_core::domain::{NewsItem, TimeSeries};
use fxseq_core::error::ValidationError;
use fxseq_core::fingerprint::{DatasetHash, RunId};
use fxseq_core::frame::{AlignedFrame, FeatureBlock, SourceLayout};
use fxseq_core::metrics::BasicMetricsCalculator;
use fxseq_core::rollups::StatisticalRollups;
use fxseq_core::sentiment::{SentimentFeaturizer, SentimentScaler};
use fxseq_core::sequence::{FittedScalers, SequenceBuilder, SequenceConfig, SequenceDataset};
use fxseq_core::session::session_block;
use fxseq_core::technical::TechnicalIndicatorEngine;

use crate::config::{ConfigError, PipelineConfig};
use crate::data_loader::{load_news, load_source, LoadError};

/// Errors from the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("no sources configured")]
    NoSources,
}

/// Loaded inputs for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub sources: Vec<TimeSeries>,
    pub news: Vec<NewsItem>,
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub matrix: FeatureMatrix,
    /// Diagnostics on the target source's returns.
    pub diagnostics: DiagnosticsReport,
    pub train: SequenceDataset,
    pub test: SequenceDataset,
    pub scalers: FittedScalers,
    /// Sentiment parameters, fitted on news up to the training boundary.
    pub sentiment_scaler: Option<SentimentScaler>,
    pub dataset_hash: DatasetHash,
    pub run_id: RunId,
}

/// Load every configured input.
pub fn load_inputs(config: &PipelineConfig) -> Result<PipelineInputs, LoadError> {
    let sources = config
        .sources
        .par_iter()
        .map(load_source)
        .collect::<Result<Vec<_>, _>>()?;
    let news = match &config.news {
        Some(path) => load_news(path)?,
        None => Vec::new(),
    };
    tracing::info!(sources = sources.len(), news = news.len(), "inputs loaded");
    Ok(PipelineInputs { sources, news })
}

/// Load inputs and run.
pub fn run_from_config(config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    if config.sources.is_empty() {
        return Err(PipelineError::NoSources);
    }
    let inputs = load_inputs(config)?;
    run_pipeline(config, &inputs)
}

/// Column prefix for a non-target source: lower-cased, punctuation to `_`.
pub fn source_prefix(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Stage engines built once from configuration and shared across sources.
struct Engines {
    basic: BasicMetricsCalculator,
    technical: TechnicalIndicatorEngine,
    rollups: Option<StatisticalRollups>,
}

impl Engines {
    fn from_config(config: &PipelineConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            basic: BasicMetricsCalculator::new(config.volatility_window)?,
            technical: TechnicalIndicatorEngine::new(&config.windows, &config.indicators)?,
            rollups: if config.statistical_rollups {
                Some(StatisticalRollups::new(&config.rollup_windows)?)
            } else {
                None
            },
        })
    }

    /// Basic and technical blocks for one source, plus rollups for the
    /// target's owner. Names are prefixed unless the source owns the target.
    fn source_block(
        &self,
        frame: &AlignedFrame,
        layout: &SourceLayout,
        owns_target: bool,
    ) -> Result<FeatureBlock, ValidationError> {
        let source = layout.name.as_str();
        let mut block = self.basic.compute(frame, source)?;
        block.extend(self.technical.compute(frame, source)?);
        if !owns_target {
            return Ok(block.qualified(&source_prefix(source)));
        }
        if let Some(rollups) = &self.rollups {
            let returns = block.column("returns").map(<[f64]>::to_vec).unwrap_or_default();
            block.extend(rollups.compute(frame.index(), &returns));
        }
        Ok(block)
    }
}

/// Run the full pipeline on pre-loaded inputs.
pub fn run_pipeline(
    config: &PipelineConfig,
    inputs: &PipelineInputs,
) -> Result<PipelineOutput, PipelineError> {
    if inputs.sources.is_empty() {
        return Err(PipelineError::NoSources);
    }
    let run_id = config.run_id()?;
    tracing::info!(run_id = %run_id.short(), target = %config.target, "pipeline started");

    let frame = SeriesAligner::new().align(&inputs.sources)?;
    let owner = frame
        .owner_of(&config.target)
        .map(|s| s.name.clone())
        .ok_or_else(|| ValidationError::MissingTarget(config.target.clone()))?;

    let engines = Engines::from_config(config)?;
    let warmup = engines.technical.warmup();
    if frame.len() <= warmup {
        tracing::warn!(rows = frame.len(), warmup, "aligned rows do not cover the indicator warmup");
    } else {
        tracing::debug!(rows = frame.len(), warmup, "indicator warmup");
    }
    let mut blocks: Vec<FeatureBlock> = frame
        .sources()
        .par_iter()
        .map(|layout| engines.source_block(&frame, layout, layout.name == owner))
        .collect::<Result<Vec<_>, _>>()?;
    if config.session_features {
        blocks.push(session_block(frame.index()));
    }
    tracing::info!(
        rows = frame.len(),
        blocks = blocks.len(),
        "feature blocks computed"
    );

    let owner_returns = blocks
        .iter()
        .find_map(|b| b.column("returns"))
        .unwrap_or_default();
    let diagnostics = StatisticalDiagnostics::default().run(owner_returns);

    let assembler = FeatureAssembler::new(config.target.clone(), config.min_rows())
        .with_duplicate_policy(config.duplicate_policy);
    let builder = SequenceBuilder::new(SequenceConfig {
        sequence_length: config.sequence_length,
        test_fraction: config.test_fraction,
        target: config.target.clone(),
    })?;

    let (matrix, sentiment_scaler) = if inputs.news.is_empty() {
        (assembler.assemble(&frame, &blocks)?, None)
    } else {
        let (matrix, scaler) =
            assemble_with_sentiment(config, &frame, &blocks, &inputs.news, &assembler, &builder)?;
        (matrix, Some(scaler))
    };

    let windowed = builder.fit_transform(&matrix)?;
    let scalers = windowed.scalers().clone();
    let dataset_hash = matrix.fingerprint();
    tracing::info!(
        rows = matrix.nrows(),
        features = matrix.ncols() - 1,
        train = windowed.train.len(),
        test = windowed.test.len(),
        dataset_hash = %dataset_hash,
        "pipeline finished"
    );

    Ok(PipelineOutput {
        matrix,
        diagnostics,
        train: windowed.train,
        test: windowed.test,
        scalers,
        sentiment_scaler,
        dataset_hash,
        run_id,
    })
}

/// Attach sentiment without letting test-period news shape its scaling.
///
/// Pass one assembles with a provisional scaler to locate the last row of the
/// training slice. The scaler is then refit on news stamped at or before that
/// row and the matrix is assembled again. Which rows survive assembly depends
/// only on which rows have news, so both passes keep the same rows.
fn assemble_with_sentiment(
    config: &PipelineConfig,
    frame: &AlignedFrame,
    blocks: &[FeatureBlock],
    news: &[NewsItem],
    assembler: &FeatureAssembler,
    builder: &SequenceBuilder,
) -> Result<(FeatureMatrix, SentimentScaler), ValidationError> {
    let assemble = |featurizer: SentimentFeaturizer| {
        let (sentiment, scaler) = featurizer.block(frame.index(), news)?;
        let mut all = blocks.to_vec();
        all.push(sentiment);
        Ok::<_, ValidationError>((assembler.assemble(frame, &all)?, scaler))
    };

    let (provisional, _) = assemble(SentimentFeaturizer::new(config.news_alignment))?;
    let boundary = training_boundary(&provisional, builder)?;

    let seen: Vec<f64> = news
        .iter()
        .filter(|n| n.timestamp <= boundary)
        .map(|n| n.sentiment_score)
        .collect();
    let scaler = SentimentScaler::fit(&seen)?;
    tracing::debug!(
        %boundary,
        items = seen.len(),
        mean = scaler.mean,
        std = scaler.std,
        "sentiment scaler refit on training news"
    );

    let featurizer = SentimentFeaturizer::new(config.news_alignment).with_scaler(scaler);
    let (matrix, _) = assemble(featurizer)?;
    Ok((matrix, scaler))
}

/// Timestamp of the last row the sequence scalers are fitted on.
fn training_boundary(
    matrix: &FeatureMatrix,
    builder: &SequenceBuilder,
) -> Result<NaiveDateTime, ValidationError> {
    let len = builder.config().sequence_length;
    if matrix.nrows() < len + 1 {
        return Err(ValidationError::InsufficientRows {
            context: "sequence windowing".into(),
            required: len + 1,
            available: matrix.nrows(),
        });
    }
    let train = builder.train_count(builder.sequence_count(matrix.nrows()));
    Ok(matrix.index()[train + len - 1])
}
