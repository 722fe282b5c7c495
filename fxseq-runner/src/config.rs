//! Serializable pipeline configuration, loaded from TOML.
//!
//! Every key has a default, so an empty file plus a `[[sources]]` table is a
//! valid configuration:
//!
//! ```toml
//! target = "usdmxn_fix"
//! news = "news.csv"
//!
//! [[sources]]
//! name = "usdmxn_fix"
//! kind = "fixing"
//! path = "banxico_fix.csv"
//!
//! [[sources]]
//! name = "AMXL.MX"
//! kind = "ohlcv"
//! path = "amxl.csv"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fxseq_core::assemble::DuplicatePolicy;
use fxseq_core::data::NewsAlignment;
use fxseq_core::domain::SourceKind;
use fxseq_core::fingerprint::RunId;
use fxseq_core::indicator::IndicatorSpec;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One input series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Fixing column name, or the ticker that prefixes OHLCV columns.
    pub name: String,
    pub kind: SourceKind,
    /// CSV file, or a Parquet file when the extension is `.parquet`.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub target: String,
    pub windows: Vec<usize>,
    pub volatility_window: usize,
    pub rollup_windows: Vec<usize>,
    pub sequence_length: usize,
    pub test_fraction: f64,
    pub indicators: Vec<IndicatorSpec>,
    pub duplicate_policy: DuplicatePolicy,
    pub news_alignment: NewsAlignment,
    pub session_features: bool,
    pub statistical_rollups: bool,
    /// Defaults to `sequence_length + 1`.
    pub min_rows: Option<usize>,
    pub sources: Vec<SourceConfig>,
    /// Scored news CSV (`timestamp,sentiment_score,source_tag`).
    pub news: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target: "usdmxn_fix".into(),
            windows: vec![5, 10, 20],
            volatility_window: 20,
            rollup_windows: vec![5, 10, 20],
            sequence_length: 10,
            test_fraction: 0.2,
            indicators: IndicatorSpec::default_families(),
            duplicate_policy: DuplicatePolicy::default(),
            news_alignment: NewsAlignment::default(),
            session_features: false,
            statistical_rollups: true,
            min_rows: None,
            sources: Vec::new(),
            news: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML string. Paths stay as written.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file. Relative input paths resolve against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        tracing::debug!(path = %path.display(), sources = config.sources.len(), "loaded config");
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for source in &mut self.sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
        if let Some(news) = &self.news {
            if news.is_relative() {
                self.news = Some(base.join(news));
            }
        }
    }

    pub fn min_rows(&self) -> usize {
        self.min_rows.unwrap_or(self.sequence_length + 1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        if self.target.trim().is_empty() {
            return invalid("target must not be empty".into());
        }
        if self.windows.is_empty() {
            return invalid("windows must not be empty".into());
        }
        if let Some(w) = self.windows.iter().find(|w| **w < 2) {
            return invalid(format!("indicator windows must be >= 2, got {w}"));
        }
        if self.volatility_window < 2 {
            return invalid(format!(
                "volatility_window must be >= 2, got {}",
                self.volatility_window
            ));
        }
        if self.statistical_rollups {
            if self.rollup_windows.is_empty() {
                return invalid("rollup_windows must not be empty".into());
            }
            if let Some(w) = self.rollup_windows.iter().find(|w| **w < 4) {
                return invalid(format!("rollup windows must be >= 4, got {w}"));
            }
        }
        if self.sequence_length < 1 {
            return invalid("sequence_length must be >= 1".into());
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return invalid(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            ));
        }
        if self.min_rows() < self.sequence_length + 1 {
            return invalid(format!(
                "min_rows must be >= sequence_length + 1 ({}), got {}",
                self.sequence_length + 1,
                self.min_rows()
            ));
        }
        for spec in &self.indicators {
            spec.validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        for (i, source) in self.sources.iter().enumerate() {
            if source.name.trim().is_empty() {
                return invalid(format!("source #{i} has an empty name"));
            }
            if self.sources[..i].iter().any(|s| s.name == source.name) {
                return invalid(format!("source '{}' is listed twice", source.name));
            }
        }
        Ok(())
    }

    /// Deterministic id: BLAKE3 over the canonical JSON form.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        Ok(RunId::of(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
target = "usdmxn_fix"
windows = [5, 10]
sequence_length = 5
news_alignment = "as_of"
duplicate_policy = "keep_first"

[[indicators]]
type = "ema"
period = 12

[[indicators]]
type = "bollinger"
period = 20
k = 2.0

[[sources]]
name = "usdmxn_fix"
kind = "fixing"
path = "fix.csv"

[[sources]]
name = "AMXL.MX"
kind = "ohlcv"
path = "/data/amxl.parquet"
"#;

    #[test]
    fn parses_example() {
        let config = PipelineConfig::from_toml(EXAMPLE).unwrap();
        assert_eq!(config.windows, vec![5, 10]);
        assert_eq!(config.sequence_length, 5);
        assert_eq!(config.min_rows(), 6);
        assert_eq!(config.news_alignment, NewsAlignment::AsOf);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::KeepFirst);
        assert_eq!(config.indicators.len(), 2);
        assert_eq!(config.sources[1].kind, SourceKind::Ohlcv);
        // Untouched keys keep their defaults.
        assert_eq!(config.volatility_window, 20);
        assert!(config.statistical_rollups);
        assert!(!config.session_features);
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let mut config = PipelineConfig::from_toml(EXAMPLE).unwrap();
        config.news = Some(PathBuf::from("news.csv"));
        config.resolve_paths(Path::new("/work/run"));
        assert_eq!(config.sources[0].path, PathBuf::from("/work/run/fix.csv"));
        assert_eq!(config.sources[1].path, PathBuf::from("/data/amxl.parquet"));
        assert_eq!(config.news, Some(PathBuf::from("/work/run/news.csv")));
    }

    #[test]
    fn rejects_bad_values() {
        for bad in [
            "windows = [1, 5]",
            "windows = []",
            "test_fraction = 1.0",
            "test_fraction = 0.0",
            "sequence_length = 0",
            "rollup_windows = [3]",
            "volatility_window = 1",
            "target = \"\"",
            "min_rows = 2",
        ] {
            let err = PipelineConfig::from_toml(bad).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn rollup_windows_ignored_when_disabled() {
        let config =
            PipelineConfig::from_toml("statistical_rollups = false\nrollup_windows = [2]").unwrap();
        assert!(!config.statistical_rollups);
    }

    #[test]
    fn duplicate_source_names_rejected() {
        let text = r#"
[[sources]]
name = "a"
kind = "fixing"
path = "a.csv"

[[sources]]
name = "a"
kind = "fixing"
path = "b.csv"
"#;
        assert!(matches!(
            PipelineConfig::from_toml(text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_enum_value_is_parse_error() {
        let err = PipelineConfig::from_toml("news_alignment = \"nearest\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let a = PipelineConfig::default();
        let mut b = PipelineConfig::default();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());
        b.sequence_length = 20;
        assert_ne!(a.run_id().unwrap(), b.run_id().unwrap());
    }
}
