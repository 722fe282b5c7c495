//! Scaling and windowing of the assembled matrix into supervised sequences.
//!
//! For `n` rows and sequence length `L` there are `n - L` sequences:
//! `X[i] = features[i .. i + L]`, `y[i] = target[i + L]`. The first
//! `floor((n - L) × (1 - f))` sequences train, the rest test, in time order.
//!
//! `fit_transform` fits both scalers on rows `[0, train_count + L)`, the rows
//! training windows and targets can see, and applies them to everything.
//! `transform` windows new data with scalers fitted earlier.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::assemble::FeatureMatrix;
use crate::error::ValidationError;
use crate::scaling::FittedMinMax;

/// Guards `floor` against products like 5 × 0.8 landing just below 4.
const SPLIT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub sequence_length: usize,
    pub test_fraction: f64,
    pub target: String,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            sequence_length: 10,
            test_fraction: 0.2,
            target: "usdmxn_fix".into(),
        }
    }
}

/// Scalers fitted on the training slice, reused for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScalers {
    pub features: FittedMinMax,
    pub target: FittedMinMax,
}

impl FittedScalers {
    /// Map scaled target values (e.g. model predictions) back to price units.
    pub fn inverse_target(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.target.inverse_value(0, *v)).collect()
    }
}

/// Matrix after scaling, with the fitted parameters that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledMatrix {
    index: Vec<NaiveDateTime>,
    feature_names: Vec<String>,
    /// Column-major: `features[c][row]`.
    features: Vec<Vec<f64>>,
    target: Vec<f64>,
    scalers: FittedScalers,
}

impl ScaledMatrix {
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature(&self, column: usize) -> &[f64] {
        &self.features[column]
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn scalers(&self) -> &FittedScalers {
        &self.scalers
    }

    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    fn window(&self, start: usize, len: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(len * self.features.len());
        for row in start..start + len {
            out.extend(self.features.iter().map(|c| c[row]));
        }
        out
    }

    fn dataset(&self, len: usize, starts: std::ops::Range<usize>) -> SequenceDataset {
        let n = starts.len();
        let mut x = Vec::with_capacity(n * len * self.features.len());
        let mut y = Vec::with_capacity(n);
        let mut start_rows = Vec::with_capacity(n);
        let mut target_timestamps = Vec::with_capacity(n);
        for i in starts {
            x.extend(self.window(i, len));
            y.push(self.target[i + len]);
            start_rows.push(i);
            target_timestamps.push(self.index[i + len]);
        }
        SequenceDataset {
            x,
            y,
            sequence_length: len,
            feature_names: self.feature_names.clone(),
            start_rows,
            target_timestamps,
        }
    }
}

/// `X` of shape `(N, L, F)` stored flat and row-major, and `y` of shape `(N,)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDataset {
    x: Vec<f64>,
    y: Vec<f64>,
    sequence_length: usize,
    feature_names: Vec<String>,
    start_rows: Vec<usize>,
    target_timestamps: Vec<NaiveDateTime>,
}

impl SequenceDataset {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.len(), self.sequence_length, self.n_features())
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Matrix row where each sequence's window starts.
    pub fn start_rows(&self) -> &[usize] {
        &self.start_rows
    }

    pub fn target_timestamps(&self) -> &[NaiveDateTime] {
        &self.target_timestamps
    }

    /// Window `i` as `L × F` values, row-major.
    pub fn window(&self, i: usize) -> &[f64] {
        let size = self.sequence_length * self.n_features();
        &self.x[i * size..(i + 1) * size]
    }
}

/// Result of `fit_transform`: both splits plus the parameters to reuse.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSequences {
    pub train: SequenceDataset,
    pub test: SequenceDataset,
    pub scaled: ScaledMatrix,
}

impl WindowedSequences {
    pub fn scalers(&self) -> &FittedScalers {
        self.scaled.scalers()
    }

    /// Sequences held by the training split.
    pub fn train_count(&self) -> usize {
        self.train.len()
    }
}

#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    config: SequenceConfig,
}

impl SequenceBuilder {
    pub fn new(config: SequenceConfig) -> Result<Self, ValidationError> {
        if config.sequence_length < 1 {
            return Err(ValidationError::InvalidParameter(
                "sequence length must be >= 1".into(),
            ));
        }
        if !(config.test_fraction > 0.0 && config.test_fraction < 1.0) {
            return Err(ValidationError::InvalidParameter(format!(
                "test fraction must be in (0, 1), got {}",
                config.test_fraction
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Sequences that `rows` matrix rows produce.
    pub fn sequence_count(&self, rows: usize) -> usize {
        rows.saturating_sub(self.config.sequence_length)
    }

    /// Training sequences out of `n_sequences`.
    pub fn train_count(&self, n_sequences: usize) -> usize {
        let raw = n_sequences as f64 * (1.0 - self.config.test_fraction) + SPLIT_EPSILON;
        (raw.floor() as usize).min(n_sequences)
    }

    /// Fit scalers on the training slice, scale, window and split.
    pub fn fit_transform(&self, matrix: &FeatureMatrix) -> Result<WindowedSequences, ValidationError> {
        let (names, features, target) = self.columns(matrix)?;
        let len = self.config.sequence_length;
        let n_seq = self.sequence_count(matrix.nrows());
        let train = self.train_count(n_seq);
        let fit_rows = train + len;

        let feature_views: Vec<&[f64]> = features.iter().map(|c| &c[..fit_rows]).collect();
        let scalers = FittedScalers {
            features: FittedMinMax::fit(&names, &feature_views)?,
            target: FittedMinMax::fit(&[self.config.target.clone()], &[&target[..fit_rows]])?,
        };
        tracing::debug!(fit_rows, rows = matrix.nrows(), "scalers fitted on training slice");

        let scaled = scale(matrix, names, &features, target, scalers)?;
        let windowed = WindowedSequences {
            train: scaled.dataset(len, 0..train),
            test: scaled.dataset(len, train..n_seq),
            scaled,
        };
        tracing::debug!(
            train = windowed.train.len(),
            test = windowed.test.len(),
            features = windowed.train.n_features(),
            "sequences built"
        );
        Ok(windowed)
    }

    /// Scale with previously fitted scalers and window every sequence.
    pub fn transform(
        &self,
        matrix: &FeatureMatrix,
        scalers: &FittedScalers,
    ) -> Result<SequenceDataset, ValidationError> {
        let (_, _, target) = self.columns(matrix)?;
        let mut features = Vec::with_capacity(scalers.features.len());
        for name in scalers.features.columns() {
            let column = matrix
                .column(name)
                .ok_or_else(|| ValidationError::UnknownColumn(name.clone()))?;
            features.push(column);
        }
        let names = scalers.features.columns().to_vec();
        let scaled = scale(matrix, names, &features, target, scalers.clone())?;
        let len = self.config.sequence_length;
        Ok(scaled.dataset(len, 0..self.sequence_count(matrix.nrows())))
    }

    #[allow(clippy::type_complexity)]
    fn columns<'m>(
        &self,
        matrix: &'m FeatureMatrix,
    ) -> Result<(Vec<String>, Vec<&'m [f64]>, &'m [f64]), ValidationError> {
        let target_name = &self.config.target;
        let target = matrix
            .column(target_name)
            .ok_or_else(|| ValidationError::MissingTarget(target_name.clone()))?;
        let names: Vec<String> = matrix
            .names()
            .into_iter()
            .filter(|n| *n != target_name.as_str())
            .map(String::from)
            .collect();
        if names.is_empty() {
            return Err(ValidationError::InvalidParameter(
                "matrix has no feature columns besides the target".into(),
            ));
        }
        let required = self.config.sequence_length + 1;
        if matrix.nrows() < required {
            return Err(ValidationError::insufficient(
                "sequence windowing",
                required,
                matrix.nrows(),
            ));
        }
        let features = names
            .iter()
            .filter_map(|n| matrix.column(n))
            .collect();
        Ok((names, features, target))
    }
}

fn scale(
    matrix: &FeatureMatrix,
    feature_names: Vec<String>,
    features: &[&[f64]],
    target: &[f64],
    scalers: FittedScalers,
) -> Result<ScaledMatrix, ValidationError> {
    let features = scalers.features.transform(features)?;
    let target = scalers
        .target
        .transform(&[target])?
        .into_iter()
        .next()
        .unwrap_or_default();
    Ok(ScaledMatrix {
        index: matrix.index().to_vec(),
        feature_names,
        features,
        target,
        scalers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameColumn;

    fn matrix(rows: usize) -> FeatureMatrix {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let index = (0..rows)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        FeatureMatrix::from_columns(
            index,
            "usdmxn_fix",
            vec![
                FrameColumn::new("usdmxn_fix", (0..rows).map(|i| 17.0 + i as f64).collect()),
                FrameColumn::new("returns", (0..rows).map(|i| i as f64 * 0.5).collect()),
                FrameColumn::new("sma_5", (0..rows).map(|i| 100.0 - i as f64).collect()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn fifteen_rows_make_four_train_and_one_test() {
        let builder = SequenceBuilder::new(SequenceConfig::default()).unwrap();
        let out = builder.fit_transform(&matrix(15)).unwrap();
        assert_eq!(out.train.shape(), (4, 10, 2));
        assert_eq!(out.test.shape(), (1, 10, 2));
        assert_eq!(out.test.start_rows(), &[4]);
        assert_eq!(out.train.feature_names(), &["returns", "sma_5"]);
    }

    #[test]
    fn windows_and_targets_line_up() {
        let builder = SequenceBuilder::new(SequenceConfig {
            sequence_length: 3,
            ..SequenceConfig::default()
        })
        .unwrap();
        let out = builder.fit_transform(&matrix(8)).unwrap();
        let target = out.scaled.target();
        for (k, &start) in out.train.start_rows().iter().enumerate() {
            assert_eq!(out.train.y()[k], target[start + 3]);
            let window = out.train.window(k);
            assert_eq!(window.len(), 3 * 2);
            assert_eq!(window[0], out.scaled.feature(0)[start]);
            assert_eq!(window[5], out.scaled.feature(1)[start + 2]);
        }
    }

    #[test]
    fn scalers_fit_on_training_rows_only() {
        // 15 rows, L = 10: train_count = 4, fit rows = [0, 14).
        let builder = SequenceBuilder::new(SequenceConfig::default()).unwrap();
        let out = builder.fit_transform(&matrix(15)).unwrap();
        let target = &out.scalers().target;
        assert_eq!(target.mins(), &[17.0]);
        assert_eq!(target.scales(), &[13.0]);
        // The last, unseen row is scaled above 1.
        assert!(out.scaled.target()[14] > 1.0);
    }

    #[test]
    fn transform_reuses_scalers() {
        let builder = SequenceBuilder::new(SequenceConfig::default()).unwrap();
        let out = builder.fit_transform(&matrix(15)).unwrap();
        let again = builder.transform(&matrix(20), out.scalers()).unwrap();
        assert_eq!(again.len(), 10);
        assert_eq!(&again.x()[..out.train.x().len()], out.train.x());
    }

    #[test]
    fn too_few_rows_is_a_validation_error() {
        let builder = SequenceBuilder::new(SequenceConfig::default()).unwrap();
        let err = builder.fit_transform(&matrix(10)).unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientRows { required: 11, available: 10, .. }));
    }

    #[test]
    fn invalid_configs() {
        assert!(SequenceBuilder::new(SequenceConfig {
            sequence_length: 0,
            ..SequenceConfig::default()
        })
        .is_err());
        for f in [0.0, 1.0, -0.1, f64::NAN] {
            assert!(SequenceBuilder::new(SequenceConfig {
                test_fraction: f,
                ..SequenceConfig::default()
            })
            .is_err());
        }
    }

    #[test]
    fn target_must_exist() {
        let builder = SequenceBuilder::new(SequenceConfig {
            target: "eurmxn_fix".into(),
            ..SequenceConfig::default()
        })
        .unwrap();
        assert_eq!(
            builder.fit_transform(&matrix(15)).unwrap_err(),
            ValidationError::MissingTarget("eurmxn_fix".into())
        );
    }
}
