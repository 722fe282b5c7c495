//! Feature assembly: raw frame columns plus every derived block, joined by
//! timestamp, deduplicated by name, with incomplete rows removed.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::ingest::timestamp_millis;
use crate::error::ValidationError;
use crate::fingerprint::DatasetHash;
use crate::frame::{AlignedFrame, FeatureBlock, FrameColumn};

/// What to do when two columns share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `ValidationError::DuplicateColumn`.
    #[default]
    Reject,
    /// Keep the leftmost column, drop the rest with a warning.
    KeepFirst,
}

#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    target: String,
    min_rows: usize,
    duplicate_policy: DuplicatePolicy,
}

impl FeatureAssembler {
    /// `min_rows` is the smallest matrix the caller can use, typically one
    /// full window plus its target.
    pub fn new(target: impl Into<String>, min_rows: usize) -> Self {
        Self {
            target: target.into(),
            min_rows: min_rows.max(1),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Frame columns first, then each block's columns in order.
    pub fn assemble(
        &self,
        frame: &AlignedFrame,
        blocks: &[FeatureBlock],
    ) -> Result<FeatureMatrix, ValidationError> {
        let index = frame.index();
        let mut columns: Vec<FrameColumn> = Vec::new();

        for column in frame.columns() {
            self.admit(column.clone(), &mut columns)?;
        }
        for block in blocks {
            for column in join_block(index, block)? {
                self.admit(column, &mut columns)?;
            }
        }

        if !columns.iter().any(|c| c.name == self.target) {
            return Err(ValidationError::MissingTarget(self.target.clone()));
        }

        let keep: Vec<usize> = (0..index.len())
            .filter(|&row| columns.iter().all(|c| c.values[row].is_finite()))
            .collect();
        let dropped = index.len() - keep.len();
        if dropped > 0 {
            tracing::warn!(dropped, kept = keep.len(), "rows with missing values dropped");
        }
        if keep.is_empty() {
            let empty: Vec<&str> = columns
                .iter()
                .filter(|c| c.values.iter().all(|v| !v.is_finite()))
                .map(|c| c.name.as_str())
                .collect();
            if !empty.is_empty() {
                tracing::warn!(columns = ?empty, "columns with no observed values");
            }
        }
        if keep.len() < self.min_rows {
            return Err(ValidationError::insufficient(
                "assembled feature matrix",
                self.min_rows,
                keep.len(),
            ));
        }

        let columns = columns
            .into_iter()
            .map(|c| FrameColumn::new(c.name, keep.iter().map(|&r| c.values[r]).collect()))
            .collect();
        let index = keep.iter().map(|&r| index[r]).collect();

        let matrix = FeatureMatrix {
            index,
            target: self.target.clone(),
            columns,
        };
        tracing::debug!(rows = matrix.nrows(), columns = matrix.ncols(), "feature matrix assembled");
        Ok(matrix)
    }

    fn admit(&self, column: FrameColumn, columns: &mut Vec<FrameColumn>) -> Result<(), ValidationError> {
        if columns.iter().any(|c| c.name == column.name) {
            return match self.duplicate_policy {
                DuplicatePolicy::Reject => Err(ValidationError::DuplicateColumn(column.name)),
                DuplicatePolicy::KeepFirst => {
                    tracing::warn!(column = %column.name, "duplicate column dropped");
                    Ok(())
                }
            };
        }
        columns.push(column);
        Ok(())
    }
}

/// Place a block's columns on `index`. Rows the block has no value for are NaN.
fn join_block(index: &[NaiveDateTime], block: &FeatureBlock) -> Result<Vec<FrameColumn>, ValidationError> {
    for column in block.columns() {
        if column.values.len() != block.index().len() {
            return Err(ValidationError::LengthMismatch {
                context: format!("block '{}' column '{}'", block.name(), column.name),
                expected: block.index().len(),
                actual: column.values.len(),
            });
        }
    }
    if block.index() == index {
        return Ok(block.columns().to_vec());
    }

    let rows: HashMap<NaiveDateTime, usize> =
        block.index().iter().enumerate().map(|(i, ts)| (*ts, i)).collect();
    Ok(block
        .columns()
        .iter()
        .map(|column| {
            let values = index
                .iter()
                .map(|ts| rows.get(ts).map_or(f64::NAN, |&i| column.values[i]))
                .collect();
            FrameColumn::new(column.name.clone(), values)
        })
        .collect())
}

/// Complete, unique-named, time-indexed feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    index: Vec<NaiveDateTime>,
    target: String,
    columns: Vec<FrameColumn>,
}

impl FeatureMatrix {
    /// Build a matrix directly from complete columns on a strictly increasing index.
    pub fn from_columns(
        index: Vec<NaiveDateTime>,
        target: impl Into<String>,
        columns: Vec<FrameColumn>,
    ) -> Result<Self, ValidationError> {
        let target = target.into();
        if index.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ValidationError::InvalidParameter(
                "matrix index must be strictly increasing".into(),
            ));
        }
        for (i, column) in columns.iter().enumerate() {
            if column.values.len() != index.len() {
                return Err(ValidationError::LengthMismatch {
                    context: format!("column '{}'", column.name),
                    expected: index.len(),
                    actual: column.values.len(),
                });
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(ValidationError::DuplicateColumn(column.name.clone()));
            }
            if column.values.iter().any(|v| !v.is_finite()) {
                return Err(ValidationError::InvalidParameter(format!(
                    "column '{}' has missing values",
                    column.name
                )));
            }
        }
        if !columns.iter().any(|c| c.name == target) {
            return Err(ValidationError::MissingTarget(target));
        }
        Ok(Self {
            index,
            target,
            columns,
        })
    }

    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn columns(&self) -> &[FrameColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn target_values(&self) -> &[f64] {
        self.column(&self.target).unwrap_or(&[])
    }

    /// Every column except the target, in matrix order.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.name != self.target)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn row(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c.values[i]).collect()
    }

    /// BLAKE3 over names, timestamps and the bit patterns of every value.
    pub fn fingerprint(&self) -> DatasetHash {
        let mut hasher = blake3::Hasher::new();
        for column in &self.columns {
            hasher.update(column.name.as_bytes());
            hasher.update(&[0]);
        }
        for ts in &self.index {
            hasher.update(&timestamp_millis(ts).to_le_bytes());
        }
        for column in &self.columns {
            for v in &column.values {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        DatasetHash::from(hasher.finalize())
    }

    /// `timestamp` (datetime, ms) followed by every column as f64.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let millis: Vec<i64> = self.index.iter().map(timestamp_millis).collect();
        let ts = Series::new("timestamp".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::from(ts));
        for column in &self.columns {
            columns.push(Column::new(column.name.as_str().into(), column.values.as_slice()));
        }
        DataFrame::new(columns)
    }
}
