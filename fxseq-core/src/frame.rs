//! Aligned frames and derived feature blocks.
//!
//! An `AlignedFrame` is the common timestamp axis plus the raw source columns
//! placed on it. A `FeatureBlock` is a named group of derived columns on the
//! same axis. Missing cells are NaN in both.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, SourceKind};
use crate::error::ValidationError;

/// One named column of f64 values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameColumn {
    pub name: String,
    pub values: Vec<f64>,
}

impl FrameColumn {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Positions of a source's price columns inside the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceColumns {
    pub close: usize,
    pub open: Option<usize>,
    pub high: Option<usize>,
    pub low: Option<usize>,
    pub volume: Option<usize>,
}

/// Where a source's columns landed after alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLayout {
    pub name: String,
    pub kind: SourceKind,
    pub columns: PriceColumns,
}

/// Time-indexed table joining all sources on a common, strictly increasing index.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFrame {
    index: Vec<NaiveDateTime>,
    columns: Vec<FrameColumn>,
    sources: Vec<SourceLayout>,
}

impl AlignedFrame {
    pub(crate) fn from_parts(
        index: Vec<NaiveDateTime>,
        columns: Vec<FrameColumn>,
        sources: Vec<SourceLayout>,
    ) -> Self {
        Self {
            index,
            columns,
            sources,
        }
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn columns(&self) -> &[FrameColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn sources(&self) -> &[SourceLayout] {
        &self.sources
    }

    pub fn source(&self, name: &str) -> Result<&SourceLayout, ValidationError> {
        self.sources
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ValidationError::UnknownSource(name.to_string()))
    }

    /// The source whose raw columns include `column`, if any.
    pub fn owner_of(&self, column: &str) -> Option<&SourceLayout> {
        let pos = self.columns.iter().position(|c| c.name == column)?;
        self.sources.iter().find(|s| {
            let p = &s.columns;
            p.close == pos
                || p.open == Some(pos)
                || p.high == Some(pos)
                || p.low == Some(pos)
                || p.volume == Some(pos)
        })
    }

    /// Close-like price column of a source.
    pub fn price(&self, source: &str) -> Result<&[f64], ValidationError> {
        let layout = self.source(source)?;
        Ok(&self.columns[layout.columns.close].values)
    }

    /// Reassemble a source's columns into bars. Fields the source lacks are NaN.
    pub fn bars(&self, source: &str) -> Result<Vec<Bar>, ValidationError> {
        let layout = self.source(source)?;
        let pick = |slot: Option<usize>, i: usize| -> f64 {
            slot.map(|c| self.columns[c].values[i]).unwrap_or(f64::NAN)
        };
        let p = &layout.columns;
        Ok(self
            .index
            .iter()
            .enumerate()
            .map(|(i, ts)| Bar {
                timestamp: *ts,
                open: pick(p.open, i),
                high: pick(p.high, i),
                low: pick(p.low, i),
                close: self.columns[p.close].values[i],
                volume: pick(p.volume, i),
            })
            .collect())
    }
}

/// A named group of derived columns attached to a frame's index.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBlock {
    name: String,
    index: Vec<NaiveDateTime>,
    columns: Vec<FrameColumn>,
}

impl FeatureBlock {
    pub fn new(name: impl Into<String>, index: Vec<NaiveDateTime>) -> Self {
        Self {
            name: name.into(),
            index,
            columns: Vec::new(),
        }
    }

    /// Append a column. Length is checked when the block is assembled.
    pub fn push(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.push(FrameColumn::new(name, values));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[FrameColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Prefix every column with `{prefix}_`.
    pub fn qualified(mut self, prefix: &str) -> Self {
        for col in &mut self.columns {
            col.name = format!("{prefix}_{}", col.name);
        }
        self.name = format!("{prefix}.{}", self.name);
        self
    }

    /// Append another block's columns (same index assumed).
    pub fn extend(&mut self, other: FeatureBlock) {
        self.columns.extend(other.columns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(d: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn frame() -> AlignedFrame {
        AlignedFrame::from_parts(
            vec![ts(2), ts(3)],
            vec![
                FrameColumn::new("usdmxn_fix", vec![17.0, 17.1]),
                FrameColumn::new("AMXL.MX_open", vec![15.0, 15.2]),
                FrameColumn::new("AMXL.MX_high", vec![15.5, 15.6]),
                FrameColumn::new("AMXL.MX_low", vec![14.9, 15.0]),
                FrameColumn::new("AMXL.MX_close", vec![15.3, f64::NAN]),
                FrameColumn::new("AMXL.MX_volume", vec![1e6, 2e6]),
            ],
            vec![
                SourceLayout {
                    name: "usdmxn_fix".into(),
                    kind: SourceKind::Fixing,
                    columns: PriceColumns {
                        close: 0,
                        open: None,
                        high: None,
                        low: None,
                        volume: None,
                    },
                },
                SourceLayout {
                    name: "AMXL.MX".into(),
                    kind: SourceKind::Ohlcv,
                    columns: PriceColumns {
                        close: 4,
                        open: Some(1),
                        high: Some(2),
                        low: Some(3),
                        volume: Some(5),
                    },
                },
            ],
        )
    }

    #[test]
    fn bars_for_fixing_are_close_only() {
        let bars = frame().bars("usdmxn_fix").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 17.1);
        assert!(bars[1].open.is_nan());
    }

    #[test]
    fn bars_for_ohlcv_keep_missing_marker() {
        let bars = frame().bars("AMXL.MX").unwrap();
        assert_eq!(bars[0].high, 15.5);
        assert!(bars[1].close.is_nan());
    }

    #[test]
    fn owner_of_resolves_source() {
        let f = frame();
        assert_eq!(f.owner_of("usdmxn_fix").unwrap().name, "usdmxn_fix");
        assert_eq!(f.owner_of("AMXL.MX_volume").unwrap().name, "AMXL.MX");
        assert!(f.owner_of("returns").is_none());
    }

    #[test]
    fn unknown_source_is_an_error() {
        assert_eq!(
            frame().price("GFNORTEO.MX").unwrap_err(),
            ValidationError::UnknownSource("GFNORTEO.MX".into())
        );
    }

    #[test]
    fn qualified_prefixes_columns() {
        let mut block = FeatureBlock::new("basic", vec![ts(2)]);
        block.push("returns", vec![f64::NAN]);
        let block = block.qualified("AMXL.MX");
        assert_eq!(block.column_names(), vec!["AMXL.MX_returns"]);
        assert_eq!(block.name(), "AMXL.MX.basic");
    }
}
