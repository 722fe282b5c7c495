//! Raw per-source time series, as handed over by a collector.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use crate::error::ValidationError;

/// Field names a price source must carry.
pub const OHLCV_FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Field name of a fixing series.
pub const FIXING_FIELD: &str = "value";

/// What kind of observations a source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// One published value per timestamp (e.g. the USD/MXN fixing).
    Fixing,
    /// Open/high/low/close/volume price data.
    Ohlcv,
}

/// An ordered sequence of (timestamp, field values) from one source.
///
/// Field names are stored lower-cased. Nothing about completeness is checked
/// here; `SeriesAligner` enforces the field set a source kind requires.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    kind: SourceKind,
    index: Vec<NaiveDateTime>,
    fields: BTreeMap<String, Vec<f64>>,
}

impl TimeSeries {
    /// Build a series from named field columns. Every column must match the index length.
    pub fn new(
        name: impl Into<String>,
        kind: SourceKind,
        index: Vec<NaiveDateTime>,
        fields: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let mut normalized = BTreeMap::new();
        for (field, values) in fields {
            if values.len() != index.len() {
                return Err(ValidationError::LengthMismatch {
                    context: format!("{name}.{field}"),
                    expected: index.len(),
                    actual: values.len(),
                });
            }
            normalized.insert(field.to_ascii_lowercase(), values);
        }
        Ok(Self {
            name,
            kind,
            index,
            fields: normalized,
        })
    }

    /// A fixing series from (timestamp, value) points.
    pub fn fixing(name: impl Into<String>, points: &[(NaiveDateTime, f64)]) -> Self {
        let index = points.iter().map(|(ts, _)| *ts).collect();
        let mut fields = BTreeMap::new();
        fields.insert(
            FIXING_FIELD.to_string(),
            points.iter().map(|(_, v)| *v).collect(),
        );
        Self {
            name: name.into(),
            kind: SourceKind::Fixing,
            index,
            fields,
        }
    }

    /// An OHLCV series from bars.
    pub fn ohlcv(ticker: impl Into<String>, bars: &[Bar]) -> Self {
        let index = bars.iter().map(|b| b.timestamp).collect();
        let mut fields = BTreeMap::new();
        fields.insert("open".to_string(), bars.iter().map(|b| b.open).collect());
        fields.insert("high".to_string(), bars.iter().map(|b| b.high).collect());
        fields.insert("low".to_string(), bars.iter().map(|b| b.low).collect());
        fields.insert("close".to_string(), bars.iter().map(|b| b.close).collect());
        fields.insert("volume".to_string(), bars.iter().map(|b| b.volume).collect());
        Self {
            name: ticker.into(),
            kind: SourceKind::Ohlcv,
            index,
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
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

    pub fn field(&self, name: &str) -> Option<&[f64]> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_slice())
    }

    /// Names of the fields this source kind requires but does not carry.
    pub fn missing_fields(&self) -> Vec<String> {
        let required: &[&str] = match self.kind {
            SourceKind::Fixing => &[FIXING_FIELD],
            SourceKind::Ohlcv => &OHLCV_FIELDS,
        };
        required
            .iter()
            .filter(|f| !self.fields.contains_key(**f))
            .map(|f| f.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn field_lookup_is_case_insensitive() {
        let mut fields = BTreeMap::new();
        fields.insert("Close".to_string(), vec![1.0, 2.0]);
        let s = TimeSeries::new("X", SourceKind::Ohlcv, vec![day(1), day(2)], fields).unwrap();
        assert_eq!(s.field("close"), Some(&[1.0, 2.0][..]));
        assert_eq!(s.field("CLOSE"), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut fields = BTreeMap::new();
        fields.insert("value".to_string(), vec![1.0]);
        let err = TimeSeries::new("fix", SourceKind::Fixing, vec![day(1), day(2)], fields)
            .unwrap_err();
        assert!(matches!(err, ValidationError::LengthMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn missing_ohlcv_fields_are_reported() {
        let mut fields = BTreeMap::new();
        fields.insert("close".to_string(), vec![1.0]);
        fields.insert("open".to_string(), vec![1.0]);
        let s = TimeSeries::new("BSMX.MX", SourceKind::Ohlcv, vec![day(1)], fields).unwrap();
        assert_eq!(s.missing_fields(), vec!["high", "low", "volume"]);
    }

    #[test]
    fn fixing_constructor_is_complete() {
        let s = TimeSeries::fixing("usdmxn_fix", &[(day(1), 17.1), (day(4), 17.2)]);
        assert!(s.missing_fields().is_empty());
        assert_eq!(s.len(), 2);
    }
}
