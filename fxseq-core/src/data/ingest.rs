//! DataFrame → `TimeSeries` conversion.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

use crate::data::schema::SourceSchema;
use crate::domain::{SourceKind, TimeSeries};
use crate::error::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("polars: {0}")]
    Polars(#[from] PolarsError),

    #[error("source '{source_name}': null or out-of-range timestamp at row {row}")]
    BadTimestamp { source_name: String, row: usize },
}

/// Convert a source DataFrame into a `TimeSeries`.
///
/// The timestamp column may be `Date` or any `Datetime` unit. Value columns
/// are cast to f64; nulls become NaN.
pub fn series_from_dataframe(
    name: &str,
    kind: SourceKind,
    df: &DataFrame,
) -> Result<TimeSeries, IngestError> {
    SourceSchema::validate(df, name, kind)?;

    let ts_name = SourceSchema::timestamp_column(df).ok_or_else(|| {
        ValidationError::MissingColumns {
            source_name: name.to_string(),
            missing: vec!["timestamp".to_string()],
        }
    })?;
    let millis = df
        .column(&ts_name)?
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)?;
    let millis = millis.i64()?;

    let mut index = Vec::with_capacity(df.height());
    for (row, ms) in millis.into_iter().enumerate() {
        let ts = ms
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| IngestError::BadTimestamp {
                source_name: name.to_string(),
                row,
            })?;
        index.push(ts);
    }

    let mut fields = BTreeMap::new();
    for column in SourceSchema::value_columns(kind) {
        let actual = SourceSchema::resolve(df, column).ok_or_else(|| {
            ValidationError::MissingColumns {
                source_name: name.to_string(),
                missing: vec![column.to_string()],
            }
        })?;
        let values = df.column(&actual)?.cast(&DataType::Float64)?;
        let values: Vec<f64> = values
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        fields.insert(column.to_string(), values);
    }

    tracing::debug!(source = name, rows = index.len(), "ingested dataframe");
    Ok(TimeSeries::new(name, kind, index, fields)?)
}

/// Milliseconds since the Unix epoch, the unit used on the polars side.
pub fn timestamp_millis(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}
