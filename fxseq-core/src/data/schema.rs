use polars::prelude::*;

use crate::domain::SourceKind;
use crate::error::ValidationError;

/// Column layout a source DataFrame must follow.
///
/// Names match case-insensitively, so both `Close` (as published by most
/// quote providers) and `close` are accepted.
pub struct SourceSchema;

impl SourceSchema {
    /// Accepted names for the timestamp column, in lookup order.
    pub const TIMESTAMP_COLUMNS: [&'static str; 2] = ["timestamp", "date"];

    /// Value columns a source kind must carry.
    pub fn value_columns(kind: SourceKind) -> &'static [&'static str] {
        match kind {
            SourceKind::Fixing => &["value"],
            SourceKind::Ohlcv => &["open", "high", "low", "close", "volume"],
        }
    }

    /// Actual name of the column matching `wanted`, ignoring case.
    pub fn resolve(df: &DataFrame, wanted: &str) -> Option<String> {
        df.get_column_names()
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(wanted))
            .map(|name| name.to_string())
    }

    /// Actual name of the timestamp column.
    pub fn timestamp_column(df: &DataFrame) -> Option<String> {
        Self::TIMESTAMP_COLUMNS
            .iter()
            .find_map(|wanted| Self::resolve(df, wanted))
    }

    /// Check that every required column is present.
    pub fn validate(df: &DataFrame, source: &str, kind: SourceKind) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if Self::timestamp_column(df).is_none() {
            missing.push("timestamp".to_string());
        }
        for column in Self::value_columns(kind) {
            if Self::resolve(df, column).is_none() {
                missing.push(column.to_string());
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingColumns {
                source_name: source.to_string(),
                missing,
            })
        }
    }
}
