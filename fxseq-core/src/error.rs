//! Structural validation errors.
//!
//! Stage-local numeric problems never show up here: they degrade to NaN cells
//! or to advisories on the diagnostics report. A `ValidationError` means the
//! inputs cannot produce a meaningful matrix and the pipeline must stop.

/// Structural precondition violated somewhere in the feature pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("source '{source_name}' is missing required columns: {}", missing.join(", "))]
    MissingColumns {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("source '{0}' has no observations")]
    EmptySource(String),

    #[error("{context}: need at least {required} rows, have {available}")]
    InsufficientRows {
        context: String,
        required: usize,
        available: usize,
    },

    #[error("target column '{0}' not present in the assembled matrix")]
    MissingTarget(String),

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{context}: expected length {expected}, got {actual}")]
    LengthMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },
}

impl ValidationError {
    pub(crate) fn insufficient(context: impl Into<String>, required: usize, available: usize) -> Self {
        Self::InsufficientRows {
            context: context.into(),
            required,
            available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_lists_every_name() {
        let err = ValidationError::MissingColumns {
            source_name: "AMXL.MX".into(),
            missing: vec!["high".into(), "volume".into()],
        };
        assert_eq!(
            err.to_string(),
            "source 'AMXL.MX' is missing required columns: high, volume"
        );
    }

    #[test]
    fn insufficient_rows_message() {
        let err = ValidationError::insufficient("sequence windowing", 11, 7);
        assert_eq!(
            err.to_string(),
            "sequence windowing: need at least 11 rows, have 7"
        );
    }
}
