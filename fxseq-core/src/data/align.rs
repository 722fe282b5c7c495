//! Multi-source time alignment.
//!
//! Every source is placed on the union of all source timestamps. A source
//! that did not report at a timestamp gets NaN there: no forward-fill and
//! no interpolation of price data.
//!
//! News items are attached causally: the row at `t` sees only items stamped
//! in `(t_prev, t]`.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::series::FIXING_FIELD;
use crate::domain::{NewsItem, SourceKind, TimeSeries};
use crate::error::ValidationError;
use crate::frame::{AlignedFrame, FrameColumn, PriceColumns, SourceLayout};

/// How rows without news of their own are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsAlignment {
    /// Rows without news stay missing.
    #[default]
    Bucket,
    /// Rows without news repeat the latest earlier bucket.
    AsOf,
}

/// Merges independently sampled sources onto one index.
#[derive(Debug, Clone, Default)]
pub struct SeriesAligner;

impl SeriesAligner {
    pub fn new() -> Self {
        Self
    }

    /// Align all sources onto the sorted, deduplicated union of their timestamps.
    ///
    /// Fixing sources produce one column named after the source. OHLCV sources
    /// produce `{ticker}_open`, `_high`, `_low`, `_close`, `_volume`. Within a
    /// source, a repeated timestamp keeps its first observation.
    pub fn align(&self, sources: &[TimeSeries]) -> Result<AlignedFrame, ValidationError> {
        if sources.is_empty() {
            return Err(ValidationError::InvalidParameter(
                "at least one source is required".into(),
            ));
        }

        for source in sources {
            let missing = source.missing_fields();
            if !missing.is_empty() {
                return Err(ValidationError::MissingColumns {
                    source_name: source.name().to_string(),
                    missing,
                });
            }
            if source.is_empty() {
                return Err(ValidationError::EmptySource(source.name().to_string()));
            }
        }

        let index: Vec<NaiveDateTime> = sources
            .iter()
            .flat_map(|s| s.index().iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut columns: Vec<FrameColumn> = Vec::new();
        let mut layouts = Vec::with_capacity(sources.len());

        for source in sources {
            let rows = first_occurrence_rows(source, &index);
            let mut place = |column_name: String, field: &str| -> Result<usize, ValidationError> {
                if columns.iter().any(|c| c.name == column_name) {
                    return Err(ValidationError::DuplicateColumn(column_name));
                }
                let raw = source.field(field).unwrap_or(&[]);
                let mut values = vec![f64::NAN; index.len()];
                for (obs, row) in rows.iter().enumerate() {
                    if let Some(row) = row {
                        let v = raw[obs];
                        values[*row] = if v.is_finite() { v } else { f64::NAN };
                    }
                }
                columns.push(FrameColumn::new(column_name, values));
                Ok(columns.len() - 1)
            };

            let layout = match source.kind() {
                SourceKind::Fixing => PriceColumns {
                    close: place(source.name().to_string(), FIXING_FIELD)?,
                    open: None,
                    high: None,
                    low: None,
                    volume: None,
                },
                SourceKind::Ohlcv => {
                    let prefix = source.name();
                    let open = place(format!("{prefix}_open"), "open")?;
                    let high = place(format!("{prefix}_high"), "high")?;
                    let low = place(format!("{prefix}_low"), "low")?;
                    let close = place(format!("{prefix}_close"), "close")?;
                    let volume = place(format!("{prefix}_volume"), "volume")?;
                    PriceColumns {
                        close,
                        open: Some(open),
                        high: Some(high),
                        low: Some(low),
                        volume: Some(volume),
                    }
                }
            };

            if layouts.iter().any(|l: &SourceLayout| l.name == source.name()) {
                return Err(ValidationError::DuplicateColumn(source.name().to_string()));
            }
            layouts.push(SourceLayout {
                name: source.name().to_string(),
                kind: source.kind(),
                columns: layout,
            });
        }

        tracing::debug!(
            rows = index.len(),
            columns = columns.len(),
            sources = layouts.len(),
            "aligned sources"
        );

        Ok(AlignedFrame::from_parts(index, columns, layouts))
    }
}

/// For each observation of `source`, the row it lands on, or `None` when an
/// earlier observation already claimed that timestamp.
fn first_occurrence_rows(source: &TimeSeries, index: &[NaiveDateTime]) -> Vec<Option<usize>> {
    let mut claimed = vec![false; index.len()];
    let mut dropped = 0usize;
    let rows = source
        .index()
        .iter()
        .map(|ts| {
            // Every source timestamp is in the union, so the search always hits.
            let row = index.binary_search(ts).ok()?;
            if claimed[row] {
                dropped += 1;
                None
            } else {
                claimed[row] = true;
                Some(row)
            }
        })
        .collect();
    if dropped > 0 {
        tracing::debug!(source = source.name(), dropped, "duplicate timestamps dropped");
    }
    rows
}

/// Assign each news item to the first row at or after its timestamp.
///
/// Returns, per row, the positions in `items` that belong to it. Items after
/// the last row are dropped since no row may see them yet.
pub fn bucket_news(index: &[NaiveDateTime], items: &[NewsItem]) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); index.len()];
    let mut future = 0usize;
    for (pos, item) in items.iter().enumerate() {
        let row = index.partition_point(|t| *t < item.timestamp);
        match buckets.get_mut(row) {
            Some(bucket) => bucket.push(pos),
            None => future += 1,
        }
    }
    if future > 0 {
        tracing::debug!(future, "news items after the last row dropped");
    }
    buckets
}
