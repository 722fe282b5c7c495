//! Input loading for the runner.
//!
//! Sources arrive as CSV exports (Banxico fixings, quote-provider OHLCV,
//! scored news) or as Parquet files. CSV is read with the `csv` crate and
//! Parquet goes through the polars ingestion boundary in `fxseq_core::data`.
//!
//! Unparseable numeric cells (Banxico publishes `N/E` on non-settlement days)
//! become NaN and are handled downstream as missing. An unparseable timestamp
//! is an error: the row cannot be placed on the index.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use thiserror::Error;

use fxseq_core::data::{series_from_dataframe, IngestError, SourceSchema};
use fxseq_core::domain::series::{FIXING_FIELD, OHLCV_FIELDS};
use fxseq_core::domain::{NewsItem, SourceKind, TimeSeries};
use fxseq_core::error::ValidationError;

use crate::config::SourceConfig;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{path}, row {row}: {message}")]
    Parse {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("parquet error in {path}: {source}")]
    Parquet { path: PathBuf, source: PolarsError },
}

/// Accepted timestamp layouts, tried in order.
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM:SS` or
/// `DD/MM/YYYY`. Dates land at midnight. Fractional seconds and a trailing
/// `Z` are accepted on the `T` form.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    let trimmed = raw.trim_end_matches('Z');
    if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Numeric cell; blanks and markers such as `N/E` become NaN.
///
/// Commas are accepted only as thousands separators (`1,250,000.5`). A
/// decimal comma such as `17,25` is ambiguous and becomes NaN.
fn parse_value(raw: &str) -> f64 {
    let raw = raw.trim();
    if !raw.contains(',') {
        return raw.parse::<f64>().unwrap_or(f64::NAN);
    }
    let (integer, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    let digits = integer
        .strip_prefix(|c: char| c == '-' || c == '+')
        .unwrap_or(integer);
    let is_digits = |g: &str| g.bytes().all(|b| b.is_ascii_digit());
    let mut groups = digits.split(',');
    let leading = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && is_digits(g));
    if !leading || !groups.all(|g| g.len() == 3 && is_digits(g)) || fraction.contains(',') {
        return f64::NAN;
    }
    raw.replace(',', "").parse::<f64>().unwrap_or(f64::NAN)
}

fn open_csv(path: &Path) -> Result<csv::Reader<File>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file))
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> LoadError + '_ {
    move |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Position of each wanted header, matched case-insensitively. The first
/// entry of each alternatives list that is present wins.
fn header_positions(
    headers: &csv::StringRecord,
    source: &str,
    wanted: &[&[&str]],
) -> Result<Vec<usize>, ValidationError> {
    let mut positions = Vec::with_capacity(wanted.len());
    let mut missing = Vec::new();
    for alternatives in wanted {
        let found = alternatives.iter().find_map(|name| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        });
        match found {
            Some(p) => positions.push(p),
            None => missing.push(alternatives[0].to_string()),
        }
    }
    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(ValidationError::MissingColumns {
            source_name: source.to_string(),
            missing,
        })
    }
}

fn read_columns(
    name: &str,
    kind: SourceKind,
    path: &Path,
) -> Result<(Vec<NaiveDateTime>, BTreeMap<String, Vec<f64>>), LoadError> {
    let fields: &[&str] = match kind {
        SourceKind::Fixing => &[FIXING_FIELD][..],
        SourceKind::Ohlcv => &OHLCV_FIELDS[..],
    };
    let mut wanted: Vec<&[&str]> = vec![&SourceSchema::TIMESTAMP_COLUMNS[..]];
    let fixing_aliases = [FIXING_FIELD, "fix", "dato"];
    match kind {
        SourceKind::Fixing => wanted.push(&fixing_aliases[..]),
        SourceKind::Ohlcv => wanted.extend(OHLCV_FIELDS.iter().map(std::slice::from_ref)),
    }

    let mut reader = open_csv(path)?;
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let positions = header_positions(&headers, name, &wanted)?;

    let mut index = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); fields.len()];
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error(path))?;
        let row = i + 2;
        let raw_ts = record.get(positions[0]).unwrap_or("");
        let ts = parse_timestamp(raw_ts).ok_or_else(|| LoadError::Parse {
            path: path.to_path_buf(),
            row,
            message: format!("unrecognised timestamp '{raw_ts}'"),
        })?;
        index.push(ts);
        for (column, pos) in values.iter_mut().zip(&positions[1..]) {
            column.push(record.get(*pos).map(parse_value).unwrap_or(f64::NAN));
        }
    }

    let columns: BTreeMap<String, Vec<f64>> = fields
        .iter()
        .map(|f| f.to_string())
        .zip(values)
        .collect();
    Ok((index, columns))
}

/// Load a fixing CSV (`date,value`).
pub fn load_fixing(name: &str, path: &Path) -> Result<TimeSeries, LoadError> {
    let (index, fields) = read_columns(name, SourceKind::Fixing, path)?;
    let series = TimeSeries::new(name, SourceKind::Fixing, index, fields)?;
    tracing::debug!(source = name, rows = series.len(), "loaded fixing csv");
    Ok(series)
}

/// Load an OHLCV CSV (`date,Open,High,Low,Close,Volume`).
pub fn load_ohlcv(ticker: &str, path: &Path) -> Result<TimeSeries, LoadError> {
    let (index, fields) = read_columns(ticker, SourceKind::Ohlcv, path)?;
    let series = TimeSeries::new(ticker, SourceKind::Ohlcv, index, fields)?;
    tracing::debug!(source = ticker, rows = series.len(), "loaded ohlcv csv");
    Ok(series)
}

/// Load a source from Parquet through the DataFrame boundary.
pub fn load_parquet(name: &str, kind: SourceKind, path: &Path) -> Result<TimeSeries, LoadError> {
    let parquet_error = |source| LoadError::Parquet {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let df = ParquetReader::new(file).finish().map_err(parquet_error)?;
    Ok(series_from_dataframe(name, kind, &df)?)
}

/// Load one configured source, picking the reader from the file extension.
pub fn load_source(source: &SourceConfig) -> Result<TimeSeries, LoadError> {
    let is_parquet = source
        .path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
    match (is_parquet, source.kind) {
        (true, kind) => load_parquet(&source.name, kind, &source.path),
        (false, SourceKind::Fixing) => load_fixing(&source.name, &source.path),
        (false, SourceKind::Ohlcv) => load_ohlcv(&source.name, &source.path),
    }
}

/// Load scored news (`timestamp,sentiment_score,source_tag`).
///
/// `source_tag` is optional. Rows whose score does not parse are kept with a
/// NaN score; the sentiment stage drops them.
pub fn load_news(path: &Path) -> Result<Vec<NewsItem>, LoadError> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let positions = header_positions(
        &headers,
        "news",
        &[&["timestamp", "date", "published"][..], &["sentiment_score", "score"][..]],
    )?;
    let tag_pos = header_positions(&headers, "news", &[&["source_tag", "source"][..]])
        .ok()
        .map(|p| p[0]);

    let mut items = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error(path))?;
        let raw_ts = record.get(positions[0]).unwrap_or("");
        let ts = parse_timestamp(raw_ts).ok_or_else(|| LoadError::Parse {
            path: path.to_path_buf(),
            row: i + 2,
            message: format!("unrecognised timestamp '{raw_ts}'"),
        })?;
        let score = record.get(positions[1]).map(parse_value).unwrap_or(f64::NAN);
        let tag = tag_pos.and_then(|p| record.get(p)).unwrap_or("");
        items.push(NewsItem::new(ts, score, tag));
    }
    tracing::debug!(path = %path.display(), items = items.len(), "loaded news csv");
    Ok(items)
}

/// Model output: one predicted target value per timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Load predictions (`timestamp,predicted`).
pub fn load_predictions(path: &Path) -> Result<Vec<Prediction>, LoadError> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers().map_err(csv_error(path))?.clone();
    let positions = header_positions(
        &headers,
        "predictions",
        &[&["timestamp", "date"][..], &["predicted", "prediction"][..]],
    )?;
    let mut out = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error(path))?;
        let raw_ts = record.get(positions[0]).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::Parse {
            path: path.to_path_buf(),
            row: i + 2,
            message: format!("unrecognised timestamp '{raw_ts}'"),
        })?;
        out.push(Prediction {
            timestamp,
            value: record.get(positions[1]).map(parse_value).unwrap_or(f64::NAN),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn timestamp_layouts() {
        assert_eq!(parse_timestamp("2024-03-15"), Some(dt(2024, 3, 15, 0, 0, 0)));
        assert_eq!(parse_timestamp("15/03/2024"), Some(dt(2024, 3, 15, 0, 0, 0)));
        assert_eq!(
            parse_timestamp("2024-03-15 09:30:00"),
            Some(dt(2024, 3, 15, 9, 30, 0))
        );
        assert_eq!(
            parse_timestamp("2024-03-15T09:30:00"),
            Some(dt(2024, 3, 15, 9, 30, 0))
        );
        assert_eq!(
            parse_timestamp("2024-03-15T09:30:00.250Z").map(|t| t.and_utc().timestamp()),
            Some(dt(2024, 3, 15, 9, 30, 0).and_utc().timestamp())
        );
        assert_eq!(parse_timestamp("March 15"), None);
    }

    #[test]
    fn values_with_markers_become_nan() {
        assert_eq!(parse_value("17.2345"), 17.2345);
        assert_eq!(parse_value("1,250,000"), 1_250_000.0);
        assert_eq!(parse_value("-1,250.5"), -1250.5);
        assert!(parse_value("N/E").is_nan());
        assert!(parse_value("").is_nan());
    }

    #[test]
    fn decimal_comma_is_not_read_as_thousands() {
        assert!(parse_value("17,25").is_nan());
        assert!(parse_value("12,50,000").is_nan());
        assert!(parse_value("1,2500").is_nan());
        assert!(parse_value("1,250.5,0").is_nan());
    }

    #[test]
    fn fixing_csv_in_banxico_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(
            dir.path(),
            "fix.csv",
            "Date,Value\n02/01/2024,16.9220\n03/01/2024,N/E\n04/01/2024,17.0110\n",
        );
        let series = load_fixing("usdmxn_fix", &path).unwrap();
        assert_eq!(series.len(), 3);
        let values = series.field("value").unwrap();
        assert_eq!(values[0], 16.9220);
        assert!(values[1].is_nan());
        assert_eq!(series.index()[2], dt(2024, 1, 4, 0, 0, 0));
    }

    #[test]
    fn ohlcv_missing_header_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(
            dir.path(),
            "amxl.csv",
            "date,Open,High,Close,Volume\n2024-01-02,15,16,15.5,1000\n",
        );
        let err = load_ohlcv("AMXL.MX", &path).unwrap_err();
        match err {
            LoadError::Validation(ValidationError::MissingColumns { source_name, missing }) => {
                assert_eq!(source_name, "AMXL.MX");
                assert_eq!(missing, vec!["low".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_timestamp_names_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(dir.path(), "fix.csv", "date,value\n2024-01-02,17\nyesterday,17\n");
        match load_fixing("usdmxn_fix", &path).unwrap_err() {
            LoadError::Parse { row, .. } => assert_eq!(row, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn news_with_optional_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(
            dir.path(),
            "news.csv",
            "timestamp,sentiment_score\n2024-01-02 10:15:00,0.4\n2024-01-02 16:00:00,oops\n",
        );
        let items = load_news(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source_tag, "");
        assert!(items[1].sentiment_score.is_nan());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_news(Path::new("/nonexistent/news.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
