//! Domain types for the feature pipeline.

pub mod bar;
pub mod news;
pub mod series;

pub use bar::Bar;
pub use news::NewsItem;
pub use series::{SourceKind, TimeSeries};

/// Timestamp used on every index. Daily sources sit at midnight.
pub type Timestamp = chrono::NaiveDateTime;
