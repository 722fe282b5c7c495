//! Source ingestion and alignment.

pub mod align;
pub mod ingest;
pub mod schema;

pub use align::{bucket_news, NewsAlignment, SeriesAligner};
pub use ingest::{series_from_dataframe, IngestError};
pub use schema::SourceSchema;
