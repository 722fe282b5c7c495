//! Scored news items.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One news item with the scalar score assigned by an external lexicon scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub timestamp: NaiveDateTime,
    pub sentiment_score: f64,
    /// Feed or outlet the item came from (e.g. "El Economista").
    pub source_tag: String,
}

impl NewsItem {
    pub fn new(timestamp: NaiveDateTime, sentiment_score: f64, source_tag: impl Into<String>) -> Self {
        Self {
            timestamp,
            sentiment_score,
            source_tag: source_tag.into(),
        }
    }
}
