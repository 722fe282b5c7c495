//! Sentiment features from externally scored news.
//!
//! Per item:
//! - `normalized = (score - mean) / std` (population std, fit on a batch)
//! - category: negative if score <= -0.3, positive if score >= 0.3, else neutral
//! - extreme if |score| > 2 × sample std of the batch
//!
//! The fit is a `SentimentScaler` value. Callers splitting train/test fit it
//! on training news only and hand it back in for everything else.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::data::align::{bucket_news, NewsAlignment};
use crate::domain::NewsItem;
use crate::error::ValidationError;
use crate::frame::FeatureBlock;
use crate::stats::{mean, population_std, sample_std};

/// Score magnitude at which an item stops being neutral.
pub const CATEGORY_THRESHOLD: f64 = 0.3;

/// Multiple of the sample std beyond which a score is extreme.
pub const EXTREME_MULTIPLIER: f64 = 2.0;

/// Normalization parameters fit on one batch of scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScaler {
    pub mean: f64,
    /// Population std, used for the z-score.
    pub std: f64,
    /// Sample std, used for the extreme flag. NaN for a single item.
    pub sample_std: f64,
    pub count: usize,
}

impl SentimentScaler {
    /// Fit on the finite scores. Fails when there are none.
    pub fn fit(scores: &[f64]) -> Result<Self, ValidationError> {
        let finite: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
        if finite.is_empty() {
            return Err(ValidationError::insufficient("sentiment scaler fit", 1, 0));
        }
        Ok(Self {
            mean: mean(&finite),
            std: population_std(&finite),
            sample_std: sample_std(&finite),
            count: finite.len(),
        })
    }

    /// Z-score. A zero-variance batch scales by 1.
    pub fn normalize(&self, score: f64) -> f64 {
        let scale = if self.std > 0.0 { self.std } else { 1.0 };
        (score - self.mean) / scale
    }

    pub fn is_extreme(&self, score: f64) -> bool {
        self.sample_std.is_finite() && score.abs() > EXTREME_MULTIPLIER * self.sample_std
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentCategory {
    Negative,
    Neutral,
    Positive,
}

impl SentimentCategory {
    pub fn from_score(score: f64) -> Self {
        if score <= -CATEGORY_THRESHOLD {
            Self::Negative
        } else if score >= CATEGORY_THRESHOLD {
            Self::Positive
        } else {
            Self::Neutral
        }
    }

    /// Numeric code used in the feature matrix.
    pub fn code(self) -> f64 {
        match self {
            Self::Negative => -1.0,
            Self::Neutral => 0.0,
            Self::Positive => 1.0,
        }
    }
}

/// One news item with its derived sentiment features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNews {
    pub timestamp: NaiveDateTime,
    pub source_tag: String,
    pub score: f64,
    pub normalized: f64,
    pub category: SentimentCategory,
    pub extreme: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SentimentFeaturizer {
    alignment: NewsAlignment,
    scaler: Option<SentimentScaler>,
}

impl SentimentFeaturizer {
    pub fn new(alignment: NewsAlignment) -> Self {
        Self {
            alignment,
            scaler: None,
        }
    }

    /// Reuse previously fit parameters instead of fitting on each batch.
    pub fn with_scaler(mut self, scaler: SentimentScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    fn scaler_for(&self, items: &[NewsItem]) -> Result<SentimentScaler, ValidationError> {
        match self.scaler {
            Some(scaler) => Ok(scaler),
            None => {
                let scores: Vec<f64> = items.iter().map(|i| i.sentiment_score).collect();
                SentimentScaler::fit(&scores)
            }
        }
    }

    /// Per-item features. Items with a non-finite score are dropped.
    pub fn score(&self, items: &[NewsItem]) -> Result<(Vec<ScoredNews>, SentimentScaler), ValidationError> {
        let scaler = self.scaler_for(items)?;
        let scored: Vec<ScoredNews> = items
            .iter()
            .filter(|item| item.sentiment_score.is_finite())
            .map(|item| ScoredNews {
                timestamp: item.timestamp,
                source_tag: item.source_tag.clone(),
                score: item.sentiment_score,
                normalized: scaler.normalize(item.sentiment_score),
                category: SentimentCategory::from_score(item.sentiment_score),
                extreme: scaler.is_extreme(item.sentiment_score),
            })
            .collect();
        if scored.len() < items.len() {
            tracing::debug!(dropped = items.len() - scored.len(), "non-finite sentiment scores dropped");
        }
        Ok((scored, scaler))
    }

    /// Aggregate news onto `index`.
    ///
    /// Columns: `sentiment_score` (mean raw score), `sentiment_score_normalized`
    /// (mean z-score), `sentiment_category` (-1/0/1 of the mean raw score),
    /// `extreme_sentiment` (1 if any item is extreme) and `news_count`.
    pub fn block(
        &self,
        index: &[NaiveDateTime],
        items: &[NewsItem],
    ) -> Result<(FeatureBlock, SentimentScaler), ValidationError> {
        let (scored, scaler) = self.score(items)?;
        let as_news: Vec<NewsItem> = scored
            .iter()
            .map(|s| NewsItem::new(s.timestamp, s.score, s.source_tag.as_str()))
            .collect();
        let buckets = bucket_news(index, &as_news);

        let n = index.len();
        let mut raw = vec![f64::NAN; n];
        let mut normalized = vec![f64::NAN; n];
        let mut category = vec![f64::NAN; n];
        let mut extreme = vec![f64::NAN; n];
        let mut count = vec![0.0; n];

        let mut last: Option<usize> = None;
        for (row, bucket) in buckets.iter().enumerate() {
            if bucket.is_empty() {
                if let (NewsAlignment::AsOf, Some(prev)) = (self.alignment, last) {
                    raw[row] = raw[prev];
                    normalized[row] = normalized[prev];
                    category[row] = category[prev];
                    extreme[row] = extreme[prev];
                }
                continue;
            }
            let members: Vec<&ScoredNews> = bucket.iter().map(|&i| &scored[i]).collect();
            let avg = members.iter().map(|s| s.score).sum::<f64>() / members.len() as f64;
            raw[row] = avg;
            normalized[row] =
                members.iter().map(|s| s.normalized).sum::<f64>() / members.len() as f64;
            category[row] = SentimentCategory::from_score(avg).code();
            extreme[row] = if members.iter().any(|s| s.extreme) { 1.0 } else { 0.0 };
            count[row] = members.len() as f64;
            last = Some(row);
        }

        let mut block = FeatureBlock::new("sentiment", index.to_vec());
        block.push("sentiment_score", raw);
        block.push("sentiment_score_normalized", normalized);
        block.push("sentiment_category", category);
        block.push("extreme_sentiment", extreme);
        block.push("news_count", count);
        Ok((block, scaler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn day(d: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 2, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn items(scores: &[(u32, f64)]) -> Vec<NewsItem> {
        scores
            .iter()
            .map(|&(d, s)| NewsItem::new(day(d), s, "El Financiero"))
            .collect()
    }

    #[test]
    fn category_thresholds_are_inclusive() {
        assert_eq!(SentimentCategory::from_score(-0.3), SentimentCategory::Negative);
        assert_eq!(SentimentCategory::from_score(-0.29), SentimentCategory::Neutral);
        assert_eq!(SentimentCategory::from_score(0.29), SentimentCategory::Neutral);
        assert_eq!(SentimentCategory::from_score(0.3), SentimentCategory::Positive);
    }

    #[test]
    fn scaler_uses_population_std_for_z_and_sample_std_for_extremes() {
        let scaler = SentimentScaler::fit(&[-1.0, 0.0, 1.0, 2.0]).unwrap();
        assert_approx(scaler.mean, 0.5, DEFAULT_EPSILON);
        assert_approx(scaler.std, 1.25f64.sqrt(), DEFAULT_EPSILON);
        assert_approx(scaler.sample_std, (5.0f64 / 3.0).sqrt(), DEFAULT_EPSILON);
        assert_approx(scaler.normalize(2.0), 1.5 / 1.25f64.sqrt(), DEFAULT_EPSILON);
        assert!(scaler.is_extreme(2.6));
        assert!(!scaler.is_extreme(2.5));
    }

    #[test]
    fn constant_batch_normalizes_to_zero() {
        let scaler = SentimentScaler::fit(&[0.4, 0.4, 0.4]).unwrap();
        assert_eq!(scaler.normalize(0.4), 0.0);
        assert!(!scaler.is_extreme(0.4));
    }

    #[test]
    fn empty_batch_cannot_fit() {
        assert!(SentimentScaler::fit(&[]).is_err());
        assert!(SentimentScaler::fit(&[f64::NAN]).is_err());
    }

    #[test]
    fn supplied_scaler_is_never_refit() {
        let fitted = SentimentScaler::fit(&[0.0, 1.0]).unwrap();
        let featurizer = SentimentFeaturizer::default().with_scaler(fitted);
        let (scored, used) = featurizer.score(&items(&[(1, 10.0), (2, 20.0)])).unwrap();
        assert_eq!(used, fitted);
        assert_approx(scored[0].normalized, (10.0 - 0.5) / 0.5, DEFAULT_EPSILON);
    }

    #[test]
    fn bucket_block_aggregates_per_row() {
        let index = vec![day(1), day(2), day(3)];
        let news = items(&[(1, 0.5), (1, 0.3), (3, -0.6)]);
        let (block, _) = SentimentFeaturizer::default().block(&index, &news).unwrap();

        let raw = block.column("sentiment_score").unwrap();
        assert_approx(raw[0], 0.4, DEFAULT_EPSILON);
        assert!(raw[1].is_nan());
        assert_approx(raw[2], -0.6, DEFAULT_EPSILON);
        assert_eq!(block.column("sentiment_category").unwrap()[0], 1.0);
        assert_eq!(block.column("sentiment_category").unwrap()[2], -1.0);
        assert_eq!(block.column("news_count").unwrap(), &[2.0, 0.0, 1.0]);
    }

    #[test]
    fn as_of_block_carries_forward() {
        let index = vec![day(1), day(2), day(3)];
        let news = items(&[(1, 0.5), (3, -0.6)]);
        let (block, _) = SentimentFeaturizer::new(NewsAlignment::AsOf)
            .block(&index, &news)
            .unwrap();
        let raw = block.column("sentiment_score").unwrap();
        assert_approx(raw[1], 0.5, DEFAULT_EPSILON);
        assert_eq!(block.column("news_count").unwrap()[1], 0.0);
    }
}
