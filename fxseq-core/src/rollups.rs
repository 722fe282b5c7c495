//! Rolling statistical rollups of a return series.
//!
//! For each window w: `mean_w`, `std_w` (sample), `skew_w` and `kurt_w`
//! (bias-corrected, excess). Windows are trailing; a window touching a
//! missing return is NaN, and so are shape statistics of a flat window.

use chrono::NaiveDateTime;

use crate::error::ValidationError;
use crate::frame::FeatureBlock;
use crate::stats::{excess_kurtosis, mean, rolling, sample_std, skewness};

#[derive(Debug, Clone)]
pub struct StatisticalRollups {
    windows: Vec<usize>,
}

impl Default for StatisticalRollups {
    fn default() -> Self {
        Self {
            windows: vec![5, 10, 20],
        }
    }
}

impl StatisticalRollups {
    /// Kurtosis needs four observations, so every window must be >= 4.
    pub fn new(windows: &[usize]) -> Result<Self, ValidationError> {
        if windows.is_empty() {
            return Err(ValidationError::InvalidParameter(
                "rollup windows must not be empty".into(),
            ));
        }
        if let Some(w) = windows.iter().find(|w| **w < 4) {
            return Err(ValidationError::InvalidParameter(format!(
                "rollup window must be >= 4, got {w}"
            )));
        }
        let mut unique = Vec::with_capacity(windows.len());
        for w in windows {
            if !unique.contains(w) {
                unique.push(*w);
            }
        }
        Ok(Self { windows: unique })
    }

    pub fn windows(&self) -> &[usize] {
        &self.windows
    }

    pub fn compute(&self, index: &[NaiveDateTime], returns: &[f64]) -> FeatureBlock {
        let mut block = FeatureBlock::new("rollups", index.to_vec());
        for &w in &self.windows {
            block.push(format!("mean_{w}"), rolling(returns, w, mean));
            block.push(format!("std_{w}"), rolling(returns, w, sample_std));
            block.push(format!("skew_{w}"), rolling(returns, w, skewness));
            block.push(format!("kurt_{w}"), rolling(returns, w, excess_kurtosis));
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn index(n: usize) -> Vec<NaiveDateTime> {
        let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect()
    }

    #[test]
    fn column_names_follow_windows() {
        let rollups = StatisticalRollups::new(&[5, 10]).unwrap();
        let block = rollups.compute(&index(3), &[f64::NAN, 0.1, 0.2]);
        assert_eq!(
            block.column_names(),
            vec!["mean_5", "std_5", "skew_5", "kurt_5", "mean_10", "std_10", "skew_10", "kurt_10"]
        );
    }

    #[test]
    fn values_over_trailing_window() {
        let returns = [f64::NAN, 1.0, 2.0, 3.0, 4.0, 10.0];
        let block = StatisticalRollups::new(&[5]).unwrap().compute(&index(6), &returns);
        let m = block.column("mean_5").unwrap();
        assert!(m[4].is_nan());
        assert_approx(m[5], 4.0, DEFAULT_EPSILON);
        assert_approx(block.column("skew_5").unwrap()[5], 1.697056274847714, 1e-9);
        assert_approx(block.column("kurt_5").unwrap()[5], 3.152, 1e-9);
    }

    #[test]
    fn flat_window_has_nan_shape() {
        let returns = [0.0; 8];
        let block = StatisticalRollups::new(&[4]).unwrap().compute(&index(8), &returns);
        assert_eq!(block.column("std_4").unwrap()[7], 0.0);
        assert!(block.column("skew_4").unwrap()[7].is_nan());
        assert!(block.column("kurt_4").unwrap()[7].is_nan());
    }

    #[test]
    fn small_windows_are_rejected() {
        assert!(StatisticalRollups::new(&[3]).is_err());
        assert!(StatisticalRollups::new(&[]).is_err());
    }
}
