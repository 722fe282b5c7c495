//! Min-max scaling with an explicit, immutable fitted value.
//!
//! `FittedMinMax::fit` is the only place parameters are computed. Everything
//! downstream receives the fitted value and applies it; there is no shared
//! scaler state to refit by accident.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Per-column minimum and range. A zero range is stored as 1 so constant
/// columns map to 0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedMinMax {
    columns: Vec<String>,
    mins: Vec<f64>,
    scales: Vec<f64>,
}

impl FittedMinMax {
    /// Fit on `values`, one slice per named column. Every slice must be
    /// non-empty and finite.
    pub fn fit(names: &[String], values: &[&[f64]]) -> Result<Self, ValidationError> {
        if names.len() != values.len() {
            return Err(ValidationError::LengthMismatch {
                context: "scaler fit columns".into(),
                expected: names.len(),
                actual: values.len(),
            });
        }
        let mut mins = Vec::with_capacity(names.len());
        let mut scales = Vec::with_capacity(names.len());
        for (name, column) in names.iter().zip(values) {
            if column.is_empty() {
                return Err(ValidationError::insufficient(
                    format!("scaler fit for '{name}'"),
                    1,
                    0,
                ));
            }
            if column.iter().any(|v| !v.is_finite()) {
                return Err(ValidationError::InvalidParameter(format!(
                    "scaler fit for '{name}' saw a missing value"
                )));
            }
            let min = column.iter().copied().fold(f64::INFINITY, f64::min);
            let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            mins.push(min);
            scales.push(if range > 0.0 { range } else { 1.0 });
        }
        Ok(Self {
            columns: names.to_vec(),
            mins,
            scales,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn mins(&self) -> &[f64] {
        &self.mins
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[inline]
    pub fn transform_value(&self, column: usize, value: f64) -> f64 {
        (value - self.mins[column]) / self.scales[column]
    }

    #[inline]
    pub fn inverse_value(&self, column: usize, value: f64) -> f64 {
        value * self.scales[column] + self.mins[column]
    }

    pub fn transform(&self, values: &[&[f64]]) -> Result<Vec<Vec<f64>>, ValidationError> {
        self.apply(values, Self::transform_value)
    }

    pub fn inverse_transform(&self, values: &[&[f64]]) -> Result<Vec<Vec<f64>>, ValidationError> {
        self.apply(values, Self::inverse_value)
    }

    fn apply(
        &self,
        values: &[&[f64]],
        f: fn(&Self, usize, f64) -> f64,
    ) -> Result<Vec<Vec<f64>>, ValidationError> {
        if values.len() != self.columns.len() {
            return Err(ValidationError::LengthMismatch {
                context: "scaled columns".into(),
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        Ok(values
            .iter()
            .enumerate()
            .map(|(c, column)| column.iter().map(|v| f(self, c, *v)).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn maps_training_range_to_unit_interval() {
        let a = [17.0, 18.0, 19.0];
        let fitted = FittedMinMax::fit(&names(&["usdmxn_fix"]), &[&a]).unwrap();
        let scaled = fitted.transform(&[&a]).unwrap();
        assert_eq!(scaled[0], vec![0.0, 0.5, 1.0]);
        // Values outside the fit range are not clipped.
        assert_approx(fitted.transform_value(0, 20.0), 1.5, DEFAULT_EPSILON);
    }

    #[test]
    fn constant_column_scales_to_zero() {
        let a = [20.0; 4];
        let fitted = FittedMinMax::fit(&names(&["c"]), &[&a]).unwrap();
        assert_eq!(fitted.scales(), &[1.0]);
        assert!(fitted.transform(&[&a]).unwrap()[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn inverse_restores_values() {
        let a = [1.5, -2.0, 7.25];
        let b = [100.0, 101.0, 99.0];
        let fitted = FittedMinMax::fit(&names(&["a", "b"]), &[&a, &b]).unwrap();
        let scaled = fitted.transform(&[&a, &b]).unwrap();
        let back = fitted
            .inverse_transform(&[&scaled[0], &scaled[1]])
            .unwrap();
        for (orig, restored) in [&a[..], &b[..]].iter().zip(&back) {
            for (o, r) in orig.iter().zip(restored) {
                assert_approx(*r, *o, 1e-12);
            }
        }
    }

    #[test]
    fn rejects_missing_values_and_wrong_shapes() {
        assert!(FittedMinMax::fit(&names(&["a"]), &[&[1.0, f64::NAN]]).is_err());
        assert!(FittedMinMax::fit(&names(&["a"]), &[&[]]).is_err());
        let fitted = FittedMinMax::fit(&names(&["a"]), &[&[1.0, 2.0]]).unwrap();
        assert!(fitted.transform(&[&[1.0], &[2.0]]).is_err());
    }

    #[test]
    fn serializes_for_reuse() {
        let fitted = FittedMinMax::fit(&names(&["a"]), &[&[1.0, 3.0]]).unwrap();
        let json = serde_json::to_string(&fitted).unwrap();
        let back: FittedMinMax = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fitted);
    }
}
