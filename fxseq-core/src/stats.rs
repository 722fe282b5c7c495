//! Small numeric helpers shared by metrics, rollups and diagnostics.
//!
//! All functions take complete windows. Callers filter or reject NaN first;
//! `rolling` does that for trailing windows.

/// Annualization factor for daily observations.
pub const TRADING_DAYS: f64 = 252.0;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Central moment of order `k` (divides by n).
pub fn central_moment(values: &[f64], k: i32) -> f64 {
    let m = mean(values);
    mean(&values.iter().map(|v| (v - m).powi(k)).collect::<Vec<_>>())
}

/// Standard deviation with `n - 1` in the denominator. NaN for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).max(0.0).sqrt()
}

/// Standard deviation with `n` in the denominator.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    central_moment(values, 2).max(0.0).sqrt()
}

/// Bias-corrected sample skewness (G1). NaN for n < 3 or zero variance.
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 3 {
        return f64::NAN;
    }
    let m2 = central_moment(values, 2);
    if m2 <= f64::EPSILON * f64::EPSILON {
        return f64::NAN;
    }
    let g1 = central_moment(values, 3) / m2.powf(1.5);
    g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
}

/// Bias-corrected sample excess kurtosis (G2). NaN for n < 4 or zero variance.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 4 {
        return f64::NAN;
    }
    let m2 = central_moment(values, 2);
    if m2 <= f64::EPSILON * f64::EPSILON {
        return f64::NAN;
    }
    let g2 = central_moment(values, 4) / (m2 * m2) - 3.0;
    (n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * g2 + 6.0)
}

/// Percentile with linear interpolation between closest ranks, `q` in [0, 100].
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Apply `f` to every trailing window of `window` values.
///
/// Output at `t` covers `[t - window + 1, t]`. Rows before the first full
/// window, and windows containing NaN, are NaN.
pub fn rolling(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }
    for t in (window - 1)..n {
        let slice = &values[t + 1 - window..=t];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[t] = f(slice);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_and_population_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std(&v) - 2.0).abs() < 1e-12);
        assert!((sample_std(&v) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn skew_and_kurt_match_bias_corrected_reference() {
        // m2 = 10, m3 = 36, m4 = 278.8
        let v = [1.0, 2.0, 3.0, 4.0, 10.0];
        assert!((skewness(&v) - 1.697056274847714).abs() < 1e-9);
        assert!((excess_kurtosis(&v) - 3.152).abs() < 1e-9);
    }

    #[test]
    fn constant_window_has_no_shape() {
        let v = [3.0; 6];
        assert!(skewness(&v).is_nan());
        assert!(excess_kurtosis(&v).is_nan());
        assert_eq!(sample_std(&v), 0.0);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 100.0), 4.0);
        assert!((percentile(&v, 5.0) - 1.15).abs() < 1e-12);
    }

    #[test]
    fn rolling_skips_incomplete_and_nan_windows() {
        let v = [1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0];
        let out = rolling(&v, 2, mean);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 1.5);
        assert!(out[2].is_nan());
        assert!(out[3].is_nan());
        assert_eq!(out[4], 4.5);
        assert_eq!(out[5], 5.5);
    }
}
