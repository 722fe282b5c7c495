//! Advisory statistical diagnostics on a return series.
//!
//! Every entry is computed independently. One that cannot be computed is left
//! absent (`None`) and explained by a `NumericAdvisory`; the report itself
//! never fails and never touches the feature matrix.
//!
//! - `normality`: D'Agostino-Pearson K² omnibus test. Normal iff p > 0.05.
//! - `stationarity`: augmented Dickey-Fuller with a constant, lag order by AIC,
//!   MacKinnon (1994) approximate p-value. Stationary iff p < 0.05.
//! - `skewness`, `kurtosis`: bias-corrected sample skewness and excess kurtosis.
//! - `jarque_bera`: JB statistic with a χ²(2) p-value. Normal iff p > 0.05.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use crate::stats::{central_moment, excess_kurtosis, skewness};

pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

pub const NORMALITY: &str = "normality";
pub const STATIONARITY: &str = "stationarity";
pub const SKEWNESS: &str = "skewness";
pub const KURTOSIS: &str = "kurtosis";
pub const JARQUE_BERA: &str = "jarque_bera";

/// Minimum sample for the K² skewness component.
const NORMALITY_MIN_OBS: usize = 8;

/// Result of one diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiagnosticEntry {
    pub statistic: f64,
    pub p_value: Option<f64>,
    /// `Some(true)` when the test's favourable hypothesis holds (normal, stationary).
    pub verdict: Option<bool>,
}

impl DiagnosticEntry {
    fn statistic(statistic: f64) -> Self {
        Self {
            statistic,
            p_value: None,
            verdict: None,
        }
    }

    fn test(statistic: f64, p_value: f64, verdict: bool) -> Self {
        Self {
            statistic,
            p_value: Some(p_value),
            verdict: Some(verdict),
        }
    }
}

/// A diagnostic that could not be computed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumericAdvisory {
    pub diagnostic: String,
    pub reason: String,
}

/// Immutable diagnostics for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    observations: usize,
    significance: f64,
    entries: BTreeMap<String, Option<DiagnosticEntry>>,
    advisories: Vec<NumericAdvisory>,
}

impl DiagnosticsReport {
    /// Number of finite observations the diagnostics ran on.
    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn significance(&self) -> f64 {
        self.significance
    }

    /// The entry for `name`, or `None` when absent or not computed.
    pub fn get(&self, name: &str) -> Option<&DiagnosticEntry> {
        self.entries.get(name).and_then(|e| e.as_ref())
    }

    pub fn entries(&self) -> &BTreeMap<String, Option<DiagnosticEntry>> {
        &self.entries
    }

    pub fn advisories(&self) -> &[NumericAdvisory] {
        &self.advisories
    }

    pub fn is_normal(&self) -> Option<bool> {
        self.get(NORMALITY).and_then(|e| e.verdict)
    }

    pub fn is_stationary(&self) -> Option<bool> {
        self.get(STATIONARITY).and_then(|e| e.verdict)
    }
}

#[derive(Debug, Clone)]
pub struct StatisticalDiagnostics {
    significance: f64,
}

impl Default for StatisticalDiagnostics {
    fn default() -> Self {
        Self {
            significance: DEFAULT_SIGNIFICANCE,
        }
    }
}

impl StatisticalDiagnostics {
    pub fn new(significance: f64) -> Self {
        Self { significance }
    }

    /// Run every diagnostic on the finite values of `returns`.
    pub fn run(&self, returns: &[f64]) -> DiagnosticsReport {
        let x: Vec<f64> = returns.iter().copied().filter(|v| v.is_finite()).collect();
        let alpha = self.significance;

        let results: [(&str, Result<DiagnosticEntry, String>); 5] = [
            (
                NORMALITY,
                dagostino_k2(&x).map(|(k2, p)| DiagnosticEntry::test(k2, p, p > alpha)),
            ),
            (
                STATIONARITY,
                adf(&x).map(|(t, p)| DiagnosticEntry::test(t, p, p < alpha)),
            ),
            (SKEWNESS, finite_or(skewness(&x), "needs at least 3 non-constant observations")),
            (
                KURTOSIS,
                finite_or(excess_kurtosis(&x), "needs at least 4 non-constant observations"),
            ),
            (
                JARQUE_BERA,
                jarque_bera(&x).map(|(jb, p)| DiagnosticEntry::test(jb, p, p > alpha)),
            ),
        ];

        let mut entries = BTreeMap::new();
        let mut advisories = Vec::new();
        for (name, result) in results {
            match result {
                Ok(entry) => {
                    entries.insert(name.to_string(), Some(entry));
                }
                Err(reason) => {
                    tracing::warn!(diagnostic = name, %reason, "diagnostic not computed");
                    entries.insert(name.to_string(), None);
                    advisories.push(NumericAdvisory {
                        diagnostic: name.to_string(),
                        reason,
                    });
                }
            }
        }

        tracing::debug!(observations = x.len(), advisories = advisories.len(), "diagnostics");
        DiagnosticsReport {
            observations: x.len(),
            significance: alpha,
            entries,
            advisories,
        }
    }
}

fn finite_or(value: f64, reason: &str) -> Result<DiagnosticEntry, String> {
    if value.is_finite() {
        Ok(DiagnosticEntry::statistic(value))
    } else {
        Err(reason.to_string())
    }
}

fn chi2_2_sf(x: f64) -> Result<f64, String> {
    let dist = ChiSquared::new(2.0).map_err(|e| e.to_string())?;
    Ok(dist.sf(x))
}

fn biased_moments(x: &[f64]) -> Result<(f64, f64), String> {
    let m2 = central_moment(x, 2);
    if m2.is_nan() || m2 <= 0.0 {
        return Err("zero variance".to_string());
    }
    let skew = central_moment(x, 3) / m2.powf(1.5);
    let kurt = central_moment(x, 4) / (m2 * m2);
    Ok((skew, kurt))
}

/// D'Agostino-Pearson K². Returns (K², p).
pub fn dagostino_k2(x: &[f64]) -> Result<(f64, f64), String> {
    let n = x.len();
    if n < NORMALITY_MIN_OBS {
        return Err(format!(
            "needs at least {NORMALITY_MIN_OBS} observations, have {n}"
        ));
    }
    let (b1, b2) = biased_moments(x)?;
    let n = n as f64;

    // Skewness component.
    let mut y = b1 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    if y == 0.0 {
        y = 1.0;
    }
    let ya = y / alpha;
    let z_skew = delta * (ya + (ya * ya + 1.0).sqrt()).ln();

    // Kurtosis component.
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let var_b2 = 24.0 * n * (n - 2.0) * (n - 3.0)
        / ((n + 1.0).powi(2) * (n + 3.0) * (n + 5.0));
    let std_b2 = (b2 - expected) / var_b2.sqrt();
    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0
        + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + std_b2 * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return Err("kurtosis transform undefined".to_string());
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    let z_kurt = (term1 - term2) / (2.0 / (9.0 * a)).sqrt();

    let k2 = z_skew * z_skew + z_kurt * z_kurt;
    if !k2.is_finite() {
        return Err("non-finite test statistic".to_string());
    }
    Ok((k2, chi2_2_sf(k2)?))
}

/// Jarque-Bera on biased moments. Returns (JB, p).
pub fn jarque_bera(x: &[f64]) -> Result<(f64, f64), String> {
    if x.len() < 2 {
        return Err(format!("needs at least 2 observations, have {}", x.len()));
    }
    let (s, k) = biased_moments(x)?;
    let jb = x.len() as f64 / 6.0 * (s * s + (k - 3.0).powi(2) / 4.0);
    Ok((jb, chi2_2_sf(jb)?))
}

struct OlsFit {
    t_stat: f64,
    llf: f64,
    params: usize,
}

/// Regress Δx[t] on [1, x[t], Δx[t-1], .., Δx[t-lags]] over the last `nobs`
/// differences and return the t-statistic of the level coefficient.
fn adf_regression(x: &[f64], dx: &[f64], lags: usize, nobs: usize) -> Result<OlsFit, String> {
    let params = lags + 2;
    if nobs <= params {
        return Err(format!(
            "regression needs more than {params} observations, have {nobs}"
        ));
    }
    let offset = dx.len() - nobs;
    let design = DMatrix::from_fn(nobs, params, |r, c| {
        let t = offset + r;
        match c {
            0 => 1.0,
            1 => x[t],
            j => dx[t - (j - 1)],
        }
    });
    let target = DVector::from_iterator(nobs, dx[offset..].iter().copied());

    let xtx = design.transpose() * &design;
    let inv = xtx
        .try_inverse()
        .ok_or_else(|| "singular regression matrix".to_string())?;
    let beta = &inv * design.transpose() * &target;
    let resid = &target - &design * &beta;
    let ssr = resid.dot(&resid);
    if !ssr.is_finite() || ssr <= f64::EPSILON * f64::EPSILON {
        return Err("degenerate regression (perfect fit)".to_string());
    }

    let nobs_f = nobs as f64;
    let se = (ssr / (nobs - params) as f64 * inv[(1, 1)]).sqrt();
    if se.is_nan() || se <= 0.0 {
        return Err("zero standard error".to_string());
    }
    let llf = -nobs_f / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nobs_f).ln() + 1.0);
    Ok(OlsFit {
        t_stat: beta[1] / se,
        llf,
        params,
    })
}

/// Augmented Dickey-Fuller with constant. Returns (t-statistic, p).
pub fn adf(x: &[f64]) -> Result<(f64, f64), String> {
    let n = x.len();
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as i64;
    let cap = (n / 2) as i64 - 2;
    let maxlag = schwert.min(cap);
    if maxlag < 0 {
        return Err(format!("sample of {n} is too short for the unit-root regression"));
    }
    let maxlag = maxlag as usize;
    let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag selection on a common sample; ties go to the shorter lag.
    let common = dx.len() - maxlag;
    let mut best: Option<(f64, usize)> = None;
    for lags in 0..=maxlag {
        let fit = adf_regression(x, &dx, lags, common)?;
        let aic = -2.0 * fit.llf + 2.0 * fit.params as f64;
        if best.map_or(true, |(b, _)| aic < b) {
            best = Some((aic, lags));
        }
    }
    let lags = best.map(|(_, l)| l).unwrap_or(0);

    let fit = adf_regression(x, &dx, lags, dx.len() - lags)?;
    Ok((fit.t_stat, mackinnon_p(fit.t_stat)?))
}

/// MacKinnon (1994) approximate p-value for the constant-only, single-series case.
pub fn mackinnon_p(t: f64) -> Result<f64, String> {
    const TAU_MAX: f64 = 2.74;
    const TAU_MIN: f64 = -18.83;
    const TAU_STAR: f64 = -1.61;
    const SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
    const LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

    if t > TAU_MAX {
        return Ok(1.0);
    }
    if t < TAU_MIN {
        return Ok(0.0);
    }
    let coeffs: &[f64] = if t <= TAU_STAR { &SMALL_P } else { &LARGE_P };
    let z = coeffs.iter().rev().fold(0.0, |acc, c| acc * t + c);
    let normal = Normal::new(0.0, 1.0).map_err(|e| e.to_string())?;
    Ok(normal.cdf(z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    fn noise(seed: u64, n: usize) -> Vec<f64> {
        let mut s = seed;
        (0..n)
            .map(|_| {
                s = s
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (s >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    fn random_walk(steps: &[f64]) -> Vec<f64> {
        steps
            .iter()
            .scan(0.0, |acc, v| {
                *acc += v;
                Some(*acc)
            })
            .collect()
    }

    #[test]
    fn mackinnon_matches_critical_value() {
        // 5% critical value for the constant case is about -2.86.
        assert_approx(mackinnon_p(-2.86).unwrap(), 0.0502011, 1e-6);
        assert_eq!(mackinnon_p(3.0).unwrap(), 1.0);
        assert_eq!(mackinnon_p(-20.0).unwrap(), 0.0);
    }

    #[test]
    fn mackinnon_is_continuous_at_the_switch() {
        let below = mackinnon_p(-1.61).unwrap();
        let above = mackinnon_p(-1.6099999).unwrap();
        assert!((below - above).abs() < 1e-3);
        assert!(below < above);
    }

    #[test]
    fn white_noise_is_stationary() {
        let (t, p) = adf(&noise(7, 200)).unwrap();
        assert_approx(t, -12.715713351154621, 1e-6);
        assert!(p < 1e-10);
    }

    #[test]
    fn random_walk_is_not_stationary() {
        let (t, p) = adf(&random_walk(&noise(7, 200))).unwrap();
        assert_approx(t, -1.2542961202092298, 1e-6);
        assert_approx(p, 0.6498140954014604, 1e-6);
    }

    #[test]
    fn k2_and_jarque_bera_reference_values() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 50.0];
        let (k2, p) = dagostino_k2(&x).unwrap();
        assert_approx(k2, 26.183240722119248, 1e-8);
        assert_approx(p, 2.062440926056786e-06, 1e-12);
        let (jb, p) = jarque_bera(&x).unwrap();
        assert_approx(jb, 19.402728274672565, 1e-8);
        assert_approx(p, 6.11999529439324e-05, 1e-12);
    }

    #[test]
    fn report_verdicts() {
        let report = StatisticalDiagnostics::default().run(&noise(7, 200));
        assert_eq!(report.observations(), 200);
        assert_eq!(report.is_stationary(), Some(true));
        // Uniform noise is too light-tailed to pass.
        assert_eq!(report.is_normal(), Some(false));
        assert!(report.advisories().is_empty());
        assert!(report.get(SKEWNESS).unwrap().p_value.is_none());
    }

    #[test]
    fn constant_series_yields_advisories_not_errors() {
        let mut returns = vec![f64::NAN];
        returns.extend(std::iter::repeat(0.0).take(29));
        let report = StatisticalDiagnostics::default().run(&returns);
        assert_eq!(report.observations(), 29);
        for name in [NORMALITY, STATIONARITY, SKEWNESS, KURTOSIS, JARQUE_BERA] {
            assert!(report.get(name).is_none(), "{name} should be absent");
            assert!(report.entries().contains_key(name));
        }
        assert_eq!(report.advisories().len(), 5);
    }

    #[test]
    fn short_series_is_advisory() {
        let report = StatisticalDiagnostics::default().run(&[0.01, -0.02, 0.015]);
        assert!(report.get(NORMALITY).is_none());
        assert!(report.get(STATIONARITY).is_none());
        assert!(report.get(SKEWNESS).is_some());
        assert!(report.get(KURTOSIS).is_none());
    }
}
