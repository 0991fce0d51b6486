//! Welch's unequal-variance two-sample t-test.

use serde::Serialize;
use thiserror::Error;

use crate::special::student_t_two_sided;

/// Conventional significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Why a test could not be computed. Never fatal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TestSkip {
    /// Fewer than two observations in either sample.
    #[error("insufficient data (need at least 2 samples per group, got {left} and {right})")]
    InsufficientData { left: usize, right: usize },

    /// Both samples are constant, so the standard error is zero.
    #[error("both groups have zero variance")]
    ZeroVariance,
}

/// Outcome of a Welch t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WelchTest {
    /// `(mean_left - mean_right) / standard_error`.
    pub statistic: f64,
    /// Welch-Satterthwaite approximation.
    pub degrees_of_freedom: f64,
    /// Two-sided.
    pub p_value: f64,
}

impl WelchTest {
    /// Runs the test on two samples.
    #[expect(clippy::cast_precision_loss, reason = "sample sizes fit in f64")]
    pub fn compute(left: &[f64], right: &[f64]) -> Result<Self, TestSkip> {
        if left.len() < 2 || right.len() < 2 {
            return Err(TestSkip::InsufficientData {
                left: left.len(),
                right: right.len(),
            });
        }

        let (mean_l, var_l) = mean_and_sample_variance(left);
        let (mean_r, var_r) = mean_and_sample_variance(right);
        let n_l = left.len() as f64;
        let n_r = right.len() as f64;

        let se_l = var_l / n_l;
        let se_r = var_r / n_r;
        let se2 = se_l + se_r;
        if se2 <= 0.0 {
            return Err(TestSkip::ZeroVariance);
        }

        let statistic = (mean_l - mean_r) / se2.sqrt();
        let degrees_of_freedom = se2 * se2 / (se_l * se_l / (n_l - 1.0) + se_r * se_r / (n_r - 1.0));
        let p_value = student_t_two_sided(statistic, degrees_of_freedom);

        Ok(Self {
            statistic,
            degrees_of_freedom,
            p_value,
        })
    }

    /// True when `p_value < alpha`.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Mean and `n - 1` variance. Callers guarantee at least two values.
#[expect(clippy::cast_precision_loss, reason = "sample sizes fit in f64")]
fn mean_and_sample_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn matches_reference_small_samples() {
        let test = WelchTest::compute(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]).unwrap();
        assert!(approx_eq(test.statistic, -1.897_366_596_1, 1e-9));
        assert!(approx_eq(test.degrees_of_freedom, 5.882_352_941_18, 1e-9));
        assert!(approx_eq(test.p_value, 0.107_531_194_93, 1e-7));
        assert!(!test.is_significant(DEFAULT_ALPHA));
    }

    #[test]
    fn detects_large_difference() {
        let test = WelchTest::compute(
            &[100.0, 200.0, 150.0, 120.0],
            &[1000.0, 1100.0, 900.0, 1050.0],
        )
        .unwrap();
        assert!(approx_eq(test.statistic, -18.157_208_225_0, 1e-9));
        assert!(approx_eq(test.degrees_of_freedom, 4.458_415_427_20, 1e-9));
        assert!(approx_eq(test.p_value, 2.376_793_015_17e-5, 1e-9));
        assert!(test.is_significant(DEFAULT_ALPHA));
    }

    #[test]
    fn two_samples_each_is_enough() {
        let test = WelchTest::compute(&[10.0, 20.0], &[10.0, 30.0]).unwrap();
        assert!(approx_eq(test.p_value, 0.711_722_791_23, 1e-7));
    }

    #[test]
    fn statistic_sign_follows_argument_order() {
        let a = [1000.0, 1200.0, 1100.0];
        let b = [1150.0, 1050.0, 1300.0];
        let ab = WelchTest::compute(&a, &b).unwrap();
        let ba = WelchTest::compute(&b, &a).unwrap();
        assert!(approx_eq(ab.statistic, -0.718_421_208_11, 1e-9));
        assert!(approx_eq(ab.statistic, -ba.statistic, 1e-12));
        assert!(approx_eq(ab.p_value, ba.p_value, 1e-12));
        assert!(approx_eq(ab.p_value, 0.514_122_678_40, 1e-7));
    }

    #[test]
    fn insufficient_data_is_reported() {
        let err = WelchTest::compute(&[1.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, TestSkip::InsufficientData { left: 1, right: 3 });
        assert!(err.to_string().starts_with("insufficient data"));
    }

    #[test]
    fn zero_variance_is_reported() {
        let err = WelchTest::compute(&[5.0, 5.0], &[5.0, 5.0, 5.0]).unwrap_err();
        assert_eq!(err, TestSkip::ZeroVariance);
    }

    #[test]
    fn one_constant_group_still_tests() {
        let test = WelchTest::compute(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(test.statistic > 0.0);
        assert!(test.p_value > 0.0 && test.p_value < 1.0);
    }
}
