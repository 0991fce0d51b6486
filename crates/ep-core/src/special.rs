//! Special functions backing the t-test p-value.
//!
//! The regularized incomplete beta function uses the Lentz continued
//! fraction from Numerical Recipes; `log_gamma` is a Lanczos approximation.

use std::f64::consts::PI;

const BETACF_MAX_ITERS: usize = 300;
const BETACF_EPS: f64 = 1.0e-14;
const BETACF_FPMIN: f64 = 1.0e-300;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural log of |Gamma(z)| for z > 0.
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() || z <= 0.0 {
        return f64::NAN;
    }
    if z < 0.5 {
        // Reflection
        return PI.ln() - (PI * z).sin().abs().ln() - log_gamma(1.0 - z);
    }

    let z = z - 1.0;
    let mut x = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        #[expect(clippy::cast_precision_loss, reason = "i is at most 8")]
        let i = i as f64;
        x += coeff / (z + i);
    }
    let t = z + LANCZOS_G + 0.5;
    0.5 * (2.0 * PI).ln() + (z + 0.5) * t.ln() - t + x.ln()
}

fn log_beta(a: f64, b: f64) -> f64 {
    log_gamma(a) + log_gamma(b) - log_gamma(a + b)
}

/// Regularized incomplete beta function `I_x(a, b)`.
pub fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x.is_nan() || a.is_nan() || b.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let front = (a * x.ln() + b * (-x).ln_1p() - log_beta(a, b)).exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * betacf(a, b, x) / a
    } else {
        1.0 - front * betacf(b, a, 1.0 - x) / b
    }
}

fn clamp_tiny(v: f64) -> f64 {
    if v.abs() < BETACF_FPMIN { BETACF_FPMIN } else { v }
}

fn betacf(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / clamp_tiny(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=BETACF_MAX_ITERS {
        #[expect(clippy::cast_precision_loss, reason = "bounded by BETACF_MAX_ITERS")]
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / clamp_tiny(1.0 + aa * d);
        c = clamp_tiny(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / clamp_tiny(1.0 + aa * d);
        c = clamp_tiny(1.0 + aa / c);
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < BETACF_EPS {
            break;
        }
    }

    h
}

/// Two-sided tail probability `P(|T| >= |t|)` for Student's t with `df`
/// degrees of freedom.
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    if t.is_nan() || df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    let x = df / (df + t * t);
    regularized_incomplete_beta(x, df / 2.0, 0.5).clamp(0.0, 1.0)
}
