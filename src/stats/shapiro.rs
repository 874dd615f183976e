//! Shapiro-Wilk test for normality (Royston 1995, algorithm AS R94).
//!
//! Steps:
//! 1. sort the sample
//! 2. approximate the expected normal order-statistic weights `a_i` from
//!    `m_i = Φ⁻¹((i − 3/8) / (n + 1/4))`, with polynomial corrections for the
//!    one or two most extreme weights
//! 3. `W` = squared correlation between the sorted sample and the weights
//! 4. p-value: exact for n = 3, otherwise Royston's normalizing transforms
//!    (separate fits for 4 ≤ n ≤ 11 and n ≥ 12)

use crate::domain::NormalityResult;
use crate::error::PipelineError;
use crate::math::special::{normal_quantile, normal_sf};

/// Smallest sample the test is defined for.
pub const MIN_SAMPLE: usize = 3;

/// Above this size Royston's p-value approximation has not been validated.
pub const MAX_VALIDATED_SAMPLE: usize = 5000;

const SMALL: f64 = 1e-19;

// Corrections for the two most extreme coefficients, in powers of 1/√n.
const C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_19, 4.434_685, -2.706_056];
const C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];

// Normalizing transform of ln(1 − W), 4 ≤ n ≤ 11 (polynomials in n).
const G: [f64; 2] = [-2.273, 0.459];
const C3: [f64; 4] = [0.544, -0.399_78, 0.025_054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.778_57, 0.062_767, -0.002_032_2];

// Normalizing transform of ln(1 − W), n ≥ 12 (polynomials in ln n).
const C5: [f64; 4] = [-1.5861, -0.310_82, -0.083_751, 0.003_891_5];
const C6: [f64; 3] = [-0.4803, -0.082_676, 0.003_030_2];

/// Run the Shapiro-Wilk test on `sample`.
///
/// Null hypothesis: the sample was drawn from a normal distribution. The
/// input order is irrelevant.
pub fn shapiro_wilk(sample: &[f64]) -> Result<NormalityResult, PipelineError> {
    let n = sample.len();
    if n < MIN_SAMPLE {
        return Err(PipelineError::InsufficientData {
            stage: "Shapiro-Wilk test",
            required: MIN_SAMPLE,
            actual: n,
        });
    }
    if sample.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::Numerical(
            "Shapiro-Wilk input contains non-finite values.".to_string(),
        ));
    }
    if n > MAX_VALIDATED_SAMPLE {
        log::warn!("Shapiro-Wilk p-value may be inaccurate for n={n} (> {MAX_VALIDATED_SAMPLE}).");
    }

    let mut x = sample.to_vec();
    x.sort_by(f64::total_cmp);

    let range = x[n - 1] - x[0];
    if range < SMALL {
        return Err(PipelineError::Numerical(
            "All values are identical; normality cannot be assessed.".to_string(),
        ));
    }

    let weights = signed_weights(n);
    let statistic = w_statistic(&x, &weights, range);
    let p_value = p_value(statistic, n);

    Ok(NormalityResult {
        n,
        statistic,
        p_value,
    })
}

/// Half-sample coefficients `a_1 ≥ a_2 ≥ … ≥ a_{n/2} > 0`.
fn half_coefficients(n: usize) -> Vec<f64> {
    let half = n / 2;
    if n == 3 {
        return vec![std::f64::consts::FRAC_1_SQRT_2];
    }

    let an = n as f64;
    let m: Vec<f64> = (1..=half)
        .map(|i| normal_quantile((i as f64 - 0.375) / (an + 0.25)))
        .collect();

    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let mut a = vec![0.0; half];
    let a1 = poly(&C1, rsn) - m[0] / ssumm2;
    a[0] = a1;

    let (first_scaled, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        let num = summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1];
        let den = 1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2;
        (2, (num / den).sqrt())
    } else {
        let num = summ2 - 2.0 * m[0] * m[0];
        let den = 1.0 - 2.0 * a1 * a1;
        (1, (num / den).sqrt())
    };

    for i in first_scaled..half {
        a[i] = -m[i] / fac;
    }
    a
}

/// Full antisymmetric weight vector aligned with the ascending sample.
fn signed_weights(n: usize) -> Vec<f64> {
    let half = half_coefficients(n);
    let mut weights = vec![0.0; n];
    for (i, a) in half.iter().enumerate() {
        weights[i] = -a;
        weights[n - 1 - i] = *a;
    }
    weights
}

/// `W = corr(a, x)²`, computed as `1 − (1 − corr²)` on range-scaled data to
/// keep W ≤ 1 under rounding.
fn w_statistic(sorted: &[f64], weights: &[f64], range: f64) -> f64 {
    let n = sorted.len() as f64;
    let mean = sorted.iter().map(|v| v / range).sum::<f64>() / n;
    let weight_mean = weights.iter().sum::<f64>() / n;

    let mut ssa = 0.0;
    let mut ssx = 0.0;
    let mut sax = 0.0;
    for (xi, ai) in sorted.iter().zip(weights) {
        let dx = xi / range - mean;
        let da = ai - weight_mean;
        ssa += da * da;
        ssx += dx * dx;
        sax += da * dx;
    }

    let ssassx = (ssa * ssx).sqrt();
    let w1 = (ssassx - sax) * (ssassx + sax) / (ssa * ssx);
    (1.0 - w1).clamp(0.0, 1.0)
}

fn p_value(w: f64, n: usize) -> f64 {
    if n == 3 {
        // Exact distribution: W is supported on [3/4, 1].
        const PI6: f64 = 6.0 / std::f64::consts::PI;
        const STQR: f64 = std::f64::consts::FRAC_PI_3;
        return (PI6 * (w.sqrt().asin() - STQR)).clamp(0.0, 1.0);
    }
    if w >= 1.0 {
        return 1.0;
    }

    let an = n as f64;
    let mut y = (1.0 - w).ln();

    let (mean, sd) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return 0.0;
        }
        y = -(gamma - y).ln();
        (poly(&C3, an), poly(&C4, an).exp())
    } else {
        let ln_n = an.ln();
        (poly(&C5, ln_n), poly(&C6, ln_n).exp())
    };

    normal_sf((y - mean) / sd).clamp(0.0, 1.0)
}

/// `c[0] + c[1]·x + c[2]·x² + …`
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}
