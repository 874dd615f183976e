//! Ordinary least squares with intercept, plus the usual fit diagnostics.
//!
//! Given cohort observations we fit
//!
//! ```text
//! log_weight = β0 + β1 · log_ddh + ε
//! ```
//!
//! and report, alongside the coefficients:
//! - R², adjusted R² and the overall F-test against F(1, n − 2)
//! - standard errors, t values and two-sided p-values per coefficient
//! - residual standard error, Gaussian log-likelihood, AIC and BIC
//! - fitted values and residuals in cohort order

use nalgebra::DVector;

use crate::domain::{CoefficientStats, CohortObservation, RegressionResult};
use crate::error::PipelineError;
use crate::math::special::{f_sf, t_two_sided_p};
use crate::math::{intercept_design, solve_least_squares};

/// Two coefficients plus one residual degree of freedom for the F-test.
pub const MIN_OBSERVATIONS: usize = 3;

const N_PARAMS: usize = 2;

/// Fit the log-log allometric model on a prepared cohort.
pub fn fit_log_log(observations: &[CohortObservation]) -> Result<RegressionResult, PipelineError> {
    let x: Vec<f64> = observations.iter().map(|o| o.log_ddh).collect();
    let y: Vec<f64> = observations.iter().map(|o| o.log_weight).collect();
    let result = fit_ols(&x, &y)?;

    log::info!(
        "OLS fit on {} trees: intercept={:.4}, slope={:.4}, R²={:.4}",
        result.n_obs,
        result.intercept,
        result.slope,
        result.r_squared
    );
    Ok(result)
}

/// Fit `y = β0 + β1·x` by ordinary least squares.
pub fn fit_ols(x: &[f64], y: &[f64]) -> Result<RegressionResult, PipelineError> {
    if x.len() != y.len() {
        return Err(PipelineError::Numerical(format!(
            "Regressor and response lengths differ ({} vs {}).",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < MIN_OBSERVATIONS {
        return Err(PipelineError::InsufficientData {
            stage: "OLS fit",
            required: MIN_OBSERVATIONS,
            actual: n,
        });
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(PipelineError::Numerical(
            "Regression inputs contain non-finite values.".to_string(),
        ));
    }

    let nf = n as f64;
    let x_mean = x.iter().sum::<f64>() / nf;
    let y_mean = y.iter().sum::<f64>() / nf;
    let sxx: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
    let sum_sq_x: f64 = x.iter().map(|v| v * v).sum();

    // Zero variance relative to the regressor's own magnitude means rank 1.
    if sxx == 0.0 || sxx <= f64::EPSILON * sum_sq_x {
        return Err(PipelineError::SingularDesign);
    }

    // Solve on the standardized regressor so the design is well conditioned
    // whatever the scale of x, then map back to the original units.
    let x_scale = sxx.sqrt();
    let z: Vec<f64> = x.iter().map(|v| (v - x_mean) / x_scale).collect();
    let design = intercept_design(&z);
    let response = DVector::from_column_slice(y);
    let beta = solve_least_squares(&design, &response)
        .ok_or_else(|| PipelineError::Numerical("Least squares solve failed.".to_string()))?;
    let (mut intercept, mut slope) = (beta[0] - beta[1] * x_mean / x_scale, beta[1] / x_scale);

    let mut fitted: Vec<f64> = z.iter().map(|zi| beta[0] + beta[1] * zi).collect();
    let mut residuals: Vec<f64> = y.iter().zip(&fitted).map(|(yi, fi)| yi - fi).collect();
    let mut ss_res: f64 = residuals.iter().map(|e| e * e).sum();
    let ss_tot: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();

    // Residuals at rounding level are an exact fit: they carry no information
    // and must not reach the normality test as noise.
    let y_scale = y.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let negligible = f64::EPSILON * nf * y_scale * y_scale;
    let flat_response = ss_tot <= negligible;
    if flat_response || ss_res <= negligible {
        fitted = y.to_vec();
        residuals = vec![0.0; n];
        ss_res = 0.0;
    }
    if flat_response {
        intercept = y_mean;
        slope = 0.0;
    }
    let df_resid = (n - N_PARAMS) as f64;

    let (r_squared, adj_r_squared, f_statistic, f_pvalue) = if flat_response {
        // Constant response: the flat line is exact and the slope is zero.
        (1.0, 1.0, 0.0, 1.0)
    } else {
        let r2 = (1.0 - ss_res / ss_tot).clamp(0.0, 1.0);
        let adj = 1.0 - (1.0 - r2) * (nf - 1.0) / df_resid;
        let ss_reg = (ss_tot - ss_res).max(0.0);
        let f = if ss_res > 0.0 {
            ss_reg / (ss_res / df_resid)
        } else {
            f64::INFINITY
        };
        (r2, adj, f, f_sf(f, 1.0, df_resid))
    };

    let sigma2 = ss_res / df_resid;
    let se_slope = (sigma2 / sxx).sqrt();
    let se_intercept = (sigma2 * (1.0 / nf + x_mean * x_mean / sxx)).sqrt();

    let coefficients = [
        coefficient("Intercept", intercept, se_intercept, df_resid),
        coefficient("log_ddh", slope, se_slope, df_resid),
    ];

    let log_likelihood = gaussian_log_likelihood(ss_res, nf);
    let k = N_PARAMS as f64;
    let aic = -2.0 * log_likelihood + 2.0 * k;
    let bic = -2.0 * log_likelihood + k * nf.ln();

    if !(intercept.is_finite() && slope.is_finite() && ss_res.is_finite()) {
        return Err(PipelineError::Numerical("Non-finite regression output.".to_string()));
    }

    Ok(RegressionResult {
        n_obs: n,
        intercept,
        slope,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_pvalue,
        coefficients,
        residual_std_error: sigma2.sqrt(),
        log_likelihood,
        aic,
        bic,
        fitted,
        residuals,
    })
}

fn coefficient(name: &str, estimate: f64, std_error: f64, df: f64) -> CoefficientStats {
    let t_value = if std_error > 0.0 {
        estimate / std_error
    } else if estimate == 0.0 {
        0.0
    } else {
        f64::INFINITY.copysign(estimate)
    };
    CoefficientStats {
        name: name.to_string(),
        estimate,
        std_error,
        t_value,
        p_value: t_two_sided_p(t_value, df),
    }
}

/// Maximized Gaussian log-likelihood with `σ̂² = SS_res / n`.
fn gaussian_log_likelihood(ss_res: f64, n: f64) -> f64 {
    if ss_res <= 0.0 {
        return f64::INFINITY;
    }
    -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (ss_res / n).ln() + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn recovers_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [2.0, 5.0, 8.0, 11.0];
        let fit = fit_ols(&x, &y).unwrap();
        assert!((fit.intercept - 2.0).abs() < 1e-10);
        assert!((fit.slope - 3.0).abs() < 1e-10);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(fit.residuals.iter().all(|e| e.abs() < 1e-9));
        assert!(fit.f_pvalue < 1e-6);
    }

    #[test]
    fn matches_hand_computed_diagnostics() {
        // Sxx = 5, Sxy = 2.3 → β1 = 0.46, β0 = 1.1
        // residuals: [0.04, -0.12, 0.12, -0.04], SS_res = 0.032, SS_tot = 1.09
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.6, 1.9, 2.6, 2.9];
        let fit = fit_ols(&x, &y).unwrap();

        assert!((fit.intercept - 1.1).abs() < 1e-12);
        assert!((fit.slope - 0.46).abs() < 1e-12);
        let expected_r2 = 1.0 - 0.032 / 1.09;
        assert!((fit.r_squared - expected_r2).abs() < 1e-12);

        let f = (1.09 - 0.032) / (0.032 / 2.0);
        assert!((fit.f_statistic - f).abs() < 1e-8);

        // F(1, 2) tail in closed form via t = √F: 1 − t/√(2 + t²)
        let t = f.sqrt();
        let p = 1.0 - t / (2.0 + t * t).sqrt();
        assert!((fit.f_pvalue - p).abs() < 1e-12);

        let se_slope = (0.032_f64 / 2.0 / 5.0).sqrt();
        assert!((fit.coefficients[1].std_error - se_slope).abs() < 1e-12);
        assert!((fit.coefficients[1].t_value - t).abs() < 1e-9);
        assert!((fit.coefficients[1].p_value - fit.f_pvalue).abs() < 1e-12);
        assert_eq!(fit.coefficients[0].name, "Intercept");
    }

    #[test]
    fn two_observations_are_insufficient() {
        let err = fit_ols(&[1.0, 2.0], &[0.5, 0.7]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData {
                required: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn constant_regressor_is_singular() {
        let err = fit_ols(&[2.5, 2.5, 2.5, 2.5], &[0.1, 0.4, 0.2, 0.3]).unwrap_err();
        assert!(matches!(err, PipelineError::SingularDesign));
    }

    #[test]
    fn constant_response_has_zero_slope() {
        let fit = fit_ols(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 4.0);
        assert_eq!(fit.r_squared, 1.0);
        assert_eq!(fit.f_pvalue, 1.0);
        assert!(fit.residuals.iter().all(|e| *e == 0.0));
    }

    #[test]
    fn constant_log_weight_leaves_exactly_zero_residuals() {
        let x: Vec<f64> = [1.7, 2.3, 2.9, 3.4, 3.8, 4.4, 5.0].iter().map(|d: &f64| (d * d * 2.5).ln()).collect();
        let y = vec![0.3_f64.ln(); x.len()];
        let fit = fit_ols(&x, &y).unwrap();
        assert!(fit.residuals.iter().all(|e| *e == 0.0), "{:?}", fit.residuals);
        assert_eq!(fit.fitted, y);
    }

    #[test]
    fn tiny_regressor_scale_is_solved_not_truncated() {
        // In units of 1e-13: Sxx = 5, Sxy = 5.15 → slope 1.03e13, intercept −0.05.
        let x = [1e-13, 2e-13, 3e-13, 4e-13];
        let y = [1.0, 2.0, 3.0, 4.1];
        let fit = fit_ols(&x, &y).unwrap();

        assert!((fit.slope / 1.03e13 - 1.0).abs() < 1e-9, "slope {}", fit.slope);
        assert!((fit.intercept + 0.05).abs() < 1e-9, "intercept {}", fit.intercept);
        assert!(fit.r_squared > 0.99);

        let dot: f64 = fit.residuals.iter().zip(&x).map(|(e, xi)| e * xi / 1e-13).sum();
        assert!(dot.abs() < 1e-9, "Σe·x = {dot}");
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(matches!(
            fit_ols(&[1.0, 2.0, 3.0], &[1.0, 2.0]),
            Err(PipelineError::Numerical(_))
        ));
    }

    proptest! {
        #[test]
        fn residuals_are_centered_and_orthogonal(
            points in prop::collection::vec((-5.0f64..5.0, -5.0f64..5.0), 3..60)
        ) {
            let x: Vec<f64> = points.iter().map(|p| p.0).collect();
            let y: Vec<f64> = points.iter().map(|p| p.1).collect();
            let mean = x.iter().sum::<f64>() / x.len() as f64;
            let sxx: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
            prop_assume!(sxx > 1e-3);

            let fit = fit_ols(&x, &y).unwrap();
            prop_assert_eq!(fit.residuals.len(), x.len());

            let sum: f64 = fit.residuals.iter().sum();
            let dot: f64 = fit.residuals.iter().zip(&x).map(|(e, xi)| e * xi).sum();
            prop_assert!(sum.abs() < 1e-8, "Σe = {}", sum);
            prop_assert!(dot.abs() < 1e-8, "Σe·x = {}", dot);
            prop_assert!((0.0..=1.0).contains(&fit.r_squared));
            prop_assert!((0.0..=1.0).contains(&fit.f_pvalue));
        }
    }
}
