//! Residual diagnostics.

pub mod shapiro;

pub use shapiro::shapiro_wilk;

use crate::domain::{NormalityResult, RegressionResult};
use crate::error::PipelineError;

/// Test the fitted model's residuals for normality.
///
/// An exact fit leaves nothing to test and is reported as a numerical failure.
pub fn test_residual_normality(regression: &RegressionResult) -> Result<NormalityResult, PipelineError> {
    if !regression.residuals.is_empty() && regression.residuals.iter().all(|e| *e == 0.0) {
        return Err(PipelineError::Numerical(
            "The model fits the cohort exactly; residual normality cannot be assessed.".to_string(),
        ));
    }

    let result = shapiro_wilk(&regression.residuals)?;
    log::info!(
        "Shapiro-Wilk on {} residuals: W={:.4}, p={:.4}",
        result.n,
        result.statistic,
        result.p_value
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fit_ols;

    #[test]
    fn exact_fit_is_not_certified() {
        let fit = fit_ols(&[0.5, 1.0, 1.5, 2.0, 2.5], &[-1.2; 5]).unwrap();
        let err = test_residual_normality(&fit).unwrap_err();
        assert!(matches!(err, PipelineError::Numerical(_)));
        assert_eq!(err.exit_code(), 4);

        let line = fit_ols(&[1.0, 2.0, 3.0, 4.0], &[0.3, 0.6, 0.9, 1.2]).unwrap();
        assert!(matches!(
            test_residual_normality(&line),
            Err(PipelineError::Numerical(_))
        ));
    }

    #[test]
    fn noisy_fit_is_tested() {
        let fit = fit_ols(&[1.0, 2.0, 3.0, 4.0], &[1.6, 1.9, 2.6, 2.9]).unwrap();
        let result = test_residual_normality(&fit).unwrap();
        assert_eq!(result.n, 4);
        assert!((0.0..=1.0).contains(&result.p_value));
    }
}
