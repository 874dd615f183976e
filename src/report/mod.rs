//! Report assembly: verdict and the immutable `ValidationReport`.

pub mod format;

pub use format::*;

use crate::domain::{
    AppliedCorrection, CohortKey, NormalityResult, RegressionResult, ReproductionCheck, ReproductionTarget,
    ValidationReport,
};

/// Residuals are accepted as normal when the Shapiro-Wilk p-value exceeds `alpha`.
pub fn is_normal(p_value: f64, alpha: f64) -> bool {
    p_value > alpha
}

/// Compare an observed Shapiro-Wilk p-value with a documented target.
pub fn check_reproduction(target: &ReproductionTarget, actual: f64) -> ReproductionCheck {
    ReproductionCheck {
        expected: target.shapiro_p,
        actual,
        tolerance: target.tolerance,
        matches: (actual - target.shapiro_p).abs() <= target.tolerance,
    }
}

/// Inputs to [`assemble_report`] that describe where the cohort came from.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub cohort: CohortKey,
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub corrections: Vec<AppliedCorrection>,
    pub alpha: f64,
    pub reproduction: Option<ReproductionTarget>,
}

/// Combine the fit and the normality test into one report value.
pub fn assemble_report(
    context: ReportContext,
    regression: RegressionResult,
    normality: NormalityResult,
) -> ValidationReport {
    let valid = is_normal(normality.p_value, context.alpha);
    let reproduction = context
        .reproduction
        .as_ref()
        .map(|target| check_reproduction(target, normality.p_value));

    ValidationReport {
        cohort: context.cohort,
        rows_read: context.rows_read,
        rows_rejected: context.rows_rejected,
        corrections: context.corrections,
        regression,
        normality,
        alpha: context.alpha,
        valid,
        reproduction,
    }
}
