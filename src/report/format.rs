//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{CohortObservation, RegressionResult, ValidationReport};

const RULE_WIDTH: usize = 50;

/// Format the main report: fit summary, normality diagnostics, verdict.
pub fn format_report(report: &ValidationReport) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let reg = &report.regression;
    let mut out = String::new();

    out.push_str(&format!("{rule}\n"));
    out.push_str("BIOMASS ALLOMETRY REPORT (Log-Log OLS)\n");
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("Cohort:           {}\n", report.cohort));
    for c in &report.corrections {
        out.push_str(&format!(
            "Correction:       tree {} {} {} -> {}\n",
            c.tree_id,
            c.field,
            c.previous.map(|v| format!("{v}")).unwrap_or_else(|| "(missing)".to_string()),
            c.value
        ));
    }
    out.push_str(&format!("Data Points:      {}\n", reg.n_obs));
    out.push_str(&format!("R-Squared:        {:.4}\n", reg.r_squared));
    out.push_str(&format!("Intercept:        {:.4}\n", reg.intercept));
    out.push_str(&format!("Slope (log_ddh):  {:.4}\n", reg.slope));

    out.push_str(&format!("{rule}\n"));
    out.push_str("VALIDATION DIAGNOSTICS\n");
    out.push_str(&format!("Shapiro-Wilk W:   {:.4}\n", report.normality.statistic));
    out.push_str(&format!(
        "Shapiro-Wilk P:   {:.4} (alpha: {})\n",
        report.normality.p_value, report.alpha
    ));
    if report.valid {
        out.push_str(">> CONCLUSION: Residuals are NORMAL. Model is VALID.\n");
    } else {
        out.push_str(">> CONCLUSION: Residuals are NOT normal. Model INVALID.\n");
    }
    if let Some(check) = &report.reproduction {
        out.push_str(&format!(
            ">> REPRODUCTION: {} (expected {:.4} ± {}, got {:.4})\n",
            if check.matches { "OK" } else { "MISMATCH" },
            check.expected,
            check.tolerance,
            check.actual
        ));
    }
    out.push_str(&format!("{rule}\n"));

    out
}

/// Extended fit diagnostics (coefficient table, F-test, information criteria).
pub fn format_details(report: &ValidationReport) -> String {
    let reg = &report.regression;
    let mut out = String::new();

    out.push_str("Fit details:\n");
    out.push_str(&format!(
        "Rows: read={} rejected={} | cohort n={}\n",
        report.rows_read, report.rows_rejected, reg.n_obs
    ));
    out.push_str(&format!(
        "Adj. R-Squared: {:.4} | F(1, {}) = {:.4}, p = {:.4}\n",
        reg.adj_r_squared,
        reg.n_obs.saturating_sub(2),
        reg.f_statistic,
        reg.f_pvalue
    ));
    out.push_str(&format!(
        "Residual SE: {:.4} | LogLik: {:.4} | AIC: {:.4} | BIC: {:.4}\n",
        reg.residual_std_error, reg.log_likelihood, reg.aic, reg.bic
    ));
    out.push('\n');

    out.push_str(&format!(
        "{:<12} {:>10} {:>10} {:>10} {:>10}\n",
        "term", "coef", "std err", "t", "P>|t|"
    ));
    out.push_str(&format!(
        "{:-<12} {:-<10} {:-<10} {:-<10} {:-<10}\n",
        "", "", "", "", ""
    ));
    for c in &reg.coefficients {
        out.push_str(&format!(
            "{:<12} {:>10.4} {:>10.4} {:>10.3} {:>10.4}\n",
            c.name, c.estimate, c.std_error, c.t_value, c.p_value
        ));
    }

    out
}

/// Per-tree table of derived variables and residuals.
pub fn format_residuals(observations: &[CohortObservation], regression: &RegressionResult) -> String {
    let mut out = String::new();
    out.push_str("Residuals (cohort order):\n");
    out.push_str(
        format!(
            "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "TreeID", "ddh", "log_ddh", "log_wt", "fitted", "residual"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<12} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10}\n",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for ((obs, fitted), residual) in observations
        .iter()
        .zip(&regression.fitted)
        .zip(&regression.residuals)
    {
        out.push_str(
            format!(
                "{:<12} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}\n",
                truncate(&obs.row.tree_id, 12),
                obs.ddh,
                obs.log_ddh,
                obs.log_weight,
                fitted,
                residual
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
