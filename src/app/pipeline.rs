//! Shared "fit pipeline" logic.
//!
//! Keeping the whole workflow in one place keeps the CLI focused on presentation:
//! load -> correct -> filter cohort -> features -> log-log OLS -> Shapiro-Wilk -> report
//!
//! Every stage either hands its output to the next or returns a terminal error;
//! no partial report is ever produced.

use crate::domain::{CohortObservation, PipelineConfig, ValidationReport};
use crate::error::PipelineError;
use crate::fit::{apply_corrections, build_features, fit_log_log, select_cohort};
use crate::io::ingest::{IngestedData, load_measurements};
use crate::report::{ReportContext, assemble_report};
use crate::stats::test_residual_normality;

/// All computed outputs of a single `biomass fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Cohort rows with their derived variables, in file order.
    pub observations: Vec<CohortObservation>,
    pub report: ValidationReport,
}

/// Execute the full pipeline against `config.data_path`.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunOutput, PipelineError> {
    config.validate()?;
    let data = load_measurements(&config.data_path)?;
    analyze(&data, config)
}

/// Run every stage after loading.
///
/// Split out so an already-loaded dataset can be re-analyzed (other cohorts,
/// other corrections) without touching the filesystem again.
pub fn analyze(data: &IngestedData, config: &PipelineConfig) -> Result<RunOutput, PipelineError> {
    config.validate()?;

    let (rows, corrections) = apply_corrections(&data.rows, &config.corrections)?;
    let cohort = select_cohort(&rows, &config.cohort)?;
    let observations = build_features(&cohort)?;
    log::debug!("Built features for {} trees", observations.len());

    let regression = fit_log_log(&observations)?;
    let normality = test_residual_normality(&regression)?;

    let context = ReportContext {
        cohort: config.cohort,
        rows_read: data.rows_read,
        rows_rejected: data.row_errors.len(),
        corrections,
        alpha: config.alpha,
        reproduction: config.reproduction,
    };
    let report = assemble_report(context, regression, normality);
    log::info!(
        "Verdict for {}: {} (p={:.4}, alpha={})",
        report.cohort,
        if report.valid { "VALID" } else { "INVALID" },
        report.normality.p_value,
        report.alpha
    );

    Ok(RunOutput { observations, report })
}
