//! Export run results.
//!
//! - report JSON: the full `ValidationReport` plus run metadata, as an audit record
//! - residual CSV: one row per cohort tree, easy to consume in spreadsheets

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::domain::{CohortObservation, RegressionResult, ValidationReport};
use crate::error::PipelineError;

/// On-disk JSON layout of an exported report.
#[derive(Debug, Serialize)]
pub struct ReportFile<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub generated_at: DateTime<Local>,
    pub report: &'a ValidationReport,
}

#[derive(Debug, Serialize)]
struct ResidualRecord<'a> {
    #[serde(rename = "TreeID")]
    tree_id: &'a str,
    line: usize,
    diameter: f64,
    height: f64,
    weight: f64,
    ddh: f64,
    log_ddh: f64,
    log_weight: f64,
    fitted: f64,
    residual: f64,
}

/// Write the report as pretty-printed JSON.
pub fn write_report_json(path: &Path, report: &ValidationReport) -> Result<(), PipelineError> {
    let file = File::create(path).map_err(|e| export_error(path, e))?;

    let doc = ReportFile {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        generated_at: Local::now(),
        report,
    };

    serde_json::to_writer_pretty(file, &doc).map_err(|e| export_error(path, e))?;
    log::info!("Wrote report JSON to {}", path.display());
    Ok(())
}

/// Write per-tree derived variables, fitted values and residuals to CSV.
pub fn write_residuals_csv(
    path: &Path,
    observations: &[CohortObservation],
    regression: &RegressionResult,
) -> Result<(), PipelineError> {
    if observations.len() != regression.residuals.len() {
        return Err(PipelineError::Numerical(format!(
            "Residual count ({}) does not match cohort size ({}).",
            regression.residuals.len(),
            observations.len()
        )));
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| export_error(path, e))?;

    for ((obs, fitted), residual) in observations
        .iter()
        .zip(&regression.fitted)
        .zip(&regression.residuals)
    {
        let record = ResidualRecord {
            tree_id: &obs.row.tree_id,
            line: obs.row.line,
            diameter: obs.row.diameter.unwrap_or(f64::NAN),
            height: obs.row.height.unwrap_or(f64::NAN),
            weight: obs.row.weight.unwrap_or(f64::NAN),
            ddh: obs.ddh,
            log_ddh: obs.log_ddh,
            log_weight: obs.log_weight,
            fitted: *fitted,
            residual: *residual,
        };
        writer.serialize(record).map_err(|e| export_error(path, e))?;
    }

    writer.flush().map_err(|e| export_error(path, e))?;
    log::info!("Wrote {} residual rows to {}", observations.len(), path.display());
    Ok(())
}

fn export_error(path: &Path, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Export {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
