//! Feature derivation: `ddh = Diameter² × Height` and the log transform.

use crate::domain::{CohortObservation, MeasurementField, MeasurementRow};
use crate::error::PipelineError;

/// Derive `ddh`, `log_ddh` and `log_weight` for every cohort row.
///
/// Each of Diameter, Height and Weight must be present and strictly positive;
/// the first offending value aborts with an error naming the row.
pub fn build_features(rows: &[MeasurementRow]) -> Result<Vec<CohortObservation>, PipelineError> {
    rows.iter().map(build_observation).collect()
}

fn build_observation(row: &MeasurementRow) -> Result<CohortObservation, PipelineError> {
    let diameter = positive(row, MeasurementField::Diameter)?;
    let height = positive(row, MeasurementField::Height)?;
    let weight = positive(row, MeasurementField::Weight)?;

    let ddh = diameter * diameter * height;
    let log_ddh = ddh.ln();
    let log_weight = weight.ln();

    // Positive finite inputs can still overflow the product.
    if !(log_ddh.is_finite() && log_weight.is_finite()) {
        return Err(PipelineError::Numerical(format!(
            "Tree `{}` (line {}): log transform produced a non-finite value.",
            row.tree_id, row.line
        )));
    }

    Ok(CohortObservation {
        row: row.clone(),
        ddh,
        log_ddh,
        log_weight,
    })
}

fn positive(row: &MeasurementRow, field: MeasurementField) -> Result<f64, PipelineError> {
    let value = row.field(field).ok_or_else(|| PipelineError::MissingMeasurement {
        tree_id: row.tree_id.clone(),
        line: row.line,
        field,
    })?;
    if value <= 0.0 || !value.is_finite() {
        return Err(PipelineError::NonPositiveValue {
            tree_id: row.tree_id.clone(),
            line: row.line,
            field,
            value,
        });
    }
    Ok(value)
}
