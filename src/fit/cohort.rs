//! Cohort selection and explicit row corrections.
//!
//! Corrections run first, on a copy of the raw rows, so the loaded dataset
//! stays untouched and every change is reported back to the caller.

use crate::domain::{AppliedCorrection, CohortKey, MeasurementRow, RowCorrection};
use crate::error::PipelineError;

/// Apply `corrections` in order and return the corrected rows plus an audit trail.
///
/// A correction overrides the field on every row carrying its TreeID. A
/// correction that matches no row is an error.
pub fn apply_corrections(
    rows: &[MeasurementRow],
    corrections: &[RowCorrection],
) -> Result<(Vec<MeasurementRow>, Vec<AppliedCorrection>), PipelineError> {
    let mut corrected = rows.to_vec();
    let mut applied = Vec::with_capacity(corrections.len());

    for correction in corrections {
        let mut previous = None;
        let mut rows_affected = 0usize;

        for row in corrected.iter_mut().filter(|r| r.tree_id == correction.tree_id) {
            if rows_affected == 0 {
                previous = row.field(correction.field);
            }
            row.set_field(correction.field, correction.value);
            rows_affected += 1;
        }

        if rows_affected == 0 {
            return Err(PipelineError::CorrectionTargetMissing {
                tree_id: correction.tree_id.clone(),
            });
        }

        log::info!(
            "Correction applied: tree {} {} {} -> {} ({} row(s))",
            correction.tree_id,
            correction.field,
            fmt_previous(previous),
            correction.value,
            rows_affected
        );

        applied.push(AppliedCorrection {
            tree_id: correction.tree_id.clone(),
            field: correction.field,
            previous,
            value: correction.value,
            rows_affected,
        });
    }

    Ok((corrected, applied))
}

/// Rows whose `(Age, Year, Treatment)` equal `key`, in original order.
///
/// Rows missing any of the three key fields never match.
pub fn filter_cohort(rows: &[MeasurementRow], key: &CohortKey) -> Vec<MeasurementRow> {
    rows.iter().filter(|r| key.matches(r)).cloned().collect()
}

/// Like [`filter_cohort`], but an empty selection is an error.
pub fn select_cohort(rows: &[MeasurementRow], key: &CohortKey) -> Result<Vec<MeasurementRow>, PipelineError> {
    let cohort = filter_cohort(rows, key);
    if cohort.is_empty() {
        return Err(PipelineError::EmptyCohort { key: *key });
    }
    log::info!("Cohort {key}: {} of {} rows selected", cohort.len(), rows.len());
    Ok(cohort)
}

fn fmt_previous(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "(missing)".to_string())
}
