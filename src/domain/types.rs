//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV as an audit record of a run

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Default dataset location, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "data/poplar_raw_data.csv";

/// Default significance level for the residual normality test.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Default tolerance for the optional reproduction check.
pub const DEFAULT_REPRODUCTION_TOLERANCE: f64 = 1e-3;

/// One measured tree, as read from the dataset.
///
/// Every measurement is optional at this stage: rows with missing cohort fields
/// are dropped by the cohort filter, and missing dimensions are reported by the
/// feature builder with the row's line number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    pub tree_id: String,
    /// 1-based line in the source file (header is line 1).
    pub line: usize,

    pub age: Option<i64>,
    pub year: Option<i64>,
    pub treatment: Option<i64>,

    pub diameter: Option<f64>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

impl MeasurementRow {
    pub fn field(&self, field: MeasurementField) -> Option<f64> {
        match field {
            MeasurementField::Diameter => self.diameter,
            MeasurementField::Height => self.height,
            MeasurementField::Weight => self.weight,
        }
    }

    pub fn set_field(&mut self, field: MeasurementField, value: f64) {
        match field {
            MeasurementField::Diameter => self.diameter = Some(value),
            MeasurementField::Height => self.height = Some(value),
            MeasurementField::Weight => self.weight = Some(value),
        }
    }
}

/// Continuous measurements that feed the log transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementField {
    Diameter,
    Height,
    Weight,
}

impl MeasurementField {
    pub const ALL: [MeasurementField; 3] = [
        MeasurementField::Diameter,
        MeasurementField::Height,
        MeasurementField::Weight,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            MeasurementField::Diameter => "Diameter",
            MeasurementField::Height => "Height",
            MeasurementField::Weight => "Weight",
        }
    }
}

impl fmt::Display for MeasurementField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for MeasurementField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diameter" => Ok(MeasurementField::Diameter),
            "height" => Ok(MeasurementField::Height),
            "weight" => Ok(MeasurementField::Weight),
            other => {
                let expected: Vec<String> = MeasurementField::ALL
                    .iter()
                    .map(|f| f.display_name().to_ascii_lowercase())
                    .collect();
                Err(format!(
                    "Unknown measurement field '{other}'. Expected one of: {}.",
                    expected.join(", ")
                ))
            }
        }
    }
}

/// The fixed `(Age, Year, Treatment)` selection criterion for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CohortKey {
    pub age: i64,
    pub year: i64,
    pub treatment: i64,
}

impl CohortKey {
    pub fn new(age: i64, year: i64, treatment: i64) -> Self {
        Self { age, year, treatment }
    }

    /// True when all three key fields are present on the row and equal the key.
    pub fn matches(&self, row: &MeasurementRow) -> bool {
        row.age == Some(self.age) && row.year == Some(self.year) && row.treatment == Some(self.treatment)
    }
}

impl Default for CohortKey {
    fn default() -> Self {
        Self::new(3, 1, 1)
    }
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Age={} Year={} Treatment={}", self.age, self.year, self.treatment)
    }
}

/// An explicit, auditable override of one tree's recorded value.
///
/// Parsed from `TREE:field=value`, e.g. `15:diameter=2.9`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowCorrection {
    pub tree_id: String,
    pub field: MeasurementField,
    pub value: f64,
}

impl FromStr for RowCorrection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let usage = || format!("Invalid correction '{s}'. Expected TREE:field=value (e.g. 15:diameter=2.9).");

        let (tree_id, rest) = s.split_once(':').ok_or_else(usage)?;
        let (field, value) = rest.split_once('=').ok_or_else(usage)?;

        let tree_id = tree_id.trim();
        if tree_id.is_empty() {
            return Err(usage());
        }
        let field = field.parse::<MeasurementField>()?;
        let value = value
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Invalid correction value in '{s}'."))?;
        if !value.is_finite() {
            return Err(format!("Correction value in '{s}' must be finite."));
        }

        Ok(RowCorrection {
            tree_id: tree_id.to_string(),
            field,
            value,
        })
    }
}

/// A correction as it was actually applied to the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCorrection {
    pub tree_id: String,
    pub field: MeasurementField,
    /// Value recorded in the dataset before the override (first matching row).
    pub previous: Option<f64>,
    pub value: f64,
    pub rows_affected: usize,
}

/// A cohort row together with its derived regression variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortObservation {
    pub row: MeasurementRow,
    /// `Diameter² × Height`
    pub ddh: f64,
    pub log_ddh: f64,
    pub log_weight: f64,
}

/// Estimate and inference for one regression coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientStats {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    /// Two-sided p-value against t(n − 2).
    pub p_value: f64,
}

/// OLS fit of `log_weight = β0 + β1 · log_ddh`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub n_obs: usize,
    pub intercept: f64,
    pub slope: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    /// Upper tail of F(1, n − 2) at `f_statistic`.
    pub f_pvalue: f64,
    /// `[intercept, slope]`
    pub coefficients: [CoefficientStats; 2],
    pub residual_std_error: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub fitted: Vec<f64>,
    /// Same order as the cohort.
    pub residuals: Vec<f64>,
}

/// Shapiro-Wilk test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityResult {
    pub n: usize,
    /// W statistic, in (0, 1].
    pub statistic: f64,
    pub p_value: f64,
}

/// A documented p-value the run is expected to reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReproductionTarget {
    pub shapiro_p: f64,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReproductionCheck {
    pub expected: f64,
    pub actual: f64,
    pub tolerance: f64,
    pub matches: bool,
}

/// Everything a run certifies, as one immutable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub cohort: CohortKey,
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub corrections: Vec<AppliedCorrection>,
    pub regression: RegressionResult,
    pub normality: NormalityResult,
    pub alpha: f64,
    /// `normality.p_value > alpha`
    pub valid: bool,
    pub reproduction: Option<ReproductionCheck>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data_path: PathBuf,
    pub cohort: CohortKey,
    /// Significance level for the residual normality test.
    pub alpha: f64,
    /// Applied in order, before cohort filtering.
    pub corrections: Vec<RowCorrection>,
    pub reproduction: Option<ReproductionTarget>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            cohort: CohortKey::default(),
            alpha: DEFAULT_ALPHA,
            corrections: Vec::new(),
            reproduction: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.alpha.is_finite() && self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        if let Some(target) = &self.reproduction {
            if !(0.0..=1.0).contains(&target.shapiro_p) {
                return Err(PipelineError::InvalidConfig(format!(
                    "expected Shapiro-Wilk p-value must lie in [0, 1], got {}",
                    target.shapiro_p
                )));
            }
            if !(target.tolerance.is_finite() && target.tolerance >= 0.0) {
                return Err(PipelineError::InvalidConfig(format!(
                    "tolerance must be finite and >= 0, got {}",
                    target.tolerance
                )));
            }
        }
        Ok(())
    }
}
