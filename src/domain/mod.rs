//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw measurement rows and the cohort key (`MeasurementRow`, `CohortKey`)
//! - explicit data corrections (`RowCorrection`, `AppliedCorrection`)
//! - fit outputs (`RegressionResult`, `NormalityResult`, `ValidationReport`)
//! - run configuration (`PipelineConfig`)

pub mod types;

pub use types::*;
