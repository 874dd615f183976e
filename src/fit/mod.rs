//! Model preparation and fitting.
//!
//! - `cohort`: explicit row corrections + cohort selection
//! - `features`: `ddh` derivation and log transform
//! - `regression`: OLS engine and fit diagnostics

pub mod cohort;
pub mod features;
pub mod regression;

pub use cohort::{apply_corrections, filter_cohort, select_cohort};
pub use features::build_features;
pub use regression::{fit_log_log, fit_ols};
