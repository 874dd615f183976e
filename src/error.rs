//! Error types.
//!
//! - `PipelineError`: typed failures raised by the modeling stages
//! - `AppError`: what the binary reports (message + process exit code)

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{CohortKey, MeasurementField};

/// A terminal failure of one pipeline stage.
///
/// Every stage either advances or returns one of these; the run is aborted and
/// no report is produced.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Dataset not found at: {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("Dataset at '{}' could not be read: {source}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed dataset: {0}")]
    MalformedInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Correction target TreeID `{tree_id}` does not occur in the dataset.")]
    CorrectionTargetMissing { tree_id: String },

    #[error("No rows match cohort {key}.")]
    EmptyCohort { key: CohortKey },

    #[error("Tree `{tree_id}` (line {line}): {field} is missing.")]
    MissingMeasurement {
        tree_id: String,
        line: usize,
        field: MeasurementField,
    },

    #[error("Tree `{tree_id}` (line {line}): {field} = {value} must be > 0 for the log transform.")]
    NonPositiveValue {
        tree_id: String,
        line: usize,
        field: MeasurementField,
        value: f64,
    },

    #[error("{stage} requires at least {required} observations, got {actual}.")]
    InsufficientData {
        stage: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("log_ddh is constant across the cohort; the slope is undefined.")]
    SingularDesign,

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Failed to write '{}': {message}", .path.display())]
    Export { path: PathBuf, message: String },
}

impl PipelineError {
    /// Process exit code for this failure class.
    ///
    /// - 2: input / configuration / output problems
    /// - 3: the data cannot support the model
    /// - 4: numerical failure
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::InputNotFound { .. }
            | PipelineError::InputUnreadable { .. }
            | PipelineError::MalformedInput(_)
            | PipelineError::InvalidConfig(_)
            | PipelineError::Export { .. } => 2,
            PipelineError::CorrectionTargetMissing { .. }
            | PipelineError::EmptyCohort { .. }
            | PipelineError::MissingMeasurement { .. }
            | PipelineError::NonPositiveValue { .. }
            | PipelineError::InsufficientData { .. } => 3,
            PipelineError::SingularDesign | PipelineError::Numerical(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), format!("Pipeline Error: {err}"))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_failure_class() {
        let missing = PipelineError::InputNotFound {
            path: PathBuf::from("nope.csv"),
        };
        assert_eq!(missing.exit_code(), 2);

        let empty = PipelineError::EmptyCohort {
            key: CohortKey::default(),
        };
        assert_eq!(empty.exit_code(), 3);
        assert_eq!(PipelineError::SingularDesign.exit_code(), 4);

        let app: AppError = empty.into();
        assert_eq!(app.exit_code(), 3);
        assert!(app.to_string().contains("Age=3 Year=1 Treatment=1"));
    }

    #[test]
    fn non_positive_message_names_the_row() {
        let err = PipelineError::NonPositiveValue {
            tree_id: "42".to_string(),
            line: 7,
            field: MeasurementField::Height,
            value: 0.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("`42`"));
        assert!(msg.contains("line 7"));
        assert!(msg.contains("Height"));
    }
}
