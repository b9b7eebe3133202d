//! Custom error types for the churn preprocessing stages.
//!
//! This module provides the error hierarchy shared by the schema validator,
//! the column transformer, the resampler and the train/test splitter.
//!
//! Errors are serializable so the CLI can emit them as `{code, message}`
//! objects when running in JSON mode.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the preprocessing stages.
#[derive(Error, Debug)]
pub enum PreprocessingError {
    /// Configured feature columns are absent from the input table.
    #[error("Missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    /// The table has too few rows for reliable training.
    #[error("Insufficient data for reliable model training: {rows} rows (minimum {minimum})")]
    InsufficientData { rows: usize, minimum: usize },

    /// `transform` was called before a successful `fit_transform`.
    #[error("Column transformer has not been fitted")]
    NotFitted,

    /// Columns present at fit time are absent at transform time.
    #[error("Columns seen during fit are missing at transform: {}", .missing.join(", "))]
    ColumnMismatchAtTransform { missing: Vec<String> },

    /// No valid values found in a numeric column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// A binary column holds a value that is not a 0/1 flag.
    #[error("Column '{column}' has a non-binary value at row {row}")]
    InvalidBinaryValue { column: String, row: usize },

    /// A label cell could not be mapped to churn / no churn.
    #[error("Label column '{column}' has an unrecognized value {value:?} at row {row}")]
    InvalidLabel {
        column: String,
        row: usize,
        value: Option<String>,
    },

    /// An operation received zero samples.
    #[error("Dataset has zero samples")]
    EmptyDataset,

    /// Feature rows and labels have different lengths.
    #[error("Got {features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    /// Resampling needs at least two classes.
    #[error("Resampling requires at least two classes, found {found}")]
    SingleClass { found: usize },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl PreprocessingError {
    /// Get a stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingColumns { .. } => "MISSING_COLUMNS",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::NotFitted => "NOT_FITTED",
            Self::ColumnMismatchAtTransform { .. } => "COLUMN_MISMATCH_AT_TRANSFORM",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::InvalidBinaryValue { .. } => "INVALID_BINARY_VALUE",
            Self::InvalidLabel { .. } => "INVALID_LABEL",
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::LengthMismatch { .. } => "LENGTH_MISMATCH",
            Self::SingleClass { .. } => "SINGLE_CLASS",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Polars(_) => "POLARS_ERROR",
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PreprocessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PreprocessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, PreprocessingError>;
