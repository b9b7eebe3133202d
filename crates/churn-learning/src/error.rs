//! Error types for the churn-learning crate.
//!
//! [`ClassifierError`] covers fitting and inference of a [`Classifier`](crate::Classifier).
//! [`ChurnError`] is the pipeline-level error; it wraps preprocessing and
//! classifier errors unchanged and adds evaluation and artifact failures.
//!
//! # Example
//!
//! ```no_run
//! use churn_learning::{ChurnError, PipelineConfig};
//!
//! fn configure() -> Result<PipelineConfig, ChurnError> {
//!     // Errors are automatically propagated with ?
//!     let config = PipelineConfig::builder().cv_folds(10).build()?;
//!     Ok(config)
//! }
//! ```

use churn_processing::PreprocessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from classifier fitting and inference.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassifierError {
    /// Inference was requested before `fit`.
    #[error("classifier has not been fitted")]
    NotFitted,

    /// The training set has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// The training set has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Feature rows and labels have different lengths.
    #[error("got {features} feature rows but {labels} labels")]
    LabelCountMismatch { features: usize, labels: usize },

    /// A sample has a different number of features than the first row.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        expected: usize,
        got: usize,
        sample_index: usize,
    },

    /// A training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        sample_index: usize,
        feature_index: usize,
    },

    /// A hyperparameter is out of range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Inference input width differs from the training width.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch { expected: usize, got: usize },
}

/// The main error type for churn pipeline operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChurnError {
    /// Validation, transformation, resampling or splitting failed.
    #[error(transparent)]
    Processing(#[from] PreprocessingError),

    /// Classifier fitting or inference failed.
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// Inference, evaluation or save was requested before `train` or `load`.
    #[error("pipeline has no fitted model; call train() or load() first")]
    NotFitted,

    /// Invalid configuration provided to the pipeline.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A class has fewer samples than cross-validation folds.
    #[error("class {class} has only {count} samples, need at least {n_folds} for stratified CV")]
    TooFewSamplesForFolds {
        class: usize,
        count: usize,
        n_folds: usize,
    },

    /// A metric cannot be computed for the given labels.
    #[error("metric is undefined: {0}")]
    UndefinedMetric(String),

    /// The artifact file could not be decoded or is internally inconsistent.
    #[error("corrupt model artifact {path}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    /// The artifact was written by an incompatible format version.
    #[error("incompatible model artifact {path}: format version {found}, expected {expected}")]
    IncompatibleArtifact {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    /// Reading or writing the artifact file failed.
    #[error("failed to access model artifact {path}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding the artifact failed.
    #[error("failed to serialize model artifact")]
    SerializeArtifact {
        #[source]
        source: Box<bincode::ErrorKind>,
    },
}

impl ChurnError {
    /// Get a stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Processing(e) => e.error_code(),
            Self::Classifier(_) => "CLASSIFIER_ERROR",
            Self::NotFitted => "NOT_FITTED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::TooFewSamplesForFolds { .. } => "TOO_FEW_SAMPLES_FOR_FOLDS",
            Self::UndefinedMetric(_) => "UNDEFINED_METRIC",
            Self::CorruptArtifact { .. } => "CORRUPT_ARTIFACT",
            Self::IncompatibleArtifact { .. } => "INCOMPATIBLE_ARTIFACT",
            Self::ArtifactIo { .. } => "ARTIFACT_IO",
            Self::SerializeArtifact { .. } => "SERIALIZE_ARTIFACT",
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ChurnError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ChurnError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ChurnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_errors_pass_through() {
        let err: ChurnError = PreprocessingError::InsufficientData {
            rows: 99,
            minimum: 100,
        }
        .into();
        assert_eq!(err.error_code(), "INSUFFICIENT_DATA");
        assert!(err.to_string().contains("99 rows"));
    }

    #[test]
    fn test_classifier_errors_pass_through() {
        let err: ChurnError = ClassifierError::NotFitted.into();
        assert!(matches!(err, ChurnError::Classifier(ClassifierError::NotFitted)));
        assert_eq!(err.to_string(), "classifier has not been fitted");
    }

    #[test]
    fn test_error_serialization() {
        let err = ChurnError::IncompatibleArtifact {
            path: PathBuf::from("model.bin"),
            expected: 2,
            found: 1,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("INCOMPATIBLE_ARTIFACT"));
        assert!(json.contains("model.bin"));
    }
}
