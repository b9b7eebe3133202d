//! Progress and event reporting for the training pipeline.
//!
//! A [`Pipeline`](crate::Pipeline) reports through an injected
//! [`EventCallback`] in addition to `tracing` events, so each pipeline can
//! route its own warnings and metrics without touching global logger state.
//!
//! # Example
//!
//! ```
//! use churn_learning::{Pipeline, PipelineConfig, PipelineEvent};
//!
//! let pipeline = Pipeline::builder()
//!     .config(PipelineConfig::default())
//!     .on_event(|event: &PipelineEvent| {
//!         if let PipelineEvent::Progress(update) = event {
//!             println!("[{}] {:.0}% - {}", update.stage, update.progress * 100.0, update.message);
//!         }
//!     })
//!     .build();
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use churn_processing::ValidationWarning;
use serde::{Deserialize, Serialize};

use crate::cross_validation::CrossValidationScores;
use crate::evaluation::EvaluationReport;

/// The current stage of a training run.
///
/// Training moves through these stages in order. [`Complete`](Self::Complete)
/// and [`Failed`](Self::Failed) are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TrainingStage {
    /// Checking columns, row count and label balance.
    #[default]
    Validating,
    /// Holding out the evaluation rows.
    Splitting,
    /// Fitting imputation, scaling and encoding on the training rows.
    Transforming,
    /// Oversampling minority classes.
    Resampling,
    /// Scoring the classifier with stratified k-fold.
    CrossValidating,
    /// Fitting the final classifier.
    Training,
    /// Scoring the held-out rows.
    Evaluating,
    Complete,
    Failed,
}

impl TrainingStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStage::Validating => "validating",
            TrainingStage::Splitting => "splitting",
            TrainingStage::Transforming => "transforming",
            TrainingStage::Resampling => "resampling",
            TrainingStage::CrossValidating => "cross_validating",
            TrainingStage::Training => "training",
            TrainingStage::Evaluating => "evaluating",
            TrainingStage::Complete => "complete",
            TrainingStage::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainingStage::Complete | TrainingStage::Failed)
    }

    /// Fraction of the run completed when this stage starts.
    pub(crate) fn progress(&self) -> f64 {
        match self {
            TrainingStage::Validating => 0.0,
            TrainingStage::Splitting => 0.05,
            TrainingStage::Transforming => 0.1,
            TrainingStage::Resampling => 0.2,
            TrainingStage::CrossValidating => 0.3,
            TrainingStage::Training => 0.6,
            TrainingStage::Evaluating => 0.9,
            TrainingStage::Complete | TrainingStage::Failed => 1.0,
        }
    }
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no [`TrainingStage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTrainingStageError {
    invalid_value: String,
}

impl ParseTrainingStageError {
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl fmt::Display for ParseTrainingStageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid training stage: '{}'. Valid values are: validating, splitting, \
             transforming, resampling, cross_validating, training, evaluating, complete, failed",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseTrainingStageError {}

impl FromStr for TrainingStage {
    type Err = ParseTrainingStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validating" => Ok(TrainingStage::Validating),
            "splitting" => Ok(TrainingStage::Splitting),
            "transforming" => Ok(TrainingStage::Transforming),
            "resampling" => Ok(TrainingStage::Resampling),
            "cross_validating" => Ok(TrainingStage::CrossValidating),
            "training" => Ok(TrainingStage::Training),
            "evaluating" => Ok(TrainingStage::Evaluating),
            "complete" => Ok(TrainingStage::Complete),
            "failed" => Ok(TrainingStage::Failed),
            _ => Err(ParseTrainingStageError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// A stage transition during training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: TrainingStage,
    /// Overall progress from 0.0 to 1.0, non-decreasing within a run.
    pub progress: f64,
    pub message: String,
}

impl ProgressUpdate {
    pub(crate) fn new(stage: TrainingStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: stage.progress(),
            message: message.into(),
        }
    }
}

/// Everything a pipeline reports to its callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum PipelineEvent {
    Progress(ProgressUpdate),
    /// A non-fatal validation finding, such as severe class imbalance.
    ValidationWarning(ValidationWarning),
    CrossValidation(CrossValidationScores),
    Evaluation(EvaluationReport),
    ArtifactSaved { path: PathBuf },
    ArtifactLoaded { path: PathBuf, version_tag: String },
}

/// Callback invoked with each [`PipelineEvent`].
///
/// The callback should return quickly; training waits for it.
pub type EventCallback = Arc<dyn Fn(&PipelineEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STAGES: [TrainingStage; 9] = [
        TrainingStage::Validating,
        TrainingStage::Splitting,
        TrainingStage::Transforming,
        TrainingStage::Resampling,
        TrainingStage::CrossValidating,
        TrainingStage::Training,
        TrainingStage::Evaluating,
        TrainingStage::Complete,
        TrainingStage::Failed,
    ];

    #[test]
    fn test_training_stage_roundtrip() {
        for stage in STAGES {
            let parsed: TrainingStage = stage.as_str().parse().unwrap();
            assert_eq!(parsed, stage);
        }
    }

    #[test]
    fn test_training_stage_from_str_error() {
        let err = "unknown".parse::<TrainingStage>().unwrap_err();
        assert_eq!(err.invalid_value(), "unknown");
        assert!(err.to_string().contains("Valid values"));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let progress: Vec<f64> = STAGES[..8].iter().map(|s| s.progress()).collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(ProgressUpdate::new(TrainingStage::Complete, "done").progress, 1.0);
    }

    #[test]
    fn test_is_terminal() {
        assert!(TrainingStage::Complete.is_terminal());
        assert!(TrainingStage::Failed.is_terminal());
        assert!(!TrainingStage::Training.is_terminal());
    }

    #[test]
    fn test_event_serialization() {
        let event = PipelineEvent::ArtifactSaved {
            path: PathBuf::from("model.bin"),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"artifact_saved","path":"model.bin"}"#);
    }
}
