//! churn-learning: churn model training, evaluation and persistence.
//!
//! This crate turns a raw customer table into a trained churn classifier.
//! Preprocessing comes from [`churn_processing`]; this crate adds the
//! classifier, evaluation, cross-validation, binary model artifacts and the
//! [`Pipeline`] that ties them together.
//!
//! # Features
//!
//! - **Random forest**: class-weighted CART trees grown in parallel with
//!   deterministic per-tree seeds ([`RandomForestClassifier`])
//! - **Pluggable classifiers**: the pipeline is generic over [`Classifier`]
//! - **Held-out evaluation**: per-class precision/recall/F1, confusion
//!   matrix and ROC-AUC ([`Evaluator`])
//! - **Cross-validation**: stratified k-fold on the resampled training rows
//! - **Artifacts**: versioned binary files with atomic replace ([`ArtifactStore`])
//! - **Events**: per-pipeline callback for progress, warnings and metrics
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use churn_learning::{Pipeline, PipelineConfig};
//!
//! let mut pipeline = Pipeline::builder()
//!     .config(PipelineConfig::default())
//!     .on_event(|event| println!("{event:?}"))
//!     .build()?;
//!
//! let result = pipeline.train(&dataframe)?;
//! println!("{}", result.evaluation);
//!
//! pipeline.save("churn.bin")?;
//! let probabilities = pipeline.predict_proba(&new_customers)?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! DataFrame ─► SchemaValidator ─► train/test split ─► ColumnTransformer (fit on train)
//!                                        │                      │
//!                                        │                      ▼
//!                                        │               Smote (train only)
//!                                        │                      │
//!                                        │                      ▼
//!                                        │        CrossValidation + Classifier::fit
//!                                        ▼                      │
//!                              held-out rows ──► Evaluator ◄────┘
//!                                                    │
//!                                                    ▼
//!                                  TrainedModel ─► ArtifactStore
//! ```
//!
//! # Logging
//!
//! The library emits `tracing` events and never installs a subscriber; the
//! `churn` binary does that. Per-pipeline reporting goes through
//! [`PipelineBuilder::on_event`].

pub mod artifact;
pub mod classifier;
pub mod config;
pub mod cross_validation;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod types;

// Re-exports for convenient access
pub use artifact::{ArtifactStore, FORMAT_VERSION, MAGIC};
pub use classifier::{
    ClassWeight, Classifier, DecisionTree, ForestParams, MaxFeatures, RandomForestClassifier,
    SplitCriterion,
};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use cross_validation::{CrossValidation, CrossValidationScores};
pub use error::{ChurnError, ClassifierError, Result};
pub use evaluation::{ClassMetrics, ConfusionMatrix, EvaluationReport, Evaluator, roc_auc};
pub use model::TrainedModel;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineState};
pub use progress::{
    EventCallback, ParseTrainingStageError, PipelineEvent, ProgressUpdate, TrainingStage,
};
pub use types::{FeatureImportance, TrainingResult};

// Re-export the preprocessing crate so callers need a single dependency.
pub use churn_processing;

static_assertions::assert_impl_all!(Pipeline: Send, Sync);
static_assertions::assert_impl_all!(RandomForestClassifier: Send, Sync, Clone);
static_assertions::assert_impl_all!(TrainedModel<RandomForestClassifier>: Send, Sync);
static_assertions::assert_impl_all!(ChurnError: Send, Sync);
