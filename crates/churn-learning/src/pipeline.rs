//! Training pipeline implementation.
//!
//! [`Pipeline`] runs the full churn training flow on a raw table:
//!
//! 1. **Validation** - required columns, minimum rows, label balance
//! 2. **Split** - stratified hold-out of the evaluation rows
//! 3. **Transformation** - imputation, scaling and encoding fitted on the
//!    training rows only
//! 4. **Resampling** - SMOTE on the training rows only
//! 5. **Cross-validation** - stratified k-fold on the resampled rows
//! 6. **Training** - the final classifier on the resampled rows
//! 7. **Evaluation** - metrics on the untouched held-out rows
//!
//! # Example
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
//! println!("Accuracy: {:.4}", result.evaluation.accuracy);
//! pipeline.save("churn.bin")?;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use churn_processing::{
    ColumnTransformer, PreprocessingError, SchemaValidator, Smote, encode_labels, split_frame,
    train_test_split,
};
use polars::prelude::DataFrame;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::artifact::ArtifactStore;
use crate::classifier::{Classifier, RandomForestClassifier};
use crate::config::PipelineConfig;
use crate::cross_validation::CrossValidation;
use crate::error::{ChurnError, Result};
use crate::evaluation::{EvaluationReport, Evaluator};
use crate::model::TrainedModel;
use crate::progress::{EventCallback, PipelineEvent, ProgressUpdate, TrainingStage};
use crate::types::TrainingResult;

/// Whether the pipeline holds a trained model.
#[derive(Debug, Clone)]
pub enum PipelineState<C> {
    Unfitted,
    Fitted(TrainedModel<C>),
}

/// The churn training and inference pipeline.
///
/// Generic over the [`Classifier`]; defaults to [`RandomForestClassifier`].
/// Inference, evaluation and saving require a model from
/// [`train()`](Self::train) or [`load()`](Self::load).
pub struct Pipeline<C = RandomForestClassifier> {
    config: PipelineConfig,
    /// Unfitted classifier cloned for every fit.
    template: C,
    state: PipelineState<C>,
    event_callback: Option<EventCallback>,
}

impl<C: std::fmt::Debug> std::fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("template", &self.template)
            .field("fitted", &matches!(self.state, PipelineState::Fitted(_)))
            .field(
                "event_callback",
                &self.event_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Pipeline<RandomForestClassifier> {
    /// Create a builder. Without [`classifier()`](PipelineBuilder::classifier)
    /// the pipeline uses a random forest built from the config.
    #[must_use]
    pub fn builder() -> PipelineBuilder<RandomForestClassifier> {
        PipelineBuilder {
            config: None,
            classifier: ClassifierSource::FromConfig(forest_from_config),
            event_callback: None,
        }
    }
}

fn forest_from_config(config: &PipelineConfig) -> RandomForestClassifier {
    RandomForestClassifier::new(config.forest.clone().with_seed(config.random_seed))
}

/// Report a row-level error against the caller's table rather than the
/// split half it was raised on.
fn at_input_row(err: PreprocessingError, rows: &[usize]) -> PreprocessingError {
    match err {
        PreprocessingError::InvalidBinaryValue { column, row } => {
            PreprocessingError::InvalidBinaryValue {
                column,
                row: rows.get(row).copied().unwrap_or(row),
            }
        }
        other => other,
    }
}

impl<C: Classifier + Clone> Pipeline<C> {
    /// Run the full training flow on a labeled raw table.
    ///
    /// Any previous model is discarded first; the pipeline is fitted again
    /// only if every stage succeeds.
    ///
    /// # Errors
    ///
    /// - [`ChurnError::Processing`]: missing columns, too few rows, bad labels,
    ///   a single class, or an unencodable binary value
    /// - [`ChurnError::TooFewSamplesForFolds`]: a class is smaller than `cv_folds`
    /// - [`ChurnError::Classifier`]: classifier fitting failed
    pub fn train(&mut self, df: &DataFrame) -> Result<TrainingResult> {
        self.state = PipelineState::Unfitted;
        match self.run_training(df) {
            Ok((model, result)) => {
                self.state = PipelineState::Fitted(model);
                self.progress(TrainingStage::Complete, "Training complete");
                Ok(result)
            }
            Err(err) => {
                warn!(error = %err, "Training failed");
                self.progress(TrainingStage::Failed, err.to_string());
                Err(err)
            }
        }
    }

    fn run_training(&self, df: &DataFrame) -> Result<(TrainedModel<C>, TrainingResult)> {
        let start = Instant::now();
        let config = &self.config;
        let seed = config.random_seed;
        let label_column = config.features.label_column();

        self.progress(TrainingStage::Validating, "Validating input table");
        let report =
            SchemaValidator::new(config.features.clone(), config.validation).validate(df)?;
        for warning in &report.warnings {
            self.emit(PipelineEvent::ValidationWarning(warning.clone()));
        }
        let labels = encode_labels(df, label_column)?;

        self.progress(TrainingStage::Splitting, "Holding out evaluation rows");
        let split = train_test_split(&labels, config.test_size, seed)?;
        let (train_df, test_df) = split_frame(df, &split)?;
        let y_train: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
        let y_test: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();

        self.progress(TrainingStage::Transforming, "Fitting column transforms");
        let mut transformer = ColumnTransformer::new(config.features.clone());
        let x_train = transformer
            .fit_transform(&train_df)
            .map_err(|e| at_input_row(e, &split.train))?;
        let x_test = transformer
            .transform(&test_df)
            .map_err(|e| at_input_row(e, &split.test))?;
        let state = transformer.into_state().ok_or(ChurnError::NotFitted)?;

        self.progress(TrainingStage::Resampling, "Oversampling minority class");
        let (x_balanced, y_balanced) =
            Smote::new(config.smote_k_neighbors, seed).resample(&x_train, &y_train)?;
        info!(
            before = x_train.len(),
            after = x_balanced.len(),
            "Resampled training rows"
        );

        self.progress(TrainingStage::CrossValidating, "Cross-validating classifier");
        let cv_scores = CrossValidation::new(config.cv_folds)?
            .with_seed(seed)
            .evaluate(&self.template, &x_balanced, &y_balanced)?;
        self.emit(PipelineEvent::CrossValidation(cv_scores.clone()));

        self.progress(TrainingStage::Training, "Fitting final classifier");
        let mut classifier = self.template.clone();
        classifier.fit(&x_balanced, &y_balanced)?;

        self.progress(TrainingStage::Evaluating, "Evaluating on held-out rows");
        let evaluation = Evaluator::evaluate(&classifier, &x_test, &y_test)?;
        self.emit(PipelineEvent::Evaluation(evaluation.clone()));

        let model = TrainedModel::new(state, classifier, config.model_version.clone());
        let feature_importance = model.feature_importance()?;

        let result = TrainingResult {
            model_version: model.version_tag().to_string(),
            classifier: model.classifier().name().to_string(),
            evaluation,
            cross_validation: cv_scores,
            feature_importance,
            train_rows: x_train.len(),
            resampled_rows: x_balanced.len(),
            test_rows: x_test.len(),
            warnings: report.warnings,
            training_time_seconds: start.elapsed().as_secs_f64(),
        };

        info!(
            version = %result.model_version,
            accuracy = result.evaluation.accuracy,
            roc_auc = ?result.evaluation.roc_auc,
            seconds = result.training_time_seconds,
            "Training finished"
        );
        Ok((model, result))
    }

    /// Churn probability per row of a raw table.
    pub fn predict_proba(&self, df: &DataFrame) -> Result<Vec<f64>> {
        self.fitted()?.predict_proba(df)
    }

    /// Predicted class per row of a raw table.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<usize>> {
        self.fitted()?.predict(df)
    }

    /// Churn probability and predicted class per row of a raw table.
    pub fn score(&self, df: &DataFrame) -> Result<(Vec<f64>, Vec<usize>)> {
        self.fitted()?.score(df)
    }

    /// Score the fitted model on a labeled raw table.
    pub fn evaluate(&self, df: &DataFrame) -> Result<EvaluationReport> {
        let model = self.fitted()?;
        let label_column = model.transform_state().spec().label_column();
        let labels = encode_labels(df, label_column)?;
        let features = model.transform_state().transform(df)?;
        let report = Evaluator::evaluate(model.classifier(), &features, &labels)?;
        self.emit(PipelineEvent::Evaluation(report.clone()));
        Ok(report)
    }

    /// Encoded feature names of the fitted model.
    pub fn feature_names(&self) -> Result<&[String]> {
        Ok(self.fitted()?.feature_names())
    }

    fn fitted(&self) -> Result<&TrainedModel<C>> {
        match &self.state {
            PipelineState::Fitted(model) => Ok(model),
            PipelineState::Unfitted => Err(ChurnError::NotFitted),
        }
    }
}

impl<C: Classifier + Clone + Serialize + DeserializeOwned> Pipeline<C> {
    /// Persist the fitted model.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        ArtifactStore::save(self.fitted()?, path)?;
        self.emit(PipelineEvent::ArtifactSaved {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Replace the in-memory state with a model read from `path`.
    ///
    /// On failure the current state is left untouched.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let model: TrainedModel<C> = ArtifactStore::load(path)?;
        let version_tag = model.version_tag().to_string();
        self.state = PipelineState::Fitted(model);
        self.emit(PipelineEvent::ArtifactLoaded {
            path: path.to_path_buf(),
            version_tag,
        });
        Ok(())
    }
}

impl<C> Pipeline<C> {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> &PipelineState<C> {
        &self.state
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, PipelineState::Fitted(_))
    }

    /// The trained model, if any.
    pub fn model(&self) -> Option<&TrainedModel<C>> {
        match &self.state {
            PipelineState::Fitted(model) => Some(model),
            PipelineState::Unfitted => None,
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(callback) = &self.event_callback {
            callback(&event);
        }
    }

    fn progress(&self, stage: TrainingStage, message: impl Into<String>) {
        let update = ProgressUpdate::new(stage, message);
        info!(stage = %update.stage, "{}", update.message);
        self.emit(PipelineEvent::Progress(update));
    }
}

enum ClassifierSource<C> {
    Given(C),
    FromConfig(fn(&PipelineConfig) -> C),
}

/// Builder for [`Pipeline`].
///
/// [`config()`](Self::config) is required.
pub struct PipelineBuilder<C> {
    config: Option<PipelineConfig>,
    classifier: ClassifierSource<C>,
    event_callback: Option<EventCallback>,
}

impl<C: std::fmt::Debug> std::fmt::Debug for PipelineBuilder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let classifier: &dyn std::fmt::Debug = match &self.classifier {
            ClassifierSource::Given(c) => c,
            ClassifierSource::FromConfig(_) => &"<from config>",
        };
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("classifier", classifier)
            .field(
                "event_callback",
                &self.event_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl<C: Classifier + Clone> PipelineBuilder<C> {
    /// Set the pipeline configuration (required).
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `classifier` instead of the configured random forest.
    ///
    /// The classifier is cloned for every fit and is never fitted itself.
    #[must_use]
    pub fn classifier<D: Classifier + Clone>(self, classifier: D) -> PipelineBuilder<D> {
        PipelineBuilder {
            config: self.config,
            classifier: ClassifierSource::Given(classifier),
            event_callback: self.event_callback,
        }
    }

    /// Set the event callback (optional).
    #[must_use]
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(Arc::new(callback));
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::InvalidConfig`] if no configuration was provided.
    pub fn build(self) -> Result<Pipeline<C>> {
        let config = self
            .config
            .ok_or_else(|| ChurnError::InvalidConfig("Pipeline config is required".to_string()))?;

        let template = match self.classifier {
            ClassifierSource::Given(classifier) => classifier,
            ClassifierSource::FromConfig(make) => make(&config),
        };

        Ok(Pipeline {
            config,
            template,
            state: PipelineState::Unfitted,
            event_callback: self.event_callback,
        })
    }
}
