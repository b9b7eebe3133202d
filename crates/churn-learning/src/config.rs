//! Configuration for the churn training pipeline.
//!
//! [`PipelineConfig`] gathers the column roles, validation thresholds,
//! forest hyperparameters and the split, resampling and cross-validation
//! settings. Build one with [`PipelineConfig::builder()`] or use
//! [`PipelineConfig::default()`].
//!
//! # Validation
//!
//! [`PipelineConfigBuilder::build()`] rejects:
//! - `test_size` outside `(0.0, 1.0)`
//! - `cv_folds` below 2
//! - `smote_k_neighbors` of 0
//! - an empty `model_version`
//! - out-of-range forest parameters or validation thresholds
//!
//! # Example
//!
//! ```
//! use churn_learning::{ForestParams, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .forest(ForestParams::default().with_n_estimators(200))
//!     .cv_folds(10)
//!     .random_seed(7)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.forest.n_estimators, 200);
//! ```

use churn_processing::{FeatureSpec, ValidationRules};
use serde::{Deserialize, Serialize};

use crate::classifier::ForestParams;
use crate::cross_validation::DEFAULT_CV_FOLDS;
use crate::error::ChurnError;

/// Timestamp format of the default model version tag.
pub const MODEL_VERSION_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Configuration for the churn training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Column roles: numeric, categorical, binary, label and identifier.
    pub features: FeatureSpec,

    /// Minimum rows and the positive-rate band that triggers a warning.
    pub validation: ValidationRules,

    /// Hyperparameters of the built-in random forest.
    ///
    /// Its `seed` is overridden by `random_seed` when the pipeline fits
    /// the default classifier.
    pub forest: ForestParams,

    /// Neighbors considered by SMOTE (default: 5).
    pub smote_k_neighbors: usize,

    /// Fraction of rows held out for evaluation (default: 0.2).
    pub test_size: f64,

    /// Stratified cross-validation folds (default: 5).
    pub cv_folds: usize,

    /// Seed for the split, oversampling, folds and forest (default: 42).
    pub random_seed: u64,

    /// Version tag stamped on trained models.
    ///
    /// Defaults to the construction time formatted as `%Y%m%d_%H%M%S`.
    pub model_version: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            features: FeatureSpec::telco(),
            validation: ValidationRules::default(),
            forest: ForestParams::default(),
            smote_k_neighbors: 5,
            test_size: churn_processing::split::DEFAULT_TEST_SIZE,
            cv_folds: DEFAULT_CV_FOLDS,
            random_seed: 42,
            model_version: chrono::Local::now()
                .format(MODEL_VERSION_FORMAT)
                .to_string(),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn features(mut self, features: FeatureSpec) -> Self {
        self.config.features = features;
        self
    }

    #[must_use]
    pub fn validation(mut self, rules: ValidationRules) -> Self {
        self.config.validation = rules;
        self
    }

    #[must_use]
    pub fn forest(mut self, params: ForestParams) -> Self {
        self.config.forest = params;
        self
    }

    #[must_use]
    pub fn smote_k_neighbors(mut self, k: usize) -> Self {
        self.config.smote_k_neighbors = k;
        self
    }

    #[must_use]
    pub fn test_size(mut self, size: f64) -> Self {
        self.config.test_size = size;
        self
    }

    #[must_use]
    pub fn cv_folds(mut self, folds: usize) -> Self {
        self.config.cv_folds = folds;
        self
    }

    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    #[must_use]
    pub fn model_version(mut self, version: impl Into<String>) -> Self {
        self.config.model_version = version.into();
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::InvalidConfig`] for any out-of-range setting.
    pub fn build(self) -> Result<PipelineConfig, ChurnError> {
        let config = self.config;

        if !(config.test_size > 0.0 && config.test_size < 1.0) {
            return Err(ChurnError::InvalidConfig(
                "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        if config.cv_folds < 2 {
            return Err(ChurnError::InvalidConfig(
                "cv_folds must be at least 2".to_string(),
            ));
        }

        if config.smote_k_neighbors == 0 {
            return Err(ChurnError::InvalidConfig(
                "smote_k_neighbors must be at least 1".to_string(),
            ));
        }

        if config.model_version.trim().is_empty() {
            return Err(ChurnError::InvalidConfig(
                "model_version must not be empty".to_string(),
            ));
        }

        config
            .validation
            .validate()
            .map_err(|e| ChurnError::InvalidConfig(e.to_string()))?;
        config
            .features
            .validate()
            .map_err(|e| ChurnError::InvalidConfig(e.to_string()))?;
        config
            .forest
            .validate()
            .map_err(|e| ChurnError::InvalidConfig(e.to_string()))?;

        Ok(config)
    }
}
