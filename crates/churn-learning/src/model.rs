//! A trained model: the frozen transform state plus a fitted classifier.
//!
//! [`TrainedModel`] is what [`Pipeline::train()`](crate::Pipeline::train)
//! produces and what the [`ArtifactStore`](crate::ArtifactStore) persists.
//! Everything needed for inference on raw rows travels together, so a
//! reloaded model scores a table exactly as the original did.
//!
//! # Example
//!
//! ```rust,ignore
//! use churn_learning::{RandomForestClassifier, TrainedModel};
//!
//! let model: TrainedModel<RandomForestClassifier> = TrainedModel::load("churn.bin")?;
//! let probabilities = model.predict_proba(&customers)?;
//! println!("model {} ({} features)", model.version_tag(), model.feature_names().len());
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use churn_processing::FittedTransformState;
use polars::prelude::DataFrame;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactStore;
use crate::classifier::Classifier;
use crate::error::Result;
use crate::types::{FeatureImportance, rank_importances};

/// A fitted transform state and classifier, ready for inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel<C> {
    transform_state: FittedTransformState,
    classifier: C,
    feature_names: Vec<String>,
    version_tag: String,
    created_at: DateTime<Utc>,
}

impl<C: Classifier> TrainedModel<C> {
    pub(crate) fn new(
        transform_state: FittedTransformState,
        classifier: C,
        version_tag: impl Into<String>,
    ) -> Self {
        let feature_names = transform_state.feature_names();
        Self {
            transform_state,
            classifier,
            feature_names,
            version_tag: version_tag.into(),
            created_at: Utc::now(),
        }
    }

    /// Churn probability per row of a raw table.
    pub fn predict_proba(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let features = self.transform_state.transform(df)?;
        Ok(self.classifier.predict_proba(&features)?)
    }

    /// Predicted class per row of a raw table.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<usize>> {
        let features = self.transform_state.transform(df)?;
        Ok(self.classifier.predict(&features)?)
    }

    /// Probabilities and predicted classes from a single transform pass.
    pub fn score(&self, df: &DataFrame) -> Result<(Vec<f64>, Vec<usize>)> {
        let features = self.transform_state.transform(df)?;
        let probabilities = self.classifier.predict_proba(&features)?;
        let classes = self.classifier.predict(&features)?;
        Ok((probabilities, classes))
    }

    /// Feature importances paired with encoded column names, highest first.
    pub fn feature_importance(&self) -> Result<Vec<FeatureImportance>> {
        let importances = self.classifier.feature_importances()?;
        Ok(rank_importances(&self.feature_names, &importances))
    }

    /// Describe the first internal inconsistency, if any.
    pub(crate) fn inconsistency(&self) -> Option<String> {
        if self.version_tag.trim().is_empty() {
            return Some("empty version tag".to_string());
        }
        let width = self.transform_state.n_features();
        if self.feature_names.len() != width {
            return Some(format!(
                "{} feature names for a transform of width {width}",
                self.feature_names.len()
            ));
        }
        match self.classifier.n_features() {
            Some(n) if n == width => None,
            Some(n) => Some(format!(
                "classifier expects {n} features, transform produces {width}"
            )),
            None => Some("classifier is not fitted".to_string()),
        }
    }

    pub fn transform_state(&self) -> &FittedTransformState {
        &self.transform_state
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Encoded feature names, in column order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn version_tag(&self) -> &str {
        &self.version_tag
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl<C: Classifier + Serialize + DeserializeOwned> TrainedModel<C> {
    /// Write the model to `path`. See [`ArtifactStore::save`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        ArtifactStore::save(self, path.as_ref())
    }

    /// Read a model from `path`. See [`ArtifactStore::load`].
    #[must_use = "returns the loaded model; use it or handle the error"]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        ArtifactStore::load(path.as_ref())
    }

    /// Encode the model as artifact bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        ArtifactStore::to_bytes(self)
    }

    /// Decode a model from artifact bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ArtifactStore::from_bytes(bytes, Path::new("<memory>"))
    }
}
