//! Classifier capability and the built-in random forest.
//!
//! The pipeline is generic over [`Classifier`]; [`RandomForestClassifier`]
//! is the default implementation.

mod forest;
mod node;
mod split;
mod tree;

pub use forest::{ClassWeight, ForestParams, MaxFeatures, RandomForestClassifier};
pub use node::Node;
pub use split::SplitCriterion;
pub use tree::DecisionTree;

use crate::error::ClassifierError;

/// A binary classifier over dense feature rows.
///
/// Class 0 is the negative class, class 1 the positive class.
pub trait Classifier: Send + Sync {
    /// Fit on row-major `features` with one label per row.
    fn fit(&mut self, features: &[Vec<f64>], labels: &[usize]) -> Result<(), ClassifierError>;

    /// Predicted class per row.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ClassifierError>;

    /// Probability of the positive class per row.
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ClassifierError>;

    /// Importance per input column, summing to 1.
    fn feature_importances(&self) -> Result<Vec<f64>, ClassifierError>;

    /// Width of the fitted input, `None` before `fit`.
    fn n_features(&self) -> Option<usize>;

    /// Short human-readable name.
    fn name(&self) -> &'static str;
}

/// Check a training set and return its width.
pub(crate) fn validate_training_input(
    features: &[Vec<f64>],
    labels: &[usize],
) -> Result<usize, ClassifierError> {
    if features.is_empty() {
        return Err(ClassifierError::EmptyDataset);
    }
    if features.len() != labels.len() {
        return Err(ClassifierError::LabelCountMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(ClassifierError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ClassifierError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_training_input() {
        assert_eq!(
            validate_training_input(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[0, 1]).unwrap(),
            2
        );
        assert!(matches!(
            validate_training_input(&[], &[]),
            Err(ClassifierError::EmptyDataset)
        ));
        assert!(matches!(
            validate_training_input(&[vec![]], &[0]),
            Err(ClassifierError::ZeroFeatures)
        ));
        assert!(matches!(
            validate_training_input(&[vec![1.0], vec![1.0, 2.0]], &[0, 1]),
            Err(ClassifierError::FeatureCountMismatch {
                expected: 1,
                got: 2,
                sample_index: 1
            })
        ));
        assert!(matches!(
            validate_training_input(&[vec![1.0, f64::NAN]], &[0]),
            Err(ClassifierError::NonFiniteValue {
                sample_index: 0,
                feature_index: 1
            })
        ));
        assert!(matches!(
            validate_training_input(&[vec![1.0]], &[0, 1]),
            Err(ClassifierError::LabelCountMismatch { .. })
        ));
    }
}
