//! Result types returned by the training pipeline.

use churn_processing::ValidationWarning;
use serde::{Deserialize, Serialize};

use crate::cross_validation::CrossValidationScores;
use crate::evaluation::EvaluationReport;

/// Importance of one encoded feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Pair names with importances, highest first.
///
/// Ties keep the encoded column order.
pub fn rank_importances(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

/// Result of [`Pipeline::train()`](crate::Pipeline::train).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrainingResult {
    /// Version tag stamped on the trained model.
    pub model_version: String,

    /// Name of the fitted classifier.
    pub classifier: String,

    /// Metrics on the held-out test rows.
    pub evaluation: EvaluationReport,

    /// Stratified k-fold accuracy on the resampled training rows.
    pub cross_validation: CrossValidationScores,

    /// Feature importances sorted in descending order, summing to 1.
    pub feature_importance: Vec<FeatureImportance>,

    /// Training rows before oversampling.
    pub train_rows: usize,

    /// Training rows after oversampling.
    pub resampled_rows: usize,

    /// Held-out rows used for evaluation.
    pub test_rows: usize,

    /// Non-fatal validation findings.
    pub warnings: Vec<ValidationWarning>,

    /// Wall-clock training time in seconds.
    pub training_time_seconds: f64,
}

impl TrainingResult {
    /// The `n` most important features.
    pub fn top_features(&self, n: usize) -> &[FeatureImportance] {
        &self.feature_importance[..n.min(self.feature_importance.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rank_importances() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranked = rank_importances(&names, &[0.2, 0.5, 0.3]);
        let order: Vec<&str> = ranked.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_rank_importances_ties_are_stable() {
        let names = vec!["x".to_string(), "y".to_string()];
        let ranked = rank_importances(&names, &[0.5, 0.5]);
        assert_eq!(ranked[0].feature, "x");
    }
}
