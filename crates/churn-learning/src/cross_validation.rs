//! Stratified k-fold cross-validation on the resampled training set.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::classifier::Classifier;
use crate::error::{ChurnError, ClassifierError, Result};

/// Default number of folds.
pub const DEFAULT_CV_FOLDS: usize = 5;

/// Stratified k-fold runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

/// Accuracy of each fold plus summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationScores {
    pub fold_scores: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation of the fold scores.
    pub std: f64,
}

impl CrossValidation {
    /// # Errors
    ///
    /// [`ChurnError::InvalidConfig`] when `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self> {
        if n_folds < 2 {
            return Err(ChurnError::InvalidConfig(format!(
                "cv_folds must be at least 2, got {n_folds}"
            )));
        }
        Ok(Self { n_folds, seed: 42 })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Fit a fresh clone of `template` on each training fold and score
    /// accuracy on the held-out fold. `template` itself is never fitted.
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_samples = features.len()))]
    pub fn evaluate<C: Classifier + Clone>(
        &self,
        template: &C,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<CrossValidationScores> {
        if features.is_empty() {
            return Err(ClassifierError::EmptyDataset.into());
        }
        if features.len() != labels.len() {
            return Err(ClassifierError::LabelCountMismatch {
                features: features.len(),
                labels: labels.len(),
            }
            .into());
        }

        let assignments = self.stratified_folds(labels)?;
        let mut fold_scores = Vec::with_capacity(self.n_folds);

        for fold in 0..self.n_folds {
            let mut train_x = Vec::new();
            let mut train_y = Vec::new();
            let mut test_x = Vec::new();
            let mut test_y = Vec::new();
            for (i, &assigned) in assignments.iter().enumerate() {
                if assigned == fold {
                    test_x.push(features[i].clone());
                    test_y.push(labels[i]);
                } else {
                    train_x.push(features[i].clone());
                    train_y.push(labels[i]);
                }
            }

            let mut model = template.clone();
            model.fit(&train_x, &train_y)?;
            let predicted = model.predict(&test_x)?;
            let correct = predicted
                .iter()
                .zip(&test_y)
                .filter(|(p, a)| p == a)
                .count();
            fold_scores.push(correct as f64 / test_y.len() as f64);
        }

        let k = fold_scores.len() as f64;
        let mean = fold_scores.iter().sum::<f64>() / k;
        let std = (fold_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / k).sqrt();

        info!(
            "Cross-validation accuracy: {:.4} (+/- {:.4})",
            mean,
            2.0 * std
        );

        Ok(CrossValidationScores {
            fold_scores,
            mean,
            std,
        })
    }

    /// Fold index per sample: each class is shuffled, then dealt round-robin.
    fn stratified_folds(&self, labels: &[usize]) -> Result<Vec<usize>> {
        let n_classes = labels.iter().max().map_or(0, |m| m + 1);
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (i, &label) in labels.iter().enumerate() {
            by_class[label].push(i);
        }

        for (class, members) in by_class.iter().enumerate() {
            if !members.is_empty() && members.len() < self.n_folds {
                return Err(ChurnError::TooFewSamplesForFolds {
                    class,
                    count: members.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut assignments = vec![0; labels.len()];
        for members in &mut by_class {
            members.shuffle(&mut rng);
            for (j, &idx) in members.iter().enumerate() {
                assignments[idx] = j % self.n_folds;
            }
        }
        Ok(assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ForestParams, RandomForestClassifier};
    use pretty_assertions::assert_eq;

    fn data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![if i % 3 == 0 { 100.0 + i as f64 } else { i as f64 * 0.01 }])
            .collect();
        let labels: Vec<usize> = (0..60).map(|i| usize::from(i % 3 == 0)).collect();
        (features, labels)
    }

    #[test]
    fn test_folds_are_stratified() {
        let (_, labels) = data();
        let cv = CrossValidation::new(5).unwrap();
        let folds = cv.stratified_folds(&labels).unwrap();
        for fold in 0..5 {
            let positives = (0..60)
                .filter(|&i| folds[i] == fold && labels[i] == 1)
                .count();
            let total = folds.iter().filter(|&&f| f == fold).count();
            assert_eq!(positives, 4);
            assert_eq!(total, 12);
        }
    }

    #[test]
    fn test_too_few_samples_for_folds() {
        let labels = vec![0, 0, 0, 0, 0, 1, 1];
        let cv = CrossValidation::new(3).unwrap();
        assert!(matches!(
            cv.stratified_folds(&labels),
            Err(ChurnError::TooFewSamplesForFolds {
                class: 1,
                count: 2,
                n_folds: 3
            })
        ));
    }

    #[test]
    fn test_invalid_fold_count() {
        assert!(CrossValidation::new(1).is_err());
    }

    #[test]
    fn test_separable_data_scores_perfectly() {
        let (features, labels) = data();
        let template =
            RandomForestClassifier::new(ForestParams::default().with_n_estimators(10));
        let scores = CrossValidation::new(5)
            .unwrap()
            .evaluate(&template, &features, &labels)
            .unwrap();

        assert_eq!(scores.fold_scores.len(), 5);
        assert_eq!(scores.mean, 1.0);
        assert_eq!(scores.std, 0.0);
        assert!(!template.is_fitted());
    }
}
