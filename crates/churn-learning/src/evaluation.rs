//! Held-out evaluation of a fitted classifier.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::error::{ChurnError, Result};

/// Display names of the two classes.
pub const CLASS_NAMES: [&str; 2] = ["No churn", "Churn"];

/// 2×2 confusion matrix indexed `[actual][predicted]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Count actual/predicted pairs. Labels above 1 are not expected.
    pub fn from_labels(actual: &[usize], predicted: &[usize]) -> Self {
        let mut matrix = [[0usize; 2]; 2];
        for (&a, &p) in actual.iter().zip(predicted) {
            matrix[a.min(1)][p.min(1)] += 1;
        }
        Self { matrix }
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.matrix[0][0] + self.matrix[1][1]) as f64 / total as f64
    }

    /// Precision, recall, F1 and support of one class.
    ///
    /// A zero denominator yields 0.0 for that metric.
    pub fn class_metrics(&self, class: usize) -> ClassMetrics {
        let tp = self.matrix[class][class];
        let predicted: usize = (0..2).map(|a| self.matrix[a][class]).sum();
        let support: usize = self.matrix[class].iter().sum();

        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        ClassMetrics {
            class,
            precision,
            recall,
            f1,
            support,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Per-class classification metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Precision, recall and F1 averaged over classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Metrics of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub confusion_matrix: ConfusionMatrix,
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    /// `None` when the labels hold a single class.
    pub roc_auc: Option<f64>,
    pub n_samples: usize,
}

impl EvaluationReport {
    /// Build a report from labels, hard predictions and positive-class scores.
    ///
    /// A single-class label set still yields a report; only ROC-AUC is left
    /// undefined.
    pub fn from_predictions(actual: &[usize], predicted: &[usize], scores: &[f64]) -> Result<Self> {
        let n_pos = actual.iter().filter(|&&l| l == 1).count();
        let roc_auc = if n_pos > 0 && n_pos < actual.len() {
            Some(roc_auc(actual, scores)?)
        } else {
            warn!(
                n_samples = actual.len(),
                "ROC-AUC undefined: evaluation labels hold a single class"
            );
            None
        };
        let confusion_matrix = ConfusionMatrix::from_labels(actual, predicted);
        let per_class: Vec<ClassMetrics> =
            (0..2).map(|c| confusion_matrix.class_metrics(c)).collect();

        let n = per_class.len() as f64;
        let macro_avg = AveragedMetrics {
            precision: per_class.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: per_class.iter().map(|m| m.recall).sum::<f64>() / n,
            f1: per_class.iter().map(|m| m.f1).sum::<f64>() / n,
        };

        let total = actual.len() as f64;
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            per_class
                .iter()
                .map(|m| f(m) * m.support as f64)
                .sum::<f64>()
                / total
        };
        let weighted_avg = AveragedMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
        };

        Ok(Self {
            accuracy: confusion_matrix.accuracy(),
            confusion_matrix,
            per_class,
            macro_avg,
            weighted_avg,
            roc_auc,
            n_samples: actual.len(),
        })
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                CLASS_NAMES[m.class], m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.n_samples
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, avg.precision, avg.recall, avg.f1, self.n_samples
            )?;
        }
        writeln!(f)?;
        match self.roc_auc {
            Some(auc) => write!(f, "ROC-AUC Score: {auc:.4}"),
            None => write!(f, "ROC-AUC Score: undefined (single class)"),
        }
    }
}

/// Area under the ROC curve via the Mann-Whitney rank statistic.
///
/// Tied scores receive the average of their ranks. Undefined unless both
/// classes are present.
pub fn roc_auc(labels: &[usize], scores: &[f64]) -> Result<f64> {
    if labels.len() != scores.len() {
        return Err(ChurnError::UndefinedMetric(format!(
            "ROC-AUC needs one score per label, got {} scores for {} labels",
            scores.len(),
            labels.len()
        )));
    }
    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(ChurnError::UndefinedMetric(
            "ROC-AUC requires both classes in the labels".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; ties share the mean of positions i..=j.
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(l, _)| **l == 1)
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Scores a fitted classifier on held-out rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Evaluate `classifier` on `features` / `labels` without mutating it.
    pub fn evaluate<C: Classifier + ?Sized>(
        classifier: &C,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<EvaluationReport> {
        if features.len() != labels.len() {
            return Err(churn_processing::PreprocessingError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            }
            .into());
        }
        let predicted = classifier.predict(features)?;
        let scores = classifier.predict_proba(features)?;
        let report = EvaluationReport::from_predictions(labels, &predicted, &scores)?;

        info!(
            classifier = classifier.name(),
            n_samples = report.n_samples,
            accuracy = report.accuracy,
            roc_auc = ?report.roc_auc,
            "Evaluated classifier"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifierError;
    use pretty_assertions::assert_eq;

    /// Scores each row by its first feature.
    struct Threshold;

    impl Classifier for Threshold {
        fn fit(&mut self, _: &[Vec<f64>], _: &[usize]) -> std::result::Result<(), ClassifierError> {
            Ok(())
        }
        fn predict(&self, x: &[Vec<f64>]) -> std::result::Result<Vec<usize>, ClassifierError> {
            Ok(x.iter().map(|r| usize::from(r[0] > 0.5)).collect())
        }
        fn predict_proba(&self, x: &[Vec<f64>]) -> std::result::Result<Vec<f64>, ClassifierError> {
            Ok(x.iter().map(|r| r[0]).collect())
        }
        fn feature_importances(&self) -> std::result::Result<Vec<f64>, ClassifierError> {
            Ok(vec![1.0])
        }
        fn n_features(&self) -> Option<usize> {
            Some(1)
        }
        fn name(&self) -> &'static str {
            "Threshold"
        }
    }

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        assert_eq!(roc_auc(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0);
        assert_eq!(roc_auc(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]).unwrap(), 0.0);
    }

    #[test]
    fn test_roc_auc_ties_are_averaged() {
        assert_eq!(roc_auc(&[0, 1], &[0.5, 0.5]).unwrap(), 0.5);
        // One positive above both negatives, one tied with a negative.
        assert_eq!(roc_auc(&[0, 0, 1, 1], &[0.2, 0.6, 0.6, 0.9]).unwrap(), 0.875);
    }

    #[test]
    fn test_roc_auc_single_class_is_undefined() {
        assert!(matches!(
            roc_auc(&[1, 1, 1], &[0.2, 0.3, 0.4]),
            Err(ChurnError::UndefinedMetric(_))
        ));
    }

    #[test]
    fn test_confusion_matrix_and_metrics() {
        let actual = [0, 0, 0, 1, 1];
        let predicted = [0, 0, 1, 1, 0];
        let cm = ConfusionMatrix::from_labels(&actual, &predicted);
        assert_eq!(cm.matrix, [[2, 1], [1, 1]]);
        assert_eq!(cm.accuracy(), 0.6);

        let churn = cm.class_metrics(1);
        assert_eq!(churn.precision, 0.5);
        assert_eq!(churn.recall, 0.5);
        assert_eq!(churn.support, 2);
    }

    #[test]
    fn test_zero_denominator_metrics() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 0]);
        let churn = cm.class_metrics(1);
        assert_eq!(churn.precision, 0.0);
        assert_eq!(churn.f1, 0.0);
    }

    #[test]
    fn test_evaluator_report() {
        let features = vec![vec![0.1], vec![0.4], vec![0.7], vec![0.9]];
        let labels = vec![0, 0, 1, 1];
        let report = Evaluator::evaluate(&Threshold, &features, &labels).unwrap();

        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.roc_auc, Some(1.0));
        assert_eq!(report.per_class.len(), 2);
        assert_eq!(report.macro_avg.f1, 1.0);
        assert_eq!(report.weighted_avg.recall, 1.0);

        let text = report.to_string();
        assert!(text.contains("No churn"));
        assert!(text.contains("Churn"));
        assert!(text.contains("ROC-AUC Score: 1.0000"));
    }

    #[test]
    fn test_evaluator_single_class_labels() {
        let features = vec![vec![0.1], vec![0.4]];
        let report = Evaluator::evaluate(&Threshold, &features, &[0, 0]).unwrap();

        assert_eq!(report.roc_auc, None);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.per_class[0].support, 2);
        assert!(report.to_string().ends_with("ROC-AUC Score: undefined (single class)"));
    }
}
