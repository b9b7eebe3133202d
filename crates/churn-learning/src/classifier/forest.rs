//! Random forest over class-weighted CART trees.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::split::SplitCriterion;
use super::tree::{DecisionTree, TreeParams};
use super::{Classifier, validate_training_input};
use crate::error::ClassifierError;

/// Number of features considered at each split.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// `ceil(sqrt(n_features))`.
    #[default]
    Sqrt,
    /// `ceil(log2(n_features))`, at least 1.
    Log2,
    /// A fraction in (0, 1] of the features, rounded up.
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// Every feature.
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count for `n_features` columns.
    pub fn resolve(self, n_features: usize) -> Result<usize, ClassifierError> {
        let resolved = match self {
            Self::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            Self::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
            Self::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            Self::Fixed(n) => n,
            Self::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(ClassifierError::InvalidParameter {
                name: "max_features",
                reason: format!("resolves to {resolved} for {n_features} features"),
            });
        }
        Ok(resolved)
    }
}

/// Per-class weighting applied to impurity and leaf distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassWeight {
    /// `n_samples / (n_classes * count_c)`, from the training labels.
    #[default]
    Balanced,
    /// Every class weighs 1.
    Uniform,
}

impl ClassWeight {
    /// Weight per class for `labels` spanning `n_classes` classes.
    pub fn weights(self, labels: &[usize], n_classes: usize) -> Vec<f64> {
        match self {
            Self::Uniform => vec![1.0; n_classes],
            Self::Balanced => {
                let mut counts = vec![0usize; n_classes];
                for &label in labels {
                    counts[label] += 1;
                }
                let n = labels.len() as f64;
                counts
                    .iter()
                    .map(|&c| {
                        if c == 0 {
                            1.0
                        } else {
                            n / (n_classes as f64 * c as f64)
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Hyperparameters of [`RandomForestClassifier`].
///
/// # Defaults
///
/// | Parameter           | Default      |
/// |---------------------|--------------|
/// | `n_estimators`      | 100          |
/// | `max_depth`         | `Some(10)`   |
/// | `min_samples_split` | 5            |
/// | `min_samples_leaf`  | 2            |
/// | `max_features`      | `Sqrt`       |
/// | `criterion`         | `Gini`       |
/// | `class_weight`      | `Balanced`   |
/// | `seed`              | 42           |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub criterion: SplitCriterion,
    pub class_weight: ClassWeight,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            criterion: SplitCriterion::Gini,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check ranges that do not depend on the data.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let invalid = |name: &'static str, reason: &str| {
            Err(ClassifierError::InvalidParameter {
                name,
                reason: reason.to_string(),
            })
        };
        if self.n_estimators == 0 {
            return invalid("n_estimators", "must be at least 1");
        }
        if self.max_depth == Some(0) {
            return invalid("max_depth", "must be at least 1 when set");
        }
        if self.min_samples_split < 2 {
            return invalid("min_samples_split", "must be at least 2");
        }
        if self.min_samples_leaf == 0 {
            return invalid("min_samples_leaf", "must be at least 1");
        }
        if let MaxFeatures::Fraction(f) = self.max_features
            && !(f > 0.0 && f <= 1.0)
        {
            return invalid("max_features", "fraction must be in (0, 1]");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
    importances: Vec<f64>,
}

/// Bagged ensemble of CART trees.
///
/// Trees are grown in parallel. Each tree gets its bootstrap sample and
/// split RNG from a seed drawn up front from the master seed, so the
/// fitted forest does not depend on the thread count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: ForestParams,
    model: Option<FittedForest>,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            model: None,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Fitted trees; empty before `fit`.
    pub fn trees(&self) -> &[DecisionTree] {
        self.model
            .as_ref()
            .map(|m| m.trees.as_slice())
            .unwrap_or(&[])
    }

    fn fitted(&self) -> Result<&FittedForest, ClassifierError> {
        self.model.as_ref().ok_or(ClassifierError::NotFitted)
    }

    /// Mean leaf distribution per row.
    fn mean_distributions(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ClassifierError> {
        let model = self.fitted()?;
        if let Some(row) = features.iter().find(|r| r.len() != model.n_features) {
            return Err(ClassifierError::PredictionFeatureMismatch {
                expected: model.n_features,
                got: row.len(),
            });
        }

        let n_trees = model.trees.len() as f64;
        Ok(features
            .par_iter()
            .map(|row| {
                let mut acc = vec![0.0; model.n_classes];
                for tree in &model.trees {
                    for (a, p) in acc.iter_mut().zip(tree.distribution(row)) {
                        *a += p;
                    }
                }
                acc.iter_mut().for_each(|a| *a /= n_trees);
                acc
            })
            .collect())
    }
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

impl Classifier for RandomForestClassifier {
    #[instrument(skip_all, fields(n_estimators = self.params.n_estimators, n_samples = features.len()))]
    fn fit(&mut self, features: &[Vec<f64>], labels: &[usize]) -> Result<(), ClassifierError> {
        self.model = None;
        self.params.validate()?;
        let n_features = validate_training_input(features, labels)?;
        let max_features = self.params.max_features.resolve(n_features)?;

        let n_samples = features.len();
        let n_classes = labels.iter().max().map_or(0, |m| m + 1).max(2);
        let class_weights = self.params.class_weight.weights(labels, n_classes);

        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();

        let tree_params = TreeParams {
            criterion: self.params.criterion,
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features,
        };

        info!(
            n_estimators = self.params.n_estimators,
            n_samples,
            n_features,
            max_features,
            "Training random forest"
        );

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let tree_seeds: Vec<u64> = (0..self.params.n_estimators)
            .map(|_| master_rng.r#gen())
            .collect();

        let trees: Vec<DecisionTree> = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let bootstrap: Vec<usize> =
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                DecisionTree::grow(
                    &tree_params,
                    &columns,
                    labels,
                    &class_weights,
                    &bootstrap,
                    rng.r#gen(),
                )
            })
            .collect();

        let mut importances = vec![0.0; n_features];
        for tree in &trees {
            for (acc, v) in importances.iter_mut().zip(tree.feature_importances()) {
                *acc += v;
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        debug!(
            n_trees = trees.len(),
            mean_depth = trees.iter().map(DecisionTree::depth).sum::<usize>() as f64
                / trees.len() as f64,
            "Forest training complete"
        );

        self.model = Some(FittedForest {
            trees,
            n_features,
            n_classes,
            importances,
        });
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ClassifierError> {
        Ok(self
            .mean_distributions(features)?
            .into_iter()
            .map(|dist| {
                // Ties go to the lower class.
                dist.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (class, &p)| {
                        if p > best.1 { (class, p) } else { best }
                    })
                    .0
            })
            .collect())
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ClassifierError> {
        Ok(self
            .mean_distributions(features)?
            .into_iter()
            .map(|dist| dist[1])
            .collect())
    }

    fn feature_importances(&self) -> Result<Vec<f64>, ClassifierError> {
        Ok(self.fitted()?.importances.clone())
    }

    fn n_features(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.n_features)
    }

    fn name(&self) -> &'static str {
        "RandomForest"
    }
}
