use rand::Rng;
use serde::{Deserialize, Serialize};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    #[default]
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Impurity of a node from its class-weighted counts.
    ///
    /// Returns 0.0 for an empty node.
    #[must_use]
    pub fn impurity(&self, weighted_counts: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        match self {
            SplitCriterion::Gini => {
                1.0 - weighted_counts
                    .iter()
                    .map(|&c| (c / total).powi(2))
                    .sum::<f64>()
            }
            SplitCriterion::Entropy => -weighted_counts
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|&c| {
                    let p = c / total;
                    p * p.ln()
                })
                .sum::<f64>(),
        }
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitCandidate {
    pub(crate) feature: usize,
    pub(crate) threshold: f64,
    pub(crate) impurity_decrease: f64,
    pub(crate) left: Vec<usize>,
    pub(crate) right: Vec<usize>,
}

/// Inputs shared by every split search within one tree.
pub(crate) struct SplitContext<'a> {
    /// Column-major features: `columns[feature][sample]`.
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) class_weights: &'a [f64],
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

impl SplitContext<'_> {
    /// Class-weighted counts of `samples`.
    pub(crate) fn weighted_counts(&self, samples: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.class_weights.len()];
        for &s in samples {
            let class = self.labels[s];
            counts[class] += self.class_weights[class];
        }
        counts
    }

    /// Search `max_features` randomly chosen features for the split with
    /// the largest weighted impurity decrease.
    ///
    /// Returns `None` when every candidate feature is constant over
    /// `samples` or every boundary violates `min_samples_leaf`.
    pub(crate) fn find_best_split(
        &self,
        samples: &[usize],
        rng: &mut impl Rng,
    ) -> Option<SplitCandidate> {
        let n_features = self.columns.len();
        let n_samples = samples.len();
        if n_samples < 2 || n_features == 0 {
            return None;
        }

        let parent_counts = self.weighted_counts(samples);
        let parent_total: f64 = parent_counts.iter().sum();
        let parent_impurity = self.criterion.impurity(&parent_counts, parent_total);

        // Partial Fisher-Yates over feature positions.
        let mut order: Vec<usize> = (0..n_features).collect();
        let take = self.max_features.min(n_features);
        for i in 0..take {
            let j = rng.gen_range(i..n_features);
            order.swap(i, j);
        }

        let mut best: Option<(usize, f64, f64)> = None;
        for &feature in &order[..take] {
            let column = &self.columns[feature];
            let mut sorted: Vec<(f64, usize)> = samples.iter().map(|&s| (column[s], s)).collect();
            sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0.0; parent_counts.len()];
            let mut right_counts = parent_counts.clone();
            let mut left_total = 0.0;

            for i in 0..(n_samples - 1) {
                let (value, s) = sorted[i];
                let class = self.labels[s];
                let w = self.class_weights[class];
                left_counts[class] += w;
                right_counts[class] -= w;
                left_total += w;

                let next = sorted[i + 1].0;
                if value == next {
                    continue;
                }
                let n_left = i + 1;
                if n_left < self.min_samples_leaf || n_samples - n_left < self.min_samples_leaf {
                    continue;
                }

                let right_total = parent_total - left_total;
                let decrease = parent_total * parent_impurity
                    - left_total * self.criterion.impurity(&left_counts, left_total)
                    - right_total * self.criterion.impurity(&right_counts, right_total);

                if best.is_none_or(|(_, _, d)| decrease > d) {
                    best = Some((feature, (value + next) / 2.0, decrease));
                }
            }
        }

        let (feature, threshold, impurity_decrease) = best?;
        let column = &self.columns[feature];
        let (left, right): (Vec<usize>, Vec<usize>) =
            samples.iter().partition(|&&s| column[s] <= threshold);

        Some(SplitCandidate {
            feature,
            threshold,
            impurity_decrease: impurity_decrease.max(0.0),
            left,
            right,
        })
    }
}
