use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::node::Node;
use super::split::{SplitContext, SplitCriterion};

/// Growth limits for a single CART tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: usize,
}

/// A fitted CART decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

impl DecisionTree {
    /// Grow a tree on `samples` (indices into the column-major `columns`).
    ///
    /// Inputs are validated by the forest before any tree is grown.
    pub(crate) fn grow(
        params: &TreeParams,
        columns: &[Vec<f64>],
        labels: &[usize],
        class_weights: &[f64],
        samples: &[usize],
        seed: u64,
    ) -> Self {
        let ctx = SplitContext {
            columns,
            labels,
            class_weights,
            criterion: params.criterion,
            max_features: params.max_features,
            min_samples_leaf: params.min_samples_leaf,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut nodes = Vec::new();
        build(&ctx, params, samples, 0, &mut rng, &mut nodes);

        Self {
            nodes,
            n_features: columns.len(),
        }
    }

    /// Class distribution of the leaf reached by `sample`.
    pub fn distribution(&self, sample: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution, .. } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Mean decrease in impurity per feature, normalized to sum to 1.
    ///
    /// All zeros when the tree is a single leaf.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[*feature] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf; a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Recursively build the arena, returning the index of the node created.
fn build(
    ctx: &SplitContext<'_>,
    params: &TreeParams,
    samples: &[usize],
    depth: usize,
    rng: &mut ChaCha8Rng,
    nodes: &mut Vec<Node>,
) -> usize {
    let counts = ctx.weighted_counts(samples);
    let total: f64 = counts.iter().sum();
    let pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
    let depth_reached = params.max_depth.is_some_and(|d| depth >= d);

    let split = if pure || depth_reached || samples.len() < params.min_samples_split {
        None
    } else {
        ctx.find_best_split(samples, rng)
    };

    let Some(split) = split else {
        let distribution = if total > 0.0 {
            counts.iter().map(|c| c / total).collect()
        } else {
            vec![0.0; counts.len()]
        };
        nodes.push(Node::Leaf {
            distribution,
            n_samples: samples.len(),
        });
        return nodes.len() - 1;
    };

    // Reserve the slot so children get higher indices.
    let idx = nodes.len();
    nodes.push(Node::Leaf {
        distribution: Vec::new(),
        n_samples: samples.len(),
    });

    let left = build(ctx, params, &split.left, depth + 1, rng, nodes);
    let right = build(ctx, params, &split.right, depth + 1, rng, nodes);

    nodes[idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        impurity_decrease: split.impurity_decrease,
        n_samples: samples.len(),
    };
    idx
}
