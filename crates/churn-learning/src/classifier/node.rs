use serde::{Deserialize, Serialize};

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` with children referenced by arena
/// index. Index 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// An interior split: `sample[feature] <= threshold` goes left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Weighted impurity decrease contributed by this split.
        impurity_decrease: f64,
        n_samples: usize,
    },
    /// A terminal leaf.
    Leaf {
        /// Class-weighted probability distribution, summing to 1.
        distribution: Vec<f64>,
        n_samples: usize,
    },
}
