//! Synthetic minority oversampling (SMOTE).
//!
//! Each non-majority class is raised to the majority count by interpolating
//! between a class member and one of its `k` nearest same-class neighbors.
//! Only ever applied to training rows.

use crate::error::{PreprocessingError, Result};
use crate::utils::class_counts;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default number of neighbors considered for interpolation.
pub const DEFAULT_K_NEIGHBORS: usize = 5;

/// SMOTE oversampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self { k_neighbors, seed }
    }

    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Balance classes by appending synthetic rows.
    ///
    /// Original rows come first in their original order, followed by the
    /// synthetic rows grouped by class.
    pub fn resample(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<(Vec<Vec<f64>>, Vec<usize>)> {
        if features.is_empty() {
            return Err(PreprocessingError::EmptyDataset);
        }
        if features.len() != labels.len() {
            return Err(PreprocessingError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        if self.k_neighbors == 0 {
            return Err(PreprocessingError::InvalidConfig(
                "k_neighbors must be at least 1".to_string(),
            ));
        }

        let counts = class_counts(labels);
        let present = counts.iter().filter(|&&c| c > 0).count();
        if present < 2 {
            return Err(PreprocessingError::SingleClass { found: present });
        }
        let majority = counts.iter().copied().max().unwrap_or(0);

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut out_features = features.to_vec();
        let mut out_labels = labels.to_vec();

        for (class, &count) in counts.iter().enumerate() {
            if count == 0 || count == majority {
                continue;
            }

            let members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, l)| **l == class)
                .map(|(i, _)| i)
                .collect();
            let k = self.k_neighbors.min(count - 1);
            let neighbors: Vec<Vec<usize>> = members
                .iter()
                .map(|&i| nearest_neighbors(features, &members, i, k))
                .collect();

            for _ in 0..(majority - count) {
                let pos = rng.gen_range(0..members.len());
                let base = &features[members[pos]];
                let synthetic = if k == 0 {
                    base.clone()
                } else {
                    let neighbor = &features[neighbors[pos][rng.gen_range(0..k)]];
                    let gap: f64 = rng.r#gen();
                    base.iter()
                        .zip(neighbor)
                        .map(|(x, n)| x + gap * (n - x))
                        .collect()
                };
                out_features.push(synthetic);
                out_labels.push(class);
            }

            info!(
                class,
                original = count,
                synthetic = majority - count,
                k,
                "Oversampled minority class"
            );
        }

        Ok((out_features, out_labels))
    }
}

impl Default for Smote {
    fn default() -> Self {
        Self::new(DEFAULT_K_NEIGHBORS, 42)
    }
}

/// The `k` nearest members of `candidates` to `target`, excluding itself.
fn nearest_neighbors(
    features: &[Vec<f64>],
    candidates: &[usize],
    target: usize,
    k: usize,
) -> Vec<usize> {
    let mut distances: Vec<(usize, f64)> = candidates
        .iter()
        .filter(|&&c| c != target)
        .map(|&c| (c, squared_distance(&features[target], &features[c])))
        .collect();

    distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    distances.into_iter().take(k).map(|(idx, _)| idx).collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
