//! Seeded, stratified train/test split of raw rows.

use crate::error::{PreprocessingError, Result};
use polars::prelude::*;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Default fraction of rows held out for evaluation.
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Row indices of the two halves, each ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices per class.
///
/// Each class contributes `round(n_class * test_size)` rows to the test
/// half. A class with two or more rows always contributes at least one, and
/// at least one row of every class stays in training.
pub fn train_test_split(labels: &[usize], test_size: f64, seed: u64) -> Result<DataSplit> {
    if labels.is_empty() {
        return Err(PreprocessingError::EmptyDataset);
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PreprocessingError::InvalidConfig(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }

    let n_classes = labels.iter().max().map_or(0, |m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (idx, &label) in labels.iter().enumerate() {
        by_class[label].push(idx);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for mut members in by_class.into_iter().filter(|m| !m.is_empty()) {
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_size).round() as usize)
            .max(1)
            .min(members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    Ok(DataSplit { train, test })
}

/// Materialize both halves of a split as DataFrames.
pub fn split_frame(df: &DataFrame, split: &DataSplit) -> Result<(DataFrame, DataFrame)> {
    let train = take_rows(df, &split.train)?;
    let test = take_rows(df, &split.test)?;
    Ok((train, test))
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let mut mask = vec![false; df.height()];
    for &row in rows {
        if row >= mask.len() {
            return Err(PreprocessingError::InvalidConfig(format!(
                "row index {row} out of bounds for {} rows",
                mask.len()
            )));
        }
        mask[row] = true;
    }
    let mask = BooleanChunked::from_slice("mask".into(), &mask);
    Ok(df.filter(&mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_is_stratified() {
        let labels: Vec<usize> = (0..100).map(|i| usize::from(i % 4 == 0)).collect();
        let split = train_test_split(&labels, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        let test_pos = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(test_pos, 5);
        assert_eq!(split.train.len() + split.test.len(), 100);
    }

    #[test]
    fn test_indices_sorted_and_disjoint() {
        let labels: Vec<usize> = (0..50).map(|i| i % 2).collect();
        let split = train_test_split(&labels, 0.3, 1).unwrap();
        assert!(split.train.windows(2).all(|w| w[0] < w[1]));
        assert!(split.test.windows(2).all(|w| w[0] < w[1]));
        assert!(split.test.iter().all(|i| !split.train.contains(i)));
    }

    #[test]
    fn test_rare_class_keeps_a_training_row() {
        let labels = vec![0, 0, 0, 0, 1];
        let split = train_test_split(&labels, 0.5, 3).unwrap();
        assert!(split.train.contains(&4));
    }

    #[test]
    fn test_small_class_still_reaches_test_half() {
        // round(2 * 0.2) == 0, but one of the two rows is held out.
        let labels: Vec<usize> = (0..100).map(|i| usize::from(i == 10 || i == 60)).collect();
        let split = train_test_split(&labels, 0.2, 42).unwrap();

        let test_pos = split.test.iter().filter(|&&i| labels[i] == 1).count();
        let train_pos = split.train.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(test_pos, 1);
        assert_eq!(train_pos, 1);
        assert_eq!(split.test.len(), 21);
    }

    #[test]
    fn test_same_seed_same_split() {
        let labels: Vec<usize> = (0..40).map(|i| i % 3 % 2).collect();
        assert_eq!(
            train_test_split(&labels, 0.25, 9).unwrap(),
            train_test_split(&labels, 0.25, 9).unwrap()
        );
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(train_test_split(&[0, 1], 1.0, 0).is_err());
        assert!(train_test_split(&[0, 1], 0.0, 0).is_err());
        assert!(matches!(
            train_test_split(&[], 0.2, 0),
            Err(PreprocessingError::EmptyDataset)
        ));
    }

    #[test]
    fn test_split_frame() {
        let df = df! { "id" => [10, 11, 12, 13] }.unwrap();
        let split = DataSplit {
            train: vec![0, 2, 3],
            test: vec![1],
        };
        let (train, test) = split_frame(&df, &split).unwrap();
        assert_eq!(train.height(), 3);
        let ids = test.column("id").unwrap().as_materialized_series();
        assert_eq!(ids.i32().unwrap().get(0), Some(11));
    }
}
