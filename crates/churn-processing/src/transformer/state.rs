//! The replayable result of fitting a [`ColumnTransformer`](super::ColumnTransformer).

use super::binary::BinaryEncoding;
use super::categorical::CategoricalVocabulary;
use super::numeric::NumericStats;
use crate::config::FeatureSpec;
use crate::error::{PreprocessingError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything learned from the fit set, frozen for inference.
///
/// Output layout: numeric columns, categorical indicator groups, binary
/// columns. [`feature_names`](Self::feature_names) is derived from the same
/// state that drives encoding, so names and columns never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransformState {
    spec: FeatureSpec,
    numeric: Vec<NumericStats>,
    categorical: Vec<CategoricalVocabulary>,
    binary: Vec<BinaryEncoding>,
}

impl FittedTransformState {
    /// Learn all column parameters from `df`.
    pub fn fit(spec: &FeatureSpec, df: &DataFrame) -> Result<Self> {
        let missing: Vec<String> = spec
            .required_columns()
            .filter(|c| df.column(c).is_err())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PreprocessingError::MissingColumns { columns: missing });
        }

        let numeric = spec
            .numeric()
            .iter()
            .map(|c| NumericStats::fit(df, c))
            .collect::<Result<Vec<_>>>()?;

        let categorical = spec
            .categorical()
            .iter()
            .map(|c| CategoricalVocabulary::fit(df, c))
            .collect::<Result<Vec<_>>>()?;

        let binary = spec
            .binary()
            .iter()
            .filter(|c| df.column(c).is_ok())
            .map(|c| BinaryEncoding::fit(df, c))
            .collect::<Result<Vec<_>>>()?;

        let state = Self {
            spec: spec.clone(),
            numeric,
            categorical,
            binary,
        };

        info!(
            rows = df.height(),
            features = state.n_features(),
            "Fitted column transformer"
        );

        Ok(state)
    }

    /// Replay the stored parameters on new data.
    pub fn transform(&self, df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        let missing: Vec<String> = self
            .fit_columns()
            .filter(|c| df.column(c).is_err())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(PreprocessingError::ColumnMismatchAtTransform { missing });
        }

        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(self.n_features());
        for stats in &self.numeric {
            columns.push(stats.apply(df)?);
        }
        for vocab in &self.categorical {
            columns.extend(vocab.apply(df)?);
        }
        for encoding in &self.binary {
            columns.push(encoding.apply(df)?);
        }

        Ok(to_rows(&columns, df.height()))
    }

    /// Ordered output column names.
    pub fn feature_names(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|s| s.column.clone())
            .chain(self.categorical.iter().flat_map(|v| v.feature_names()))
            .chain(self.binary.iter().map(|b| b.column.clone()))
            .collect()
    }

    /// Output width.
    pub fn n_features(&self) -> usize {
        self.numeric.len()
            + self.categorical.iter().map(|v| v.width()).sum::<usize>()
            + self.binary.len()
    }

    /// Raw columns that must be present at transform time.
    pub fn fit_columns(&self) -> impl Iterator<Item = &str> {
        self.numeric
            .iter()
            .map(|s| s.column.as_str())
            .chain(self.categorical.iter().map(|v| v.column.as_str()))
            .chain(self.binary.iter().map(|b| b.column.as_str()))
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn numeric(&self) -> &[NumericStats] {
        &self.numeric
    }

    pub fn categorical(&self) -> &[CategoricalVocabulary] {
        &self.categorical
    }

    pub fn binary(&self) -> &[BinaryEncoding] {
        &self.binary
    }
}

fn to_rows(columns: &[Vec<f64>], n_rows: usize) -> Vec<Vec<f64>> {
    (0..n_rows)
        .map(|row| columns.iter().map(|col| col[row]).collect())
        .collect()
}
