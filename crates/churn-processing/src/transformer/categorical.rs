//! Reference-dropped one-hot encoding of categorical columns.

use crate::error::Result;
use crate::utils::column_as_strings;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token substituted for null categorical cells.
pub const MISSING_TOKEN: &str = "missing";

/// Vocabulary learned for one categorical column.
///
/// `categories[0]` is the reference level and gets no indicator column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalVocabulary {
    pub column: String,
    pub categories: Vec<String>,
}

impl CategoricalVocabulary {
    /// Collect distinct values in first-discovery order.
    pub fn fit(df: &DataFrame, column: &str) -> Result<Self> {
        let mut categories: Vec<String> = Vec::new();
        for value in read_values(df, column)? {
            if !categories.contains(&value) {
                categories.push(value);
            }
        }
        Ok(Self {
            column: column.to_string(),
            categories,
        })
    }

    /// Reference level, if any value was observed.
    pub fn reference(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// Number of indicator columns produced.
    pub fn width(&self) -> usize {
        self.categories.len().saturating_sub(1)
    }

    /// Output names `{column}_{value}` for non-reference levels.
    pub fn feature_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .skip(1)
            .map(move |value| format!("{}_{}", self.column, value))
    }

    /// Encode a column as `width()` indicator columns.
    ///
    /// Unseen values encode as the reference level (all zeros).
    pub fn apply(&self, df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        let values = read_values(df, &self.column)?;
        let mut columns = vec![vec![0.0; values.len()]; self.width()];
        let mut unseen = 0usize;

        for (row, value) in values.iter().enumerate() {
            match self.categories.iter().position(|c| c == value) {
                Some(0) => {}
                Some(idx) => columns[idx - 1][row] = 1.0,
                None => unseen += 1,
            }
        }

        if unseen > 0 {
            debug!(
                column = %self.column,
                count = unseen,
                "Unseen categories encoded as reference level"
            );
        }

        Ok(columns)
    }
}

fn read_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    Ok(column_as_strings(df, column)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| MISSING_TOKEN.to_string()))
        .collect())
}
