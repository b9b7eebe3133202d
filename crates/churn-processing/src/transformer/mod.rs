//! Stateful mapping from raw columns to a numeric feature matrix.
//!
//! A [`ColumnTransformer`] starts [`Unfitted`](ColumnTransformer::Unfitted)
//! with a [`FeatureSpec`]. `fit_transform` learns imputation values,
//! scaling parameters and category vocabularies, and moves it to
//! [`Fitted`](ColumnTransformer::Fitted). `transform` replays the fitted
//! state on new rows and is only available once fitted.
//!
//! | Role        | Fit                          | Output                   |
//! |-------------|------------------------------|--------------------------|
//! | numeric     | median, mean, std            | 1 standardized column    |
//! | categorical | vocabulary, discovery order  | k−1 indicator columns    |
//! | binary      | flag or two-level mapping    | 1 column of 0/1          |

mod binary;
mod categorical;
mod numeric;
mod state;

pub use binary::BinaryEncoding;
pub use categorical::{CategoricalVocabulary, MISSING_TOKEN};
pub use numeric::NumericStats;
pub use state::FittedTransformState;

use crate::config::FeatureSpec;
use crate::error::{PreprocessingError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Raw-table to feature-matrix transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnTransformer {
    Unfitted(FeatureSpec),
    Fitted(FittedTransformState),
}

impl ColumnTransformer {
    pub fn new(spec: FeatureSpec) -> Self {
        Self::Unfitted(spec)
    }

    /// Rebuild a fitted transformer from stored state.
    pub fn from_state(state: FittedTransformState) -> Self {
        Self::Fitted(state)
    }

    pub fn spec(&self) -> &FeatureSpec {
        match self {
            Self::Unfitted(spec) => spec,
            Self::Fitted(state) => state.spec(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, Self::Fitted(_))
    }

    pub fn state(&self) -> Option<&FittedTransformState> {
        match self {
            Self::Fitted(state) => Some(state),
            Self::Unfitted(_) => None,
        }
    }

    /// Consume the transformer, returning its fitted state.
    pub fn into_state(self) -> Option<FittedTransformState> {
        match self {
            Self::Fitted(state) => Some(state),
            Self::Unfitted(_) => None,
        }
    }

    /// Learn parameters from `df` and return its encoded rows.
    ///
    /// A failed fit leaves the transformer in its previous state.
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        let state = FittedTransformState::fit(self.spec(), df)?;
        let matrix = state.transform(df)?;
        *self = Self::Fitted(state);
        Ok(matrix)
    }

    /// Encode `df` with the fitted parameters.
    pub fn transform(&self, df: &DataFrame) -> Result<Vec<Vec<f64>>> {
        match self {
            Self::Fitted(state) => state.transform(df),
            Self::Unfitted(_) => Err(PreprocessingError::NotFitted),
        }
    }

    /// Output column names; `None` until fitted.
    pub fn feature_names(&self) -> Option<Vec<String>> {
        self.state().map(FittedTransformState::feature_names)
    }
}

// Compile-time assertion that the transformer can move across threads.
static_assertions::assert_impl_all!(ColumnTransformer: Send, Sync);
