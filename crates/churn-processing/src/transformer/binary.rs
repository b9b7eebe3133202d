//! 0/1 encoding of binary columns.

use crate::error::{PreprocessingError, Result};
use crate::utils::{column_as_flags, column_as_strings};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// How one binary column maps to 0/1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryEncoding {
    pub column: String,
    /// Two text levels `[zero, one]` for columns that are not flags
    /// (e.g. `Male`/`Female`). `None` for flag columns.
    pub levels: Option<[String; 2]>,
}

impl BinaryEncoding {
    /// Decide between flag parsing and a two-level mapping.
    ///
    /// A column is a flag column when every cell parses as yes/no,
    /// true/false or 1/0. Otherwise it must hold exactly two distinct
    /// non-null text values; the first discovered maps to 0.
    pub fn fit(df: &DataFrame, column: &str) -> Result<Self> {
        let flags = column_as_flags(df, column)?;
        if let Some(row) = flags.iter().position(Option::is_none) {
            return Err(invalid(column, row));
        }
        if flags.iter().all(|f| matches!(f, Some(Some(_)))) {
            return Ok(Self {
                column: column.to_string(),
                levels: None,
            });
        }

        let mut levels: Vec<String> = Vec::with_capacity(2);
        for (row, value) in column_as_strings(df, column)?.into_iter().enumerate() {
            let value = value.ok_or_else(|| invalid(column, row))?;
            if !levels.contains(&value) {
                if levels.len() == 2 {
                    return Err(invalid(column, row));
                }
                levels.push(value);
            }
        }

        match <[String; 2]>::try_from(levels) {
            Ok(levels) => Ok(Self {
                column: column.to_string(),
                levels: Some(levels),
            }),
            Err(_) => Err(invalid(column, 0)),
        }
    }

    /// Encode the column as 0.0 / 1.0.
    ///
    /// Nulls and values outside the fitted mapping fail with the
    /// offending row.
    pub fn apply(&self, df: &DataFrame) -> Result<Vec<f64>> {
        match &self.levels {
            None => column_as_flags(df, &self.column)?
                .into_iter()
                .enumerate()
                .map(|(row, flag)| match flag {
                    Some(Some(true)) => Ok(1.0),
                    Some(Some(false)) => Ok(0.0),
                    _ => Err(invalid(&self.column, row)),
                })
                .collect(),
            Some([zero, one]) => column_as_strings(df, &self.column)?
                .into_iter()
                .enumerate()
                .map(|(row, value)| match value {
                    Some(v) if &v == zero => Ok(0.0),
                    Some(v) if &v == one => Ok(1.0),
                    _ => Err(invalid(&self.column, row)),
                })
                .collect(),
        }
    }
}

fn invalid(column: &str, row: usize) -> PreprocessingError {
    PreprocessingError::InvalidBinaryValue {
        column: column.to_string(),
        row,
    }
}
