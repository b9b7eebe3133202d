//! Median imputation and standardization of numeric columns.

use crate::error::{PreprocessingError, Result};
use crate::utils::{column_as_f64, mean_std, median};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Statistics learned for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub column: String,
    /// Fill value for missing cells.
    pub median: f64,
    /// Population mean of the imputed column.
    pub mean: f64,
    /// Population standard deviation of the imputed column.
    pub std: f64,
}

impl NumericStats {
    /// Learn median, mean and standard deviation from a column.
    pub fn fit(df: &DataFrame, column: &str) -> Result<Self> {
        let values = column_as_f64(df, column)?;
        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        let median =
            median(&observed).ok_or_else(|| PreprocessingError::NoValidValues(column.into()))?;

        let imputed: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();
        let (mean, std) = mean_std(&imputed);

        Ok(Self {
            column: column.to_string(),
            median,
            mean,
            std,
        })
    }

    /// Divisor used for scaling; constant columns scale by 1.0.
    pub fn scale(&self) -> f64 {
        if self.std > 0.0 { self.std } else { 1.0 }
    }

    /// Impute and standardize a column with the stored statistics.
    pub fn apply(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let scale = self.scale();
        Ok(column_as_f64(df, &self.column)?
            .into_iter()
            .map(|v| (v.unwrap_or(self.median) - self.mean) / scale)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_imputes_median_before_scaling() {
        let df = df! { "tenure" => [Some(1.0), None, Some(3.0), Some(2.0)] }.unwrap();
        let stats = NumericStats::fit(&df, "tenure").unwrap();
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.mean, 2.0);

        let out = stats.apply(&df).unwrap();
        assert_eq!(out[1], 0.0);
        assert!(out[0] < 0.0 && out[2] > 0.0);
    }

    #[test]
    fn test_constant_column_scales_by_one() {
        let df = df! { "x" => [5.0, 5.0, 5.0] }.unwrap();
        let stats = NumericStats::fit(&df, "x").unwrap();
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.apply(&df).unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_text_column_with_blanks() {
        let df = df! { "TotalCharges" => ["10", " ", "30"] }.unwrap();
        let stats = NumericStats::fit(&df, "TotalCharges").unwrap();
        assert_eq!(stats.median, 20.0);
    }

    #[test]
    fn test_all_missing_column_fails() {
        let df = df! { "x" => [None::<f64>, None] }.unwrap();
        let err = NumericStats::fit(&df, "x").unwrap_err();
        assert!(matches!(err, PreprocessingError::NoValidValues(c) if c == "x"));
    }
}
