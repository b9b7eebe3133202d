//! Shared utilities for the preprocessing stages.
//!
//! Column extraction from polars frames, numeric string cleaning, flag
//! parsing, label encoding and small statistics helpers.

use crate::error::{PreprocessingError, Result};
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters stripped from numeric text before parsing.
pub const NUMERIC_FORMAT_CHARS: [char; 5] = [',', '$', '%', '€', ' '];

/// Text values that map to `true` in binary and label columns.
pub const FLAG_TRUE_VALUES: [&str; 3] = ["yes", "true", "1"];

/// Text values that map to `false` in binary and label columns.
pub const FLAG_FALSE_VALUES: [&str; 3] = ["no", "false", "0"];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// # Example
///
/// ```rust
/// use churn_processing::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// assert_eq!(clean_numeric_string("  42%  "), "42");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !NUMERIC_FORMAT_CHARS.contains(c))
        .collect()
}

/// Try to parse a string as a finite f64.
///
/// Blank cells (the telco export writes `" "` for new customers'
/// `TotalCharges`) and NaN text parse as `None`.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a yes/no style flag, case-insensitively.
///
/// Accepts `yes/no`, `true/false`, `1/0` and numeric text equal to 1 or 0
/// (so `"1.0"` is accepted).
pub fn parse_flag(s: &str) -> Option<bool> {
    let lower = s.trim().to_ascii_lowercase();
    if FLAG_TRUE_VALUES.contains(&lower.as_str()) {
        return Some(true);
    }
    if FLAG_FALSE_VALUES.contains(&lower.as_str()) {
        return Some(false);
    }
    match lower.parse::<f64>() {
        Ok(v) if v == 1.0 => Some(true),
        Ok(v) if v == 0.0 => Some(false),
        _ => None,
    }
}

// =============================================================================
// Column Extraction Utilities
// =============================================================================

/// Read a column as optional f64 values.
///
/// String columns are parsed with [`parse_numeric_string`], booleans map to
/// 0/1, everything else is cast to Float64. NaN becomes `None`.
pub fn column_as_f64(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df.column(name)?.as_materialized_series();

    let values = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_numeric_string))
            .collect(),
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { 1.0 } else { 0.0 }))
            .collect(),
        _ => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect(),
    };

    Ok(values)
}

/// Read a column as optional strings, casting non-string dtypes.
pub fn column_as_strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series();
    let casted;
    let strings = if matches!(series.dtype(), DataType::String) {
        series.str()?
    } else {
        casted = series.cast(&DataType::String)?;
        casted.str()?
    };

    Ok(strings
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Read a column as optional flags.
///
/// The outer `Option` is `None` for nulls; the inner parse result is
/// `None` for values that are not recognizable flags.
pub fn column_as_flags(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<Option<bool>>>> {
    let series = df.column(name)?.as_materialized_series();

    let values = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map(Some))
            .collect(),
        dtype if is_numeric_dtype(dtype) => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| {
                v.map(|x| match x {
                    x if x == 1.0 => Some(true),
                    x if x == 0.0 => Some(false),
                    _ => None,
                })
            })
            .collect(),
        _ => column_as_strings(df, name)?
            .into_iter()
            .map(|v| v.map(|s| parse_flag(&s)))
            .collect(),
    };

    Ok(values)
}

/// Encode the label column as class indices (0 = no churn, 1 = churn).
///
/// Fails with [`PreprocessingError::InvalidLabel`] on the first null or
/// unrecognized cell.
pub fn encode_labels(df: &DataFrame, label_column: &str) -> Result<Vec<usize>> {
    if df.column(label_column).is_err() {
        return Err(PreprocessingError::MissingColumns {
            columns: vec![label_column.to_string()],
        });
    }

    let flags = column_as_flags(df, label_column)?;
    let raw = column_as_strings(df, label_column)?;

    flags
        .into_iter()
        .enumerate()
        .map(|(row, flag)| match flag {
            Some(Some(true)) => Ok(1),
            Some(Some(false)) => Ok(0),
            _ => Err(PreprocessingError::InvalidLabel {
                column: label_column.to_string(),
                row,
                value: raw[row].clone(),
            }),
        })
        .collect()
}

/// Fraction of labels equal to the positive class.
pub fn positive_rate(labels: &[usize]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    labels.iter().filter(|&&l| l == 1).count() as f64 / labels.len() as f64
}

/// Number of samples per class, indexed by class.
pub fn class_counts(labels: &[usize]) -> Vec<usize> {
    let n_classes = labels.iter().max().map_or(0, |m| m + 1);
    let mut counts = vec![0; n_classes];
    for &label in labels {
        counts[label] += 1;
    }
    counts
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Median of a non-empty slice; `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Population mean and standard deviation; `(0.0, 0.0)` when empty.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_numeric_string() {
        assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
        assert_eq!(clean_numeric_string("  42%  "), "42");
        assert_eq!(clean_numeric_string("€100"), "100");
        assert_eq!(clean_numeric_string("1 000"), "1000");
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("29.85"), Some(29.85));
        assert_eq!(parse_numeric_string("$1,889.50"), Some(1889.5));
        assert_eq!(parse_numeric_string(" "), None);
        assert_eq!(parse_numeric_string("NaN"), None);
        assert_eq!(parse_numeric_string("abc"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag(" no "), Some(false));
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1.0"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("Female"), None);
        assert_eq!(parse_flag("2"), None);
    }

    #[test]
    fn test_column_as_f64_parses_text() {
        let df = df! {
            "charges" => [Some("29.85"), Some(" "), None, Some("$1,000")],
        }
        .unwrap();
        let values = column_as_f64(&df, "charges").unwrap();
        assert_eq!(values, vec![Some(29.85), None, None, Some(1000.0)]);
    }

    #[test]
    fn test_column_as_f64_casts_integers_and_drops_nan() {
        let df = df! {
            "tenure" => [Some(1i64), None, Some(72)],
            "ratio" => [1.5, f64::NAN, 0.0],
        }
        .unwrap();
        assert_eq!(
            column_as_f64(&df, "tenure").unwrap(),
            vec![Some(1.0), None, Some(72.0)]
        );
        assert_eq!(
            column_as_f64(&df, "ratio").unwrap(),
            vec![Some(1.5), None, Some(0.0)]
        );
    }

    #[test]
    fn test_column_as_strings_casts_numbers() {
        let df = df! { "code" => [Some(1i32), None] }.unwrap();
        assert_eq!(
            column_as_strings(&df, "code").unwrap(),
            vec![Some("1".to_string()), None]
        );
    }

    #[test]
    fn test_encode_labels_mixed_spelling() {
        let df = df! { "Churn" => ["Yes", "no", "TRUE", "0"] }.unwrap();
        assert_eq!(encode_labels(&df, "Churn").unwrap(), vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_encode_labels_boolean_dtype() {
        let df = df! { "Churn" => [true, false] }.unwrap();
        assert_eq!(encode_labels(&df, "Churn").unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_encode_labels_rejects_unknown_value() {
        let df = df! { "Churn" => [Some("Yes"), Some("maybe")] }.unwrap();
        let err = encode_labels(&df, "Churn").unwrap_err();
        match err {
            PreprocessingError::InvalidLabel { row, value, .. } => {
                assert_eq!(row, 1);
                assert_eq!(value.as_deref(), Some("maybe"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encode_labels_rejects_null() {
        let df = df! { "Churn" => [Some("Yes"), None] }.unwrap();
        assert!(matches!(
            encode_labels(&df, "Churn"),
            Err(PreprocessingError::InvalidLabel { row: 1, value: None, .. })
        ));
    }

    #[test]
    fn test_median_and_mean_std() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);

        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
    }

    #[test]
    fn test_class_counts_and_positive_rate() {
        let labels = [0, 1, 0, 0];
        assert_eq!(class_counts(&labels), vec![3, 1]);
        assert_eq!(positive_rate(&labels), 0.25);
        assert_eq!(positive_rate(&[]), 0.0);
    }
}
