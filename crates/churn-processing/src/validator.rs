//! Schema and volume checks run before any fitting.

use crate::config::{FeatureSpec, ValidationRules};
use crate::error::{PreprocessingError, Result};
use crate::utils::{encode_labels, positive_rate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Non-fatal findings of a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// The positive rate falls outside the configured band.
    Imbalance {
        positive_rate: f64,
        min_rate: f64,
        max_rate: f64,
    },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imbalance { positive_rate, .. } => write!(
                f,
                "Severe class imbalance detected: {:.2}% churn rate",
                positive_rate * 100.0
            ),
        }
    }
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Number of rows in the validated table.
    pub n_rows: usize,
    /// Positive rate, when the label column is present.
    pub positive_rate: Option<f64>,
    /// Non-fatal findings.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// Whether the run produced any warning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Checks column presence, row count and label balance.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    spec: FeatureSpec,
    rules: ValidationRules,
}

impl SchemaValidator {
    pub fn new(spec: FeatureSpec, rules: ValidationRules) -> Self {
        Self { spec, rules }
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Validate a raw table.
    ///
    /// Fails on missing numeric/categorical columns (all reported in
    /// configured order) or on fewer rows than `min_rows`. A positive rate
    /// outside the configured band is logged and recorded, never fatal.
    pub fn validate(&self, df: &DataFrame) -> Result<ValidationReport> {
        let present: Vec<&str> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .collect();

        let missing: Vec<String> = self
            .spec
            .required_columns()
            .filter(|column| !present.contains(&column.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(PreprocessingError::MissingColumns { columns: missing });
        }

        let n_rows = df.height();
        if n_rows < self.rules.min_rows {
            return Err(PreprocessingError::InsufficientData {
                rows: n_rows,
                minimum: self.rules.min_rows,
            });
        }

        let mut warnings = Vec::new();
        let label_column = self.spec.label_column();
        let rate = if present.contains(&label_column) {
            let labels = encode_labels(df, label_column)?;
            let rate = positive_rate(&labels);
            if rate < self.rules.min_positive_rate || rate > self.rules.max_positive_rate {
                let warning = ValidationWarning::Imbalance {
                    positive_rate: rate,
                    min_rate: self.rules.min_positive_rate,
                    max_rate: self.rules.max_positive_rate,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
            Some(rate)
        } else {
            None
        };

        debug!(rows = n_rows, positive_rate = ?rate, "Schema validation passed");

        Ok(ValidationReport {
            n_rows,
            positive_rate: rate,
            warnings,
        })
    }
}
