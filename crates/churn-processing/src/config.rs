//! Configuration types for the preprocessing stages.
//!
//! [`FeatureSpec`] fixes the column roles (numeric, categorical, binary,
//! label, identifier) for the lifetime of a transformer. [`ValidationRules`]
//! holds the thresholds used by the schema validator.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default label column of the telco churn table.
pub const DEFAULT_LABEL_COLUMN: &str = "Churn";

/// Default identifier column of the telco churn table.
pub const DEFAULT_ID_COLUMN: &str = "CustomerID";

/// Column roles used to turn a raw table into a feature matrix.
///
/// Use [`FeatureSpec::builder()`] or [`FeatureSpec::telco()`].
///
/// # Example
///
/// ```rust
/// use churn_processing::FeatureSpec;
///
/// let spec = FeatureSpec::builder()
///     .numeric(["tenure", "MonthlyCharges"])
///     .categorical(["Contract"])
///     .binary(["Partner"])
///     .label_column("Churn")
///     .build()
///     .expect("valid spec");
///
/// assert_eq!(spec.numeric(), ["tenure", "MonthlyCharges"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    numeric: Vec<String>,
    categorical: Vec<String>,
    binary: Vec<String>,
    label_column: String,
    id_column: Option<String>,
}

impl FeatureSpec {
    /// Create a new specification builder.
    pub fn builder() -> FeatureSpecBuilder {
        FeatureSpecBuilder::default()
    }

    /// Column roles of the telco customer churn table.
    pub fn telco() -> Self {
        Self {
            numeric: to_strings(["tenure", "MonthlyCharges", "TotalCharges"]),
            categorical: to_strings(["InternetService", "Contract", "PaymentMethod"]),
            binary: to_strings([
                "gender",
                "Partner",
                "Dependents",
                "PhoneService",
                "PaperlessBilling",
            ]),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            id_column: Some(DEFAULT_ID_COLUMN.to_string()),
        }
    }

    /// Numeric columns, in output order.
    pub fn numeric(&self) -> &[String] {
        &self.numeric
    }

    /// Categorical columns, in output order.
    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// Binary (0/1) columns, in output order.
    pub fn binary(&self) -> &[String] {
        &self.binary
    }

    /// Name of the label column.
    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Name of the identifier column, if any.
    pub fn id_column(&self) -> Option<&str> {
        self.id_column.as_deref()
    }

    /// Columns the validator requires: numeric and categorical roles.
    pub fn required_columns(&self) -> impl Iterator<Item = &String> {
        self.numeric
            .iter()
            .chain(self.categorical.iter())
            .filter(move |c| c.as_str() != self.label_column)
    }

    /// Check role lists for overlaps and label leakage.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.numeric.is_empty() && self.categorical.is_empty() && self.binary.is_empty() {
            return Err(ConfigValidationError::NoFeatures);
        }

        let mut seen = HashSet::new();
        for column in self
            .numeric
            .iter()
            .chain(&self.categorical)
            .chain(&self.binary)
        {
            if column == &self.label_column {
                return Err(ConfigValidationError::LabelAsFeature(column.clone()));
            }
            if self.id_column.as_ref() == Some(column) {
                return Err(ConfigValidationError::IdentifierAsFeature(column.clone()));
            }
            if !seen.insert(column.as_str()) {
                return Err(ConfigValidationError::DuplicateColumn(column.clone()));
            }
        }

        Ok(())
    }
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self::telco()
    }
}

/// Builder for [`FeatureSpec`].
#[derive(Debug, Clone, Default)]
pub struct FeatureSpecBuilder {
    numeric: Vec<String>,
    categorical: Vec<String>,
    binary: Vec<String>,
    label_column: Option<String>,
    id_column: Option<String>,
}

impl FeatureSpecBuilder {
    /// Set the numeric columns.
    pub fn numeric<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the categorical columns.
    pub fn categorical<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the binary columns.
    pub fn binary<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binary = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the label column. Defaults to `Churn`.
    pub fn label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = Some(column.into());
        self
    }

    /// Set the identifier column excluded from features.
    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    /// Build and validate the feature roles.
    pub fn build(self) -> Result<FeatureSpec, ConfigValidationError> {
        let spec = FeatureSpec {
            numeric: self.numeric,
            categorical: self.categorical,
            binary: self.binary,
            label_column: self
                .label_column
                .unwrap_or_else(|| DEFAULT_LABEL_COLUMN.to_string()),
            id_column: self.id_column,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Thresholds applied by the schema validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Minimum number of rows for training.
    /// Default: 100
    pub min_rows: usize,

    /// Positive rates below this emit an imbalance warning.
    /// Default: 0.05
    pub min_positive_rate: f64,

    /// Positive rates above this emit an imbalance warning.
    /// Default: 0.95
    pub max_positive_rate: f64,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_rows: 100,
            min_positive_rate: 0.05,
            max_positive_rate: 0.95,
        }
    }
}

impl ValidationRules {
    /// Validate the thresholds.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("min_positive_rate", self.min_positive_rate),
            ("max_positive_rate", self.max_positive_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }
        if self.min_positive_rate > self.max_positive_rate {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "min_positive_rate".to_string(),
                value: self.min_positive_rate,
            });
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Column '{0}' is listed under more than one role")]
    DuplicateColumn(String),

    #[error("Label column '{0}' cannot be used as a feature")]
    LabelAsFeature(String),

    #[error("Identifier column '{0}' cannot be used as a feature")]
    IdentifierAsFeature(String),

    #[error("Feature specification has no feature columns")]
    NoFeatures,

    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },
}

fn to_strings<const N: usize>(columns: [&str; N]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}
