//! Churn data preprocessing.
//!
//! Data-side stages of the churn training pipeline, built on Polars:
//!
//! - **Schema validation**: required columns, minimum row count, label
//!   imbalance warning ([`SchemaValidator`])
//! - **Column transformation**: median imputation and standardization for
//!   numeric columns, reference-dropped one-hot encoding for categorical
//!   columns, 0/1 encoding for binary columns ([`ColumnTransformer`])
//! - **Imbalance correction**: SMOTE oversampling of minority classes
//!   ([`Smote`])
//! - **Splitting**: seeded, stratified train/test split ([`train_test_split`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use churn_processing::{
//!     ColumnTransformer, FeatureSpec, SchemaValidator, Smote, ValidationRules,
//!     encode_labels, split_frame, train_test_split,
//! };
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("telco.csv".into()))?
//!     .finish()?;
//!
//! let spec = FeatureSpec::telco();
//! let report = SchemaValidator::new(spec.clone(), ValidationRules::default()).validate(&df)?;
//!
//! let labels = encode_labels(&df, spec.label_column())?;
//! let split = train_test_split(&labels, 0.2, 42)?;
//! let (train_df, test_df) = split_frame(&df, &split)?;
//!
//! let mut transformer = ColumnTransformer::new(spec);
//! let x_train = transformer.fit_transform(&train_df)?;
//! let y_train: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
//! let (x_balanced, y_balanced) = Smote::new(5, 42).resample(&x_train, &y_train)?;
//!
//! let x_test = transformer.transform(&test_df)?;
//! ```

pub mod config;
pub mod error;
pub mod resampler;
pub mod split;
pub mod transformer;
pub mod utils;
pub mod validator;

// Re-exports for convenient access
pub use config::{ConfigValidationError, FeatureSpec, FeatureSpecBuilder, ValidationRules};
pub use error::{PreprocessingError, Result as PreprocessingResult};
pub use resampler::Smote;
pub use split::{DataSplit, split_frame, train_test_split};
pub use transformer::{
    BinaryEncoding, CategoricalVocabulary, ColumnTransformer, FittedTransformState, NumericStats,
};
pub use utils::{class_counts, encode_labels, positive_rate};
pub use validator::{SchemaValidator, ValidationReport, ValidationWarning};
