//! # Data Loading and Validation Module
//!
//! The exclusive entry point for user-provided data. Reads the heart-disease
//! CSV, validates it against the fixed 14-column schema, and packs it into
//! the clean `ndarray` structures the statistical core consumes.
//!
//! - Strict Schema: column names are not configurable. The module enforces
//!   the canonical Cleveland attribute names (`age`, `sex`, `cp`, ...,
//!   `thal`) plus the binary outcome `target`. Extra columns are ignored.
//! - User-Centric Errors: failures are assumed to be user-input errors.
//!   The `DataError` enum is designed to provide clear, actionable feedback.
//! - Complete cases only: records with missing or non-finite values are
//!   rejected at this boundary. Nothing downstream imputes.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, ShapeBuilder};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Attribute columns, in the order they occupy in `Dataset::features`.
pub const FEATURE_COLUMNS: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// The binary outcome column: 0 = disease absent, 1 = disease present.
pub const OUTCOME_COLUMN: &str = "target";

/// Schema index of the `age` column within `Dataset::features`.
pub const AGE_COLUMN: usize = 0;
/// Schema index of the `sex` column (0 = female, 1 = male).
pub const SEX_COLUMN: usize = 1;
/// Schema index of the `cp` (chest pain type) column, coded 0 through 3.
pub const CP_COLUMN: usize = 2;

/// A validated, immutable table of patient records.
///
/// Rows are records in file order; columns are the attributes in
/// [`FEATURE_COLUMNS`] order. Construction guarantees the absence of
/// missing and non-finite values and that every label is exactly 0 or 1.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub(crate) features: Array2<f64>,
    pub(crate) labels: Array1<f64>,
}

/// A comprehensive error type for all data loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The required column '{column_name}' could not be converted to the expected type '{expected_type}'. It contains non-numeric data. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error(
        "Missing or null values were found in the required column '{0}'. This tool requires complete data with no missing values."
    )]
    MissingValuesFound(String),
    #[error(
        "Non-finite values (NaN or Infinity) were found in the required column '{0}'. This tool requires all data to be finite."
    )]
    NonFiniteValuesFound(String),
    #[error(
        "The outcome column 'target' must contain only 0 and 1, but data row {row} holds {value}."
    )]
    NonBinaryOutcome { row: usize, value: f64 },
    #[error("The input file contains a header but no data rows.")]
    EmptyTable,
    #[error("The feature matrix has {rows} rows but the label vector has {labels} entries.")]
    ShapeMismatch { rows: usize, labels: usize },
    #[error("Expected {expected} feature columns, found {found}.")]
    WrongFeatureCount { found: usize, expected: usize },
}

impl Dataset {
    /// Builds a dataset from pre-assembled arrays, applying the same
    /// validation the file loader applies.
    pub fn from_parts(features: Array2<f64>, labels: Array1<f64>) -> Result<Self, DataError> {
        if features.nrows() != labels.len() {
            return Err(DataError::ShapeMismatch {
                rows: features.nrows(),
                labels: labels.len(),
            });
        }
        if features.ncols() != FEATURE_COLUMNS.len() {
            return Err(DataError::WrongFeatureCount {
                found: features.ncols(),
                expected: FEATURE_COLUMNS.len(),
            });
        }
        if features.nrows() == 0 {
            return Err(DataError::EmptyTable);
        }
        for (j, column) in features.axis_iter(Axis(1)).enumerate() {
            if column.iter().any(|v| !v.is_finite()) {
                return Err(DataError::NonFiniteValuesFound(
                    FEATURE_COLUMNS[j].to_string(),
                ));
            }
        }
        for (i, &value) in labels.iter().enumerate() {
            if value != 0.0 && value != 1.0 {
                return Err(DataError::NonBinaryOutcome { row: i + 1, value });
            }
        }
        Ok(Dataset { features, labels })
    }

    /// Number of records.
    pub fn n_records(&self) -> usize {
        self.features.nrows()
    }

    /// Number of attribute columns (always the schema width).
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Attribute matrix, one row per record in schema column order.
    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    /// Outcome vector of exact 0.0/1.0 values, aligned with `features` rows.
    pub fn labels(&self) -> ArrayView1<'_, f64> {
        self.labels.view()
    }

    /// Record counts per outcome: `(disease absent, disease present)`.
    pub fn label_counts(&self) -> (usize, usize) {
        let present = self.labels.iter().filter(|&&y| y == 1.0).count();
        (self.labels.len() - present, present)
    }

    /// Materializes the records at `indices`, in the order given.
    /// Indices must be in range.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }
}

/// Loads and validates the heart-disease table from a comma-separated,
/// headered file.
pub fn load_dataset(path: &str) -> Result<Dataset, DataError> {
    log::info!("loading data from '{path}'");

    let df = CsvReader::new(File::open(Path::new(path))?)
        .with_options(CsvReadOptions::default().with_has_header(true))
        .finish()?;

    if df.height() == 0 {
        return Err(DataError::EmptyTable);
    }

    let mut required_cols: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
    required_cols.push(OUTCOME_COLUMN.to_string());

    let df_columns = df.get_column_names();
    let columns_set: HashSet<String> = df_columns.into_iter().map(|s| s.to_string()).collect();
    for col_name in &required_cols {
        if !columns_set.contains(col_name) {
            return Err(DataError::ColumnNotFound(col_name.clone()));
        }
    }

    // Drop any extra columns once validation has passed.
    let projection: Vec<&str> = required_cols.iter().map(|s| s.as_str()).collect();
    let df = df.select(projection)?;

    let n = df.height();
    let mut feature_buffer = Vec::with_capacity(n * FEATURE_COLUMNS.len());
    for feature_name in FEATURE_COLUMNS {
        let mut column = extract_numeric_column(&df, feature_name)?;
        feature_buffer.append(&mut column);
    }
    let features = Array2::from_shape_vec((n, FEATURE_COLUMNS.len()).f(), feature_buffer)
        .expect("feature columns should have consistent row counts");

    let outcome = extract_numeric_column(&df, OUTCOME_COLUMN)?;
    for (i, &value) in outcome.iter().enumerate() {
        if value != 0.0 && value != 1.0 {
            return Err(DataError::NonBinaryOutcome { row: i + 1, value });
        }
    }
    let labels = Array1::from_vec(outcome);

    log::info!(
        "data validation passed: {} records, {} attributes, no missing values",
        n,
        FEATURE_COLUMNS.len()
    );

    Ok(Dataset { features, labels })
}

fn extract_numeric_column(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, DataError> {
    let series = df.column(column_name)?;
    if series.null_count() > 0 {
        return Err(DataError::MissingValuesFound(column_name.to_string()));
    }

    let casted = match series.cast(&DataType::Float64) {
        Ok(casted) => casted,
        Err(_) => {
            return Err(DataError::ColumnWrongType {
                column_name: column_name.to_string(),
                expected_type: "f64 (numeric)",
                found_type: format!("{:?}", series.dtype()),
            });
        }
    };

    if casted.null_count() > 0 {
        return Err(DataError::ColumnWrongType {
            column_name: column_name.to_string(),
            expected_type: "f64 (numeric)",
            found_type: format!("{:?}", series.dtype()),
        });
    }

    let chunked = casted.f64()?.rechunk();
    let values: Vec<f64> = chunked.into_no_null_iter().collect();
    validate_is_finite(&values, column_name)?;
    Ok(values)
}

fn validate_is_finite(values: &[f64], column_name: &str) -> Result<(), DataError> {
    if values.iter().any(|&v| !v.is_finite()) {
        return Err(DataError::NonFiniteValuesFound(column_name.to_string()));
    }
    Ok(())
}
