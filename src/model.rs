//! Persisted linear model.
//!
//! Training produces a [`LinearModel`]: the fitted coefficients together with
//! the feature columns they belong to, stored as JSON. Evaluation and the
//! prediction form both load it back from disk.

use crate::config::ModelKind;
use crate::error::{PipelineError, Result};
use crate::io::{column_as_f64, load_json, save_json};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub kind: ModelKind,
    pub target: String,
    pub feature_columns: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub trained_at: DateTime<Utc>,
}

impl LinearModel {
    pub fn new(
        kind: ModelKind,
        target: impl Into<String>,
        feature_columns: Vec<String>,
        coefficients: Vec<f64>,
        intercept: f64,
    ) -> Result<Self> {
        if feature_columns.len() != coefficients.len() {
            return Err(PipelineError::Model(format!(
                "{} feature columns but {} coefficients",
                feature_columns.len(),
                coefficients.len()
            )));
        }
        Ok(Self {
            kind,
            target: target.into(),
            feature_columns,
            coefficients,
            intercept,
            trained_at: Utc::now(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.feature_columns.len()
    }

    /// Predict one row given in `feature_columns` order.
    pub fn predict_row(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features() {
            return Err(PipelineError::Model(format!(
                "Expected {} features, got {}",
                self.n_features(),
                features.len()
            )));
        }
        Ok(self.intercept
            + features
                .iter()
                .zip(&self.coefficients)
                .map(|(x, w)| x * w)
                .sum::<f64>())
    }

    /// Predict every row of `df`, selecting the model's feature columns by name.
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = feature_matrix(df, &self.feature_columns)?;
        let weights = Array1::from(self.coefficients.clone());
        Ok(x.dot(&weights) + self.intercept)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let model: Self = load_json(path, "Model")?;
        if model.feature_columns.len() != model.coefficients.len() {
            return Err(PipelineError::Model(format!(
                "Model file {} is inconsistent: {} features, {} coefficients",
                path.display(),
                model.feature_columns.len(),
                model.coefficients.len()
            )));
        }
        Ok(model)
    }
}

/// Build a row-major `f64` matrix from the named columns.
///
/// Absent columns are schema errors; missing values are rejected.
pub fn feature_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut values = Vec::with_capacity(columns.len());
    for name in columns {
        let column = column_as_f64(df, name)?;
        let dense: Option<Vec<f64>> = column.into_iter().collect();
        let dense = dense.ok_or_else(|| {
            PipelineError::DataProcessing(format!("Feature column '{name}' contains missing values"))
        })?;
        values.push(dense);
    }

    Ok(Array2::from_shape_fn((df.height(), columns.len()), |(row, col)| {
        values[col][row]
    }))
}
