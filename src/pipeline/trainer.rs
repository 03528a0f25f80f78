//! Model training stage: fit a linear model on `train.csv` and persist it.

use crate::config::{ElasticNetParams, ModelKind, ModelTrainerConfig};
use crate::error::{PipelineError, Result};
use crate::io::{has_column, load_csv};
use crate::model::{LinearModel, feature_matrix};
use linfa::prelude::*;
use linfa_elasticnet::ElasticNet;
use linfa_linear::LinearRegression;
use ndarray::Array1;
use polars::prelude::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model_kind: ModelKind,
    pub rows: usize,
    pub feature_columns: Vec<String>,
    /// In-sample coefficient of determination
    pub r2_score: f64,
    pub model_path: PathBuf,
    pub duration: Duration,
}

pub struct ModelTrainer {
    config: ModelTrainerConfig,
    params: ElasticNetParams,
    target: String,
}

impl ModelTrainer {
    pub fn new(config: ModelTrainerConfig, params: ElasticNetParams, target: impl Into<String>) -> Self {
        Self {
            config,
            params,
            target: target.into(),
        }
    }

    pub fn run(&self) -> Result<TrainingReport> {
        self.train().inspect_err(|e| {
            tracing::error!(stage = "model_trainer", error = %e, "Error in model training");
        })
    }

    fn train(&self) -> Result<TrainingReport> {
        let start = Instant::now();
        let df = load_csv(&self.config.train_data_path, "Training data")?;
        let target = self.target.as_str();

        if !has_column(&df, target) {
            return Err(PipelineError::Schema(format!(
                "Target column '{target}' not found in {}",
                self.config.train_data_path.display()
            )));
        }

        // Rows without a target cannot be trained on
        let df = df.filter(&df.column(target)?.is_not_null())?;
        if df.height() == 0 {
            return Err(PipelineError::Validation(format!(
                "All rows in target column '{target}' are empty"
            )));
        }

        let feature_columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|s| s != target)
            .collect();
        if feature_columns.is_empty() {
            return Err(PipelineError::DataProcessing(
                "No feature columns found for training".to_owned(),
            ));
        }

        let x = feature_matrix(&df, &feature_columns)?;
        let y: Array1<f64> = df
            .column(target)?
            .as_materialized_series()
            .cast(&DataType::Float64)?
            .f64()?
            .into_no_null_iter()
            .collect();
        let dataset = Dataset::new(x, y);

        let model = match self.config.model_kind {
            ModelKind::ElasticNet => {
                let fitted = ElasticNet::<f64>::params()
                    .penalty(self.params.alpha)
                    .l1_ratio(self.params.l1_ratio)
                    .fit(&dataset)
                    .map_err(|e| PipelineError::Model(format!("ElasticNet training failed: {e}")))?;
                LinearModel::new(
                    ModelKind::ElasticNet,
                    target,
                    feature_columns.clone(),
                    fitted.hyperplane().to_vec(),
                    fitted.intercept(),
                )?
            }
            ModelKind::LinearRegression => {
                let fitted = LinearRegression::default()
                    .fit(&dataset)
                    .map_err(|e| PipelineError::Model(format!("Linear Regression training failed: {e}")))?;
                LinearModel::new(
                    ModelKind::LinearRegression,
                    target,
                    feature_columns.clone(),
                    fitted.params().to_vec(),
                    fitted.intercept(),
                )?
            }
        };

        let predicted = model.predict_frame(&df)?;
        let r2_score = predicted
            .r2(dataset.targets())
            .map_err(|e| PipelineError::Model(format!("Failed to score model: {e}")))?;

        std::fs::create_dir_all(&self.config.root_dir)?;
        let model_path = self.config.model_path();
        model.save(&model_path)?;

        let report = TrainingReport {
            model_kind: model.kind,
            rows: df.height(),
            feature_columns,
            r2_score,
            model_path,
            duration: start.elapsed(),
        };
        tracing::info!(
            "{} trained on {} rows x {} features (train R² {:.4}) in {:.2}s, saved to {}",
            report.model_kind.as_str(),
            report.rows,
            report.feature_columns.len(),
            report.r2_score,
            report.duration.as_secs_f64(),
            report.model_path.display()
        );
        Ok(report)
    }
}
