//! Model evaluation stage: score the persisted model on `test.csv`, write the
//! metrics file and report the run to experiment tracking.

use crate::config::ModelEvaluationConfig;
use crate::error::{PipelineError, Result};
use crate::io::{has_column, load_csv, save_json};
use crate::model::LinearModel;
use crate::tracking::{ExperimentTracker, TrackedRun};
use linfa::prelude::*;
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl EvaluationMetrics {
    /// Compare `predicted` against `actual`.
    ///
    /// When every actual value is the same, R² is 1.0 for exact predictions
    /// and 0.0 otherwise.
    pub fn compute(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<Self> {
        if actual.is_empty() {
            return Err(PipelineError::Validation(
                "Cannot evaluate on an empty test set".to_owned(),
            ));
        }
        if actual.len() != predicted.len() {
            return Err(PipelineError::Model(format!(
                "{} predictions for {} targets",
                predicted.len(),
                actual.len()
            )));
        }

        let metric_err = |e: linfa::Error| PipelineError::Model(format!("Failed to compute metrics: {e}"));
        let mse = predicted.mean_squared_error(actual).map_err(metric_err)?;
        let mae = predicted.mean_absolute_error(actual).map_err(metric_err)?;

        let first = actual[0];
        let r2 = if actual.iter().all(|v| *v == first) {
            if predicted == actual { 1.0 } else { 0.0 }
        } else {
            predicted.r2(actual).map_err(metric_err)?
        };

        Ok(Self {
            rmse: mse.sqrt(),
            mae,
            r2,
        })
    }

    pub fn as_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("rmse".to_owned(), self.rmse),
            ("mae".to_owned(), self.mae),
            ("r2".to_owned(), self.r2),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub metrics: EvaluationMetrics,
    pub rows: usize,
    pub run_id: String,
}

pub struct ModelEvaluation {
    config: ModelEvaluationConfig,
    params: BTreeMap<String, String>,
    target: String,
}

impl ModelEvaluation {
    pub fn new(
        config: ModelEvaluationConfig,
        params: BTreeMap<String, String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            config,
            params,
            target: target.into(),
        }
    }

    pub fn run(&self, tracker: &mut dyn ExperimentTracker) -> Result<EvaluationReport> {
        self.evaluate(tracker).inspect_err(|e| {
            tracing::error!(stage = "model_evaluation", error = %e, "Error during model evaluation");
        })
    }

    fn evaluate(&self, tracker: &mut dyn ExperimentTracker) -> Result<EvaluationReport> {
        let test_data = load_csv(&self.config.test_data_path, "Test data")?;
        tracing::info!(
            "Test data shape: ({}, {})",
            test_data.height(),
            test_data.width()
        );
        let model = LinearModel::load(&self.config.model_path)?;

        let target = self.target.as_str();
        if !has_column(&test_data, target) {
            return Err(PipelineError::Schema(format!(
                "Target column '{target}' not found in test data"
            )));
        }
        if test_data.height() == 0 {
            return Err(PipelineError::Validation(
                "Cannot evaluate on an empty test set".to_owned(),
            ));
        }

        let actual: Array1<f64> = test_data
            .column(target)?
            .as_materialized_series()
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| {
                PipelineError::DataProcessing(format!("Target column '{target}' has missing values"))
            })?
            .into();

        tracing::info!(
            "Predicting on {} test samples with features {:?}",
            test_data.height(),
            model.feature_columns
        );
        let predicted = model.predict_frame(&test_data)?;
        let metrics = EvaluationMetrics::compute(&actual, &predicted)?;
        tracing::info!(
            "Evaluation metrics - RMSE: {:.4}, MAE: {:.4}, R²: {:.4}",
            metrics.rmse,
            metrics.mae,
            metrics.r2
        );

        save_json(&self.config.metric_file_name, &metrics)?;
        tracing::info!("Metrics saved to: {}", self.config.metric_file_name.display());

        let run = TrackedRun {
            run_name: Some(format!("{} evaluation", model.kind.as_str())),
            params: self.params.clone(),
            metrics: metrics.as_map(),
            tags: BTreeMap::from([
                ("model_kind".to_owned(), model.kind.as_str().to_owned()),
                ("target".to_owned(), target.to_owned()),
            ]),
            model_path: Some(self.config.model_path.clone()),
            registered_model_name: self.config.registered_model_name.clone(),
        };
        let run_id = tracker.log_run(&run)?;
        tracing::info!("Model and metrics logged to {} tracker", tracker.backend());

        Ok(EvaluationReport {
            metrics,
            rows: test_data.height(),
            run_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelKind;
    use crate::io::load_json;
    use ndarray::array;

    struct RecordingTracker {
        runs: Vec<TrackedRun>,
    }

    impl ExperimentTracker for RecordingTracker {
        fn log_run(&mut self, run: &TrackedRun) -> Result<String> {
            self.runs.push(run.clone());
            Ok(format!("run-{}", self.runs.len()))
        }

        fn backend(&self) -> &'static str {
            "recording"
        }
    }

    #[test]
    fn test_metrics() -> Result<()> {
        let metrics = EvaluationMetrics::compute(&array![1.0, 2.0, 3.0, 4.0], &array![1.0, 2.0, 3.0, 5.0])?;
        assert!((metrics.rmse - 0.5).abs() < 1e-9);
        assert!((metrics.mae - 0.25).abs() < 1e-9);
        assert!((metrics.r2 - 0.8).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_constant_target_r2() -> Result<()> {
        let exact = EvaluationMetrics::compute(&array![1.0, 1.0], &array![1.0, 1.0])?;
        assert_eq!(exact.r2, 1.0);
        let off = EvaluationMetrics::compute(&array![1.0, 1.0], &array![1.0, 0.5])?;
        assert_eq!(off.r2, 0.0);
        Ok(())
    }

    #[test]
    fn test_empty_is_validation_error() {
        let err = EvaluationMetrics::compute(&Array1::zeros(0), &Array1::zeros(0)).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    fn setup(dir: &std::path::Path) -> ModelEvaluationConfig {
        std::fs::write(dir.join("test.csv"), "age,bmi,diabetes\n1,2,4\n2,1,1\n3,3,5\n").expect("test.csv");
        LinearModel::new(
            ModelKind::LinearRegression,
            "diabetes",
            vec!["age".to_owned(), "bmi".to_owned()],
            vec![-1.0, 2.0],
            1.0,
        )
        .and_then(|m| m.save(&dir.join("model.json")))
        .expect("model");

        ModelEvaluationConfig {
            root_dir: dir.join("model_evaluation"),
            test_data_path: dir.join("test.csv"),
            model_path: dir.join("model.json"),
            metric_file_name: dir.join("model_evaluation").join("metrics.json"),
            mlflow_uri: "file:mlruns".to_owned(),
            experiment_id: "0".to_owned(),
            registered_model_name: None,
        }
    }

    #[test]
    fn test_run_writes_metrics_and_tracks() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let config = setup(tmp.path());
        let params = BTreeMap::from([("alpha".to_owned(), "0.2".to_owned())]);
        let mut tracker = RecordingTracker { runs: Vec::new() };

        let report = ModelEvaluation::new(config.clone(), params, "diabetes").run(&mut tracker)?;
        assert_eq!(report.run_id, "run-1");
        assert_eq!(report.rows, 3);
        // 1 - 1 + 4 = 4, 1 - 2 + 2 = 1, 1 - 3 + 6 = 4 (actual 5)
        assert!((report.metrics.mae - 1.0 / 3.0).abs() < 1e-9);

        let saved: EvaluationMetrics = load_json(&config.metric_file_name, "Metrics")?;
        assert_eq!(saved, report.metrics);
        let content = std::fs::read_to_string(&config.metric_file_name)?;
        assert!(content.contains("\n    \"rmse\""));

        let run = &tracker.runs[0];
        assert_eq!(run.params.get("alpha").map(String::as_str), Some("0.2"));
        assert_eq!(run.metrics.len(), 3);
        Ok(())
    }

    #[test]
    fn test_missing_model_is_io_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = setup(tmp.path());
        config.model_path = tmp.path().join("absent.json");
        let mut tracker = RecordingTracker { runs: Vec::new() };

        let err = ModelEvaluation::new(config, BTreeMap::new(), "diabetes")
            .run(&mut tracker)
            .unwrap_err();
        assert_eq!(err.kind(), "io");
        assert!(tracker.runs.is_empty());
    }

    #[test]
    fn test_missing_target_is_schema_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = setup(tmp.path());
        let mut tracker = RecordingTracker { runs: Vec::new() };

        let err = ModelEvaluation::new(config, BTreeMap::new(), "outcome")
            .run(&mut tracker)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }
}
