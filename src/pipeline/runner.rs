//! Stage entry points and the sequential training run.
//!
//! Each `run_*` function builds one stage from the [`ConfigurationManager`]
//! and runs it between start/finish markers. [`run_all`] chains them and
//! stops at the first failure.

use super::encoding::EncodingPolicy;
use super::evaluation::{EvaluationReport, ModelEvaluation};
use super::ingestion::{DataIngestion, IngestionOutcome};
use super::status::ValidationStatus;
use super::trainer::{ModelTrainer, TrainingReport};
use super::transformation::{DataTransformation, TransformationReport};
use super::validation::DataValidation;
use crate::config::ConfigurationManager;
use crate::error::Result;
use crate::tracking::{ExperimentTracker, tracker_for_uri};
use std::time::{Duration, Instant};

pub const INGESTION_STAGE: &str = "Data Ingestion stage";
pub const VALIDATION_STAGE: &str = "Data Validation stage";
pub const TRANSFORMATION_STAGE: &str = "Data Transformation stage";
pub const TRAINER_STAGE: &str = "Model Trainer stage";
pub const EVALUATION_STAGE: &str = "Model Evaluation stage";

/// Outcome of a full training run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub ingestion: IngestionOutcome,
    pub validation: ValidationStatus,
    pub transformation: TransformationReport,
    pub training: TrainingReport,
    pub evaluation: EvaluationReport,
    pub duration: Duration,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "Pipeline completed: {} train / {} test rows, RMSE {:.4}, MAE {:.4}, R² {:.4}, run {}, {:.2}s",
            self.transformation.train_rows,
            self.transformation.test_rows,
            self.evaluation.metrics.rmse,
            self.evaluation.metrics.mae,
            self.evaluation.metrics.r2,
            self.evaluation.run_id,
            self.duration.as_secs_f64()
        )
    }
}

fn stage<T>(name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    tracing::info!(">>>>>> {name} started <<<<<<");
    let value = f().inspect_err(|e| {
        tracing::error!("{name} failed: {e}");
    })?;
    tracing::info!(">>>>>> {name} completed <<<<<<");
    Ok(value)
}

pub fn run_ingestion(manager: &ConfigurationManager) -> Result<IngestionOutcome> {
    stage(INGESTION_STAGE, || {
        DataIngestion::new(manager.data_ingestion_config()).run()
    })
}

pub fn run_validation(manager: &ConfigurationManager) -> Result<ValidationStatus> {
    stage(VALIDATION_STAGE, || {
        DataValidation::new(manager.data_validation_config(), manager.schema().clone()).run()
    })
}

/// Run the transformation behind `gate`, or behind the status file when no
/// gate value is at hand.
pub fn run_transformation(
    manager: &ConfigurationManager,
    gate: Option<&ValidationStatus>,
    encoding: Option<EncodingPolicy>,
) -> Result<TransformationReport> {
    stage(TRANSFORMATION_STAGE, || {
        let gate = match gate {
            Some(gate) => gate.clone(),
            None => ValidationStatus::read_from(&manager.data_validation_config().status_file),
        };
        let mut transformation =
            DataTransformation::new(manager.data_transformation_config(), manager.schema().clone());
        if let Some(encoding) = encoding {
            transformation = transformation.with_encoding(encoding);
        }
        transformation.run(&gate)
    })
}

pub fn run_training(manager: &ConfigurationManager) -> Result<TrainingReport> {
    stage(TRAINER_STAGE, || {
        ModelTrainer::new(
            manager.model_trainer_config(),
            manager.params().elastic_net,
            manager.schema().target_column(),
        )
        .run()
    })
}

pub fn run_evaluation(
    manager: &ConfigurationManager,
    tracker: &mut dyn ExperimentTracker,
) -> Result<EvaluationReport> {
    stage(EVALUATION_STAGE, || {
        ModelEvaluation::new(
            manager.model_evaluation_config(),
            manager.params().all_params(),
            manager.schema().target_column(),
        )
        .run(tracker)
    })
}

/// Tracker configured for the evaluation stage.
pub fn configured_tracker(manager: &ConfigurationManager) -> Result<Box<dyn ExperimentTracker>> {
    let config = manager.model_evaluation_config();
    tracker_for_uri(&config.mlflow_uri, &config.experiment_id)
}

/// Ingestion → validation → transformation → training → evaluation.
pub fn run_all(manager: &ConfigurationManager) -> Result<RunReport> {
    let mut tracker = configured_tracker(manager)?;
    run_all_with_tracker(manager, tracker.as_mut())
}

pub fn run_all_with_tracker(
    manager: &ConfigurationManager,
    tracker: &mut dyn ExperimentTracker,
) -> Result<RunReport> {
    let start = Instant::now();

    let ingestion = run_ingestion(manager)?;
    let validation = run_validation(manager)?;
    let transformation = run_transformation(manager, Some(&validation), None)?;
    let training = run_training(manager)?;
    let evaluation = run_evaluation(manager, tracker)?;

    let report = RunReport {
        ingestion,
        validation,
        transformation,
        training,
        evaluation,
        duration: start.elapsed(),
    };
    tracing::info!("{}", report.summary());
    Ok(report)
}
