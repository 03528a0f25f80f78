//! Batch training pipeline.
//!
//! Stages run in a fixed order, each reading the artifacts of the previous
//! one from disk:
//!
//! 1. **Ingestion**: fetch or copy the raw CSV into `artifacts/data_ingestion`.
//! 2. **Validation**: check the dataset's columns against `schema.yaml` and
//!    record a [`ValidationStatus`].
//! 3. **Transformation**: encode categorical columns ([`EncodingPolicy`]),
//!    split 80/20 with seed 42 and write `train.csv` / `test.csv`. Refuses to
//!    run unless validation passed.
//! 4. **Training**: fit ElasticNet (or ordinary least squares) on `train.csv`.
//! 5. **Evaluation**: RMSE, MAE and R² on `test.csv`, written to
//!    `metrics.json` and reported to experiment tracking.
//!
//! Every stage logs its failure and returns the error unchanged; nothing is
//! retried.
//!
//! # Example
//!
//! ```no_run
//! use diabetes_risk::config::ConfigurationManager;
//! use diabetes_risk::pipeline::{DataTransformation, ValidationStatus};
//! use std::path::Path;
//!
//! let manager = ConfigurationManager::load(
//!     Path::new("config/config.yaml"),
//!     Path::new("config/params.yaml"),
//!     Path::new("config/schema.yaml"),
//! )?;
//! let gate = ValidationStatus::read_from(Path::new("artifacts/data_validation/status.txt"));
//! let report = DataTransformation::new(
//!     manager.data_transformation_config(),
//!     manager.schema().clone(),
//! )
//! .run(&gate)?;
//! println!("{}", report.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod encoding;
pub mod evaluation;
pub mod ingestion;
pub mod runner;
pub mod split;
pub mod status;
pub mod trainer;
pub mod transformation;
pub mod validation;

pub use encoding::{EncodedTable, EncodingPolicy, EncodingReport};
pub use evaluation::{EvaluationMetrics, EvaluationReport, ModelEvaluation};
pub use ingestion::{DataIngestion, IngestionOutcome};
pub use runner::{RunReport, run_all, run_all_with_tracker};
pub use split::{SplitParts, Splitter};
pub use status::{GATE_CLOSED_MESSAGE, ValidationStatus};
pub use trainer::{ModelTrainer, TrainingReport};
pub use transformation::{DataTransformation, TransformationReport};
pub use validation::{DataValidation, SchemaIssue, validate_columns};
