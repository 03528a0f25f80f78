//! Static configuration for every pipeline stage.
//!
//! Three YAML files are read once by [`ConfigurationManager::load`]:
//! `config.yaml` (paths per stage), `params.yaml` (model hyperparameters) and
//! `schema.yaml` (see [`crate::schema`]). Stages never read configuration on
//! their own; they receive the struct they need from the manager.

use crate::error::{PipelineError, Result, ResultExt as _};
use crate::pipeline::encoding::EncodingPolicy;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_PATH: &str = "config/config.yaml";
pub const PARAMS_FILE_PATH: &str = "config/params.yaml";
pub const SCHEMA_FILE_PATH: &str = "config/schema.yaml";

/// Environment variable overriding `model_evaluation.mlflow_uri`.
pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIngestionConfig {
    pub root_dir: PathBuf,
    /// HTTP(S) URL or local path of the raw CSV
    pub source: String,
    pub local_data_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataValidationConfig {
    pub root_dir: PathBuf,
    pub data_path: PathBuf,
    pub status_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTransformationConfig {
    pub root_dir: PathBuf,
    pub data_path: PathBuf,
    #[serde(default)]
    pub encoding: EncodingPolicy,
}

impl DataTransformationConfig {
    pub fn train_path(&self) -> PathBuf {
        self.root_dir.join("train.csv")
    }

    pub fn test_path(&self) -> PathBuf {
        self.root_dir.join("test.csv")
    }
}

/// Which linear estimator the trainer fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    ElasticNet,
    LinearRegression,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElasticNet => "ElasticNet",
            Self::LinearRegression => "Linear Regression",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTrainerConfig {
    pub root_dir: PathBuf,
    pub train_data_path: PathBuf,
    pub test_data_path: PathBuf,
    pub model_name: String,
    #[serde(default)]
    pub model_kind: ModelKind,
}

impl ModelTrainerConfig {
    pub fn model_path(&self) -> PathBuf {
        self.root_dir.join(&self.model_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEvaluationConfig {
    pub root_dir: PathBuf,
    pub test_data_path: PathBuf,
    pub model_path: PathBuf,
    pub metric_file_name: PathBuf,
    pub mlflow_uri: String,
    #[serde(default = "default_experiment_id")]
    pub experiment_id: String,
    #[serde(default)]
    pub registered_model_name: Option<String>,
}

fn default_experiment_id() -> String {
    "0".to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub artifacts_root: PathBuf,
    pub data_ingestion: DataIngestionConfig,
    pub data_validation: DataValidationConfig,
    pub data_transformation: DataTransformationConfig,
    pub model_trainer: ModelTrainerConfig,
    pub model_evaluation: ModelEvaluationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetParams {
    pub alpha: f64,
    pub l1_ratio: f64,
}

impl Default for ElasticNetParams {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            l1_ratio: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamsFile {
    #[serde(rename = "ElasticNet", default)]
    pub elastic_net: ElasticNetParams,
}

impl ParamsFile {
    /// Flat view of every hyperparameter, as forwarded to experiment tracking.
    pub fn all_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("alpha".to_owned(), self.elastic_net.alpha.to_string());
        params.insert("l1_ratio".to_owned(), self.elastic_net.l1_ratio.to_string());
        params
    }
}

/// Read-only holder of all three configuration files.
#[derive(Debug, Clone)]
pub struct ConfigurationManager {
    config: ConfigFile,
    params: ParamsFile,
    schema: Schema,
}

impl ConfigurationManager {
    pub fn new(config: ConfigFile, params: ParamsFile, schema: Schema) -> Self {
        Self {
            config,
            params,
            schema,
        }
    }

    /// Load all three files.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any file is missing or malformed.
    pub fn load(config_path: &Path, params_path: &Path, schema_path: &Path) -> Result<Self> {
        let config: ConfigFile = serde_yaml::from_str(&read_config_file(config_path)?)
            .with_context(|| format!("Invalid config file {}", config_path.display()))?;
        let params: ParamsFile = serde_yaml::from_str(&read_config_file(params_path)?)
            .with_context(|| format!("Invalid params file {}", params_path.display()))?;
        let schema = Schema::from_yaml(&read_config_file(schema_path)?)
            .with_context(|| format!("Invalid schema file {}", schema_path.display()))?;

        tracing::debug!(
            "Loaded configuration: artifacts_root={}, target={}",
            config.artifacts_root.display(),
            schema.target_column()
        );

        Ok(Self::new(config, params, schema))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn params(&self) -> &ParamsFile {
        &self.params
    }

    pub fn artifacts_root(&self) -> &Path {
        &self.config.artifacts_root
    }

    pub fn data_ingestion_config(&self) -> DataIngestionConfig {
        self.config.data_ingestion.clone()
    }

    pub fn data_validation_config(&self) -> DataValidationConfig {
        self.config.data_validation.clone()
    }

    pub fn data_transformation_config(&self) -> DataTransformationConfig {
        self.config.data_transformation.clone()
    }

    pub fn model_trainer_config(&self) -> ModelTrainerConfig {
        self.config.model_trainer.clone()
    }

    /// Evaluation config with the tracking URI taken from the environment
    /// when `MLFLOW_TRACKING_URI` is set.
    pub fn model_evaluation_config(&self) -> ModelEvaluationConfig {
        let mut config = self.config.model_evaluation.clone();
        if let Ok(uri) = std::env::var(TRACKING_URI_ENV)
            && !uri.trim().is_empty()
        {
            config.mlflow_uri = uri;
        }
        config
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Configuration(format!("Failed to read {}: {e}", path.display()))
    })
}
