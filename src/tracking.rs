//! Experiment tracking.
//!
//! The evaluation stage reports every run to an [`ExperimentTracker`]. Two
//! backends exist:
//!
//! - [`LocalTracker`] keeps runs as JSON files under a directory, used for
//!   `file:` URIs and plain paths.
//! - [`MlflowTracker`] talks to an MLflow tracking server over its REST API,
//!   used for `http(s)` URIs.

pub mod local;
pub mod mlflow;

pub use local::LocalTracker;
pub use mlflow::MlflowTracker;

use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything recorded about one evaluation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedRun {
    pub run_name: Option<String>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub tags: BTreeMap<String, String>,
    /// Serialized model to attach to the run
    pub model_path: Option<PathBuf>,
    /// Register the model under this name (remote backends only)
    pub registered_model_name: Option<String>,
}

pub trait ExperimentTracker {
    /// Record `run` and return the backend's run id.
    fn log_run(&mut self, run: &TrackedRun) -> Result<String>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Pick a tracker from a tracking URI.
///
/// `http://` and `https://` go to an MLflow server (credentials from the
/// environment); `file:` URIs and plain paths are local directories.
pub fn tracker_for_uri(uri: &str, experiment_id: &str) -> Result<Box<dyn ExperimentTracker>> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(PipelineError::Configuration(
            "Tracking URI is empty".to_owned(),
        ));
    }

    if uri.starts_with("http://") || uri.starts_with("https://") {
        return Ok(Box::new(MlflowTracker::from_env(uri, experiment_id)?));
    }

    if let Some(path) = uri.strip_prefix("file://").or_else(|| uri.strip_prefix("file:")) {
        return Ok(Box::new(LocalTracker::new(path)));
    }

    if let Some((scheme, _)) = uri.split_once("://") {
        return Err(PipelineError::Configuration(format!(
            "Unsupported tracking URI scheme '{scheme}'"
        )));
    }

    Ok(Box::new(LocalTracker::new(uri)))
}
