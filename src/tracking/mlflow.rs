//! MLflow tracking server client (REST API 2.0).
//!
//! Uses the blocking `reqwest` client, so it must not be called from inside an
//! async runtime.

use super::{ExperimentTracker, TrackedRun};
use crate::error::{PipelineError, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::Path;

pub const USERNAME_ENV: &str = "MLFLOW_TRACKING_USERNAME";
pub const PASSWORD_ENV: &str = "MLFLOW_TRACKING_PASSWORD";

const API_PREFIX: &str = "api/2.0/mlflow";
const ARTIFACTS_PREFIX: &str = "api/2.0/mlflow-artifacts/artifacts";
/// Artifact directory the model file is uploaded to, relative to the run.
pub const MODEL_ARTIFACT_DIR: &str = "model";

const RUN_FINISHED: &str = "FINISHED";
const RUN_FAILED: &str = "FAILED";

pub struct MlflowTracker {
    client: Client,
    base_url: String,
    experiment_id: String,
    username: Option<String>,
    password: Option<SecretString>,
}

impl MlflowTracker {
    pub fn new(base_url: impl Into<String>, experiment_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            experiment_id: experiment_id.into(),
            username: None,
            password: None,
        })
    }

    /// Like [`Self::new`], with basic-auth credentials read from
    /// `MLFLOW_TRACKING_USERNAME` / `MLFLOW_TRACKING_PASSWORD` when set.
    pub fn from_env(base_url: &str, experiment_id: &str) -> Result<Self> {
        let tracker = Self::new(base_url, experiment_id)?;
        match std::env::var(USERNAME_ENV) {
            Ok(username) if !username.is_empty() => {
                let password = std::env::var(PASSWORD_ENV).unwrap_or_default();
                Ok(tracker.with_credentials(username, SecretString::from(password)))
            }
            _ => Ok(tracker),
        }
    }

    pub fn with_credentials(mut self, username: String, password: SecretString) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{API_PREFIX}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Artifact proxy URL for `file_name` under the run's model directory.
    fn model_artifact_url(&self, run_id: &str, file_name: &str) -> String {
        format!(
            "{}/{ARTIFACTS_PREFIX}/{}/{run_id}/artifacts/{MODEL_ARTIFACT_DIR}/{file_name}",
            self.base_url.trim_end_matches('/'),
            self.experiment_id
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => {
                let password = self.password.as_ref().map(|p| p.expose_secret().to_owned());
                request.basic_auth(username, password)
            }
            None => request,
        }
    }

    fn send(&self, path: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let response = self
            .authorized(self.client.post(self.endpoint(path)).json(body))
            .send()?;
        let status = response.status();
        let text = response.text()?;
        if text.trim().is_empty() {
            return Ok((status, Value::Null));
        }
        let body = serde_json::from_str(&text).map_err(|e| {
            PipelineError::Tracking(format!(
                "{path} returned invalid JSON (status {status}): {e}"
            ))
        })?;
        Ok((status, body))
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let (status, response) = self.send(path, body)?;
        if status.is_success() {
            Ok(response)
        } else {
            Err(PipelineError::Tracking(format!(
                "{path} failed (status {status}): {response}"
            )))
        }
    }

    /// Upload the model file into the run's `model/` artifact directory.
    fn upload_model(&self, run_id: &str, model_path: &Path) -> Result<()> {
        let file_name = model_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                PipelineError::Tracking(format!(
                    "Model path {} has no file name",
                    model_path.display()
                ))
            })?;
        let bytes = std::fs::read(model_path)?;
        let size = bytes.len();

        let response = self
            .authorized(self.client.put(self.model_artifact_url(run_id, &file_name)).body(bytes))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Tracking(format!(
                "Model artifact upload failed (status {status}): {}",
                response.text().unwrap_or_default()
            )));
        }
        tracing::info!("Uploaded {file_name} ({size} bytes) to run {run_id}");
        Ok(())
    }

    fn register_model(&self, name: &str, run_id: &str) -> Result<()> {
        let (status, response) = self.send("registered-models/create", &json!({ "name": name }))?;
        if !status.is_success() && !is_already_exists(&response) {
            return Err(PipelineError::Tracking(format!(
                "registered-models/create failed (status {status}): {response}"
            )));
        }

        let version = self.post(
            "model-versions/create",
            &model_version_body(name, run_id),
        )?;
        tracing::info!(
            "Registered model '{name}' version {}",
            version["model_version"]["version"]
        );
        Ok(())
    }

    /// Everything after `runs/create`: metrics, params, model and registration.
    fn record(&self, run_id: &str, run: &TrackedRun) -> Result<()> {
        self.post("runs/log-batch", &log_batch_body(run_id, run, now_millis()))?;

        match &run.model_path {
            Some(model_path) => {
                self.upload_model(run_id, model_path)?;
                if let Some(name) = &run.registered_model_name {
                    self.register_model(name, run_id)?;
                }
            }
            None if run.registered_model_name.is_some() => {
                tracing::warn!("No model file for run {run_id}, skipping model registration");
            }
            None => {}
        }
        Ok(())
    }
}

impl ExperimentTracker for MlflowTracker {
    fn log_run(&mut self, run: &TrackedRun) -> Result<String> {
        let start = now_millis();
        let created = self.post(
            "runs/create",
            &create_run_body(&self.experiment_id, start, run),
        )?;
        let run_id = created["run"]["info"]["run_id"]
            .as_str()
            .ok_or_else(|| {
                PipelineError::Tracking(format!("runs/create returned no run id: {created}"))
            })?
            .to_owned();

        if let Err(e) = self.record(&run_id, run) {
            // A failed close is only logged
            if let Err(close) = self.post("runs/update", &update_run_body(&run_id, RUN_FAILED, now_millis())) {
                tracing::warn!("Could not mark run {run_id} as failed: {close}");
            }
            return Err(e);
        }

        self.post("runs/update", &update_run_body(&run_id, RUN_FINISHED, now_millis()))?;
        tracing::info!("Run {run_id} logged to {}", self.base_url);
        Ok(run_id)
    }

    fn backend(&self) -> &'static str {
        "mlflow"
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn key_values(map: &BTreeMap<String, String>) -> Vec<Value> {
    map.iter()
        .map(|(key, value)| json!({ "key": key, "value": value }))
        .collect()
}

fn is_already_exists(response: &Value) -> bool {
    response["error_code"].as_str() == Some("RESOURCE_ALREADY_EXISTS")
}

pub fn create_run_body(experiment_id: &str, start_time: i64, run: &TrackedRun) -> Value {
    let mut body = json!({
        "experiment_id": experiment_id,
        "start_time": start_time,
        "tags": key_values(&run.tags),
    });
    if let Some(name) = &run.run_name {
        body["run_name"] = json!(name);
    }
    body
}

pub fn log_batch_body(run_id: &str, run: &TrackedRun, timestamp: i64) -> Value {
    let metrics: Vec<Value> = run
        .metrics
        .iter()
        .map(|(key, value)| json!({ "key": key, "value": value, "timestamp": timestamp, "step": 0 }))
        .collect();

    let mut tags = run.tags.clone();
    if let Some(model_path) = &run.model_path {
        tags.insert("model_path".to_owned(), model_path.display().to_string());
    }

    json!({
        "run_id": run_id,
        "metrics": metrics,
        "params": key_values(&run.params),
        "tags": key_values(&tags),
    })
}

pub fn update_run_body(run_id: &str, status: &str, end_time: i64) -> Value {
    json!({ "run_id": run_id, "status": status, "end_time": end_time })
}

pub fn model_version_body(name: &str, run_id: &str) -> Value {
    json!({
        "name": name,
        "source": format!("runs:/{run_id}/{MODEL_ARTIFACT_DIR}"),
        "run_id": run_id,
    })
}
