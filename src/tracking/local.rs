use super::{ExperimentTracker, TrackedRun};
use crate::error::{Result, ResultExt as _};
use crate::io::save_json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Run record written to `<root>/<run_id>/run.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalRunRecord {
    pub run_id: String,
    pub run_name: Option<String>,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub tags: BTreeMap<String, String>,
    pub model_artifact: Option<PathBuf>,
}

pub struct LocalTracker {
    root: PathBuf,
}

impl LocalTracker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }
}

impl ExperimentTracker for LocalTracker {
    fn log_run(&mut self, run: &TrackedRun) -> Result<String> {
        let start_time = Utc::now();
        let run_id = Uuid::new_v4().simple().to_string();
        let run_dir = self.run_dir(&run_id);
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create run directory {}", run_dir.display()))?;

        let model_artifact = match &run.model_path {
            Some(model_path) => {
                let model_dir = run_dir.join("model");
                std::fs::create_dir_all(&model_dir)?;
                let file_name = model_path
                    .file_name()
                    .map_or_else(|| "model.json".into(), ToOwned::to_owned);
                let dest = model_dir.join(file_name);
                std::fs::copy(model_path, &dest).with_context(|| {
                    format!("Failed to copy model {} into run", model_path.display())
                })?;
                Some(dest)
            }
            None => None,
        };

        let record = LocalRunRecord {
            run_id: run_id.clone(),
            run_name: run.run_name.clone(),
            status: "FINISHED".to_owned(),
            start_time,
            end_time: Utc::now(),
            params: run.params.clone(),
            metrics: run.metrics.clone(),
            tags: run.tags.clone(),
            model_artifact,
        };
        save_json(&run_dir.join("run.json"), &record)?;

        tracing::info!("Run {run_id} recorded in {}", run_dir.display());
        Ok(run_id)
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::load_json;

    #[test]
    fn test_log_run_writes_record_and_model() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let model_path = tmp.path().join("model.json");
        std::fs::write(&model_path, "{}")?;

        let mut run = TrackedRun {
            model_path: Some(model_path),
            ..TrackedRun::default()
        };
        run.params.insert("alpha".to_owned(), "0.2".to_owned());
        run.metrics.insert("rmse".to_owned(), 0.25);

        let mut tracker = LocalTracker::new(tmp.path().join("mlruns"));
        let run_id = tracker.log_run(&run)?;

        let run_dir = tracker.run_dir(&run_id);
        let record: LocalRunRecord = load_json(&run_dir.join("run.json"), "Run record")?;
        assert_eq!(record.run_id, run_id);
        assert_eq!(record.params.get("alpha").map(String::as_str), Some("0.2"));
        assert_eq!(record.metrics.get("rmse"), Some(&0.25));
        assert!(run_dir.join("model").join("model.json").exists());
        Ok(())
    }

    #[test]
    fn test_missing_model_fails() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let run = TrackedRun {
            model_path: Some(tmp.path().join("absent.json")),
            ..TrackedRun::default()
        };
        let mut tracker = LocalTracker::new(tmp.path().join("mlruns"));
        assert!(tracker.log_run(&run).is_err());
    }
}
