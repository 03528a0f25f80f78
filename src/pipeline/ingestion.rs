//! Data ingestion stage: make the raw dataset available locally.

use crate::config::DataIngestionConfig;
use crate::error::{PipelineError, Result, ResultExt as _};
use std::path::{Path, PathBuf};

/// Where the local dataset came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome {
    /// The file was already present and left untouched
    AlreadyPresent,
    Downloaded { bytes: u64 },
    Copied { bytes: u64 },
}

pub struct DataIngestion {
    config: DataIngestionConfig,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Self {
        Self { config }
    }

    pub fn local_data_file(&self) -> &Path {
        &self.config.local_data_file
    }

    pub fn run(&self) -> Result<IngestionOutcome> {
        self.ingest().inspect_err(|e| {
            tracing::error!(stage = "data_ingestion", error = %e, "Error in data ingestion");
        })
    }

    fn ingest(&self) -> Result<IngestionOutcome> {
        let dest = &self.config.local_data_file;
        if dest.exists() {
            tracing::info!("{} already exists, skipping download", dest.display());
            return Ok(IngestionOutcome::AlreadyPresent);
        }

        std::fs::create_dir_all(&self.config.root_dir)?;
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let source = self.config.source.trim();
        let outcome = if is_remote(source) {
            IngestionOutcome::Downloaded {
                bytes: download(source, dest)?,
            }
        } else {
            let path = PathBuf::from(source);
            if !path.exists() {
                return Err(PipelineError::not_found("Source dataset", &path));
            }
            let bytes = std::fs::copy(&path, dest)
                .with_context(|| format!("Failed to copy {} to {}", path.display(), dest.display()))?;
            IngestionOutcome::Copied { bytes }
        };

        tracing::info!("Dataset from {source} stored at {} ({outcome:?})", dest.display());
        Ok(outcome)
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Blocking GET of `url` into `dest`. Non-success statuses are I/O errors.
fn download(url: &str, dest: &Path) -> Result<u64> {
    let mut response = reqwest::blocking::get(url)?;
    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Io(std::io::Error::other(format!(
            "Download of {url} failed with status {status}"
        ))));
    }

    let mut file = std::fs::File::create(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    let bytes = response.copy_to(&mut file)?;
    Ok(bytes)
}
