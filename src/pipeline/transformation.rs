//! Data transformation stage: gate → encode → split → write `train.csv` / `test.csv`.

use super::encoding::{EncodingPolicy, EncodingReport};
use super::split::Splitter;
use super::status::ValidationStatus;
use crate::config::DataTransformationConfig;
use crate::error::{Result, ResultExt as _};
use crate::io::{load_csv, save_csv};
use crate::schema::Schema;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Summary of one transformation run.
#[derive(Debug, Clone)]
pub struct TransformationReport {
    pub input_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub stratified: bool,
    pub columns: Vec<String>,
    pub encoding: EncodingReport,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub duration: Duration,
}

impl TransformationReport {
    pub fn summary(&self) -> String {
        format!(
            "Transformed {} rows → train {} / test {} ({}, {} encoding), {} columns, {:.2}s",
            self.input_rows,
            self.train_rows,
            self.test_rows,
            if self.stratified { "stratified" } else { "unstratified" },
            self.encoding.policy.as_str(),
            self.columns.len(),
            self.duration.as_secs_f64()
        )
    }
}

pub struct DataTransformation {
    config: DataTransformationConfig,
    schema: Schema,
    splitter: Splitter,
}

impl DataTransformation {
    pub fn new(config: DataTransformationConfig, schema: Schema) -> Self {
        Self {
            config,
            schema,
            splitter: Splitter::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: EncodingPolicy) -> Self {
        self.config.encoding = encoding;
        self
    }

    pub fn config(&self) -> &DataTransformationConfig {
        &self.config
    }

    /// Run the stage if `gate` is open.
    ///
    /// # Errors
    ///
    /// Validation error when the gate is closed (nothing is read or written),
    /// schema error when the target is absent, and any load, encode, split or
    /// write error unchanged.
    pub fn run(&self, gate: &ValidationStatus) -> Result<TransformationReport> {
        gate.ensure_passed()?;

        self.transform().inspect_err(|e| {
            tracing::error!(stage = "data_transformation", error = %e, "Error in data transformation");
        })
    }

    fn transform(&self) -> Result<TransformationReport> {
        let start = Instant::now();
        let data = load_csv(&self.config.data_path, "Dataset")?;
        let input_rows = data.height();
        tracing::info!(
            "Loaded {} rows x {} columns from {}",
            input_rows,
            data.width(),
            self.config.data_path.display()
        );

        let target = self.schema.target_column();
        let encoded = self.config.encoding.encode(&data, &self.schema)?;

        let mut table = encoded.features;
        table.with_column(encoded.target)?;

        let parts = self.splitter.split(&table, target)?;
        let stratified = parts.stratified;
        let (mut train, mut test) = parts.into_frames()?;

        std::fs::create_dir_all(&self.config.root_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.config.root_dir.display()
            )
        })?;

        let train_path = self.config.train_path();
        let test_path = self.config.test_path();
        save_csv(&mut train, &train_path)?;
        save_csv(&mut test, &test_path)?;

        let report = TransformationReport {
            input_rows,
            train_rows: train.height(),
            test_rows: test.height(),
            stratified,
            columns: crate::io::column_names(&train),
            encoding: encoded.report,
            train_path,
            test_path,
            duration: start.elapsed(),
        };

        tracing::info!("Data transformation completed successfully: {}", report.summary());
        Ok(report)
    }
}
