//! Data validation stage.
//!
//! Checks the raw dataset's columns against the declared schema before any
//! transformation happens, and records the outcome both as a value and as the
//! status file later stages read.

use super::status::ValidationStatus;
use crate::config::DataValidationConfig;
use crate::error::Result;
use crate::io::load_csv;
use crate::schema::Schema;

/// One finding about the dataset's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub column: String,
    pub message: String,
    /// Whether this issue closes the gate
    pub blocking: bool,
}

impl SchemaIssue {
    fn blocking(column: &str, message: impl Into<String>) -> Self {
        Self {
            column: column.to_owned(),
            message: message.into(),
            blocking: true,
        }
    }

    fn warning(column: &str, message: impl Into<String>) -> Self {
        Self {
            column: column.to_owned(),
            message: message.into(),
            blocking: false,
        }
    }
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Column '{}': {}", self.column, self.message)
    }
}

/// Compare a loaded schema against the declared one.
///
/// Undeclared columns and a missing target are blocking; declared columns
/// that are absent and dtype mismatches are only reported.
pub fn validate_columns(input_schema: &polars::prelude::Schema, schema: &Schema) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();

    for (name, dtype) in input_schema.iter() {
        let name = name.as_str();
        match schema.declared_marker(name) {
            None => issues.push(SchemaIssue::blocking(name, "not declared in schema")),
            Some(marker) => match schema.column_type(name) {
                Some(kind) if !kind.accepts(dtype) => issues.push(SchemaIssue::warning(
                    name,
                    format!("declared '{marker}' but loaded as {dtype}"),
                )),
                Some(_) => {}
                None => issues.push(SchemaIssue::warning(
                    name,
                    format!("unrecognised declared type '{marker}'"),
                )),
            },
        }
    }

    let target = schema.target_column();
    if !input_schema.contains(target) {
        issues.push(SchemaIssue::blocking(target, "target column missing from dataset"));
    }

    for declared in schema.columns().keys() {
        if declared != target && !input_schema.contains(declared) {
            issues.push(SchemaIssue::warning(declared, "declared but absent from dataset"));
        }
    }

    issues
}

pub struct DataValidation {
    config: DataValidationConfig,
    schema: Schema,
}

impl DataValidation {
    pub fn new(config: DataValidationConfig, schema: Schema) -> Self {
        Self { config, schema }
    }

    /// Validate the dataset, write the status file and return the status.
    ///
    /// A failed validation is a normal outcome, not an error; errors are
    /// reserved for an unreadable dataset or an unwritable status file.
    pub fn run(&self) -> Result<ValidationStatus> {
        self.validate().inspect_err(|e| {
            tracing::error!(stage = "data_validation", error = %e, "Error in data validation");
        })
    }

    fn validate(&self) -> Result<ValidationStatus> {
        let data = load_csv(&self.config.data_path, "Dataset")?;
        let issues = validate_columns(&data.schema(), &self.schema);

        for issue in issues.iter().filter(|i| !i.blocking) {
            tracing::warn!("{issue}");
        }

        let blocking: Vec<String> = issues
            .iter()
            .filter(|i| i.blocking)
            .map(ToString::to_string)
            .collect();

        let status = if blocking.is_empty() {
            ValidationStatus::Passed
        } else {
            for issue in &blocking {
                tracing::error!("{issue}");
            }
            ValidationStatus::failed(blocking.join("; "))
        };

        std::fs::create_dir_all(&self.config.root_dir)?;
        status.write_to(&self.config.status_file)?;
        tracing::info!(
            "{} written to {}",
            status.status_line(),
            self.config.status_file.display()
        );

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{DataType, Field};
    use std::collections::BTreeMap;

    fn schema() -> Schema {
        let mut columns = BTreeMap::new();
        for (name, marker) in [
            ("gender", "object"),
            ("age", "float64"),
            ("bmi", "float64"),
            ("diabetes", "int64"),
        ] {
            columns.insert(name.to_owned(), marker.to_owned());
        }
        Schema::new(columns, "diabetes")
    }

    fn frame_schema(columns: &[(&str, DataType)]) -> polars::prelude::Schema {
        columns
            .iter()
            .map(|(name, dtype)| Field::new((*name).into(), dtype.clone()))
            .collect()
    }

    #[test]
    fn test_undeclared_column_blocks() {
        let input = frame_schema(&[
            ("gender", DataType::String),
            ("age", DataType::Float64),
            ("zipcode", DataType::String),
            ("diabetes", DataType::Int64),
        ]);
        let issues = validate_columns(&input, &schema());
        let blocking: Vec<_> = issues.iter().filter(|i| i.blocking).collect();
        assert_eq!(blocking.len(), 1);
        assert_eq!(blocking[0].column, "zipcode");
        // bmi is declared but absent: only a warning
        assert!(issues.iter().any(|i| i.column == "bmi" && !i.blocking));
    }

    #[test]
    fn test_dtype_mismatch_is_warning() {
        let input = frame_schema(&[
            ("gender", DataType::String),
            ("age", DataType::String),
            ("bmi", DataType::Float64),
            ("diabetes", DataType::Int64),
        ]);
        let issues = validate_columns(&input, &schema());
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].blocking);
        assert_eq!(issues[0].column, "age");
    }

    #[test]
    fn test_missing_target_blocks() {
        let input = frame_schema(&[("gender", DataType::String), ("age", DataType::Float64)]);
        let issues = validate_columns(&input, &schema());
        assert!(issues.iter().any(|i| i.column == "diabetes" && i.blocking));
    }

    #[test]
    fn test_run_writes_status_file() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let data_path = tmp.path().join("data.csv");
        std::fs::write(&data_path, "gender,age,bmi,diabetes\nMale,50.0,27.3,0\nFemale,61.0,30.1,1\n")?;
        let config = DataValidationConfig {
            root_dir: tmp.path().join("data_validation"),
            data_path: data_path.clone(),
            status_file: tmp.path().join("data_validation").join("status.txt"),
        };

        let status = DataValidation::new(config.clone(), schema()).run()?;
        assert!(status.is_passed());
        assert_eq!(
            std::fs::read_to_string(&config.status_file)?,
            "Validation status: True"
        );

        std::fs::write(&data_path, "gender,age,extra,diabetes\nMale,50.0,x,0\n")?;
        let status = DataValidation::new(config.clone(), schema()).run()?;
        assert!(!status.is_passed());
        assert_eq!(
            std::fs::read_to_string(&config.status_file)?,
            "Validation status: False"
        );
        Ok(())
    }
}
