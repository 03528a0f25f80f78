//! Dataset schema: declared column types plus the target column.
//!
//! Loaded once from `schema.yaml` and never mutated afterwards.

use polars::prelude::DataType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared type marker used in `schema.yaml` for categorical columns.
pub const CATEGORICAL_MARKER: &str = "object";

/// Declared type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Categorical,
    Integer,
    Float,
    Boolean,
}

impl ColumnType {
    /// Parse a declared marker (`object`, `int64`, `float64`, `bool`, ...).
    pub fn parse_marker(marker: &str) -> Option<Self> {
        match marker.trim().to_lowercase().as_str() {
            CATEGORICAL_MARKER | "category" | "str" | "string" => Some(Self::Categorical),
            "int" | "int8" | "int16" | "int32" | "int64" => Some(Self::Integer),
            "float" | "float32" | "float64" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Whether a loaded Polars column is compatible with this declaration.
    ///
    /// Integers are accepted where floats are declared; a column that came
    /// in entirely empty (read as string) is accepted for anything.
    pub fn accepts(&self, dtype: &DataType) -> bool {
        match self {
            Self::Categorical => !dtype.is_primitive_numeric() || dtype.is_null(),
            Self::Integer => dtype.is_integer() || dtype.is_null(),
            Self::Float => dtype.is_primitive_numeric() || dtype.is_null(),
            Self::Boolean => dtype.is_bool() || dtype.is_integer() || dtype.is_null(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetColumn {
    pub name: String,
}

/// Column name → declared type, plus the designated target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "COLUMNS")]
    columns: BTreeMap<String, String>,

    #[serde(rename = "TARGET_COLUMN")]
    target: TargetColumn,
}

impl Schema {
    pub fn new(columns: BTreeMap<String, String>, target: impl Into<String>) -> Self {
        Self {
            columns,
            target: TargetColumn {
                name: target.into(),
            },
        }
    }

    pub fn target_column(&self) -> &str {
        &self.target.name
    }

    pub fn columns(&self) -> &BTreeMap<String, String> {
        &self.columns
    }

    pub fn declared_marker(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.declared_marker(column).and_then(ColumnType::parse_marker)
    }

    pub fn is_declared(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Whether the declared marker equals the categorical marker exactly.
    pub fn is_categorical(&self, column: &str) -> bool {
        self.declared_marker(column) == Some(CATEGORICAL_MARKER)
    }

    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let schema: Self = serde_yaml::from_str(yaml)?;
        if schema.target.name.trim().is_empty() {
            return Err(crate::error::PipelineError::Configuration(
                "TARGET_COLUMN.name must not be empty".to_owned(),
            ));
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA_YAML: &str = r"
COLUMNS:
  gender: object
  age: float64
  hypertension: int64
  smoking_history: object
  diabetes: int64
TARGET_COLUMN:
  name: diabetes
";

    #[test]
    fn test_schema_from_yaml() {
        let schema = Schema::from_yaml(SCHEMA_YAML).expect("valid schema");
        assert_eq!(schema.target_column(), "diabetes");
        assert!(schema.is_categorical("gender"));
        assert!(!schema.is_categorical("age"));
        assert_eq!(schema.column_type("hypertension"), Some(ColumnType::Integer));
        assert!(!schema.is_declared("unknown"));
    }

    #[test]
    fn test_empty_target_is_configuration_error() {
        let yaml = "COLUMNS: {}\nTARGET_COLUMN:\n  name: ''\n";
        let err = Schema::from_yaml(yaml).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_column_type_accepts() {
        assert!(ColumnType::Float.accepts(&DataType::Int64));
        assert!(ColumnType::Categorical.accepts(&DataType::String));
        assert!(!ColumnType::Integer.accepts(&DataType::String));
    }
}
