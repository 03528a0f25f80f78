//! CSV and JSON persistence helpers shared by the stages.

use crate::error::{PipelineError, Result, ResultExt as _};
use polars::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read a CSV file with a header row into a `DataFrame`.
///
/// A missing file is reported as a not-found I/O error naming `what`.
pub fn load_csv(path: &Path, what: &str) -> Result<DataFrame> {
    if !path.exists() {
        return Err(PipelineError::not_found(what, path));
    }

    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(10_000))
        .with_has_header(true)
        .finish()?
        .collect()
        .with_context(|| format!("Failed to read CSV {}", path.display()))?;

    Ok(df)
}

/// Write a `DataFrame` as CSV with a header row and no index column.
///
/// The file is truncated and rewritten in place.
pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("Failed to write CSV file {}", path.display()))?;

    Ok(())
}

/// Pretty-print `data` as JSON (4-space indent) to `path`.
pub fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut ser)?;
    std::fs::write(path, buf).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    if !path.exists() {
        return Err(PipelineError::not_found(what, path));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Names of all columns, in frame order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Cast a column to `f64` values; nulls stay `None`.
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::Schema(format!("Column '{name}' not found")))?;
    let casted = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{name}' is not numeric"))?;
    Ok(casted.f64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_roundtrip_keeps_order_and_header() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("nested").join("frame.csv");
        let mut df = DataFrame::new(vec![
            Column::from(Series::new("age".into(), vec![50.0, 61.5])),
            Column::from(Series::new("diabetes".into(), vec![0i64, 1])),
        ])?;

        save_csv(&mut df, &path)?;
        let content = std::fs::read_to_string(&path)?;
        assert!(content.starts_with("age,diabetes\n"));

        let loaded = load_csv(&path, "Frame")?;
        assert_eq!(column_names(&loaded), vec!["age", "diabetes"]);
        assert_eq!(loaded.height(), 2);
        Ok(())
    }

    #[test]
    fn test_load_csv_missing_file() {
        let err = load_csv(Path::new("does/not/exist.csv"), "Dataset").unwrap_err();
        assert!(matches!(err, PipelineError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
        assert!(err.to_string().contains("Dataset not found"));
    }

    #[test]
    fn test_save_json_uses_four_space_indent() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("out").join("metrics.json");
        let mut data = std::collections::BTreeMap::new();
        data.insert("rmse", 0.5);
        save_json(&path, &data)?;
        let content = std::fs::read_to_string(&path)?;
        assert!(content.contains("\n    \"rmse\": 0.5"));

        let back: std::collections::BTreeMap<String, f64> = load_json(&path, "Metrics")?;
        assert_eq!(back.get("rmse"), Some(&0.5));
        Ok(())
    }

    #[test]
    fn test_column_as_f64_missing_is_schema_error() -> Result<()> {
        let df = DataFrame::new(vec![Column::from(Series::new("a".into(), vec![1i64]))])?;
        assert_eq!(column_as_f64(&df, "a")?, vec![Some(1.0)]);
        assert!(matches!(column_as_f64(&df, "b"), Err(PipelineError::Schema(_))));
        Ok(())
    }
}
