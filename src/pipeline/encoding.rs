//! Categorical encoding of the feature table.
//!
//! Two policies exist and exactly one is used per run:
//!
//! - [`EncodingPolicy::SemanticMapping`] knows the domain columns. `gender`
//!   maps `Male`→0, `Female`→1 and anything else (including missing) to 0.
//!   `smoking_history` collapses to 0 for `never` (trimmed, any case) and 1
//!   for everything else. Other columns pass through untouched.
//! - [`EncodingPolicy::OneHot`] expands every column declared `object` in the
//!   schema into indicator columns, dropping the first (sorted) level.
//!
//! Both are expressed as Polars expressions over a lazy frame.
//!
//! Neither policy ever touches the target column.

use crate::error::{PipelineError, Result};
use crate::io::{column_names, has_column};
use crate::schema::Schema;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const GENDER_COLUMN: &str = "gender";
pub const SMOKING_HISTORY_COLUMN: &str = "smoking_history";

/// Code used for gender values outside the mapping table.
pub const GENDER_FALLBACK_CODE: i64 = 0;
/// Code for every smoking history other than `never`.
pub const SMOKING_OTHER_CODE: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingPolicy {
    #[default]
    #[serde(alias = "semantic")]
    SemanticMapping,
    #[serde(alias = "one-hot", alias = "dummies")]
    OneHot,
}

impl EncodingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SemanticMapping => "semantic_mapping",
            Self::OneHot => "one_hot",
        }
    }

    /// Split `table` into encoded features and the untouched target.
    ///
    /// # Errors
    ///
    /// Returns a schema error when the target column is absent; nothing is
    /// encoded in that case.
    pub fn encode(&self, table: &DataFrame, schema: &Schema) -> Result<EncodedTable> {
        let target_name = schema.target_column();
        if !has_column(table, target_name) {
            return Err(PipelineError::Schema(format!(
                "Target column '{target_name}' not found in dataset"
            )));
        }

        let target = table.column(target_name)?.as_materialized_series().clone();
        let features = table.drop(target_name)?;

        let mut report = EncodingReport::new(*self);
        let features = match self {
            Self::SemanticMapping => encode_semantic(features, &mut report)?,
            Self::OneHot => encode_one_hot(features, schema, &mut report)?,
        };

        report.emit();
        Ok(EncodedTable {
            features,
            target,
            report,
        })
    }
}

impl std::str::FromStr for EncodingPolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "semantic" | "semantic_mapping" => Ok(Self::SemanticMapping),
            "one_hot" | "dummies" => Ok(Self::OneHot),
            other => Err(PipelineError::Configuration(format!(
                "Unknown encoding policy '{other}' (expected 'semantic' or 'one_hot')"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncodedTable {
    pub features: DataFrame,
    pub target: Series,
    pub report: EncodingReport,
}

/// What the encoder did, for logs and for callers that want to assert on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingReport {
    pub policy: EncodingPolicy,
    /// Columns rewritten (semantic) or expanded (one-hot)
    pub affected_columns: Vec<String>,
    /// Rows that fell back to the default code, per column
    pub fallback_counts: BTreeMap<String, usize>,
    /// Expected columns the table did not have
    pub missing_columns: Vec<String>,
    /// Indicator columns created by one-hot expansion
    pub indicator_columns: Vec<String>,
}

impl EncodingReport {
    fn new(policy: EncodingPolicy) -> Self {
        Self {
            policy,
            affected_columns: Vec::new(),
            fallback_counts: BTreeMap::new(),
            missing_columns: Vec::new(),
            indicator_columns: Vec::new(),
        }
    }

    pub fn fallback_count(&self, column: &str) -> usize {
        self.fallback_counts.get(column).copied().unwrap_or(0)
    }

    fn emit(&self) {
        for column in &self.missing_columns {
            tracing::warn!("Column '{column}' not found in dataset");
        }
        for (column, count) in &self.fallback_counts {
            if *count > 0 {
                tracing::warn!(
                    "{count} rows have missing or unknown {column} value → filled with default code"
                );
            }
        }
        tracing::info!(
            policy = self.policy.as_str(),
            affected = ?self.affected_columns,
            indicators = self.indicator_columns.len(),
            "Categorical encoding applied"
        );
    }
}

fn encode_semantic(features: DataFrame, report: &mut EncodingReport) -> Result<DataFrame> {
    let mut mapped = Vec::new();

    if has_column(&features, GENDER_COLUMN) {
        let fallbacks = count_unmatched(&features, gender_known(as_text(GENDER_COLUMN)))?;
        mapped.push(gender_code(as_text(GENDER_COLUMN)).alias(GENDER_COLUMN));
        report.affected_columns.push(GENDER_COLUMN.to_owned());
        report
            .fallback_counts
            .insert(GENDER_COLUMN.to_owned(), fallbacks);
    } else {
        report.missing_columns.push(GENDER_COLUMN.to_owned());
    }

    if has_column(&features, SMOKING_HISTORY_COLUMN) {
        mapped.push(smoking_history_code(as_text(SMOKING_HISTORY_COLUMN)).alias(SMOKING_HISTORY_COLUMN));
        report.affected_columns.push(SMOKING_HISTORY_COLUMN.to_owned());
    } else {
        report.missing_columns.push(SMOKING_HISTORY_COLUMN.to_owned());
    }

    if mapped.is_empty() {
        return Ok(features);
    }
    // Replacing in place keeps the column order
    Ok(features.lazy().with_columns(mapped).collect()?)
}

/// Column `name` read as text, whatever dtype it was loaded with.
fn as_text(name: &str) -> Expr {
    col(name).cast(DataType::String)
}

fn gender_known(value: Expr) -> Expr {
    value.clone().eq(lit("Male")).or(value.eq(lit("Female")))
}

/// `Male`→0, `Female`→1, anything else (missing included) → fallback code.
fn gender_code(value: Expr) -> Expr {
    when(value.clone().eq(lit("Male")))
        .then(lit(0i64))
        .when(value.eq(lit("Female")))
        .then(lit(1i64))
        .otherwise(lit(GENDER_FALLBACK_CODE))
}

/// `never` (trimmed, any case) → 0, everything else → 1.
fn smoking_history_code(value: Expr) -> Expr {
    when(
        value
            .str()
            .strip_chars(lit(LiteralValue::Null))
            .str()
            .to_lowercase()
            .eq(lit("never")),
    )
    .then(lit(0i64))
    .otherwise(lit(SMOKING_OTHER_CODE))
}

/// Rows where `matched` is false or null.
fn count_unmatched(features: &DataFrame, matched: Expr) -> Result<usize> {
    let counted = features
        .clone()
        .lazy()
        .select([when(matched)
            .then(lit(0i64))
            .otherwise(lit(1i64))
            .sum()
            .alias("unmatched")])
        .collect()?;
    let unmatched = counted
        .column("unmatched")?
        .as_materialized_series()
        .i64()?
        .get(0)
        .unwrap_or(0);
    Ok(usize::try_from(unmatched).unwrap_or(0))
}

fn encode_one_hot(
    features: DataFrame,
    schema: &Schema,
    report: &mut EncodingReport,
) -> Result<DataFrame> {
    let present = column_names(&features);

    for declared in schema.columns().keys() {
        if declared != schema.target_column()
            && schema.is_categorical(declared)
            && !present.contains(declared)
        {
            report.missing_columns.push(declared.clone());
        }
    }

    let (categorical, kept): (Vec<String>, Vec<String>) = present
        .into_iter()
        .partition(|name| schema.is_categorical(name));
    if categorical.is_empty() {
        return Ok(features);
    }

    let mut names: BTreeSet<String> = kept.iter().cloned().collect();
    let mut expressions: Vec<Expr> = kept.iter().map(|name| col(name.as_str())).collect();

    for name in categorical {
        for level in levels(&features, &name)?.into_iter().skip(1) {
            let indicator = format!("{name}_{level}");
            if !names.insert(indicator.clone()) {
                return Err(PipelineError::DataProcessing(format!(
                    "Indicator column '{indicator}' collides with an existing column"
                )));
            }
            expressions.push(
                when(as_text(&name).eq(lit(level.as_str())))
                    .then(lit(1i32))
                    .otherwise(lit(0i32))
                    .alias(indicator.as_str()),
            );
            report.indicator_columns.push(indicator);
        }
        report.affected_columns.push(name);
    }

    // Missing values get 0 in every indicator
    Ok(features.lazy().select(expressions).collect()?)
}

/// Distinct non-null values of `name`, sorted; the first is the reference level.
fn levels(features: &DataFrame, name: &str) -> Result<BTreeSet<String>> {
    let as_text = features
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let unique = as_text.unique()?.drop_nulls();

    Ok(unique
        .str()?
        .into_iter()
        .flatten()
        .map(ToOwned::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        let mut columns = BTreeMap::new();
        for (name, marker) in [
            ("gender", "object"),
            ("age", "float64"),
            ("smoking_history", "object"),
            ("diabetes", "int64"),
        ] {
            columns.insert(name.to_owned(), marker.to_owned());
        }
        Schema::new(columns, "diabetes")
    }

    fn i64_values(df: &DataFrame, name: &str) -> Vec<i64> {
        df.column(name)
            .expect("column")
            .as_materialized_series()
            .i64()
            .expect("i64")
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_gender_fallback_scenario() -> Result<()> {
        let df = DataFrame::new(vec![
            Column::from(Series::new(
                "gender".into(),
                vec![Some("Male"), Some("Female"), Some("Unknown"), None],
            )),
            Column::from(Series::new("diabetes".into(), vec![0i64, 1, 0, 1])),
        ])?;

        let encoded = EncodingPolicy::SemanticMapping.encode(&df, &schema())?;

        assert_eq!(i64_values(&encoded.features, "gender"), vec![0, 1, 0, 0]);
        assert_eq!(encoded.report.fallback_count("gender"), 2);
        assert_eq!(encoded.report.missing_columns, vec!["smoking_history"]);
        Ok(())
    }

    #[test]
    fn test_smoking_history_scenario() -> Result<()> {
        let df = DataFrame::new(vec![
            Column::from(Series::new(
                "smoking_history".into(),
                vec![
                    Some("never"),
                    Some("Never "),
                    Some("current"),
                    Some("No Info"),
                    None,
                ],
            )),
            Column::from(Series::new("diabetes".into(), vec![0i64, 0, 1, 0, 1])),
        ])?;

        let encoded = EncodingPolicy::SemanticMapping.encode(&df, &schema())?;

        assert_eq!(
            i64_values(&encoded.features, "smoking_history"),
            vec![0, 0, 1, 1, 1]
        );
        assert_eq!(encoded.report.affected_columns, vec!["smoking_history"]);
        Ok(())
    }

    #[test]
    fn test_semantic_keeps_column_order_and_target() -> Result<()> {
        let df = DataFrame::new(vec![
            Column::from(Series::new("gender".into(), vec!["Female", "Male"])),
            Column::from(Series::new("age".into(), vec![44.0, 80.0])),
            Column::from(Series::new("smoking_history".into(), vec!["former", "never"])),
            Column::from(Series::new("diabetes".into(), vec![1i64, 0])),
        ])?;

        let encoded = EncodingPolicy::SemanticMapping.encode(&df, &schema())?;

        assert_eq!(
            column_names(&encoded.features),
            vec!["gender", "age", "smoking_history"]
        );
        assert_eq!(encoded.target.name().as_str(), "diabetes");
        assert_eq!(encoded.target.len(), 2);
        Ok(())
    }

    #[test]
    fn test_missing_target_is_schema_error() -> Result<()> {
        let df = DataFrame::new(vec![Column::from(Series::new(
            "gender".into(),
            vec!["Male"],
        ))])?;

        for policy in [EncodingPolicy::SemanticMapping, EncodingPolicy::OneHot] {
            let err = policy.encode(&df, &schema()).unwrap_err();
            assert!(matches!(err, PipelineError::Schema(_)), "got {err}");
        }
        Ok(())
    }

    #[test]
    fn test_one_hot_drops_reference_level() -> Result<()> {
        let df = DataFrame::new(vec![
            Column::from(Series::new(
                "gender".into(),
                vec![Some("Male"), Some("Female"), Some("Other"), None],
            )),
            Column::from(Series::new("age".into(), vec![1.0, 2.0, 3.0, 4.0])),
            Column::from(Series::new("diabetes".into(), vec![0i64, 1, 0, 1])),
        ])?;

        let encoded = EncodingPolicy::OneHot.encode(&df, &schema())?;

        // Levels sorted: Female (dropped), Male, Other
        assert_eq!(
            column_names(&encoded.features),
            vec!["age", "gender_Male", "gender_Other"]
        );
        let male: Vec<i32> = encoded
            .features
            .column("gender_Male")?
            .as_materialized_series()
            .i32()?
            .into_no_null_iter()
            .collect();
        assert_eq!(male, vec![1, 0, 0, 0]);
        assert_eq!(encoded.report.missing_columns, vec!["smoking_history"]);
        assert_eq!(encoded.report.indicator_columns.len(), 2);
        Ok(())
    }

    #[test]
    fn test_one_hot_reads_numeric_levels_as_text() -> Result<()> {
        let df = DataFrame::new(vec![
            Column::from(Series::new("gender".into(), vec![Some(2i64), Some(1), None, Some(2)])),
            Column::from(Series::new("diabetes".into(), vec![0i64, 1, 0, 1])),
        ])?;

        let encoded = EncodingPolicy::OneHot.encode(&df, &schema())?;

        assert_eq!(column_names(&encoded.features), vec!["gender_2"]);
        let twos: Vec<i32> = encoded
            .features
            .column("gender_2")?
            .as_materialized_series()
            .i32()?
            .into_no_null_iter()
            .collect();
        assert_eq!(twos, vec![1, 0, 0, 1]);
        Ok(())
    }

    #[test]
    fn test_semantic_counts_fallbacks_for_numeric_gender() -> Result<()> {
        let df = DataFrame::new(vec![
            Column::from(Series::new("gender".into(), vec![0i64, 1, 1])),
            Column::from(Series::new("diabetes".into(), vec![0i64, 1, 0])),
        ])?;

        let encoded = EncodingPolicy::SemanticMapping.encode(&df, &schema())?;

        assert_eq!(i64_values(&encoded.features, "gender"), vec![0, 0, 0]);
        assert_eq!(encoded.report.fallback_count("gender"), 3);
        Ok(())
    }

    #[test]
    fn test_one_hot_never_expands_target() -> Result<()> {
        let mut columns = BTreeMap::new();
        columns.insert("label".to_owned(), "object".to_owned());
        columns.insert("colour".to_owned(), "object".to_owned());
        let schema = Schema::new(columns, "label");

        let df = DataFrame::new(vec![
            Column::from(Series::new("colour".into(), vec!["red", "blue"])),
            Column::from(Series::new("label".into(), vec!["yes", "no"])),
        ])?;

        let encoded = EncodingPolicy::OneHot.encode(&df, &schema)?;
        assert_eq!(column_names(&encoded.features), vec!["colour_red"]);
        assert_eq!(encoded.target.name().as_str(), "label");
        Ok(())
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "one-hot".parse::<EncodingPolicy>().ok(),
            Some(EncodingPolicy::OneHot)
        );
        assert_eq!(
            "semantic".parse::<EncodingPolicy>().ok(),
            Some(EncodingPolicy::SemanticMapping)
        );
        assert!("label".parse::<EncodingPolicy>().is_err());
    }
}
