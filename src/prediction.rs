//! Single-record inference for the web form and the `predict` command.

use crate::error::{PipelineError, Result};
use crate::model::LinearModel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Feature names in the order the form submits them.
pub const FEATURE_ORDER: [&str; 8] = [
    "gender",
    "age",
    "hypertension",
    "heart_disease",
    "smoking_history",
    "bmi",
    "HbA1c_level",
    "blood_glucose_level",
];

/// One patient, already encoded the way the semantic mapping encodes
/// training data (gender 0/1, smoking history 0/1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub gender: i64,
    pub age: f64,
    pub hypertension: f64,
    pub heart_disease: f64,
    pub smoking_history: i64,
    pub bmi: f64,
    #[serde(rename = "HbA1c_level")]
    pub hba1c_level: f64,
    pub blood_glucose_level: f64,
}

impl PatientRecord {
    /// Parse submitted form fields. Every field is required.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            gender: parse_field(fields, "gender")?,
            age: parse_field(fields, "age")?,
            hypertension: parse_field(fields, "hypertension")?,
            heart_disease: parse_field(fields, "heart_disease")?,
            smoking_history: parse_field(fields, "smoking_history")?,
            bmi: parse_field(fields, "bmi")?,
            hba1c_level: parse_field(fields, "HbA1c_level")?,
            blood_glucose_level: parse_field(fields, "blood_glucose_level")?,
        })
    }

    /// Build a record from values in [`FEATURE_ORDER`].
    pub fn from_values(values: [f64; 8]) -> Self {
        let [gender, age, hypertension, heart_disease, smoking_history, bmi, hba1c, glucose] = values;
        Self {
            gender: gender as i64,
            age,
            hypertension,
            heart_disease,
            smoking_history: smoking_history as i64,
            bmi,
            hba1c_level: hba1c,
            blood_glucose_level: glucose,
        }
    }

    pub fn to_feature_vector(&self) -> [f64; 8] {
        [
            self.gender as f64,
            self.age,
            self.hypertension,
            self.heart_disease,
            self.smoking_history as f64,
            self.bmi,
            self.hba1c_level,
            self.blood_glucose_level,
        ]
    }
}

fn parse_field<T: std::str::FromStr>(fields: &HashMap<String, String>, name: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = fields
        .get(name)
        .ok_or_else(|| PipelineError::Validation(format!("Missing form field '{name}'")))?;
    raw.trim()
        .parse()
        .map_err(|e| PipelineError::Validation(format!("Invalid value '{raw}' for '{name}': {e}")))
}

/// A loaded model ready to score patient records.
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    model: LinearModel,
    /// Position in [`FEATURE_ORDER`] of each model feature
    positions: Vec<usize>,
}

impl PredictionPipeline {
    pub fn from_path(path: &Path) -> Result<Self> {
        let model = LinearModel::load(path)?;
        tracing::info!(
            "Loaded {} model from {}",
            model.kind.as_str(),
            path.display()
        );
        Self::new(model)
    }

    /// Fails if the model expects a feature the form does not provide, as
    /// with a model trained on one-hot indicator columns.
    pub fn new(model: LinearModel) -> Result<Self> {
        let positions = model
            .feature_columns
            .iter()
            .map(|name| {
                FEATURE_ORDER
                    .iter()
                    .position(|f| *f == name.as_str())
                    .ok_or_else(|| {
                        PipelineError::Schema(format!(
                            "Model feature '{name}' is not provided by the prediction form"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { model, positions })
    }

    pub fn predict(&self, record: &PatientRecord) -> Result<f64> {
        let values = record.to_feature_vector();
        let row: Vec<f64> = self.positions.iter().map(|&i| values[i]).collect();
        self.model.predict_row(&row)
    }
}
