//! Fitted Preprocessor
//!
//! Column transformer exported from training: standard scaling for
//! continuous columns, one-hot encoding for categoricals, passthrough for
//! binary flags. Output features are named `<column>` or `<column>_<token>`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::normalize::FeatureValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaledColumn {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotColumn {
    pub column: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    #[serde(default)]
    pub numeric: Vec<ScaledColumn>,
    #[serde(default)]
    pub categorical: Vec<OneHotColumn>,
    #[serde(default)]
    pub passthrough: Vec<String>,
}

/// Input did not match what the preprocessor was fit on
#[derive(Debug, Clone, PartialEq)]
pub enum TransformError {
    MissingColumn(String),
    ExpectedNumber(String),
    ExpectedCategory(String),
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::MissingColumn(c) => write!(f, "column '{}' not provided", c),
            TransformError::ExpectedNumber(c) => write!(f, "column '{}' must be numeric", c),
            TransformError::ExpectedCategory(c) => write!(f, "column '{}' must be categorical", c),
        }
    }
}

impl Preprocessor {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Every input column, in transformer order
    pub fn input_columns(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .map(|c| c.column.as_str())
            .chain(self.categorical.iter().map(|c| c.column.as_str()))
            .chain(self.passthrough.iter().map(String::as_str))
            .collect()
    }

    /// Output feature names in transformer order
    pub fn output_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|c| c.column.clone()).collect();
        for cat in &self.categorical {
            names.extend(cat.categories.iter().map(|t| one_hot_name(&cat.column, t)));
        }
        names.extend(self.passthrough.iter().cloned());
        names
    }

    /// Column names appearing more than once across transformers
    pub fn duplicate_columns(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.input_columns()
            .into_iter()
            .filter(|c| !seen.insert(*c))
            .map(str::to_string)
            .collect()
    }

    /// Apply the fitted transform, keyed by output feature name.
    pub fn transform(
        &self,
        inputs: &BTreeMap<&str, FeatureValue>,
    ) -> Result<BTreeMap<String, f32>, TransformError> {
        let mut out = BTreeMap::new();

        for col in &self.numeric {
            let value = number(inputs, &col.column)?;
            let scale = if col.scale == 0.0 { 1.0 } else { col.scale };
            out.insert(col.column.clone(), ((value - col.mean) / scale) as f32);
        }

        for col in &self.categorical {
            let token = match inputs.get(col.column.as_str()) {
                Some(FeatureValue::Category(token)) => *token,
                Some(FeatureValue::Number(_)) => {
                    return Err(TransformError::ExpectedCategory(col.column.clone()))
                }
                None => return Err(TransformError::MissingColumn(col.column.clone())),
            };
            for category in &col.categories {
                let hot = if category == token { 1.0 } else { 0.0 };
                out.insert(one_hot_name(&col.column, category), hot);
            }
        }

        for column in &self.passthrough {
            let value = number(inputs, column)?;
            out.insert(column.clone(), value as f32);
        }

        Ok(out)
    }
}

pub fn one_hot_name(column: &str, token: &str) -> String {
    format!("{}_{}", column, token)
}

fn number(inputs: &BTreeMap<&str, FeatureValue>, column: &str) -> Result<f64, TransformError> {
    match inputs.get(column) {
        Some(FeatureValue::Number(v)) => Ok(*v),
        Some(FeatureValue::Category(_)) => Err(TransformError::ExpectedNumber(column.to_string())),
        None => Err(TransformError::MissingColumn(column.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Preprocessor {
        Preprocessor::from_slice(
            br#"{
                "numeric": [{"column": "age", "mean": 50.0, "scale": 10.0}],
                "categorical": [{"column": "gender", "categories": ["Female", "Male"]}],
                "passthrough": ["diabetes"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_output_names() {
        assert_eq!(
            small().output_names(),
            vec!["age", "gender_Female", "gender_Male", "diabetes"]
        );
    }

    #[test]
    fn test_transform() {
        let inputs = BTreeMap::from([
            ("age", FeatureValue::Number(65.0)),
            ("gender", FeatureValue::Category("Male")),
            ("diabetes", FeatureValue::Number(1.0)),
        ]);

        let out = small().transform(&inputs).unwrap();
        assert_eq!(out["age"], 1.5);
        assert_eq!(out["gender_Female"], 0.0);
        assert_eq!(out["gender_Male"], 1.0);
        assert_eq!(out["diabetes"], 1.0);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_zero_scale_is_identity_scale() {
        let pre = Preprocessor::from_slice(
            br#"{"numeric": [{"column": "age", "mean": 40.0, "scale": 0.0}]}"#,
        )
        .unwrap();
        let inputs = BTreeMap::from([("age", FeatureValue::Number(42.0))]);
        assert_eq!(pre.transform(&inputs).unwrap()["age"], 2.0);
    }

    #[test]
    fn test_transform_errors() {
        let pre = small();

        let missing = BTreeMap::from([("age", FeatureValue::Number(1.0))]);
        assert_eq!(
            pre.transform(&missing).unwrap_err(),
            TransformError::MissingColumn("gender".to_string())
        );

        let wrong = BTreeMap::from([
            ("age", FeatureValue::Category("Male")),
            ("gender", FeatureValue::Category("Male")),
            ("diabetes", FeatureValue::Number(0.0)),
        ]);
        assert_eq!(
            pre.transform(&wrong).unwrap_err(),
            TransformError::ExpectedNumber("age".to_string())
        );
    }

    #[test]
    fn test_duplicate_columns() {
        let pre = Preprocessor::from_slice(
            br#"{"numeric": [{"column": "age", "mean": 0.0, "scale": 1.0}], "passthrough": ["age"]}"#,
        )
        .unwrap();
        assert_eq!(pre.duplicate_columns(), vec!["age"]);
        assert!(small().duplicate_columns().is_empty());
    }
}
