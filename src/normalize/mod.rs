//! Input Normalizer
//!
//! Turns a raw request into the canonical feature mapping the bundle's
//! preprocessor was fit on. Rules, applied per field:
//!
//! - `age`, `height_cm`, `weight_kg`: required numbers (JSON number or
//!   numeric string).
//! - `liver_function_score`, `alpha_fetoprotein_level`: optional labs;
//!   absent, `null` or blank means [`OPTIONAL_LAB_DEFAULT`].
//! - medical-history flags: coerced to 0/1.
//! - categoricals: folded and looked up in a closed vocabulary.
//!
//! `bmi` is derived from height and weight; the model never sees the two
//! raw measurements.

pub mod vocabulary;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::RawPredictionRequest;

pub use vocabulary::{fold, ActivityLevel, AlcoholConsumption, Gender, SmokingStatus, Vocabulary};

/// Value used for an optional lab field the client left out
pub const OPTIONAL_LAB_DEFAULT: f64 = 0.0;

pub const OPTIONAL_LAB_FIELDS: [&str; 2] = ["liver_function_score", "alpha_fetoprotein_level"];

pub const FLAG_FIELDS: [&str; 5] = [
    "hepatitis_b",
    "hepatitis_c",
    "cirrhosis_history",
    "family_history_cancer",
    "diabetes",
];

/// Per-request rejection. Always names the offending field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("field '{field}' {reason}")]
    MissingField { field: &'static str, reason: String },

    #[error("unknown value '{value}' for field '{field}' (expected one of: {})", expected.join(", "))]
    UnknownCategory {
        field: &'static str,
        value: String,
        expected: Vec<&'static str>,
    },

    #[error("invalid value '{value}' for flag '{field}' (expected 0 or 1)")]
    InvalidFlag { field: &'static str, value: String },
}

impl NormalizeError {
    pub fn field(&self) -> &'static str {
        match self {
            NormalizeError::MissingField { field, .. } => field,
            NormalizeError::UnknownCategory { field, .. } => field,
            NormalizeError::InvalidFlag { field, .. } => field,
        }
    }
}

/// A single model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Category(&'static str),
}

/// Canonical per-request features. One value per named field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedFeatures {
    pub age: f64,
    pub bmi: f64,
    pub liver_function_score: f64,
    pub alpha_fetoprotein_level: f64,
    pub hepatitis_b: u8,
    pub hepatitis_c: u8,
    pub cirrhosis_history: u8,
    pub family_history_cancer: u8,
    pub diabetes: u8,
    pub gender: Gender,
    pub alcohol_consumption: AlcoholConsumption,
    pub smoking_status: SmokingStatus,
    pub physical_activity_level: ActivityLevel,
}

impl NormalizedFeatures {
    /// Keyed view consumed by the preprocessor
    pub fn entries(&self) -> BTreeMap<&'static str, FeatureValue> {
        use FeatureValue::{Category, Number};

        BTreeMap::from([
            ("age", Number(self.age)),
            ("bmi", Number(self.bmi)),
            ("liver_function_score", Number(self.liver_function_score)),
            ("alpha_fetoprotein_level", Number(self.alpha_fetoprotein_level)),
            ("hepatitis_b", Number(f64::from(self.hepatitis_b))),
            ("hepatitis_c", Number(f64::from(self.hepatitis_c))),
            ("cirrhosis_history", Number(f64::from(self.cirrhosis_history))),
            ("family_history_cancer", Number(f64::from(self.family_history_cancer))),
            ("diabetes", Number(f64::from(self.diabetes))),
            ("gender", Category(self.gender.token())),
            ("alcohol_consumption", Category(self.alcohol_consumption.token())),
            ("smoking_status", Category(self.smoking_status.token())),
            ("physical_activity_level", Category(self.physical_activity_level.token())),
        ])
    }
}

/// Normalize a raw request. Fields are checked in a fixed order and the
/// first failure is returned.
pub fn normalize(raw: &RawPredictionRequest) -> Result<NormalizedFeatures, NormalizeError> {
    let age = required_number("age", raw.age.as_ref())?;
    let height_cm = required_number("height_cm", raw.height_cm.as_ref())?;
    let weight_kg = required_number("weight_kg", raw.weight_kg.as_ref())?;

    Ok(NormalizedFeatures {
        age,
        bmi: body_mass_index(height_cm, weight_kg),
        liver_function_score: optional_lab("liver_function_score", raw.liver_function_score.as_ref())?,
        alpha_fetoprotein_level: optional_lab(
            "alpha_fetoprotein_level",
            raw.alpha_fetoprotein_level.as_ref(),
        )?,
        hepatitis_b: flag("hepatitis_b", raw.hepatitis_b.as_ref())?,
        hepatitis_c: flag("hepatitis_c", raw.hepatitis_c.as_ref())?,
        cirrhosis_history: flag("cirrhosis_history", raw.cirrhosis_history.as_ref())?,
        family_history_cancer: flag("family_history_cancer", raw.family_history_cancer.as_ref())?,
        diabetes: flag("diabetes", raw.diabetes.as_ref())?,
        gender: category("gender", raw.gender.as_ref())?,
        alcohol_consumption: category("alcohol_consumption", raw.alcohol_consumption.as_ref())?,
        smoking_status: category("smoking_status", raw.smoking_status.as_ref())?,
        physical_activity_level: category(
            "physical_activity_level",
            raw.physical_activity_level.as_ref(),
        )?,
    })
}

/// BMI from centimetres and kilograms; zero when height is not positive.
pub fn body_mass_index(height_cm: f64, weight_kg: f64) -> f64 {
    let height_m = height_cm / 100.0;
    if height_m > 0.0 {
        weight_kg / (height_m * height_m)
    } else {
        0.0
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_number(field: &'static str, value: &Value) -> Result<f64, NormalizeError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.filter(|v| v.is_finite()).ok_or_else(|| NormalizeError::MissingField {
        field,
        reason: format!("must be numeric, got '{}'", display(value)),
    })
}

fn required_number(field: &'static str, value: Option<&Value>) -> Result<f64, NormalizeError> {
    match value {
        None | Some(Value::Null) => Err(NormalizeError::MissingField {
            field,
            reason: "is required".to_string(),
        }),
        Some(Value::String(s)) if s.trim().is_empty() => Err(NormalizeError::MissingField {
            field,
            reason: "is required".to_string(),
        }),
        Some(v) => parse_number(field, v),
    }
}

fn optional_lab(field: &'static str, value: Option<&Value>) -> Result<f64, NormalizeError> {
    match value {
        None | Some(Value::Null) => Ok(OPTIONAL_LAB_DEFAULT),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(OPTIONAL_LAB_DEFAULT),
        Some(v) => parse_number(field, v),
    }
}

fn flag(field: &'static str, value: Option<&Value>) -> Result<u8, NormalizeError> {
    let invalid = |v: &Value| NormalizeError::InvalidFlag {
        field,
        value: display(v),
    };

    match value {
        None | Some(Value::Null) => Err(NormalizeError::MissingField {
            field,
            reason: "is required".to_string(),
        }),
        Some(Value::Bool(b)) => Ok(u8::from(*b)),
        Some(v @ Value::Number(n)) => match n.as_f64() {
            Some(x) if x == 0.0 => Ok(0),
            Some(x) if x == 1.0 => Ok(1),
            _ => Err(invalid(v)),
        },
        Some(v @ Value::String(s)) => match fold(s).as_str() {
            "0" | "no" | "n" | "false" => Ok(0),
            "1" | "yes" | "y" | "si" | "sí" | "true" => Ok(1),
            _ => Err(invalid(v)),
        },
        Some(v) => Err(invalid(v)),
    }
}

fn category<V: Vocabulary>(field: &'static str, value: Option<&Value>) -> Result<V, NormalizeError> {
    match value {
        None | Some(Value::Null) => Err(NormalizeError::MissingField {
            field,
            reason: "is required".to_string(),
        }),
        Some(Value::String(s)) if s.trim().is_empty() => Err(NormalizeError::MissingField {
            field,
            reason: "is required".to_string(),
        }),
        Some(v @ Value::String(s)) => V::lookup(s).ok_or_else(|| unknown::<V>(field, v)),
        Some(v) => Err(unknown::<V>(field, v)),
    }
}

fn unknown<V: Vocabulary>(field: &'static str, value: &Value) -> NormalizeError {
    NormalizeError::UnknownCategory {
        field,
        value: display(value),
        expected: V::tokens(),
    }
}
