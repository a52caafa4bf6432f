//! Prediction payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::inference::RiskAction;
use crate::normalize::NormalizedFeatures;

/// Client-supplied fields, kept loosely typed so the normalizer can name
/// the exact field and reason on rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPredictionRequest {
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub height_cm: Option<Value>,
    #[serde(default)]
    pub weight_kg: Option<Value>,
    #[serde(default)]
    pub liver_function_score: Option<Value>,
    #[serde(default)]
    pub alpha_fetoprotein_level: Option<Value>,
    #[serde(default)]
    pub hepatitis_b: Option<Value>,
    #[serde(default)]
    pub hepatitis_c: Option<Value>,
    #[serde(default)]
    pub cirrhosis_history: Option<Value>,
    #[serde(default)]
    pub family_history_cancer: Option<Value>,
    #[serde(default)]
    pub diabetes: Option<Value>,
    #[serde(default)]
    pub gender: Option<Value>,
    #[serde(default)]
    pub alcohol_consumption: Option<Value>,
    #[serde(default)]
    pub smoking_status: Option<Value>,
    #[serde(default)]
    pub physical_activity_level: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    pub diagnostics: Option<String>,
}

impl PredictQuery {
    /// `?diagnostics`, `?diagnostics=1|true|yes` enable the echo
    pub fn diagnostics_enabled(&self) -> bool {
        match self.diagnostics.as_deref() {
            Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "" | "1" | "true" | "yes"),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub risk_pct: f64,
    pub action: RiskAction,
    pub recommendation: &'static str,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_input: Option<NormalizedFeatures>,
}
