//! Prediction Engine
//!
//! normalized features -> preprocessor -> ordered feature row -> model ->
//! percentage -> action. Pure per call; the bundle is only read.

use std::collections::HashSet;

use ndarray::Array1;
use serde::Serialize;
use thiserror::Error;

use super::policy::{to_percentage, DecisionPolicy, RiskAction};
use super::preprocessor::one_hot_name;
use super::InferenceError;
use crate::artifacts::ArtifactBundle;
use crate::normalize::{FeatureValue, NormalizedFeatures};

/// Server-side failures. None of these are caused by client input.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The bundle and the normalizer disagree on the feature contract
    #[error("feature contract mismatch: {detail}")]
    FeatureOrderMismatch { detail: String },

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Raw model output in [0, 1]
    pub probability: f32,
    /// Percentage rounded to two decimals
    pub risk_pct: f64,
    pub action: RiskAction,
}

/// Score one request against the bundle.
pub fn predict(
    bundle: &ArtifactBundle,
    features: &NormalizedFeatures,
) -> Result<Prediction, PredictError> {
    let row = assemble(bundle, features)?;

    let probability = bundle.model().predict(row.view())?;
    let risk_pct = to_percentage(probability);
    let action = DecisionPolicy::default().decide(risk_pct);

    tracing::debug!(
        "Prediction: p={:.6} risk_pct={} action={}",
        probability,
        risk_pct,
        action
    );

    Ok(Prediction {
        probability,
        risk_pct,
        action,
    })
}

/// Build the preprocessed row in the bundle's feature order.
pub fn assemble(
    bundle: &ArtifactBundle,
    features: &NormalizedFeatures,
) -> Result<Array1<f32>, PredictError> {
    let entries = features.entries();
    let names = bundle.feature_names();
    let known: HashSet<&str> = names.iter().map(String::as_str).collect();

    let uncovered: Vec<String> = entries
        .iter()
        .filter_map(|(key, value)| {
            let expected = match value {
                FeatureValue::Number(_) => key.to_string(),
                FeatureValue::Category(token) => one_hot_name(key, token),
            };
            (!known.contains(expected.as_str())).then_some(expected)
        })
        .collect();

    if !uncovered.is_empty() {
        return Err(PredictError::FeatureOrderMismatch {
            detail: format!("feature list lacks {}", uncovered.join(", ")),
        });
    }

    let transformed = bundle
        .preprocessor()
        .transform(&entries)
        .map_err(|e| PredictError::FeatureOrderMismatch {
            detail: format!("preprocessor rejected input: {}", e),
        })?;

    let mut row = Vec::with_capacity(names.len());
    let mut unproduced = Vec::new();
    for name in names {
        match transformed.get(name) {
            Some(value) => row.push(*value),
            None => unproduced.push(name.as_str()),
        }
    }

    if !unproduced.is_empty() {
        return Err(PredictError::FeatureOrderMismatch {
            detail: format!("preprocessor does not produce {}", unproduced.join(", ")),
        });
    }

    Ok(Array1::from(row))
}
