//! Inference Module - preprocessing, model backends and decision policy
//!
//! Backends sit behind `InferenceBackend` so ONNX and dense exports are
//! interchangeable inside a bundle.

pub mod dense;
pub mod engine;
pub mod onnx;
pub mod policy;
pub mod preprocessor;

use ndarray::ArrayView1;
use thiserror::Error;

pub use dense::DenseNetwork;
pub use engine::{predict, PredictError, Prediction};
pub use onnx::OnnxModel;
pub use policy::{DecisionPolicy, RiskAction, RISK_CUTOFF_PCT};
pub use preprocessor::Preprocessor;

#[derive(Debug, Error)]
#[error("InferenceError: {0}")]
pub struct InferenceError(pub String);

/// A loaded classifier producing the positive-class probability
pub trait InferenceBackend: Send + Sync {
    /// Short backend name ("onnx", "dense")
    fn name(&self) -> &'static str;

    /// Number of input features, when the backend knows it
    fn input_width(&self) -> Option<usize>;

    /// Probability in [0, 1] for a single preprocessed feature row
    fn predict(&self, features: ArrayView1<'_, f32>) -> Result<f32, InferenceError>;
}

/// Reject outputs that are not a probability.
pub(crate) fn check_probability(value: f32) -> Result<f32, InferenceError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(InferenceError(format!(
            "model output {} is not a probability",
            value
        )))
    }
}
