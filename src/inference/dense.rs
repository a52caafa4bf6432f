//! Dense network backend
//!
//! Evaluates a feed-forward network exported as JSON: an ordered list of
//! fully connected layers, each `weights[in][out]`, `bias[out]` and an
//! activation. Pure ndarray, no shared mutable state.

use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;

use super::{check_probability, InferenceBackend, InferenceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Linear,
}

impl Activation {
    fn apply(&self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LayerExport {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
    activation: Activation,
}

#[derive(Debug, Deserialize)]
struct NetworkExport {
    layers: Vec<LayerExport>,
}

#[derive(Debug, Clone)]
pub struct DenseLayer {
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: ArrayView1<'_, f32>) -> Array1<f32> {
        let mut out = input.dot(&self.weights) + &self.bias;
        out.mapv_inplace(|v| self.activation.apply(v));
        out
    }
}

#[derive(Debug, Clone)]
pub struct DenseNetwork {
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Parse and shape-check a JSON export.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, InferenceError> {
        let export: NetworkExport = serde_json::from_slice(bytes)
            .map_err(|e| InferenceError(format!("Invalid dense model JSON: {}", e)))?;

        if export.layers.is_empty() {
            return Err(InferenceError("Dense model has no layers".to_string()));
        }

        let mut layers = Vec::with_capacity(export.layers.len());
        let mut prev_out: Option<usize> = None;

        for (idx, layer) in export.layers.into_iter().enumerate() {
            let rows = layer.weights.len();
            let cols = layer.weights.first().map(Vec::len).unwrap_or(0);
            if rows == 0 || cols == 0 {
                return Err(InferenceError(format!("Layer {} has empty weights", idx)));
            }
            if layer.weights.iter().any(|row| row.len() != cols) {
                return Err(InferenceError(format!("Layer {} weights are ragged", idx)));
            }
            if layer.bias.len() != cols {
                return Err(InferenceError(format!(
                    "Layer {} bias has {} values, expected {}",
                    idx,
                    layer.bias.len(),
                    cols
                )));
            }
            if let Some(expected) = prev_out {
                if rows != expected {
                    return Err(InferenceError(format!(
                        "Layer {} takes {} inputs but previous layer yields {}",
                        idx, rows, expected
                    )));
                }
            }

            let flat: Vec<f32> = layer.weights.into_iter().flatten().collect();
            let weights = Array2::from_shape_vec((rows, cols), flat)
                .map_err(|e| InferenceError(format!("Array error: {}", e)))?;

            prev_out = Some(cols);
            layers.push(DenseLayer {
                weights,
                bias: Array1::from(layer.bias),
                activation: layer.activation,
            });
        }

        if prev_out != Some(1) {
            return Err(InferenceError(format!(
                "Dense model must end in a single output, got {}",
                prev_out.unwrap_or(0)
            )));
        }

        Ok(Self { layers })
    }
}

impl InferenceBackend for DenseNetwork {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn input_width(&self) -> Option<usize> {
        self.layers.first().map(|l| l.weights.nrows())
    }

    fn predict(&self, features: ArrayView1<'_, f32>) -> Result<f32, InferenceError> {
        if Some(features.len()) != self.input_width() {
            return Err(InferenceError(format!(
                "Expected {} features, got {}",
                self.input_width().unwrap_or(0),
                features.len()
            )));
        }

        let mut activations = features.to_owned();
        for layer in &self.layers {
            activations = layer.forward(activations.view());
        }

        let value = activations
            .iter()
            .next()
            .copied()
            .ok_or_else(|| InferenceError("No output".to_string()))?;

        check_probability(value)
    }
}
