//! ONNX backend
//!
//! Runs an ONNX export of the classifier through ONNX Runtime.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array2, ArrayView1};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::{Mutex, MutexGuard};

use super::{check_probability, InferenceBackend, InferenceError};

/// Upper bound on sessions built per model
const MAX_SESSIONS: usize = 4;

/// Fixed set of exclusively borrowed slots.
///
/// `acquire` hands out the first free slot, starting from a rotating offset,
/// and only waits when every slot is busy.
pub(crate) struct SessionPool<T> {
    slots: Vec<Mutex<T>>,
    next: AtomicUsize,
}

impl<T> SessionPool<T> {
    /// `None` when `items` is empty.
    pub(crate) fn new(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self {
            slots: items.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn acquire(&self) -> MutexGuard<'_, T> {
        let len = self.slots.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed) % len;

        for offset in 0..len {
            if let Some(guard) = self.slots[(start + offset) % len].try_lock() {
                return guard;
            }
        }

        self.slots[start].lock()
    }
}

/// ONNX Runtime model.
///
/// A session run needs `&mut Session`, so one session can serve a single
/// request at a time. The model keeps a small pool of identical sessions
/// (one per core, up to `MAX_SESSIONS`) so concurrent requests each get
/// their own; a request only waits when every session is busy.
pub struct OnnxModel {
    sessions: SessionPool<Session>,
}

impl OnnxModel {
    /// Build the session pool from model bytes already read from disk.
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self, InferenceError> {
        let count = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            .min(MAX_SESSIONS);

        tracing::info!(
            "Loading ONNX model from memory ({} bytes, {} session(s))",
            model_bytes.len(),
            count
        );

        let sessions = (0..count)
            .map(|_| build_session(model_bytes))
            .collect::<Result<Vec<_>, _>>()?;

        let sessions = SessionPool::new(sessions)
            .ok_or_else(|| InferenceError("No ONNX session built".to_string()))?;

        Ok(Self { sessions })
    }
}

fn build_session(model_bytes: &[u8]) -> Result<Session, InferenceError> {
    Session::builder()
        .map_err(|e| InferenceError(format!("Session builder error: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| InferenceError(format!("Optimization error: {}", e)))?
        .commit_from_memory(model_bytes)
        .map_err(|e| InferenceError(format!("Load from memory error: {}", e)))
}

impl InferenceBackend for OnnxModel {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn input_width(&self) -> Option<usize> {
        None
    }

    fn predict(&self, features: ArrayView1<'_, f32>) -> Result<f32, InferenceError> {
        let input_array = Array2::<f32>::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| InferenceError(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;

        let mut session = self.sessions.acquire();

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError("No output defined".to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&output_name)
            .ok_or_else(|| InferenceError("No output".to_string()))?;

        let output_tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

        let value = output_tensor
            .1
            .first()
            .copied()
            .ok_or_else(|| InferenceError("Empty output tensor".to_string()))?;

        check_probability(value)
    }
}
