//! ONNX classifier (pure Rust via `tract-onnx`).
//!
//! Gradient-boosting models exported with their probability head. The graph
//! takes a `[1, n_features]` f32 tensor; its first output holds either
//! `P(high risk)` alone or the `[P(low), P(high)]` pair.

use std::path::Path;

use tract_onnx::prelude::*;

use crate::error::{Result, RiskError};
use crate::ml::classifier::{ClassifierOutput, RiskClassifier};

#[derive(Clone)]
pub struct OnnxClassifier {
    plan: TypedRunnableModel<TypedModel>,
    input_dim: usize,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_dim", &self.input_dim)
            .finish()
    }
}

impl OnnxClassifier {
    /// Load a graph and specialize it to a fixed `[1, input_dim]` input.
    pub fn load<P: AsRef<Path>>(path: P, input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(RiskError::Artifact("input_dim must be > 0".to_string()));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| RiskError::Artifact(format!("onnx load failed: {e}")))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, input_dim)))
            .map_err(|e| RiskError::Artifact(format!("onnx input fact failed: {e}")))?
            .into_optimized()
            .map_err(|e| RiskError::Artifact(format!("onnx optimize failed: {e}")))?
            .into_runnable()
            .map_err(|e| RiskError::Artifact(format!("onnx runnable failed: {e}")))?;

        let loaded = Self { plan, input_dim };
        // Probe once: a graph with the wrong output head fails here.
        loaded.predict(&vec![0.0; input_dim])?;
        Ok(loaded)
    }
}

impl RiskClassifier for OnnxClassifier {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn predict(&self, features: &[f64]) -> Result<ClassifierOutput> {
        if features.len() != self.input_dim {
            return Err(RiskError::Inference(format!(
                "onnx input dim mismatch: got {}, expected {}",
                features.len(),
                self.input_dim
            )));
        }

        let input: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let tensor = tract_ndarray::Array2::<f32>::from_shape_vec((1, self.input_dim), input)
            .map_err(|e| RiskError::Inference(format!("onnx input reshape failed: {e}")))?
            .into_tvalue();

        let outputs = self
            .plan
            .run(tvec!(tensor))
            .map_err(|e| RiskError::Inference(format!("onnx run failed: {e}")))?;
        let first = outputs
            .first()
            .ok_or_else(|| RiskError::Inference("onnx produced no outputs".to_string()))?;
        let arr = first
            .to_array_view::<f32>()
            .map_err(|e| RiskError::Inference(format!("onnx output decode failed: {e}")))?;

        let probs: Vec<f32> = arr.iter().copied().collect();
        let p_high = match probs.as_slice() {
            [p] => *p,
            [_, p] => *p,
            other => {
                return Err(RiskError::Inference(format!(
                    "onnx output has {} elements, expected 1 or 2",
                    other.len()
                )))
            }
        };
        ClassifierOutput::from_probability(f64::from(p_high))
    }
}
