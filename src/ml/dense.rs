//! Dense neural network classifier (CPU-only).
//!
//! Small MLPs exported to JSON: logistic regression is the one-layer case.
//! The last layer must produce a single sigmoid output, read as P(high risk).
//! Shapes are validated at load time so a mismatch fails fast instead of at
//! the first request.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, RiskError};
use crate::ml::classifier::{ClassifierOutput, RiskClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weights shape: [out_dim][in_dim]
    pub weights: Vec<Vec<f64>>,
    /// Bias shape: [out_dim]
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn out_dim(&self) -> usize {
        self.weights.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseNetwork {
    /// Expected input dimension.
    pub input_dim: usize,
    pub layers: Vec<DenseLayer>,
    /// Free-form training metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DenseNetwork {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let model: Self = serde_json::from_str(&content)?;
        model.validate().map_err(RiskError::Artifact)?;
        Ok(model)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.input_dim == 0 {
            return Err("input_dim must be > 0".to_string());
        }
        if self.layers.is_empty() {
            return Err("layers must not be empty".to_string());
        }

        let mut expected_in = self.input_dim;
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.out_dim() == 0 {
                return Err(format!("layer[{idx}] out_dim must be > 0"));
            }
            if layer.bias.len() != layer.out_dim() {
                return Err(format!(
                    "layer[{idx}] bias len {} != out_dim {}",
                    layer.bias.len(),
                    layer.out_dim()
                ));
            }
            for (r, row) in layer.weights.iter().enumerate() {
                if row.len() != expected_in {
                    return Err(format!(
                        "layer[{idx}] weights row {r} len {} != expected in_dim {expected_in}",
                        row.len()
                    ));
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return Err(format!("layer[{idx}] weights contain non-finite values"));
                }
            }
            if layer.bias.iter().any(|v| !v.is_finite()) {
                return Err(format!("layer[{idx}] bias contain non-finite values"));
            }
            expected_in = layer.out_dim();
        }

        match self.layers.last() {
            Some(last) if last.out_dim() == 1 && last.activation == Activation::Sigmoid => Ok(()),
            _ => Err("last layer must be a single sigmoid output".to_string()),
        }
    }

    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_dim {
            return Err(RiskError::Inference(format!(
                "input dim mismatch: got {}, expected {}",
                input.len(),
                self.input_dim
            )));
        }

        let mut x: Vec<f64> = input.to_vec();
        for layer in &self.layers {
            x = layer
                .weights
                .iter()
                .zip(&layer.bias)
                .map(|(row, bias)| {
                    let sum = row.iter().zip(&x).fold(*bias, |acc, (w, xi)| acc + w * xi);
                    apply_activation(sum, layer.activation)
                })
                .collect();
        }
        Ok(x)
    }
}

fn apply_activation(x: f64, act: Activation) -> f64 {
    match act {
        Activation::Linear => x,
        Activation::Relu => x.max(0.0),
        Activation::Tanh => x.tanh(),
        Activation::Sigmoid => sigmoid(x),
    }
}

fn sigmoid(x: f64) -> f64 {
    // Numerically-stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// [`RiskClassifier`] over a [`DenseNetwork`].
#[derive(Debug, Clone)]
pub struct DenseClassifier {
    network: DenseNetwork,
}

impl DenseClassifier {
    pub fn new(network: DenseNetwork) -> Result<Self> {
        network.validate().map_err(RiskError::Artifact)?;
        Ok(Self { network })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            network: DenseNetwork::from_file(path)?,
        })
    }

    pub fn network(&self) -> &DenseNetwork {
        &self.network
    }
}

impl RiskClassifier for DenseClassifier {
    fn input_dim(&self) -> usize {
        self.network.input_dim
    }

    fn predict(&self, features: &[f64]) -> Result<ClassifierOutput> {
        let out = self.network.forward(features)?;
        match out.as_slice() {
            [p] => ClassifierOutput::from_probability(*p),
            _ => Err(RiskError::Inference(format!(
                "expected a single output, got {}",
                out.len()
            ))),
        }
    }
}
