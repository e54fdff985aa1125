//! Dam-failure risk model: preprocessing contract, classifier adapters and
//! the once-only model registry.
//!
//! Inference is CPU-only and pure Rust, so the service deploys without a
//! Python runtime next to it.

pub mod artifact;
pub mod assembler;
pub mod classifier;
pub mod dense;
pub mod normalizer;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod registry;

pub use artifact::{ClassifierSource, ModelManifest, PreprocessingSpec, ScalerColumn};
pub use assembler::{ConfidencePolicy, PredictionAssembler};
pub use classifier::{ClassifierOutput, RiskClassifier, DECISION_THRESHOLD};
pub use dense::{Activation, DenseClassifier, DenseLayer, DenseNetwork};
pub use normalizer::{FeatureNormalizer, NormalizedFeatureVector, UnseenCategory};
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
pub use registry::{LoadedModel, ModelRegistry, ModelState};
