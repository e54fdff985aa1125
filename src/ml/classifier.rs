//! The opaque binary-classification oracle.

use crate::error::{Result, RiskError};

/// Decision boundary of a standard binary classifier.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Raw classifier answer: predicted class and P(class = 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierOutput {
    pub class: u8,
    pub probability: f64,
}

impl ClassifierOutput {
    /// Derive the class label from P(class = 1) at the standard boundary.
    pub fn from_probability(probability: f64) -> Result<Self> {
        let out = Self {
            class: u8::from(probability >= DECISION_THRESHOLD),
            probability,
        };
        out.check()?;
        Ok(out)
    }

    /// Reject answers no well-formed binary classifier can produce.
    pub fn check(&self) -> Result<()> {
        if self.class > 1 {
            return Err(RiskError::Inference(format!(
                "classifier returned class {}, expected 0 or 1",
                self.class
            )));
        }
        if !self.probability.is_finite() || !(0.0..=1.0).contains(&self.probability) {
            return Err(RiskError::Inference(format!(
                "classifier returned probability {} outside [0, 1]",
                self.probability
            )));
        }
        Ok(())
    }
}

/// Pre-trained dam-failure classifier. Implementations are immutable after
/// loading and shared across requests.
#[cfg_attr(test, mockall::automock)]
pub trait RiskClassifier: Send + Sync {
    /// Number of features the classifier was trained on.
    fn input_dim(&self) -> usize;

    /// Score one feature vector laid out in `expected_features` order.
    fn predict(&self, features: &[f64]) -> Result<ClassifierOutput>;
}
