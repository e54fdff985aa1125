use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary risk class reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLevel {
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            Self::High
        } else {
            Self::Low
        }
    }

    pub fn class(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::High => "High Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far the probability sits from the 0.5 decision boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk judgment for one input. `risk_probability` keeps full precision;
/// rounding happens only in [`PredictionResponse`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskPrediction {
    pub risk_class: u8,
    pub risk_probability: f64,
    pub risk_level: RiskLevel,
    pub confidence: Confidence,
}

/// Wire form of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub risk_level: RiskLevel,
    pub risk_class: u8,
    pub risk_probability: f64,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl PredictionResponse {
    pub fn from_prediction(prediction: &RiskPrediction, model: Option<String>) -> Self {
        Self {
            risk_level: prediction.risk_level,
            risk_class: prediction.risk_class,
            risk_probability: round_probability(prediction.risk_probability),
            confidence: prediction.confidence,
            model,
        }
    }
}

/// Round to 4 decimal digits for presentation.
pub fn round_probability(p: f64) -> f64 {
    (p * 10_000.0).round() / 10_000.0
}
