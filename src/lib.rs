pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ml;
pub mod services;

pub use config::{AppConfig, LoadMode};
pub use domain::{
    FeatureDefaults, FeatureRecord, PredictionResponse, RiskFeatures, RiskFeaturesInput,
    RiskPrediction,
};
pub use error::{Result, RiskError};
pub use ml::{FeatureNormalizer, ModelRegistry, PredictionAssembler, RiskClassifier};
pub use services::{RiskService, RiskServiceConfig};
