pub mod defaults;
pub mod features;
pub mod prediction;
pub mod record;

pub use defaults::FeatureDefaults;
pub use features::{RiskFeatures, RiskFeaturesInput, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS};
pub use prediction::{round_probability, Confidence, PredictionResponse, RiskLevel, RiskPrediction};
pub use record::{FeatureRecord, FeaturesFilter};
