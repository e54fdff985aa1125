pub mod risk;

pub use risk::{RiskService, RiskServiceConfig};
