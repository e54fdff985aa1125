use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::adapters::FeatureStore;
use crate::services::RiskService;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Risk scoring pipeline
    pub risk: Arc<RiskService>,

    /// Stored observations (optional; only set when a database is configured)
    pub store: Option<Arc<dyn FeatureStore>>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(risk: Arc<RiskService>, store: Option<Arc<dyn FeatureStore>>) -> Self {
        Self {
            risk,
            store,
            start_time: Utc::now(),
        }
    }

    /// Get system uptime in seconds
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
