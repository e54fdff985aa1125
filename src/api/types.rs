use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::{FeatureRecord, PredictionResponse};
use crate::error::RiskError;
use crate::ml::ModelState;

// ============================================================================
// Model Types
// ============================================================================

/// Prediction for a randomly drawn stored dam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomPredictionResponse {
    pub dam_id: i32,
    pub dam_type: Option<String>,
    /// Raw stored height, before sentinel replacement
    pub original_hgt: Option<f64>,
    #[serde(flatten)]
    pub prediction: PredictionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatusResponse {
    pub state: ModelState,
    pub model_name: Option<String>,
    pub version: Option<String>,
    pub classifier_format: Option<String>,
    pub loaded_at: Option<chrono::DateTime<chrono::Utc>>,
    pub expected_features: Vec<String>,
}

// ============================================================================
// Feature Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesListResponse {
    pub features: Vec<FeatureRecord>,
    pub count: usize,
}

// ============================================================================
// Health Check Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    NotConfigured,
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: ModelState,
    pub store: StoreStatus,
    pub uptime_secs: i64,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Maps [`RiskError`] onto HTTP responses.
///
/// Server-side faults are logged with their details and answered with a
/// generic message.
#[derive(Debug)]
pub struct ApiError(pub RiskError);

impl From<RiskError> for ApiError {
    fn from(err: RiskError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            RiskError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RiskError::NotFound(_) => StatusCode::NOT_FOUND,
            RiskError::ModelUnavailable(_) | RiskError::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(kind = self.0.kind(), error = %self.0, "request failed");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        let body = ErrorBody {
            error: self.0.kind().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
