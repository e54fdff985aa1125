use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use crate::api::{state::AppState, types::*};
use crate::domain::FeaturesFilter;
use crate::error::RiskError;

/// GET /api/features
pub async fn list_features(
    State(state): State<AppState>,
    query: std::result::Result<Query<FeaturesFilter>, QueryRejection>,
) -> std::result::Result<Json<FeaturesListResponse>, ApiError> {
    let Query(filter) = query.map_err(|e| RiskError::Validation(e.body_text()))?;
    let store = state.store.as_ref().ok_or_else(|| {
        RiskError::StoreUnavailable("no database configured".to_string())
    })?;

    let features = store.list(&filter).await?;
    Ok(Json(FeaturesListResponse {
        count: features.len(),
        features,
    }))
}
