use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use crate::api::{state::AppState, types::*};
use crate::domain::RiskFeaturesInput;
use crate::error::RiskError;

/// POST /api/model/predict
pub async fn predict_risk(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RiskFeaturesInput>, JsonRejection>,
) -> std::result::Result<Json<crate::domain::PredictionResponse>, ApiError> {
    let Json(input) = payload.map_err(|e| RiskError::Validation(e.body_text()))?;
    let prediction = state.risk.predict_input(input).await?;
    Ok(Json(state.risk.respond(&prediction)))
}

/// GET /api/model/random -- score a randomly drawn stored dam
pub async fn predict_random(
    State(state): State<AppState>,
) -> std::result::Result<Json<RandomPredictionResponse>, ApiError> {
    let store = state.store.as_ref().ok_or_else(|| {
        RiskError::StoreUnavailable("no database configured".to_string())
    })?;
    let record = store
        .random_record()
        .await?
        .ok_or_else(|| RiskError::NotFound("no stored dam records".to_string()))?;

    let prediction = state.risk.predict_record(&record).await?;
    info!(dam_id = record.id, risk_class = prediction.risk_class, "random dam scored");

    Ok(Json(RandomPredictionResponse {
        dam_id: record.id,
        dam_type: record.dam_type.clone(),
        original_hgt: record.dam_hgt_m,
        prediction: state.risk.respond(&prediction),
    }))
}

/// GET /api/model/status
pub async fn model_status(State(state): State<AppState>) -> Json<ModelStatusResponse> {
    let registry = state.risk.registry();
    let response = match registry.get() {
        Ok(model) => {
            let manifest = model.manifest();
            ModelStatusResponse {
                state: registry.state(),
                model_name: Some(manifest.model_name.clone()),
                version: Some(manifest.version.clone()),
                classifier_format: Some(manifest.classifier.format().to_string()),
                loaded_at: Some(model.loaded_at()),
                expected_features: model.normalizer().expected_features().to_vec(),
            }
        }
        Err(_) => ModelStatusResponse {
            state: registry.state(),
            model_name: None,
            version: None,
            classifier_format: None,
            loaded_at: None,
            expected_features: Vec::new(),
        },
    };
    Json(response)
}
