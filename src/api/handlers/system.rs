use axum::{extract::State, http::StatusCode, Json};
use tracing::warn;

use crate::api::{state::AppState, types::*};
use crate::ml::ModelState;

/// GET /health -- liveness plus model readiness
///
/// 503 until the model is loaded. An unreachable feature store only
/// degrades the status.
pub async fn health_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let model = state.risk.registry().state();
    let store = match &state.store {
        None => StoreStatus::NotConfigured,
        Some(store) if store.ping().await => StoreStatus::Up,
        Some(_) => {
            warn!("feature store did not answer the health ping");
            StoreStatus::Down
        }
    };

    let ready = model == ModelState::Loaded;
    let status = match (ready, store) {
        (false, _) => "loading",
        (true, StoreStatus::Down) => "degraded",
        (true, _) => "ok",
    };
    let resp = HealthResponse {
        status: status.to_string(),
        model,
        store,
        uptime_secs: state.uptime_seconds(),
    };

    if ready {
        Ok(Json(resp))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(resp)))
    }
}
