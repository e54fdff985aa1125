use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // The map frontend is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_handler))
        // Model endpoints
        .route("/api/model/predict", post(handlers::predict_risk))
        .route("/api/model/random", get(handlers::predict_random))
        .route("/api/model/status", get(handlers::model_status))
        // Feature endpoints
        .route("/api/features", get(handlers::list_features))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
