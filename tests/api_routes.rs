use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use hydrorisk::adapters::{FeatureStore, MemoryFeatureStore};
use hydrorisk::api::{create_router, AppState};
use hydrorisk::domain::{FeatureRecord, FeaturesFilter};
use hydrorisk::ml::{ModelRegistry, PredictionAssembler};
use hydrorisk::services::{RiskService, RiskServiceConfig};
use hydrorisk::{LoadMode, RiskError};

async fn loaded_service() -> Arc<RiskService> {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("models/dam_risk/manifest.json");
    let registry = Arc::new(ModelRegistry::new(manifest, Duration::from_secs(5)));
    registry.load().await.unwrap();
    Arc::new(RiskService::new(
        registry,
        PredictionAssembler::default(),
        RiskServiceConfig::default(),
    ))
}

fn unloaded_service() -> Arc<RiskService> {
    let registry = Arc::new(ModelRegistry::new(
        "/nonexistent/manifest.json",
        Duration::from_secs(1),
    ));
    Arc::new(RiskService::new(
        registry,
        PredictionAssembler::default(),
        RiskServiceConfig {
            load_mode: LoadMode::Eager,
            ..RiskServiceConfig::default()
        },
    ))
}

fn record(id: i32, dam_type: &str, hgt: Option<f64>) -> FeatureRecord {
    FeatureRecord {
        id,
        cap_mcm: Some(120.0),
        cap_max: Some(150.0),
        cap_min: Some(20.0),
        area_skm: Some(15.0),
        area_max: Some(18.0),
        depth_m: Some(25.0),
        catch_skm: Some(850.0),
        dis_avg_ls: Some(45.0),
        elev_masl: Some(520.0),
        dam_hgt_m: hgt,
        dam_len_m: Some(420.0),
        dam_type: Some(dam_type.to_string()),
        instream: Some("Instream".to_string()),
        date: None,
    }
}

fn payload() -> Value {
    json!({
        "CAP_MCM": 120.5,
        "CAP_MAX": 150.0,
        "CAP_MIN": 20.0,
        "AREA_SKM": 15.2,
        "AREA_MAX": 18.0,
        "DEPTH_M": 25.0,
        "CATCH_SKM": 850.0,
        "DIS_AVG_LS": 45.0,
        "ELEV_MASL": 520.0,
        "DAM_HGT_M": 38.0,
        "DAM_LEN_M": 420.0,
        "DAM_TYPE": "Dam",
        "INSTREAM": "Instream"
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn predict_returns_the_assembled_prediction() {
    let app = create_router(AppState::new(loaded_service().await, None));
    let (status, body) = send(app, post_json("/api/model/predict", &payload())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk_class"], 1);
    assert_eq!(body["risk_level"], "High Risk");
    assert_eq!(body["confidence"], "low");
    assert_eq!(body["model"], "dam_risk_logit (2024.11.0)");

    let p = body["risk_probability"].as_f64().unwrap();
    assert!(p > 0.5 && p < 0.6);
    assert_eq!((p * 1e4).round() / 1e4, p);
}

#[tokio::test]
async fn predict_rejects_missing_field_with_422() {
    let app = create_router(AppState::new(loaded_service().await, None));
    let mut body = payload();
    body.as_object_mut().unwrap().remove("DEPTH_M");

    let (status, body) = send(app, post_json("/api/model/predict", &body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("DEPTH_M"));
}

#[tokio::test]
async fn predict_rejects_malformed_json_with_422() {
    let app = create_router(AppState::new(loaded_service().await, None));
    let request = Request::builder()
        .method("POST")
        .uri("/api/model/predict")
        .header("content-type", "application/json")
        .body(Body::from("{\"CAP_MCM\": \"lots\"}"))
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn predict_before_model_load_is_503() {
    let app = create_router(AppState::new(unloaded_service(), None));
    let (status, body) = send(app, post_json("/api/model/predict", &payload())).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "model_unavailable");
}

#[tokio::test]
async fn health_reports_loading_then_ok() {
    let app = create_router(AppState::new(unloaded_service(), None));
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "loading");
    assert_eq!(body["model"], "unloaded");

    let app = create_router(AppState::new(loaded_service().await, None));
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "not_configured");
}

struct UnreachableStore;

#[async_trait]
impl FeatureStore for UnreachableStore {
    async fn random_record(&self) -> hydrorisk::Result<Option<FeatureRecord>> {
        Err(RiskError::StoreUnavailable("connection refused".to_string()))
    }

    async fn list(&self, _filter: &FeaturesFilter) -> hydrorisk::Result<Vec<FeatureRecord>> {
        Err(RiskError::StoreUnavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn health_pings_the_feature_store() {
    let store: Arc<dyn FeatureStore> = Arc::new(MemoryFeatureStore::default());
    let app = create_router(AppState::new(loaded_service().await, Some(store)));
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "up");

    let store: Arc<dyn FeatureStore> = Arc::new(UnreachableStore);
    let app = create_router(AppState::new(loaded_service().await, Some(store)));
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["store"], "down");
}

#[tokio::test]
async fn status_lists_expected_features() {
    let app = create_router(AppState::new(loaded_service().await, None));
    let (status, body) = send(app, get("/api/model/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "loaded");
    assert_eq!(body["classifier_format"], "dense");
    assert_eq!(body["expected_features"].as_array().unwrap().len(), 17);
}

#[tokio::test]
async fn random_scores_a_stored_dam() {
    let store: Arc<dyn FeatureStore> =
        Arc::new(MemoryFeatureStore::new(vec![record(3, "Dam", Some(-99.0))]));
    let app = create_router(AppState::new(loaded_service().await, Some(store)));

    let (status, body) = send(app, get("/api/model/random")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dam_id"], 3);
    assert_eq!(body["dam_type"], "Dam");
    assert_eq!(body["original_hgt"], -99.0);
    assert!(body["risk_probability"].is_number());
    assert!(body["risk_level"].is_string());
}

#[tokio::test]
async fn random_without_records_is_404() {
    let store: Arc<dyn FeatureStore> = Arc::new(MemoryFeatureStore::default());
    let app = create_router(AppState::new(loaded_service().await, Some(store)));

    let (status, body) = send(app, get("/api/model/random")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn random_without_store_is_503() {
    let app = create_router(AppState::new(loaded_service().await, None));
    let (status, body) = send(app, get("/api/model/random")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "store_unavailable");
}

#[tokio::test]
async fn features_listing_filters_and_pages() {
    let store: Arc<dyn FeatureStore> = Arc::new(MemoryFeatureStore::new(vec![
        record(1, "Dam", Some(10.0)),
        record(2, "Lock", Some(40.0)),
        record(3, "Lake Control Dam", Some(60.0)),
        record(4, "Dam", None),
    ]));
    let app = create_router(AppState::new(loaded_service().await, Some(store)));

    let (status, body) = send(app.clone(), get("/api/features?dam_type=dam&dam_hgt_min=20")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["features"][0]["id"], 3);

    let (status, body) = send(app.clone(), get("/api/features?skip=1&limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 3]);

    let (status, _) = send(app, get("/api/features?limit=0")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
