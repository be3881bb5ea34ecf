//! HTTP tests driven through the router with `oneshot`

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use enose_api::middleware::{ApiKeyConfig, RateLimitConfig};
use enose_api::{build_app, AppOptions, AppState};
use enose_core::{demo, ArtifactStore, EnsembleConfig, PipelineCell};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BENCH_READING: [f64; 8] = [815.0, 2530.0, 1075.0, 2510.0, 1435.0, 2160.0, 37.0, 72.0];

fn demo_state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let config = demo::write(dir.path()).unwrap();
    let state = AppState::new(PipelineCell::new(ArtifactStore::new(config)));
    (dir, state)
}

fn app(state: AppState) -> Router {
    build_app(state, AppOptions::default())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn predict(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_predict_bench_reading() {
    let (_dir, state) = demo_state();
    let (status, body) = send(app(state), predict(json!({ "input_data": BENCH_READING }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["input_data"].as_array().unwrap().len(), 8);

    let predictions = data["predictions"].as_object().unwrap();
    for name in ["base_1", "base_2", "base_3", "base_4", "meta"] {
        let entry = &predictions[name];
        assert!(entry["class_label"].is_string(), "{name}");
        assert!(entry["probability"].is_number(), "{name}");
    }
    assert!(!predictions.contains_key("knn"));

    let sensors = data["metadata"]["sensor_names"].as_array().unwrap();
    assert_eq!(sensors.len(), 8);
    assert_eq!(sensors[0], "sensor_5");
    assert!(data["metadata"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_predict_short_reading_is_400() {
    let (_dir, state) = demo_state();
    let (status, body) = send(
        app(state),
        predict(json!({ "input_data": &BENCH_READING[..7] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("expected 8"));
}

#[tokio::test]
async fn test_predict_malformed_body_is_400() {
    let (_dir, state) = demo_state();
    let (status, body) = send(app(state), predict(json!({ "values": [1, 2] }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_artifacts_are_503_until_fixed() {
    let dir = tempfile::tempdir().unwrap();
    let config = EnsembleConfig::in_dir(dir.path());
    let state = AppState::new(PipelineCell::new(ArtifactStore::new(config)));

    let (status, body) = send(
        app(state.clone()),
        predict(json!({ "input_data": BENCH_READING })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "ARTIFACT_LOAD_ERROR");

    let (status, body) = send(app(state.clone()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pipeline_loaded"], false);

    demo::write(dir.path()).unwrap();
    let (status, _) = send(
        app(state.clone()),
        predict(json!({ "input_data": BENCH_READING })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.cell.is_loaded());
}

#[tokio::test]
async fn test_models_listing() {
    let (_dir, state) = demo_state();
    let (status, body) = send(app(state), get("/models")).await;

    assert_eq!(status, StatusCode::OK);
    let models = body["data"]["models"].as_array().unwrap();
    let names: Vec<_> = models.iter().map(|m| m["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["base_2", "base_3", "base_4", "base_1", "meta"]);
    assert_eq!(models[4]["role"], "meta");
    assert_eq!(models[0]["capability"], "probabilistic");
    assert_eq!(body["data"]["labels"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_sensors_listing() {
    let (_dir, state) = demo_state();
    let (status, body) = send(app(state), get("/sensors")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 8);
    assert_eq!(body["data"]["sensors"][7], "sensor_4");
}

#[tokio::test]
async fn test_api_key_required_except_health() {
    let (_dir, state) = demo_state();
    let options = AppOptions {
        auth: Arc::new(ApiKeyConfig::new(vec!["secret".into()])),
        ..AppOptions::default()
    };
    let app = build_app(state, options);

    let (status, body) = send(app.clone(), get("/sensors")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/sensors")
        .header("X-API-Key", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit() {
    let (_dir, state) = demo_state();
    let options = AppOptions {
        rate_limit: RateLimitConfig {
            requests_per_second: 1,
            burst_size: 1,
            enabled: true,
        },
        ..AppOptions::default()
    };
    let app = build_app(state, options);

    let (first, _) = send(app.clone(), get("/sensors")).await;
    let (second, body) = send(app, get("/sensors")).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}
