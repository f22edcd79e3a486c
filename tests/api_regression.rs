//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the endpoints using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port.

use hydrawatch::acquisition::{ApiError, InMemorySensorApi};
use hydrawatch::api::{create_app, ApiState};
use hydrawatch::config::MonitorConfig;
use hydrawatch::pipeline::{Monitor, PollTrigger};
use hydrawatch::types::OperatingMode;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::sync::Arc;
use tower::ServiceExt;

async fn create_test_state(config: &MonitorConfig) -> (ApiState, Arc<InMemorySensorApi>) {
    let api = Arc::new(InMemorySensorApi::with_sample_data().await);
    let monitor = Monitor::new(config, api.clone()).unwrap();
    (ApiState::new(monitor), api)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, content_type: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All GET endpoints should return 200.
#[tokio::test]
async fn test_get_endpoints_return_200() {
    let (state, _) = create_test_state(&MonitorConfig::default()).await;

    let endpoints = [
        "/health",
        "/api/v1/status",
        "/api/v1/history",
        "/api/v1/alerts",
        "/api/v1/thresholds",
        "/api/v1/thresholds/onshore/temperature",
        "/api/v1/mode",
        "/api/v1/simulation",
    ];

    for endpoint in &endpoints {
        let app = create_app(state.clone());
        let resp = app.oneshot(get(endpoint)).await.unwrap();
        assert!(
            resp.status().is_success(),
            "GET {endpoint} returned status {}",
            resp.status()
        );
    }
}

/// Every response carries the `{data, meta}` envelope.
#[tokio::test]
async fn test_status_envelope_after_poll() {
    let (state, _) = create_test_state(&MonitorConfig::default()).await;
    state.monitor.polling().poll_current(PollTrigger::Refresh).await;

    let resp = create_app(state).oneshot(get("/api/v1/status")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = body_json(resp).await;
    assert!(v["meta"]["timestamp"].is_string());
    assert_eq!(v["data"]["mode"], "offshore");
    assert_eq!(v["data"]["current"]["hydrate_risk"]["status"], "Warning");
    assert_eq!(v["data"]["alert_count"], 1);
    assert_eq!(v["data"]["poll_stats"]["readings"], 1);
}

#[tokio::test]
async fn test_mode_switch_reports_reclassification() {
    let (state, _) = create_test_state(&MonitorConfig::default()).await;
    state.monitor.polling().poll_current(PollTrigger::Refresh).await;
    state
        .monitor
        .polling()
        .reload_history(OperatingMode::Offshore)
        .await
        .await
        .unwrap();
    assert_eq!(state.monitor.polling().history().await.readings.len(), 5);

    let resp = create_app(state.clone())
        .oneshot(post("/api/v1/mode", "application/json", br#"{"mode":"onshore"}"#.to_vec()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;
    assert_eq!(v["data"]["mode"], "onshore");
    assert_eq!(v["data"]["reclassified"]["classified"]["classified_under"], "onshore");

    // Old-mode history is gone as soon as the switch returns
    let resp = create_app(state).oneshot(get("/api/v1/history")).await.unwrap();
    let v = body_json(resp).await;
    assert!(v["data"]["mode"].is_null());
    assert_eq!(v["data"]["readings"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unauthenticated_backend_maps_to_401() {
    let (state, api) = create_test_state(&MonitorConfig::default()).await;
    api.set_failure(Some(ApiError::Unauthenticated)).await;

    let body = br#"{"temperature":"5","pressure":"100","flow_rate":"20","timestamp":"2026-10-17T08:00"}"#;
    let resp = create_app(state.clone())
        .oneshot(post("/api/v1/readings", "application/json", body.to_vec()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let v = body_json(resp).await;
    assert_eq!(v["error"]["code"], "UNAUTHENTICATED");

    api.set_failure(Some(ApiError::Server {
        status: 500,
        detail: "database unavailable".to_string(),
    }))
    .await;
    let resp = create_app(state)
        .oneshot(post("/api/v1/readings", "application/json", body.to_vec()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let v = body_json(resp).await;
    assert_eq!(v["error"]["message"], "database unavailable");
}

#[tokio::test]
async fn test_oversized_dataset_is_rejected_by_pipeline() {
    let mut config = MonitorConfig::default();
    config.upload.max_file_bytes = 1024;
    let (state, api) = create_test_state(&config).await;

    let resp = create_app(state.clone())
        .oneshot(post(
            "/api/v1/simulation/file?name=big.csv",
            "text/csv",
            vec![b'1'; 2048],
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = body_json(resp).await;
    assert!(v["error"]["message"].as_str().unwrap().contains("1024"));

    // No job was created and nothing was sent
    let resp = create_app(state).oneshot(get("/api/v1/simulation")).await.unwrap();
    let v = body_json(resp).await;
    assert_eq!(v["data"]["state"], "idle");
    assert_eq!(api.upload_calls(), 0);
}

#[tokio::test]
async fn test_failed_upload_is_reported_in_job() {
    let (state, api) = create_test_state(&MonitorConfig::default()).await;

    let resp = create_app(state.clone())
        .oneshot(post(
            "/api/v1/simulation/file?name=batch.json",
            "application/json",
            br#"[{"mode":"offshore","temperature":4,"pressure":120,"flow_rate":30}]"#.to_vec(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = create_app(state.clone())
        .oneshot(post("/api/v1/simulation/validate", "text/plain", Vec::new()))
        .await
        .unwrap();
    let v = body_json(resp).await;
    assert_eq!(v["data"]["state"], "ready");
    assert_eq!(v["data"]["record_count"], 1);

    api.set_failure(Some(ApiError::Rejected {
        status: 400,
        detail: "Invalid JSON format".to_string(),
    }))
    .await;
    let resp = create_app(state.clone())
        .oneshot(post("/api/v1/simulation/run", "text/plain", Vec::new()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;
    assert_eq!(v["data"]["state"], "failed");
    assert_eq!(v["data"]["error"], "Invalid JSON format");

    // Running again without a reset is a conflict
    let resp = create_app(state)
        .oneshot(post("/api/v1/simulation/run", "text/plain", Vec::new()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}
