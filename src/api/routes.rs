//! API route definitions
//!
//! - /health - liveness
//! - /api/v1/status, /history, /alerts - monitoring views
//! - /api/v1/thresholds - threshold profiles
//! - /api/v1/mode, /readings - operator actions
//! - /api/v1/simulation/* - dataset upload job

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, ApiState};

/// Create all v1 API routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        .route("/history", get(handlers::get_history))
        .route("/alerts", get(handlers::get_alerts))
        // Thresholds
        .route("/thresholds", get(handlers::get_thresholds))
        .route("/thresholds/:mode/:quantity", get(handlers::get_threshold_profile))
        // Operator actions
        .route("/mode", get(handlers::get_mode).post(handlers::set_mode))
        .route("/readings", post(handlers::submit_reading))
        // Simulation job
        .route("/simulation", get(handlers::get_simulation))
        .route("/simulation/file", post(handlers::select_simulation_file))
        .route("/simulation/validate", post(handlers::validate_simulation))
        .route("/simulation/run", post(handlers::run_simulation))
        .route("/simulation/reset", post(handlers::reset_simulation))
        .with_state(state)
}

/// Health endpoint at root level
pub fn root_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::InMemorySensorApi;
    use crate::config::MonitorConfig;
    use crate::pipeline::Monitor;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state() -> ApiState {
        let api = Arc::new(InMemorySensorApi::new());
        ApiState::new(Monitor::new(&MonitorConfig::default(), api).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, json: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    fn post_raw(uri: &str, body: &'static [u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_health() {
        let app = root_routes(create_test_state());
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_starts_without_reading() {
        let app = api_routes(create_test_state());
        let response = app.oneshot(get("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"]["mode"], "offshore");
        assert!(v["data"]["current"].is_null());
        assert_eq!(v["data"]["backend"], "in-memory");
    }

    #[tokio::test]
    async fn test_mode_switch() {
        let state = create_test_state();

        let response = api_routes(state.clone())
            .oneshot(post_json("/mode", r#"{"mode":"Onshore"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = api_routes(state.clone()).oneshot(get("/mode")).await.unwrap();
        let v = body_json(response).await;
        assert_eq!(v["data"]["mode"], "onshore");

        let response = api_routes(state)
            .oneshot(post_json("/mode", r#"{"mode":"arctic"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_thresholds_cover_both_modes() {
        let response = api_routes(create_test_state()).oneshot(get("/thresholds")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"]["active_mode"], "offshore");
        assert_eq!(v["data"]["offshore"]["temperature"]["direction"], "lower_is_worse");
        assert_eq!(v["data"]["onshore"]["temperature"]["direction"], "higher_is_worse");
        assert_eq!(v["data"]["onshore"]["hydrate_risk"]["critical"], 60.0);
    }

    #[tokio::test]
    async fn test_threshold_lookup() {
        let state = create_test_state();

        let response = api_routes(state.clone())
            .oneshot(get("/thresholds/offshore/hydrate_risk"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"]["warning"], 40.0);
        assert_eq!(v["data"]["critical"], 70.0);

        let response = api_routes(state)
            .oneshot(get("/thresholds/offshore/salinity"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_manual_reading_validation_errors() {
        let app = api_routes(create_test_state());
        let response = app
            .oneshot(post_json(
                "/readings",
                r#"{"temperature":"200","pressure":"100","flow_rate":"","timestamp":""}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let v = body_json(response).await;
        assert_eq!(v["error"]["code"], "VALIDATION_FAILED");
        assert!(v["error"]["fields"]["temperature"].is_string());
        assert_eq!(v["error"]["fields"]["timestamp"], "Timestamp is required");
        assert!(v["error"]["fields"].get("pressure").is_none());
    }

    #[tokio::test]
    async fn test_manual_reading_accepted() {
        let state = create_test_state();
        let response = api_routes(state.clone())
            .oneshot(post_json(
                "/readings",
                r#"{"temperature":"2.5","pressure":"65","flow_rate":"25","timestamp":"2026-10-17T08:00"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"]["hydrate_risk"]["status"], "Warning");

        let response = api_routes(state).oneshot(get("/alerts")).await.unwrap();
        let v = body_json(response).await;
        assert_eq!(v["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_simulation_flow() {
        let state = create_test_state();

        let response = api_routes(state.clone())
            .oneshot(post_raw("/simulation/validate", b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = api_routes(state.clone())
            .oneshot(post_raw("/simulation/file?name=notes.txt", b"hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = api_routes(state.clone())
            .oneshot(post_raw(
                "/simulation/file?name=readings.csv",
                b"mode,temperature,pressure,flow_rate\nonshore,15,25,55\n",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"]["state"], "file_selected");

        let response = api_routes(state.clone())
            .oneshot(post_raw("/simulation/run", b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"]["state"], "complete");
        assert_eq!(v["data"]["record_count"], 1);

        // A finished job must be reset before the next file
        let response = api_routes(state.clone())
            .oneshot(post_raw("/simulation/file?name=next.json", b"[]"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = api_routes(state)
            .oneshot(post_raw("/simulation/reset", b""))
            .await
            .unwrap();
        let v = body_json(response).await;
        assert_eq!(v["data"]["state"], "idle");
    }
}
