//! API route handlers
//!
//! All handlers return `Response` via [`ApiResponse::ok`] or
//! [`ApiErrorResponse`]. Operator actions (mode switch, manual reading,
//! simulation steps) go through the [`Monitor`] facade.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::pipeline::{Ingested, ManualReadingForm, Monitor, SubmitError};
use crate::simulation::{SimulationError, SimulationJobView, UploadFile};
use crate::types::{ModeThresholds, OperatingMode};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub monitor: Monitor,
}

impl ApiState {
    pub const fn new(monitor: Monitor) -> Self {
        Self { monitor }
    }
}

// ============================================================================
// Response / request types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: OperatingMode,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ModeResponse {
    pub mode: OperatingMode,
    /// Reclassification of the last-known reading, when there was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reclassified: Option<Ingested>,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: String,
}

/// Profiles for both modes; `active_mode` says which one applies now.
#[derive(Debug, Serialize)]
pub struct ThresholdsResponse {
    pub active_mode: OperatingMode,
    pub offshore: ModeThresholds,
    pub onshore: ModeThresholds,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub name: Option<String>,
}

// ============================================================================
// Monitoring
// ============================================================================

/// GET /health
pub async fn health(State(state): State<ApiState>) -> Response {
    let status = state.monitor.status().await;
    ApiResponse::ok(HealthResponse {
        status: "ok",
        mode: status.mode,
        uptime_secs: status.uptime_secs,
    })
}

/// GET /api/v1/status
pub async fn get_status(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.monitor.status().await)
}

/// GET /api/v1/history
pub async fn get_history(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.monitor.polling().history().await)
}

/// GET /api/v1/alerts
pub async fn get_alerts(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.monitor.alerts().await)
}

/// GET /api/v1/thresholds
pub async fn get_thresholds(State(state): State<ApiState>) -> Response {
    let monitor = state.monitor.state().read().await;
    let thresholds = monitor.thresholds();
    ApiResponse::ok(ThresholdsResponse {
        active_mode: monitor.mode(),
        offshore: thresholds.for_mode(OperatingMode::Offshore).clone(),
        onshore: thresholds.for_mode(OperatingMode::Onshore).clone(),
    })
}

/// GET /api/v1/thresholds/:mode/:quantity
pub async fn get_threshold_profile(
    State(state): State<ApiState>,
    Path((mode, quantity)): Path<(String, String)>,
) -> Response {
    let monitor = state.monitor.state().read().await;
    match monitor.thresholds().lookup(&mode, &quantity) {
        Ok(profile) => ApiResponse::ok(*profile),
        Err(e) => ApiErrorResponse::not_found(e.to_string()),
    }
}

// ============================================================================
// Operator actions
// ============================================================================

/// GET /api/v1/mode
pub async fn get_mode(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(ModeResponse {
        mode: state.monitor.mode().await,
        reclassified: None,
    })
}

/// POST /api/v1/mode
pub async fn set_mode(State(state): State<ApiState>, Json(req): Json<ModeRequest>) -> Response {
    let mode: OperatingMode = match req.mode.parse() {
        Ok(m) => m,
        Err(e) => return ApiErrorResponse::bad_request(e.to_string()),
    };
    info!(mode = %mode, "[API] Operating mode change requested");
    let reclassified = state.monitor.switch_mode(mode).await;
    ApiResponse::ok(ModeResponse { mode, reclassified })
}

/// POST /api/v1/readings
pub async fn submit_reading(State(state): State<ApiState>, Json(form): Json<ManualReadingForm>) -> Response {
    match state.monitor.submitter().submit(&form).await {
        Ok(classified) => ApiResponse::ok(classified),
        Err(SubmitError::Validation(fields)) => ApiErrorResponse::invalid_fields(fields),
        Err(SubmitError::Api(e)) => ApiErrorResponse::backend(&e),
    }
}

// ============================================================================
// Simulation
// ============================================================================

fn simulation_error(error: &SimulationError) -> Response {
    match error {
        SimulationError::Validation(rejection) => ApiErrorResponse::bad_request(rejection.to_string()),
        SimulationError::NoJob => ApiErrorResponse::not_found(error.to_string()),
        SimulationError::JobRunning | SimulationError::ResetRequired | SimulationError::InvalidTransition { .. } => {
            ApiErrorResponse::conflict(error.to_string())
        }
    }
}

fn simulation_result(result: Result<SimulationJobView, SimulationError>) -> Response {
    match result {
        Ok(view) => ApiResponse::ok(view),
        Err(e) => simulation_error(&e),
    }
}

/// GET /api/v1/simulation
pub async fn get_simulation(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.monitor.simulation().snapshot().await)
}

/// POST /api/v1/simulation/file?name=readings.csv
///
/// The request body is the raw file content.
pub async fn select_simulation_file(
    State(state): State<ApiState>,
    Query(query): Query<FileQuery>,
    body: Bytes,
) -> Response {
    let file = UploadFile::new(query.name.unwrap_or_default(), body.to_vec());
    simulation_result(state.monitor.simulation().select_file(file).await)
}

/// POST /api/v1/simulation/validate
pub async fn validate_simulation(State(state): State<ApiState>) -> Response {
    simulation_result(state.monitor.simulation().validate().await)
}

/// POST /api/v1/simulation/run
///
/// Answers once the upload has finished; the job's outcome (Complete or
/// Failed) is in the returned view.
pub async fn run_simulation(State(state): State<ApiState>) -> Response {
    simulation_result(state.monitor.simulation().run().await)
}

/// POST /api/v1/simulation/reset
pub async fn reset_simulation(State(state): State<ApiState>) -> Response {
    simulation_result(state.monitor.simulation().reset().await)
}
