//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery. Values that operators tune live
//! in `MonitorConfig`; these are the fallbacks it is built from.

// ============================================================================
// Polling
// ============================================================================

/// Interval between current-reading polls (milliseconds).
pub const POLL_INTERVAL_MS: u64 = 5_000;

/// Absolute change below which a quantity's trend is reported as Stable.
pub const TREND_EPSILON: f64 = 0.01;

// ============================================================================
// Alerts
// ============================================================================

/// Live alert list capacity (most recent first).
pub const MAX_ALERTS: usize = 5;

/// Re-alert interval for a sustained condition (seconds). 0 = never re-alert.
pub const REALERT_AFTER_SECS: u64 = 0;

// ============================================================================
// Simulation Upload
// ============================================================================

/// Largest dataset accepted for a simulation run. 10 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// File extensions accepted for simulation datasets (lowercase, no dot).
pub const ALLOWED_UPLOAD_EXTENSIONS: [&str; 2] = ["csv", "json"];

// ============================================================================
// Manual Entry
// ============================================================================

/// Accepted manual temperature range (°C).
pub const MANUAL_TEMPERATURE_MIN_C: f64 = -50.0;
pub const MANUAL_TEMPERATURE_MAX_C: f64 = 150.0;

/// Accepted manual pressure range (bar).
pub const MANUAL_PRESSURE_MIN_BAR: f64 = 0.0;
pub const MANUAL_PRESSURE_MAX_BAR: f64 = 500.0;

// ============================================================================
// Sensor Backend
// ============================================================================

/// Base URL of the sensor backend API.
pub const BACKEND_BASE_URL: &str = "http://localhost:8000/api/v1";

/// HTTP client timeout for backend requests (seconds).
pub const BACKEND_HTTP_TIMEOUT_SECS: u64 = 30;

/// Most recent readings returned by a history fetch.
pub const HISTORY_LIMIT: usize = 50;

// ============================================================================
// Status API
// ============================================================================

/// Default bind address for the status API.
pub const SERVER_ADDR: &str = "0.0.0.0:8090";

/// Request body headroom above `MAX_UPLOAD_BYTES` so oversized datasets reach
/// the simulation validator and get a structured rejection.
pub const UPLOAD_BODY_HEADROOM_BYTES: u64 = 16 * 1024 * 1024;
