//! Sensor data acquisition module
//!
//! The monitoring core talks to the sensor backend only through the
//! [`SensorApi`] trait. Two implementations ship with the crate:
//!
//! - [`HttpSensorApi`]: reqwest client for the backend REST API
//! - [`InMemorySensorApi`]: local backend used for demo mode and tests
//!
//! Plus the helpers those backends need: the upload dataset parser and a
//! deterministic reading generator.

pub mod dataset;
pub mod generator;
pub mod http_client;
pub mod in_memory;

pub use dataset::{parse_dataset, DatasetError, DatasetFormat, DatasetRecord};
pub use generator::ReadingGenerator;
pub use http_client::HttpSensorApi;
pub use in_memory::InMemorySensorApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{OperatingMode, SensorReading};

/// Errors returned by a sensor backend.
///
/// `Unauthenticated` is kept apart from every other failure so callers can
/// send the operator to re-authenticate instead of offering a retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Not authenticated with the sensor backend")]
    Unauthenticated,
    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("Backend error ({status}): {detail}")]
    Server { status: u16, detail: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed backend response: {0}")]
    Decode(String),
}

impl ApiError {
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Human-readable detail for display, without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Rejected { detail, .. } | Self::Server { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Body of `POST /sensors/add`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    pub mode: OperatingMode,
    pub temperature: f64,
    pub pressure: f64,
    pub flow_rate: f64,
}

/// Success body of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub message: String,
    /// Number of readings ingested, when the backend reports it
    #[serde(default)]
    pub count: Option<usize>,
}

/// Transport-agnostic view of the sensor backend.
#[async_trait]
pub trait SensorApi: Send + Sync + 'static {
    /// Latest reading for `mode`; `Ok(None)` when the backend has none yet.
    async fn fetch_current(&self, mode: OperatingMode) -> Result<Option<SensorReading>, ApiError>;

    /// Past readings for `mode`, oldest first. May be empty.
    async fn fetch_history(&self, mode: OperatingMode) -> Result<Vec<SensorReading>, ApiError>;

    /// Store an operator-entered reading; the echo carries the computed
    /// hydrate risk.
    async fn add_reading(&self, reading: &NewReading) -> Result<SensorReading, ApiError>;

    /// Transmit a simulation dataset for processing.
    async fn upload(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadReceipt, ApiError>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}
