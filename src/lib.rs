//! HydraWatch: pipeline hydrate-risk monitoring core
//!
//! ## Architecture
//!
//! - **Types**: operating modes, readings, threshold profiles, alerts
//! - **Physics Engine**: hydrate formation risk model
//! - **Classifier**: per-quantity status and trend against a mode's profiles
//! - **Alerting**: edge-triggered, bounded alert list
//! - **Acquisition**: sensor backend clients, dataset parsing, demo generator
//! - **Pipeline**: polling source, manual submissions, the `Monitor` facade
//! - **Simulation**: dataset upload job state machine
//! - **API**: JSON status and operator endpoints

pub mod acquisition;
pub mod alerting;
pub mod api;
pub mod classifier;
pub mod config;
pub mod physics_engine;
pub mod pipeline;
pub mod simulation;
pub mod types;

pub use config::MonitorConfig;
pub use pipeline::Monitor;
pub use types::{ClassifiedReading, OperatingMode, SensorReading, Status};
