//! Monitor Configuration Module
//!
//! Per-deployment configuration loaded from TOML, covering polling cadence,
//! alert retention, upload limits, backend connection and the per-mode
//! threshold tables.
//!
//! ## Loading Order
//!
//! 1. `HYDRAWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `hydrawatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let config = MonitorConfig::load()?;
//! let thresholds = ThresholdStore::from_config(&config.thresholds)?;
//! ```

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
