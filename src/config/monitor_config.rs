//! Monitor Configuration - every tunable value as a TOML field
//!
//! Each section implements `Default` with the values from `defaults`, so a
//! missing file or a partial file behaves like the built-in configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::types::{OperatingMode, ThresholdConfig};

/// Environment variable pointing at a TOML config file.
pub const CONFIG_ENV_VAR: &str = "HYDRAWATCH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "hydrawatch.toml";

/// Configuration failures. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Unknown operating mode '{0}' (expected offshore or onshore)")]
    UnknownMode(String),
    #[error("Unknown quantity '{0}' (expected temperature, pressure, flow_rate or hydrate_risk)")]
    UnknownQuantity(String),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a monitoring deployment.
///
/// Load with [`MonitorConfig::load()`], which searches:
/// 1. `$HYDRAWATCH_CONFIG`
/// 2. `./hydrawatch.toml`
/// 3. Built-in defaults
///
/// The config is passed explicitly to the components that need it; there is
/// no process-global copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub monitor: MonitorSection,

    /// Status API server
    #[serde(default)]
    pub server: ServerConfig,

    /// Sensor backend connection
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    /// Simulation dataset upload limits
    #[serde(default)]
    pub upload: UploadConfig,

    /// Per-mode threshold tables. A mode table, when present, must list all
    /// four quantities.
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order, apply environment
    /// overrides and validate.
    ///
    /// A file that exists but fails to read, parse or validate is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::locate()?;
        config.validate()?;
        Ok(config)
    }

    /// [`load`](Self::load) without the final [`validate`](Self::validate),
    /// for callers that layer more overrides first. Errors in the file
    /// itself are still fatal.
    pub fn locate() -> Result<Self, ConfigError> {
        let mut config = if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            let config = Self::load_from_file(&p)?;
            info!(path = %p.display(), "Loaded monitor config from {}", CONFIG_ENV_VAR);
            config
        } else {
            let local = PathBuf::from(LOCAL_CONFIG_FILE);
            if local.exists() {
                let config = Self::load_from_file(&local)?;
                info!("Loaded monitor config from ./{}", LOCAL_CONFIG_FILE);
                config
            } else {
                info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse TOML text and reject invalid values.
    ///
    /// Two passes: unknown keys are reported as warnings (with suggestions),
    /// then serde deserialization runs. Unknown modes or quantities under
    /// `[thresholds]` are rejected by the deserializer. Range warnings are
    /// left to [`validate`](Self::validate).
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let mut config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.upload.normalize();
        config.check()?;
        Ok(config)
    }

    /// Environment overrides: secrets and bind address.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("HYDRAWATCH_API_TOKEN") {
            if !token.is_empty() {
                self.backend.api_token = Some(token);
            }
        }
        if let Ok(addr) = std::env::var("HYDRAWATCH_SERVER_ADDR") {
            self.server.addr = addr;
        }
    }

    /// Check every section; errors are fatal, range warnings are logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check()?;
        for w in super::validation::validate_ranges(self) {
            warn!("{}", w);
        }
        Ok(())
    }

    fn check(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        self.thresholds.validate(&mut errors);

        if self.polling.interval_ms == 0 {
            errors.push("polling.interval_ms must be > 0".to_string());
        }
        if self.alerts.max_alerts == 0 {
            errors.push("alerts.max_alerts must be >= 1".to_string());
        }
        if self.upload.max_file_bytes == 0 {
            errors.push("upload.max_file_bytes must be > 0".to_string());
        }
        if self.upload.allowed_extensions.is_empty() {
            errors.push("upload.allowed_extensions must list at least one extension".to_string());
        }
        if self.backend.timeout_secs == 0 {
            errors.push("backend.timeout_secs must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Serialize back to TOML (used by `--print-config`).
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// Mode selected at startup until the operator switches it
    pub initial_mode: OperatingMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: defaults::SERVER_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL including the API prefix, e.g. `http://host:8000/api/v1`
    pub base_url: String,
    /// Bearer token attached to every request. Prefer `HYDRAWATCH_API_TOKEN`.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BACKEND_BASE_URL.to_string(),
            api_token: None,
            timeout_secs: defaults::BACKEND_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

impl PollingConfig {
    pub const fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alerts retained in the live list
    pub max_alerts: usize,
    /// Re-emit a sustained Warning/Critical after this many seconds (0 = never)
    pub realert_after_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            max_alerts: defaults::MAX_ALERTS,
            realert_after_secs: defaults::REALERT_AFTER_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_file_bytes: u64,
    /// Lowercase extensions without the leading dot
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: defaults::MAX_UPLOAD_BYTES,
            allowed_extensions: defaults::ALLOWED_UPLOAD_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl UploadConfig {
    /// Accept `.CSV` and `csv` alike.
    pub fn normalize(&mut self) {
        for ext in &mut self.allowed_extensions {
            *ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        }
        self.allowed_extensions.retain(|e| !e.is_empty());
    }
}
