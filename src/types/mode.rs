//! Operating modes and monitored quantities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Operating-environment profile selecting which thresholds apply.
///
/// The active mode is owned by an external source of truth (the operator's
/// mode selector); the monitoring core only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Subsea pipeline: high pressure, low ambient temperature
    #[default]
    Offshore,
    /// Surface pipeline: ambient temperature and operational control
    Onshore,
}

impl OperatingMode {
    pub const ALL: [Self; 2] = [Self::Offshore, Self::Onshore];

    /// Wire name used in request paths and payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offshore => "offshore",
            Self::Onshore => "onshore",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offshore" => Ok(Self::Offshore),
            "onshore" => Ok(Self::Onshore),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// A monitored quantity carried by every sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// Pipeline temperature (°C)
    Temperature,
    /// Line pressure (bar)
    Pressure,
    /// Volumetric flow rate (m³/h)
    FlowRate,
    /// Derived hydrate formation risk (%)
    HydrateRisk,
}

impl Quantity {
    pub const ALL: [Self; 4] = [
        Self::Temperature,
        Self::Pressure,
        Self::FlowRate,
        Self::HydrateRisk,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Pressure => "pressure",
            Self::FlowRate => "flow_rate",
            Self::HydrateRisk => "hydrate_risk",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Pressure => "bar",
            Self::FlowRate => "m³/h",
            Self::HydrateRisk => "%",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quantity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" => Ok(Self::Temperature),
            "pressure" => Ok(Self::Pressure),
            "flow_rate" | "flowrate" => Ok(Self::FlowRate),
            "hydrate_risk" => Ok(Self::HydrateRisk),
            _ => Err(ConfigError::UnknownQuantity(s.to_string())),
        }
    }
}
