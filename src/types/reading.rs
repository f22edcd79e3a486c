//! Sensor readings and their classified form

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::{OperatingMode, Quantity};

/// One telemetry sample as delivered by the sensor backend or entered by an
/// operator. Quantities are optional: a missing value means the sensor was
/// offline for that sample.
///
/// Readings are immutable once created; a newer reading supersedes an older
/// one, it never modifies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Backend row id, when the reading came from the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Mode the reading was captured under
    pub mode: OperatingMode,
    /// Capture time. Naive timestamps from the backend are taken as UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub flow_rate: Option<f64>,
    #[serde(default)]
    pub hydrate_risk: Option<f64>,
}

impl SensorReading {
    /// A reading with every quantity absent.
    pub fn empty(mode: OperatingMode, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            mode,
            timestamp,
            temperature: None,
            pressure: None,
            flow_rate: None,
            hydrate_risk: None,
        }
    }

    /// Value of a quantity. Non-finite values count as absent.
    pub fn value(&self, quantity: Quantity) -> Option<f64> {
        let raw = match quantity {
            Quantity::Temperature => self.temperature,
            Quantity::Pressure => self.pressure,
            Quantity::FlowRate => self.flow_rate,
            Quantity::HydrateRisk => self.hydrate_risk,
        };
        raw.filter(|v| v.is_finite())
    }

    /// Builder-style setter used by generators and tests.
    #[must_use]
    pub fn with(mut self, quantity: Quantity, value: Option<f64>) -> Self {
        match quantity {
            Quantity::Temperature => self.temperature = value,
            Quantity::Pressure => self.pressure = value,
            Quantity::FlowRate => self.flow_rate = value,
            Quantity::HydrateRisk => self.hydrate_risk = value,
        }
        self
    }
}

/// Parse RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS[.fff]]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

/// Severity label for a single quantity.
///
/// Ordered by severity so `max()` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Offline,
    Normal,
    Warning,
    Critical,
}

impl Status {
    /// Warning or Critical.
    pub const fn is_alerting(self) -> bool {
        matches!(self, Self::Warning | Self::Critical)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Offline => "Offline",
            Self::Normal => "Normal",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// Direction of change relative to the preceding reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}

/// Classification of one quantity within a reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantityStatus {
    pub value: Option<f64>,
    pub status: Status,
    pub trend: Trend,
}

/// A reading together with its derived status and trend per quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedReading {
    pub reading: SensorReading,
    /// Mode whose profiles produced the statuses below. Differs from
    /// `reading.mode` after an operating-mode switch reclassifies the
    /// last-known reading.
    pub classified_under: OperatingMode,
    pub temperature: QuantityStatus,
    pub pressure: QuantityStatus,
    pub flow_rate: QuantityStatus,
    pub hydrate_risk: QuantityStatus,
    /// Worst non-offline status, or Offline when every sensor is offline
    pub overall: Status,
}

impl ClassifiedReading {
    pub const fn quantity(&self, quantity: Quantity) -> &QuantityStatus {
        match quantity {
            Quantity::Temperature => &self.temperature,
            Quantity::Pressure => &self.pressure,
            Quantity::FlowRate => &self.flow_rate,
            Quantity::HydrateRisk => &self.hydrate_risk,
        }
    }

    pub const fn status(&self, quantity: Quantity) -> Status {
        self.quantity(quantity).status
    }
}
