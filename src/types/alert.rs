//! Hydrate-risk alerts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OperatingMode, Status};

/// Alert severity shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Hydrate risk crossed into Warning
    Medium,
    /// Hydrate risk crossed into Critical
    High,
}

impl AlertLevel {
    /// Level for an alerting status; `None` for Normal/Offline.
    pub const fn for_status(status: Status) -> Option<Self> {
        match status {
            Status::Warning => Some(Self::Medium),
            Status::Critical => Some(Self::High),
            Status::Normal | Status::Offline => None,
        }
    }
}

/// Points back at the reading that raised an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingRef {
    pub mode: OperatingMode,
    pub captured_at: DateTime<Utc>,
}

/// A hydrate-risk alert. Alerts are never edited after creation; the
/// aggregator only prepends new ones and evicts the oldest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Monotonic sequence number within the process
    pub id: u64,
    pub level: AlertLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub reading_ref: ReadingRef,
}
