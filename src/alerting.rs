//! Alert Aggregator
//!
//! Turns classified readings into hydrate-risk alerts. Emission is
//! edge-triggered: an alert is raised when the hydrate-risk status moves
//! into Warning or Critical from a different status, not on every poll
//! while the condition persists. The live list is bounded, most recent
//! first; inserting past the bound evicts the oldest entry.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::config::AlertConfig;
use crate::types::{Alert, AlertLevel, ClassifiedReading, ReadingRef, Status};

/// Edge-triggered, bounded alert list.
#[derive(Debug, Clone)]
pub struct AlertAggregator {
    alerts: VecDeque<Alert>,
    capacity: usize,
    /// Re-emit a sustained condition after this long; `None` = never
    realert_after: Option<Duration>,
    /// Last non-offline hydrate-risk status seen
    tracked: Status,
    last_emitted_at: Option<DateTime<Utc>>,
    next_id: u64,
}

impl AlertAggregator {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            alerts: VecDeque::with_capacity(capacity),
            capacity,
            realert_after: None,
            tracked: Status::Offline,
            last_emitted_at: None,
            next_id: 1,
        }
    }

    pub fn from_config(config: &AlertConfig) -> Self {
        let mut aggregator = Self::new(config.max_alerts);
        if config.realert_after_secs > 0 {
            let secs = i64::try_from(config.realert_after_secs).unwrap_or(i64::MAX);
            aggregator.realert_after = Some(Duration::seconds(secs));
        }
        aggregator
    }

    #[must_use]
    pub fn with_realert_after(mut self, after: Option<Duration>) -> Self {
        self.realert_after = after;
        self
    }

    /// Feed a classified reading; returns the alert if one was emitted.
    pub fn on_classified_reading(&mut self, reading: &ClassifiedReading) -> Option<Alert> {
        self.on_classified_reading_at(reading, Utc::now())
    }

    /// Same as [`on_classified_reading`](Self::on_classified_reading) with an
    /// explicit clock.
    pub fn on_classified_reading_at(
        &mut self,
        reading: &ClassifiedReading,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        let status = reading.hydrate_risk.status;
        // A sensor dropout neither clears nor re-arms the edge detector.
        if status == Status::Offline {
            return None;
        }

        let previous = std::mem::replace(&mut self.tracked, status);
        let level = AlertLevel::for_status(status)?;
        let risk = reading.hydrate_risk.value?;

        let transition = previous != status;
        let sustained_due = !transition
            && self.realert_after.is_some_and(|after| {
                self.last_emitted_at
                    .map_or(true, |last| now.signed_duration_since(last) >= after)
            });

        if !transition && !sustained_due {
            debug!(status = %status, risk, "[AlertAggregator] Condition unchanged, no alert");
            return None;
        }

        let alert = Alert {
            id: self.next_id,
            level,
            message: alert_message(level, risk, reading.reading.timestamp),
            created_at: now,
            reading_ref: ReadingRef {
                mode: reading.reading.mode,
                captured_at: reading.reading.timestamp,
            },
        };
        self.next_id += 1;
        self.last_emitted_at = Some(now);
        self.push(alert.clone());

        info!(
            alert_level = ?alert.level,
            from = %previous,
            to = %status,
            "[AlertAggregator] {}",
            alert.message
        );
        Some(alert)
    }

    fn push(&mut self, alert: Alert) {
        self.alerts.push_front(alert);
        self.alerts.truncate(self.capacity);
    }

    /// Alerts, most recent first.
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn snapshot(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Last non-offline hydrate-risk status the edge detector saw.
    pub const fn tracked_status(&self) -> Status {
        self.tracked
    }
}

/// "Critical hydrate risk: 75.0% at 2026-10-17 08:00:00 UTC"
fn alert_message(level: AlertLevel, risk: f64, at: DateTime<Utc>) -> String {
    let label = match level {
        AlertLevel::High => "Critical",
        AlertLevel::Medium => "Moderate",
    };
    format!(
        "{label} hydrate risk: {risk:.1}% at {}",
        at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}
