//! Monitor State
//!
//! The classified view of the sensor stream: active mode, the last
//! classified reading and the alert list. Polled and manually entered
//! readings both enter through [`MonitorState::ingest`], so the two are
//! indistinguishable downstream.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::alerting::AlertAggregator;
use crate::classifier::classify_for_mode;
use crate::types::{Alert, ClassifiedReading, OperatingMode, SensorReading, ThresholdStore};

/// Shared handle used by the polling task, the manual submitter and the API.
pub type SharedMonitor = Arc<RwLock<MonitorState>>;

/// Result of feeding one reading into the monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ingested {
    pub classified: ClassifiedReading,
    /// Alert raised by this reading, if it crossed a boundary
    pub alert: Option<Alert>,
    /// True when the reading was the one already displayed
    pub duplicate: bool,
}

#[derive(Debug)]
pub struct MonitorState {
    thresholds: Arc<ThresholdStore>,
    mode: OperatingMode,
    current: Option<ClassifiedReading>,
    /// Reading that preceded `current`, kept for trend on reclassification
    previous: Option<SensorReading>,
    alerts: AlertAggregator,
    readings_ingested: u64,
    started_at: Instant,
}

impl MonitorState {
    pub fn new(thresholds: Arc<ThresholdStore>, mode: OperatingMode, alerts: AlertAggregator) -> Self {
        Self {
            thresholds,
            mode,
            current: None,
            previous: None,
            alerts,
            readings_ingested: 0,
            started_at: Instant::now(),
        }
    }

    pub fn shared(self) -> SharedMonitor {
        Arc::new(RwLock::new(self))
    }

    /// Classify a reading under the active mode and hand the result to the
    /// alert aggregator.
    ///
    /// The backend keeps answering with the same latest row until a new one
    /// arrives; re-ingesting it would flatten every trend to Stable, so a
    /// repeat of the displayed reading is reported as a duplicate instead.
    pub fn ingest(&mut self, reading: SensorReading) -> Ingested {
        if let Some(current) = &self.current {
            if same_sample(&current.reading, &reading) {
                debug!(mode = %self.mode, "[Monitor] Reading unchanged since last poll");
                return Ingested {
                    classified: current.clone(),
                    alert: None,
                    duplicate: true,
                };
            }
        }

        let previous = self.current.take().map(|c| c.reading);
        let classified = classify_for_mode(reading, &self.thresholds, self.mode, previous.as_ref());
        let alert = self.alerts.on_classified_reading(&classified);

        self.previous = previous;
        self.current = Some(classified.clone());
        self.readings_ingested += 1;

        Ingested {
            classified,
            alert,
            duplicate: false,
        }
    }

    /// Ingest a reading captured for `mode`, but only while `mode` is still
    /// active. Returns `None` and leaves the state untouched otherwise.
    pub fn ingest_for_mode(&mut self, mode: OperatingMode, reading: SensorReading) -> Option<Ingested> {
        if mode != self.mode {
            debug!(captured = %mode, active = %self.mode, "[Monitor] Discarding reading for inactive mode");
            return None;
        }
        Some(self.ingest(reading))
    }

    /// Switch the active mode and reclassify the last-known reading against
    /// the new profiles right away. Returns `None` when nothing has been
    /// ingested yet or the mode is unchanged.
    pub fn set_mode(&mut self, mode: OperatingMode) -> Option<Ingested> {
        if mode == self.mode {
            return None;
        }
        let from = std::mem::replace(&mut self.mode, mode);
        info!(from = %from, to = %mode, "[Monitor] Operating mode switched");

        let reading = self.current.take()?.reading;
        let classified = classify_for_mode(reading, &self.thresholds, mode, self.previous.as_ref());
        let alert = self.alerts.on_classified_reading(&classified);
        self.current = Some(classified.clone());

        Some(Ingested {
            classified,
            alert,
            duplicate: false,
        })
    }

    pub const fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub const fn current(&self) -> Option<&ClassifiedReading> {
        self.current.as_ref()
    }

    pub const fn alerts(&self) -> &AlertAggregator {
        &self.alerts
    }

    pub fn thresholds(&self) -> &ThresholdStore {
        &self.thresholds
    }

    pub const fn readings_ingested(&self) -> u64 {
        self.readings_ingested
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Same backend row, or byte-for-byte the same sample when ids are absent.
fn same_sample(a: &SensorReading, b: &SensorReading) -> bool {
    match (a.id, b.id) {
        (Some(x), Some(y)) => x == y && a.mode == b.mode,
        _ => a == b,
    }
}
