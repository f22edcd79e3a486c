//! Monitor Coordinator - wires the monitoring core together
//!
//! ```text
//! ThresholdStore ──► Classifier ◄── PollingSource / ManualReadingSubmitter
//!                        │
//!                        ▼
//!                 AlertAggregator ──► status API
//!
//! SimulationPipeline ──(refresh)──► PollingSource
//! ```
//!
//! The operator's mode selection enters through [`Monitor::switch_mode`],
//! which reclassifies the last reading before the polling task hears about
//! the change.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::manual::ManualReadingSubmitter;
use super::polling::{PollError, PollStats, PollingSource, RefreshHandle};
use super::state::{Ingested, MonitorState, SharedMonitor};
use crate::acquisition::SensorApi;
use crate::alerting::AlertAggregator;
use crate::config::{ConfigError, MonitorConfig};
use crate::simulation::SimulationPipeline;
use crate::types::{Alert, ClassifiedReading, OperatingMode, ThresholdStore};

/// Everything the status API shows on its landing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub mode: OperatingMode,
    pub current: Option<ClassifiedReading>,
    pub last_error: Option<PollError>,
    pub poll_stats: PollStats,
    pub alert_count: usize,
    pub readings_ingested: u64,
    pub uptime_secs: u64,
    pub backend: String,
}

/// Facade over the monitoring core. Cheap to clone.
#[derive(Clone)]
pub struct Monitor {
    api: Arc<dyn SensorApi>,
    state: SharedMonitor,
    polling: PollingSource,
    submitter: ManualReadingSubmitter,
    simulation: Arc<SimulationPipeline>,
    mode_tx: Arc<watch::Sender<OperatingMode>>,
}

impl Monitor {
    /// Build the core from configuration. Fails only on invalid thresholds.
    pub fn new(config: &MonitorConfig, api: Arc<dyn SensorApi>) -> Result<Self, ConfigError> {
        let thresholds = Arc::new(ThresholdStore::from_config(&config.thresholds)?);
        let mode = config.monitor.initial_mode;
        let state = MonitorState::new(thresholds, mode, AlertAggregator::from_config(&config.alerts)).shared();

        let (mode_tx, mode_rx) = watch::channel(mode);
        let polling = PollingSource::new(api.clone(), state.clone(), mode_rx, config.polling.interval());
        let refresh = polling.refresh_handle();
        let submitter = ManualReadingSubmitter::new(api.clone(), state.clone(), refresh.clone());
        let simulation = Arc::new(SimulationPipeline::new(api.clone(), refresh, config.upload.clone()));

        info!(
            mode = %mode,
            backend = api.source_name(),
            interval = ?config.polling.interval(),
            max_alerts = config.alerts.max_alerts,
            "[Monitor] Initialized"
        );

        Ok(Self {
            api,
            state,
            polling,
            submitter,
            simulation,
            mode_tx: Arc::new(mode_tx),
        })
    }

    /// Run the polling task until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        self.polling.run(cancel).await;
    }

    pub async fn mode(&self) -> OperatingMode {
        self.state.read().await.mode()
    }

    /// Switch the operating mode.
    ///
    /// The last-known reading is reclassified against the new profiles
    /// before this returns; the polling task then reloads history and polls
    /// the new mode.
    pub async fn switch_mode(&self, mode: OperatingMode) -> Option<Ingested> {
        let reclassified = {
            let mut state = self.state.write().await;
            if state.mode() == mode {
                return None;
            }
            state.set_mode(mode)
        };
        self.polling.supersede_history(mode).await;
        self.mode_tx.send_replace(mode);
        reclassified
    }

    pub async fn status(&self) -> MonitorStatus {
        let poll = self.polling.snapshot().await;
        let state = self.state.read().await;
        MonitorStatus {
            mode: state.mode(),
            current: state.current().cloned(),
            last_error: poll.last_error,
            poll_stats: poll.stats,
            alert_count: state.alerts().len(),
            readings_ingested: state.readings_ingested(),
            uptime_secs: state.uptime_secs(),
            backend: self.api.source_name().to_string(),
        }
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.state.read().await.alerts().snapshot()
    }

    pub async fn current(&self) -> Option<ClassifiedReading> {
        self.state.read().await.current().cloned()
    }

    pub const fn state(&self) -> &SharedMonitor {
        &self.state
    }

    pub const fn polling(&self) -> &PollingSource {
        &self.polling
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        self.polling.refresh_handle()
    }

    pub const fn submitter(&self) -> &ManualReadingSubmitter {
        &self.submitter
    }

    pub fn simulation(&self) -> &SimulationPipeline {
        &self.simulation
    }
}
