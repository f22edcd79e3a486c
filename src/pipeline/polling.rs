//! Polling Source
//!
//! Periodically fetches the latest reading for the active mode and keeps the
//! history series for that mode. Owns the current-reading and history
//! caches; accepted readings are handed by value to the monitor state.
//!
//! Scheduling rules:
//! - one interval timer; a tick that finds a poll still in flight is skipped
//! - out-of-band refreshes wait for the in-flight poll, then issue their own
//! - a mode change cancels the history fetch for the old mode; any result
//!   that arrives for a superseded mode or generation is discarded
//! - failures are recorded in `last_error` and the timer keeps running

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::SharedMonitor;
use crate::acquisition::{ApiError, SensorApi};
use crate::types::{OperatingMode, SensorReading};

// ============================================================================
// Errors and Stats
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollErrorKind {
    /// Network or server trouble; the next tick retries
    Transient,
    /// Credentials rejected; retrying will not help
    Unauthenticated,
}

/// Last fetch failure, as shown to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollError {
    pub kind: PollErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl PollError {
    pub fn from_api(error: &ApiError) -> Self {
        let kind = if error.is_unauthenticated() {
            PollErrorKind::Unauthenticated
        } else {
            PollErrorKind::Transient
        };
        Self {
            kind,
            message: error.to_string(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    /// Current-reading fetches that completed (success or failure)
    pub polls: u64,
    /// Fetches that produced a new reading
    pub readings: u64,
    /// Ticks skipped because a poll was still in flight
    pub skipped: u64,
    pub failures: u64,
    /// Results dropped because the mode changed while they were in flight
    pub discarded: u64,
    pub history_fetches: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTrigger {
    /// Timer tick: give up if a poll is already running
    Tick,
    /// Out-of-band request: wait for the running poll, then poll again
    Refresh,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Updated,
    /// The backend returned the reading already displayed
    Unchanged,
    /// No reading exists yet for the mode
    Empty,
    Skipped,
    Discarded,
    Failed(ApiError),
}

// ============================================================================
// Refresh Handle
// ============================================================================

/// Requests an out-of-band poll. Requests made while one is already pending
/// collapse into it.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Returns `false` when the request collapsed into a pending one.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("[PollingSource] Refresh already pending, collapsed");
                false
            }
            Err(TrySendError::Closed(())) => {
                debug!("[PollingSource] Refresh requested after shutdown");
                false
            }
        }
    }
}

// ============================================================================
// Polling Source
// ============================================================================

#[derive(Debug, Default)]
struct PollCache {
    current: Option<SensorReading>,
    history: Vec<SensorReading>,
    history_mode: Option<OperatingMode>,
    history_generation: u64,
    history_cancel: CancellationToken,
    last_error: Option<PollError>,
    stats: PollStats,
}

/// Read-only view of the polling caches.
#[derive(Debug, Clone, Serialize)]
pub struct PollSnapshot {
    pub current: Option<SensorReading>,
    pub history_mode: Option<OperatingMode>,
    pub history_len: usize,
    pub last_error: Option<PollError>,
    pub stats: PollStats,
}

/// History series for the mode it was fetched under.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub mode: Option<OperatingMode>,
    pub readings: Vec<SensorReading>,
}

struct Inner {
    api: Arc<dyn SensorApi>,
    monitor: SharedMonitor,
    mode_rx: watch::Receiver<OperatingMode>,
    interval: Duration,
    /// Held for the duration of a current-reading fetch
    in_flight: Arc<Mutex<()>>,
    cache: RwLock<PollCache>,
    refresh_tx: mpsc::Sender<()>,
    refresh_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

#[derive(Clone)]
pub struct PollingSource {
    inner: Arc<Inner>,
}

impl PollingSource {
    pub fn new(
        api: Arc<dyn SensorApi>,
        monitor: SharedMonitor,
        mode_rx: watch::Receiver<OperatingMode>,
        interval: Duration,
    ) -> Self {
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        Self {
            inner: Arc::new(Inner {
                api,
                monitor,
                mode_rx,
                interval,
                in_flight: Arc::new(Mutex::new(())),
                cache: RwLock::new(PollCache::default()),
                refresh_tx,
                refresh_rx: Mutex::new(Some(refresh_rx)),
            }),
        }
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle {
            tx: self.inner.refresh_tx.clone(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Fetch the current reading for the active mode once.
    pub async fn poll_current(&self, trigger: PollTrigger) -> PollOutcome {
        let _guard = match trigger {
            PollTrigger::Tick => match self.inner.in_flight.clone().try_lock_owned() {
                Ok(guard) => guard,
                Err(_) => {
                    self.inner.cache.write().await.stats.skipped += 1;
                    debug!("[PollingSource] Poll still in flight, tick skipped");
                    return PollOutcome::Skipped;
                }
            },
            PollTrigger::Refresh => self.inner.in_flight.clone().lock_owned().await,
        };

        let mode = self.inner.monitor.read().await.mode();
        let result = self.inner.api.fetch_current(mode).await;

        match result {
            Ok(Some(reading)) => {
                let ingested = self.inner.monitor.write().await.ingest_for_mode(mode, reading.clone());
                let Some(ingested) = ingested else {
                    return self.discard(mode).await;
                };

                let mut cache = self.inner.cache.write().await;
                cache.stats.polls += 1;
                cache.last_error = None;
                cache.current = Some(reading);
                if ingested.duplicate {
                    PollOutcome::Unchanged
                } else {
                    cache.stats.readings += 1;
                    debug!(
                        mode = %mode,
                        status = %ingested.classified.overall,
                        "[PollingSource] Reading accepted"
                    );
                    PollOutcome::Updated
                }
            }
            Ok(None) => {
                if self.inner.monitor.read().await.mode() != mode {
                    return self.discard(mode).await;
                }
                let mut cache = self.inner.cache.write().await;
                cache.stats.polls += 1;
                cache.last_error = None;
                PollOutcome::Empty
            }
            Err(e) => {
                if self.inner.monitor.read().await.mode() != mode {
                    return self.discard(mode).await;
                }
                let mut cache = self.inner.cache.write().await;
                cache.stats.polls += 1;
                cache.stats.failures += 1;
                cache.last_error = Some(PollError::from_api(&e));
                if e.is_unauthenticated() {
                    warn!(mode = %mode, "[PollingSource] Backend rejected credentials");
                } else {
                    warn!(mode = %mode, error = %e, "[PollingSource] Poll failed, keeping last reading");
                }
                PollOutcome::Failed(e)
            }
        }
    }

    async fn discard(&self, mode: OperatingMode) -> PollOutcome {
        self.inner.cache.write().await.stats.discarded += 1;
        debug!(mode = %mode, "[PollingSource] Mode changed during poll, result discarded");
        PollOutcome::Discarded
    }

    /// Cancel any history fetch in progress and start one for `mode`.
    ///
    /// History for a different mode is cleared immediately so it is never
    /// shown under the new mode, even while the fetch is pending.
    pub async fn reload_history(&self, mode: OperatingMode) -> JoinHandle<()> {
        let (generation, token) = self.supersede_history(mode).await;
        let this = self.clone();
        tokio::spawn(async move { this.fetch_history(mode, generation, token).await })
    }

    /// Cancel the history fetch in flight and drop cached readings that do
    /// not belong to `mode`. Returns the new generation and its cancel token.
    pub(super) async fn supersede_history(&self, mode: OperatingMode) -> (u64, CancellationToken) {
        let mut cache = self.inner.cache.write().await;
        cache.history_cancel.cancel();
        cache.history_cancel = CancellationToken::new();
        cache.history_generation += 1;
        if cache.history_mode != Some(mode) {
            cache.history.clear();
            cache.history_mode = None;
        }
        if cache.current.as_ref().is_some_and(|r| r.mode != mode) {
            cache.current = None;
        }
        (cache.history_generation, cache.history_cancel.clone())
    }

    async fn fetch_history(&self, mode: OperatingMode, generation: u64, token: CancellationToken) {
        let result = tokio::select! {
            _ = token.cancelled() => {
                debug!(mode = %mode, "[PollingSource] History fetch cancelled");
                return;
            }
            result = self.inner.api.fetch_history(mode) => result,
        };

        let mut cache = self.inner.cache.write().await;
        if cache.history_generation != generation {
            cache.stats.discarded += 1;
            debug!(mode = %mode, "[PollingSource] Superseded history result discarded");
            return;
        }
        cache.stats.history_fetches += 1;
        match result {
            Ok(readings) => {
                debug!(mode = %mode, count = readings.len(), "[PollingSource] History loaded");
                cache.history = readings;
                cache.history_mode = Some(mode);
            }
            Err(e) => {
                warn!(mode = %mode, error = %e, "[PollingSource] History fetch failed, history cleared");
                cache.history.clear();
                cache.history_mode = None;
                cache.stats.failures += 1;
                cache.last_error = Some(PollError::from_api(&e));
            }
        }
    }

    pub async fn snapshot(&self) -> PollSnapshot {
        let cache = self.inner.cache.read().await;
        PollSnapshot {
            current: cache.current.clone(),
            history_mode: cache.history_mode,
            history_len: cache.history.len(),
            last_error: cache.last_error.clone(),
            stats: cache.stats,
        }
    }

    pub async fn history(&self) -> HistoryView {
        let cache = self.inner.cache.read().await;
        HistoryView {
            mode: cache.history_mode,
            readings: cache.history.clone(),
        }
    }

    pub async fn last_error(&self) -> Option<PollError> {
        self.inner.cache.read().await.last_error.clone()
    }

    pub async fn stats(&self) -> PollStats {
        self.inner.cache.read().await.stats
    }

    /// Drive the timer, refresh requests and mode changes until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let Some(mut refresh_rx) = self.inner.refresh_rx.lock().await.take() else {
            warn!("[PollingSource] Already running");
            return;
        };
        let mut mode_rx = self.inner.mode_rx.clone();
        let mode = *mode_rx.borrow_and_update();

        info!(
            mode = %mode,
            interval = ?self.inner.interval,
            source = self.inner.api.source_name(),
            "[PollingSource] Started"
        );
        drop(self.reload_history(mode).await);

        let mut ticker = tokio::time::interval(self.inner.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut watching_mode = true;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[PollingSource] Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    let this = self.clone();
                    tokio::spawn(async move {
                        this.poll_current(PollTrigger::Tick).await;
                    });
                }
                Some(()) = refresh_rx.recv() => {
                    let this = self.clone();
                    tokio::spawn(async move {
                        this.poll_current(PollTrigger::Refresh).await;
                    });
                }
                changed = mode_rx.changed(), if watching_mode => {
                    if changed.is_err() {
                        debug!("[PollingSource] Mode sender dropped, no longer watching");
                        watching_mode = false;
                        continue;
                    }
                    let mode = *mode_rx.borrow_and_update();
                    info!(mode = %mode, "[PollingSource] Mode change, reloading history");
                    drop(self.reload_history(mode).await);
                    self.refresh_handle().request();
                }
            }
        }

        self.inner.cache.read().await.history_cancel.cancel();
        let stats = self.stats().await;
        info!(
            polls = stats.polls,
            readings = stats.readings,
            skipped = stats.skipped,
            failures = stats.failures,
            "[PollingSource] Stopped"
        );
    }
}
