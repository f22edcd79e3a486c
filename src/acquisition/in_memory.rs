//! In-memory sensor backend
//!
//! Implements the same four endpoints as the REST backend against local
//! per-mode storage that keeps only the most recent rows. Hydrate risk is
//! computed on read with the physics engine. Used by demo mode and by the
//! test suite, which also drives the fault knobs (injected failures,
//! artificial latency, call counters).

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::dataset::{parse_dataset, DatasetFormat};
use super::{ApiError, NewReading, SensorApi, UploadReceipt};
use crate::config::defaults::HISTORY_LIMIT;
use crate::physics_engine::calculate_hydrate_risk;
use crate::types::{OperatingMode, SensorReading};

/// A stored row. Risk is not persisted; it is derived when served.
#[derive(Debug, Clone)]
struct StoredReading {
    id: i64,
    timestamp: DateTime<Utc>,
    reading: NewReading,
}

impl StoredReading {
    fn to_reading(&self) -> SensorReading {
        let r = &self.reading;
        SensorReading {
            id: Some(self.id),
            mode: r.mode,
            timestamp: self.timestamp,
            temperature: Some(r.temperature),
            pressure: Some(r.pressure),
            flow_rate: Some(r.flow_rate),
            hydrate_risk: Some(calculate_hydrate_risk(r.temperature, r.pressure, r.flow_rate)),
        }
    }
}

/// Per-mode rows ordered by (timestamp, id), capped at [`HISTORY_LIMIT`].
#[derive(Debug, Default)]
struct Store {
    offshore: VecDeque<StoredReading>,
    onshore: VecDeque<StoredReading>,
    next_id: i64,
}

impl Store {
    const fn rows(&self, mode: OperatingMode) -> &VecDeque<StoredReading> {
        match mode {
            OperatingMode::Offshore => &self.offshore,
            OperatingMode::Onshore => &self.onshore,
        }
    }

    fn insert(&mut self, reading: NewReading, timestamp: DateTime<Utc>) -> SensorReading {
        self.next_id += 1;
        let row = StoredReading {
            id: self.next_id,
            timestamp,
            reading,
        };
        let served = row.to_reading();
        let rows = match row.reading.mode {
            OperatingMode::Offshore => &mut self.offshore,
            OperatingMode::Onshore => &mut self.onshore,
        };
        // Appends unless a caller back-dates a row
        let key = (row.timestamp, row.id);
        let at = rows.partition_point(|r| (r.timestamp, r.id) <= key);
        rows.insert(at, row);
        while rows.len() > HISTORY_LIMIT {
            rows.pop_front();
        }
        served
    }
}

/// Test and demo knobs.
#[derive(Debug, Default)]
struct Faults {
    /// Returned by every call while set
    failure: Option<ApiError>,
    current_delay: Duration,
    history_delay: Duration,
    add_delay: Duration,
    upload_delay: Duration,
}

/// Local [`SensorApi`] backed by in-process storage.
#[derive(Debug, Default)]
pub struct InMemorySensorApi {
    store: RwLock<Store>,
    faults: RwLock<Faults>,
    current_calls: AtomicUsize,
    history_calls: AtomicUsize,
    upload_calls: AtomicUsize,
}

impl InMemorySensorApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with a short high-risk offshore series and a
    /// low-risk onshore series, five minutes apart, ending now.
    pub async fn with_sample_data() -> Self {
        const OFFSHORE: [(f64, f64, f64); 5] = [
            (2.5, 65.0, 25.0),
            (3.0, 62.0, 28.0),
            (2.8, 68.0, 22.0),
            (1.5, 70.0, 20.0),
            (3.5, 60.0, 30.0),
        ];
        const ONSHORE: [(f64, f64, f64); 5] = [
            (15.0, 25.0, 55.0),
            (16.5, 23.0, 58.0),
            (14.5, 27.0, 52.0),
            (17.0, 22.0, 60.0),
            (15.5, 24.0, 56.0),
        ];

        let api = Self::new();
        let now = Utc::now();
        for (mode, series) in [(OperatingMode::Offshore, OFFSHORE), (OperatingMode::Onshore, ONSHORE)] {
            for (i, (temperature, pressure, flow_rate)) in series.into_iter().enumerate() {
                let minutes_ago = i64::try_from(series.len() - i - 1).unwrap_or(0) * 5;
                api.insert_at(
                    NewReading {
                        mode,
                        temperature,
                        pressure,
                        flow_rate,
                    },
                    now - ChronoDuration::minutes(minutes_ago),
                )
                .await;
            }
        }
        api
    }

    /// Store a reading with an explicit capture time.
    pub async fn insert_at(&self, reading: NewReading, timestamp: DateTime<Utc>) -> SensorReading {
        self.store.write().await.insert(reading, timestamp)
    }

    /// Store a reading captured now.
    pub async fn insert(&self, reading: NewReading) -> SensorReading {
        self.insert_at(reading, Utc::now()).await
    }

    /// Number of stored readings for `mode`, at most [`HISTORY_LIMIT`].
    pub async fn len(&self, mode: OperatingMode) -> usize {
        self.store.read().await.rows(mode).len()
    }

    /// Make every call fail with `error` until cleared with `None`.
    pub async fn set_failure(&self, error: Option<ApiError>) {
        self.faults.write().await.failure = error;
    }

    /// Delay applied before answering `fetch_current`.
    pub async fn set_current_delay(&self, delay: Duration) {
        self.faults.write().await.current_delay = delay;
    }

    /// Delay applied before answering `fetch_history`.
    pub async fn set_history_delay(&self, delay: Duration) {
        self.faults.write().await.history_delay = delay;
    }

    /// Delay applied before answering `add_reading`.
    pub async fn set_add_delay(&self, delay: Duration) {
        self.faults.write().await.add_delay = delay;
    }

    /// Delay applied before answering `upload`.
    pub async fn set_upload_delay(&self, delay: Duration) {
        self.faults.write().await.upload_delay = delay;
    }

    pub fn current_calls(&self) -> usize {
        self.current_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    async fn check_failure(&self) -> Result<(), ApiError> {
        match &self.faults.read().await.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SensorApi for InMemorySensorApi {
    async fn fetch_current(&self, mode: OperatingMode) -> Result<Option<SensorReading>, ApiError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.faults.read().await.current_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check_failure().await?;

        let store = self.store.read().await;
        Ok(store.rows(mode).back().map(StoredReading::to_reading))
    }

    async fn fetch_history(&self, mode: OperatingMode) -> Result<Vec<SensorReading>, ApiError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.faults.read().await.history_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check_failure().await?;

        let store = self.store.read().await;
        Ok(store.rows(mode).iter().map(StoredReading::to_reading).collect())
    }

    async fn add_reading(&self, reading: &NewReading) -> Result<SensorReading, ApiError> {
        let delay = self.faults.read().await.add_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check_failure().await?;
        let values = [reading.temperature, reading.pressure, reading.flow_rate];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ApiError::Rejected {
                status: 422,
                detail: "temperature, pressure and flow_rate must be finite numbers".to_string(),
            });
        }
        let stored = self.insert(reading.clone()).await;
        debug!(mode = %reading.mode, id = ?stored.id, "[InMemorySensorApi] Reading added");
        Ok(stored)
    }

    async fn upload(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadReceipt, ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.faults.read().await.upload_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check_failure().await?;

        let format = DatasetFormat::from_file_name(file_name).ok_or_else(|| ApiError::Rejected {
            status: 400,
            detail: "Only CSV and JSON files are supported".to_string(),
        })?;
        let records = parse_dataset(format, &contents).map_err(|e| ApiError::Rejected {
            status: 400,
            detail: e.to_string(),
        })?;

        let count = records.len();
        let now = Utc::now();
        let mut store = self.store.write().await;
        for record in records {
            store.insert(
                NewReading {
                    mode: record.mode,
                    temperature: record.temperature,
                    pressure: record.pressure,
                    flow_rate: record.flow_rate,
                },
                now,
            );
        }

        Ok(UploadReceipt {
            message: format!("Successfully uploaded {count} sensor readings"),
            count: Some(count),
        })
    }

    fn source_name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offshore(temperature: f64) -> NewReading {
        NewReading {
            mode: OperatingMode::Offshore,
            temperature,
            pressure: 65.0,
            flow_rate: 25.0,
        }
    }

    #[tokio::test]
    async fn current_is_latest_for_mode() {
        let api = InMemorySensorApi::new();
        assert_eq!(api.fetch_current(OperatingMode::Offshore).await.unwrap(), None);

        api.insert(offshore(4.0)).await;
        api.insert(offshore(2.5)).await;
        let current = api.fetch_current(OperatingMode::Offshore).await.unwrap().unwrap();
        assert_eq!(current.temperature, Some(2.5));
        assert_eq!(api.fetch_current(OperatingMode::Onshore).await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_reading_echoes_risk() {
        let api = InMemorySensorApi::new();
        let echoed = api.add_reading(&offshore(2.5)).await.unwrap();
        let risk = echoed.hydrate_risk.unwrap();
        assert!((risk - 65.0).abs() < 1e-9, "risk was {risk}");
    }

    #[tokio::test]
    async fn history_is_capped_oldest_first() {
        let api = InMemorySensorApi::new();
        let start = Utc::now();
        for i in 0..60 {
            api.insert_at(offshore(f64::from(i)), start + ChronoDuration::seconds(i64::from(i)))
                .await;
        }
        let history = api.fetch_history(OperatingMode::Offshore).await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].temperature, Some(10.0));
        assert_eq!(history[HISTORY_LIMIT - 1].temperature, Some(59.0));
    }

    #[tokio::test]
    async fn long_running_feed_stays_bounded() {
        let api = InMemorySensorApi::new();
        let start = Utc::now();
        for i in 0..5_000 {
            api.insert_at(offshore(4.0), start + ChronoDuration::seconds(i)).await;
        }
        assert_eq!(api.len(OperatingMode::Offshore).await, HISTORY_LIMIT);

        // A back-dated row lands in time order, not at the end
        api.insert_at(offshore(9.0), start + ChronoDuration::seconds(4_990)).await;
        let history = api.fetch_history(OperatingMode::Offshore).await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(history[HISTORY_LIMIT - 10].temperature, Some(9.0));
        let latest = api.fetch_current(OperatingMode::Offshore).await.unwrap().unwrap();
        assert_eq!(latest.timestamp, start + ChronoDuration::seconds(4_999));
    }

    #[tokio::test]
    async fn upload_ingests_dataset() {
        let api = InMemorySensorApi::new();
        let csv = b"mode,temperature,pressure,flow_rate\noffshore,5.2,45.3,35.7\nonshore,20,40,120\n".to_vec();
        let receipt = api.upload("run.csv", csv).await.unwrap();
        assert_eq!(receipt.count, Some(2));
        assert_eq!(receipt.message, "Successfully uploaded 2 sensor readings");
        assert_eq!(api.len(OperatingMode::Offshore).await, 1);
        assert_eq!(api.len(OperatingMode::Onshore).await, 1);
    }

    #[tokio::test]
    async fn upload_rejects_bad_content() {
        let api = InMemorySensorApi::new();
        let err = api.upload("run.csv", b"mode,temperature\noffshore,5\n".to_vec()).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected { status: 400, .. }));
        assert_eq!(api.len(OperatingMode::Offshore).await, 0);
    }

    #[tokio::test]
    async fn injected_failure_applies_until_cleared() {
        let api = InMemorySensorApi::new();
        api.set_failure(Some(ApiError::Unauthenticated)).await;
        assert_eq!(
            api.fetch_history(OperatingMode::Onshore).await,
            Err(ApiError::Unauthenticated)
        );
        api.set_failure(None).await;
        assert!(api.fetch_history(OperatingMode::Onshore).await.is_ok());
        assert_eq!(api.history_calls(), 2);
    }

    #[tokio::test]
    async fn sample_data_covers_both_modes() {
        let api = InMemorySensorApi::with_sample_data().await;
        assert_eq!(api.len(OperatingMode::Offshore).await, 5);
        assert_eq!(api.len(OperatingMode::Onshore).await, 5);
        let latest = api.fetch_current(OperatingMode::Offshore).await.unwrap().unwrap();
        assert_eq!(latest.temperature, Some(3.5));
    }
}
