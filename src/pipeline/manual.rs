//! Manual Reading Submitter
//!
//! Validates an operator-entered reading, posts it to the backend and feeds
//! the echoed result through the same ingest path as a polled reading.
//! Every field is checked before any network call; nothing is coerced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::polling::RefreshHandle;
use super::state::SharedMonitor;
use crate::acquisition::{ApiError, NewReading, SensorApi};
use crate::classifier::classify_for_mode;
use crate::config::defaults::{
    MANUAL_PRESSURE_MAX_BAR, MANUAL_PRESSURE_MIN_BAR, MANUAL_TEMPERATURE_MAX_C,
    MANUAL_TEMPERATURE_MIN_C,
};
use crate::types::{parse_timestamp, ClassifiedReading, SensorReading};

/// Raw form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualReadingForm {
    pub temperature: String,
    pub pressure: String,
    /// Optional; blank is sent as 0
    pub flow_rate: String,
    pub timestamp: String,
}

/// Field name → message, sorted by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("Invalid reading: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A form that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedReading {
    pub temperature: f64,
    pub pressure: f64,
    pub flow_rate: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ManualReadingForm {
    /// Check every field, collecting all problems rather than the first.
    pub fn validate(&self) -> Result<ValidatedReading, FieldErrors> {
        let mut errors = FieldErrors::default();

        let temperature = required_number(&mut errors, "temperature", "Temperature", &self.temperature)
            .filter(|t| {
                let ok = (MANUAL_TEMPERATURE_MIN_C..=MANUAL_TEMPERATURE_MAX_C).contains(t);
                if !ok {
                    errors.add(
                        "temperature",
                        format!(
                            "Temperature must be between {MANUAL_TEMPERATURE_MIN_C} and {MANUAL_TEMPERATURE_MAX_C} °C"
                        ),
                    );
                }
                ok
            });

        let pressure = required_number(&mut errors, "pressure", "Pressure", &self.pressure).filter(|p| {
            let ok = (MANUAL_PRESSURE_MIN_BAR..=MANUAL_PRESSURE_MAX_BAR).contains(p);
            if !ok {
                errors.add(
                    "pressure",
                    format!("Pressure must be between {MANUAL_PRESSURE_MIN_BAR} and {MANUAL_PRESSURE_MAX_BAR} bar"),
                );
            }
            ok
        });

        let flow_rate = if self.flow_rate.trim().is_empty() {
            Some(0.0)
        } else {
            match parse_number(&self.flow_rate) {
                Some(f) if f >= 0.0 => Some(f),
                Some(_) => {
                    errors.add("flow_rate", "Flow rate cannot be negative");
                    None
                }
                None => {
                    errors.add("flow_rate", "Flow rate must be a number");
                    None
                }
            }
        };

        let timestamp = if self.timestamp.trim().is_empty() {
            errors.add("timestamp", "Timestamp is required");
            None
        } else {
            let ts = parse_timestamp(&self.timestamp);
            if ts.is_none() {
                errors.add("timestamp", "Timestamp must look like 2026-10-17T08:00 or RFC 3339");
            }
            ts
        };

        match (temperature, pressure, flow_rate, timestamp) {
            (Some(temperature), Some(pressure), Some(flow_rate), Some(timestamp)) if errors.is_empty() => {
                Ok(ValidatedReading {
                    temperature,
                    pressure,
                    flow_rate,
                    timestamp,
                })
            }
            _ => Err(errors),
        }
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn required_number(errors: &mut FieldErrors, field: &'static str, label: &str, raw: &str) -> Option<f64> {
    if raw.trim().is_empty() {
        errors.add(field, format!("{label} is required"));
        return None;
    }
    let value = parse_number(raw);
    if value.is_none() {
        errors.add(field, format!("{label} must be a number"));
    }
    value
}

/// Accepts operator readings for the active mode.
#[derive(Clone)]
pub struct ManualReadingSubmitter {
    api: Arc<dyn SensorApi>,
    monitor: SharedMonitor,
    refresh: RefreshHandle,
}

impl ManualReadingSubmitter {
    pub fn new(api: Arc<dyn SensorApi>, monitor: SharedMonitor, refresh: RefreshHandle) -> Self {
        Self { api, monitor, refresh }
    }

    /// Validate, post and ingest one reading.
    ///
    /// The operator's timestamp is kept as the capture time; id and hydrate
    /// risk come from the backend echo. If the mode changes while the post is
    /// in flight, the echo is classified under the mode it was submitted for
    /// and returned without becoming the current reading.
    pub async fn submit(&self, form: &ManualReadingForm) -> Result<ClassifiedReading, SubmitError> {
        let valid = form.validate().map_err(|errors| {
            info!(errors = %errors, "[ManualReading] Rejected before submission");
            SubmitError::Validation(errors)
        })?;

        let mode = self.monitor.read().await.mode();
        let payload = NewReading {
            mode,
            temperature: valid.temperature,
            pressure: valid.pressure,
            flow_rate: valid.flow_rate,
        };
        let echo = self.api.add_reading(&payload).await.map_err(|e| {
            warn!(mode = %mode, error = %e, "[ManualReading] Backend refused reading");
            SubmitError::Api(e)
        })?;

        let reading = SensorReading {
            id: echo.id,
            mode,
            timestamp: valid.timestamp,
            temperature: Some(valid.temperature),
            pressure: Some(valid.pressure),
            flow_rate: Some(valid.flow_rate),
            hydrate_risk: echo.hydrate_risk,
        };
        let mut monitor = self.monitor.write().await;
        let Some(ingested) = monitor.ingest_for_mode(mode, reading.clone()) else {
            // Stored under the old mode; report it against that mode's limits
            let active = monitor.mode();
            let classified = classify_for_mode(reading, monitor.thresholds(), mode, None);
            drop(monitor);
            info!(
                submitted = %mode,
                active = %active,
                "[ManualReading] Mode switched while submitting, reading not shown"
            );
            return Ok(classified);
        };
        drop(monitor);
        info!(
            mode = %mode,
            risk = ?ingested.classified.hydrate_risk.value,
            status = %ingested.classified.overall,
            "[ManualReading] Reading accepted"
        );

        self.refresh.request();
        Ok(ingested.classified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::InMemorySensorApi;
    use crate::alerting::AlertAggregator;
    use crate::pipeline::polling::PollingSource;
    use crate::pipeline::state::MonitorState;
    use crate::types::{OperatingMode, Status, ThresholdStore};
    use std::time::Duration;
    use tokio::sync::watch;

    fn form(temperature: &str, pressure: &str, flow_rate: &str, timestamp: &str) -> ManualReadingForm {
        ManualReadingForm {
            temperature: temperature.to_string(),
            pressure: pressure.to_string(),
            flow_rate: flow_rate.to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    fn submitter() -> (ManualReadingSubmitter, Arc<InMemorySensorApi>, SharedMonitor) {
        let api = Arc::new(InMemorySensorApi::new());
        let monitor = MonitorState::new(
            Arc::new(ThresholdStore::default()),
            OperatingMode::Offshore,
            AlertAggregator::new(5),
        )
        .shared();
        let (_tx, rx) = watch::channel(OperatingMode::Offshore);
        let polling = PollingSource::new(api.clone(), monitor.clone(), rx, Duration::from_secs(5));
        let submitter = ManualReadingSubmitter::new(api.clone(), monitor.clone(), polling.refresh_handle());
        (submitter, api, monitor)
    }

    #[test]
    fn valid_form_passes() {
        let v = form("4.5", "120", "", "2026-10-17T08:00").validate().unwrap();
        assert_eq!(v.flow_rate, 0.0);
        assert_eq!(v.temperature, 4.5);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(form("-50", "0", "0", "2026-10-17T08:00").validate().is_ok());
        assert!(form("150", "500", "0", "2026-10-17T08:00").validate().is_ok());
        assert!(form("150.1", "500", "0", "2026-10-17T08:00").validate().is_err());
    }

    #[test]
    fn every_bad_field_is_reported() {
        let errors = form("-60", "abc", "-1", "").validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.get("temperature").unwrap().contains("between -50 and 150"));
        assert_eq!(errors.get("pressure"), Some("Pressure must be a number"));
        assert_eq!(errors.get("flow_rate"), Some("Flow rate cannot be negative"));
        assert_eq!(errors.get("timestamp"), Some("Timestamp is required"));
    }

    #[test]
    fn errors_iterate_by_field_name() {
        let errors = form("", "", "-1", "").validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|(field, _)| field).collect();
        assert_eq!(fields, ["flow_rate", "pressure", "temperature", "timestamp"]);
        assert!(errors.to_string().starts_with("flow_rate: Flow rate cannot be negative; "));
    }

    #[test]
    fn missing_and_non_finite_values() {
        let errors = form("", "NaN", "x", "tomorrow").validate().unwrap_err();
        assert_eq!(errors.get("temperature"), Some("Temperature is required"));
        assert_eq!(errors.get("pressure"), Some("Pressure must be a number"));
        assert_eq!(errors.get("flow_rate"), Some("Flow rate must be a number"));
        assert!(errors.get("timestamp").is_some());
    }

    #[tokio::test]
    async fn rejected_form_makes_no_network_call() {
        let (submitter, api, monitor) = submitter();
        let err = submitter
            .submit(&form("-60", "100", "20", "2026-10-17T08:00"))
            .await
            .unwrap_err();
        match err {
            SubmitError::Validation(errors) => assert!(errors.get("temperature").is_some()),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(api.len(OperatingMode::Offshore).await, 0);
        assert!(monitor.read().await.current().is_none());
    }

    #[tokio::test]
    async fn accepted_reading_is_classified_and_alerts() {
        let (submitter, api, monitor) = submitter();
        let classified = submitter
            .submit(&form("2.5", "65", "25", "2026-10-17T08:00:00Z"))
            .await
            .unwrap();

        assert_eq!(classified.hydrate_risk.status, Status::Warning);
        assert_eq!(classified.reading.timestamp.to_rfc3339(), "2026-10-17T08:00:00+00:00");
        assert_eq!(api.len(OperatingMode::Offshore).await, 1);

        let monitor = monitor.read().await;
        assert_eq!(monitor.alerts().len(), 1);
        assert_eq!(monitor.current(), Some(&classified));
    }

    #[tokio::test]
    async fn mode_switch_during_submission_keeps_reading_out_of_view() {
        let (submitter, api, monitor) = submitter();
        api.set_add_delay(Duration::from_millis(150)).await;

        let task = {
            let submitter = submitter.clone();
            tokio::spawn(async move { submitter.submit(&form("1", "90", "5", "2026-10-17T08:00")).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        monitor.write().await.set_mode(OperatingMode::Onshore);

        let classified = task.await.unwrap().unwrap();
        assert_eq!(classified.classified_under, OperatingMode::Offshore);
        assert_eq!(classified.hydrate_risk.status, Status::Critical);
        // Stored by the backend under the mode it was entered for
        assert_eq!(api.len(OperatingMode::Offshore).await, 1);

        let monitor = monitor.read().await;
        assert_eq!(monitor.mode(), OperatingMode::Onshore);
        assert!(monitor.current().is_none());
        assert!(monitor.alerts().is_empty());
        assert_eq!(monitor.readings_ingested(), 0);
    }

    #[tokio::test]
    async fn backend_failure_is_reported() {
        let (submitter, api, _) = submitter();
        api.set_failure(Some(ApiError::Unauthenticated)).await;
        let err = submitter
            .submit(&form("5", "100", "20", "2026-10-17T08:00"))
            .await
            .unwrap_err();
        assert_eq!(err, SubmitError::Api(ApiError::Unauthenticated));
    }
}
