//! Reading Classifier
//!
//! Maps a raw reading onto a status and trend per quantity using the
//! threshold profiles of the active operating mode. Status depends only on
//! (value, profile), so identical inputs always classify identically; trend
//! additionally depends on the preceding reading.

use crate::config::defaults::TREND_EPSILON;
use crate::types::{
    ClassifiedReading, ModeThresholds, OperatingMode, Quantity, QuantityStatus, SensorReading,
    Status, ThresholdProfile, ThresholdStore, Trend,
};

/// Status of a single value against a single profile.
///
/// Boundaries are inclusive on the worse side, so a value exactly at the
/// warning limit is Warning, never Normal.
pub fn classify_value(value: Option<f64>, profile: &ThresholdProfile) -> Status {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return Status::Offline;
    };
    if profile.reaches(v, profile.critical) {
        Status::Critical
    } else if profile.reaches(v, profile.warning) {
        Status::Warning
    } else {
        Status::Normal
    }
}

/// Trend of `current` relative to `previous`; changes within
/// [`TREND_EPSILON`] and missing samples are Stable.
pub fn trend_between(previous: Option<f64>, current: Option<f64>) -> Trend {
    match (previous, current) {
        (Some(prev), Some(cur)) => {
            let delta = cur - prev;
            if delta.abs() <= TREND_EPSILON {
                Trend::Stable
            } else if delta > 0.0 {
                Trend::Up
            } else {
                Trend::Down
            }
        }
        _ => Trend::Stable,
    }
}

/// Classify every quantity of `reading` against `profiles`.
///
/// `classified_under` names the mode the profiles belong to; `previous` is
/// the reading that preceded this one, used only for trend.
pub fn classify(
    reading: SensorReading,
    profiles: &ModeThresholds,
    classified_under: OperatingMode,
    previous: Option<&SensorReading>,
) -> ClassifiedReading {
    let quantity_status = |quantity: Quantity| {
        let value = reading.value(quantity);
        QuantityStatus {
            value,
            status: classify_value(value, profiles.get(quantity)),
            trend: trend_between(previous.and_then(|p| p.value(quantity)), value),
        }
    };

    let temperature = quantity_status(Quantity::Temperature);
    let pressure = quantity_status(Quantity::Pressure);
    let flow_rate = quantity_status(Quantity::FlowRate);
    let hydrate_risk = quantity_status(Quantity::HydrateRisk);

    let overall = [temperature, pressure, flow_rate, hydrate_risk]
        .iter()
        .map(|q| q.status)
        .max()
        .unwrap_or(Status::Offline);

    ClassifiedReading {
        reading,
        classified_under,
        temperature,
        pressure,
        flow_rate,
        hydrate_risk,
        overall,
    }
}

/// Convenience wrapper that picks the profiles for `mode` from the store.
pub fn classify_for_mode(
    reading: SensorReading,
    store: &ThresholdStore,
    mode: OperatingMode,
    previous: Option<&SensorReading>,
) -> ClassifiedReading {
    classify(reading, store.for_mode(mode), mode, previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(mode: OperatingMode) -> SensorReading {
        SensorReading::empty(mode, Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap())
    }

    fn offshore(quantity: Quantity, value: f64) -> Status {
        let store = ThresholdStore::default();
        classify_value(Some(value), store.profile_for(OperatingMode::Offshore, quantity))
    }

    #[test]
    fn absent_value_is_offline() {
        let store = ThresholdStore::default();
        let p = store.profile_for(OperatingMode::Offshore, Quantity::Pressure);
        assert_eq!(classify_value(None, p), Status::Offline);
        assert_eq!(classify_value(Some(f64::NAN), p), Status::Offline);
    }

    #[test]
    fn offshore_temperature_severity_grows_as_it_cools() {
        assert_eq!(offshore(Quantity::Temperature, 6.0), Status::Normal);
        assert_eq!(offshore(Quantity::Temperature, 5.0), Status::Warning);
        assert_eq!(offshore(Quantity::Temperature, 4.0), Status::Warning);
        assert_eq!(offshore(Quantity::Temperature, 3.0), Status::Critical);
        assert_eq!(offshore(Quantity::Temperature, 2.0), Status::Critical);
    }

    #[test]
    fn offshore_temperature_is_monotone() {
        let mut worst = Status::Normal;
        let mut t = 12.0;
        while t > -10.0 {
            let s = offshore(Quantity::Temperature, t);
            assert!(s >= worst, "severity dropped at {t} °C");
            worst = s;
            t -= 0.25;
        }
        assert_eq!(worst, Status::Critical);
    }

    #[test]
    fn offshore_hydrate_risk_bands() {
        assert_eq!(offshore(Quantity::HydrateRisk, 35.0), Status::Normal);
        assert_eq!(offshore(Quantity::HydrateRisk, 40.0), Status::Warning);
        assert_eq!(offshore(Quantity::HydrateRisk, 45.0), Status::Warning);
        assert_eq!(offshore(Quantity::HydrateRisk, 70.0), Status::Critical);
        assert_eq!(offshore(Quantity::HydrateRisk, 75.0), Status::Critical);
    }

    #[test]
    fn classification_is_deterministic() {
        let store = ThresholdStore::default();
        for mode in OperatingMode::ALL {
            let r = reading(mode)
                .with(Quantity::Temperature, Some(4.2))
                .with(Quantity::Pressure, Some(95.0))
                .with(Quantity::FlowRate, Some(650.0))
                .with(Quantity::HydrateRisk, Some(44.0));
            let a = classify_for_mode(r.clone(), &store, mode, None);
            let b = classify_for_mode(r, &store, mode, None);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn same_reading_differs_between_profiles() {
        let store = ThresholdStore::default();
        let r = reading(OperatingMode::Offshore).with(Quantity::HydrateRisk, Some(35.0));
        let off = classify_for_mode(r.clone(), &store, OperatingMode::Offshore, None);
        let on = classify_for_mode(r, &store, OperatingMode::Onshore, None);
        assert_eq!(off.hydrate_risk.status, Status::Normal);
        assert_eq!(on.hydrate_risk.status, Status::Warning);
        assert_eq!(on.classified_under, OperatingMode::Onshore);
        assert_eq!(on.reading.mode, OperatingMode::Offshore);
    }

    #[test]
    fn trend_uses_previous_reading() {
        let store = ThresholdStore::default();
        let prev = reading(OperatingMode::Offshore)
            .with(Quantity::Temperature, Some(5.0))
            .with(Quantity::Pressure, Some(100.0))
            .with(Quantity::HydrateRisk, Some(30.0));
        let cur = reading(OperatingMode::Offshore)
            .with(Quantity::Temperature, Some(4.0))
            .with(Quantity::Pressure, Some(100.005))
            .with(Quantity::HydrateRisk, Some(45.0));
        let c = classify_for_mode(cur, &store, OperatingMode::Offshore, Some(&prev));
        assert_eq!(c.temperature.trend, Trend::Down);
        assert_eq!(c.pressure.trend, Trend::Stable);
        assert_eq!(c.hydrate_risk.trend, Trend::Up);
        assert_eq!(c.flow_rate.trend, Trend::Stable);
    }

    #[test]
    fn overall_is_worst_status() {
        let store = ThresholdStore::default();
        let r = reading(OperatingMode::Offshore)
            .with(Quantity::Temperature, Some(2.0))
            .with(Quantity::HydrateRisk, Some(10.0));
        let c = classify_for_mode(r, &store, OperatingMode::Offshore, None);
        assert_eq!(c.overall, Status::Critical);
        assert_eq!(c.pressure.status, Status::Offline);

        let empty = classify_for_mode(reading(OperatingMode::Onshore), &store, OperatingMode::Onshore, None);
        assert_eq!(empty.overall, Status::Offline);
    }
}
