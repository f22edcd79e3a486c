//! Hydrate formation risk model
//!
//! Simplified hydrate-zone model: risk rises with low temperature, high
//! pressure and low flow. Each driver is mapped to a 0-1 factor, then
//! combined as a weighted sum and expressed as a percentage.

/// Temperature at or below which the temperature factor saturates (°C)
const TEMP_SATURATION_C: f64 = 0.0;
/// Temperature at or above which the temperature factor is zero (°C)
const TEMP_ONSET_C: f64 = 10.0;

/// Pressure at or below which the pressure factor is zero (bar)
const PRESSURE_ONSET_BAR: f64 = 30.0;
/// Pressure at or above which the pressure factor saturates (bar)
const PRESSURE_SATURATION_BAR: f64 = 100.0;

/// Flow at or below which the flow factor saturates (m³/h)
const FLOW_SATURATION_M3H: f64 = 10.0;
/// Flow at or above which the flow factor is zero (m³/h)
const FLOW_ONSET_M3H: f64 = 50.0;

const WEIGHT_TEMPERATURE: f64 = 0.5;
const WEIGHT_PRESSURE: f64 = 0.3;
const WEIGHT_FLOW: f64 = 0.2;

/// Per-driver factors, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskFactors {
    pub temperature: f64,
    pub pressure: f64,
    pub flow: f64,
}

/// Colder is riskier: 1 below 0 °C, falling linearly to 0 at 10 °C.
pub fn temperature_factor(temperature_c: f64) -> f64 {
    if temperature_c < TEMP_SATURATION_C {
        1.0
    } else if temperature_c < TEMP_ONSET_C {
        1.0 - (temperature_c - TEMP_SATURATION_C) / (TEMP_ONSET_C - TEMP_SATURATION_C)
    } else {
        0.0
    }
}

/// Higher pressure is riskier: 0 up to 30 bar, rising linearly to 1 at 100 bar.
pub fn pressure_factor(pressure_bar: f64) -> f64 {
    if pressure_bar > PRESSURE_SATURATION_BAR {
        1.0
    } else if pressure_bar > PRESSURE_ONSET_BAR {
        (pressure_bar - PRESSURE_ONSET_BAR) / (PRESSURE_SATURATION_BAR - PRESSURE_ONSET_BAR)
    } else {
        0.0
    }
}

/// Slower flow is riskier: 1 below 10 m³/h, falling linearly to 0 at 50 m³/h.
pub fn flow_factor(flow_rate_m3h: f64) -> f64 {
    if flow_rate_m3h < FLOW_SATURATION_M3H {
        1.0
    } else if flow_rate_m3h < FLOW_ONSET_M3H {
        1.0 - (flow_rate_m3h - FLOW_SATURATION_M3H) / (FLOW_ONSET_M3H - FLOW_SATURATION_M3H)
    } else {
        0.0
    }
}

pub fn risk_factors(temperature_c: f64, pressure_bar: f64, flow_rate_m3h: f64) -> RiskFactors {
    RiskFactors {
        temperature: temperature_factor(temperature_c),
        pressure: pressure_factor(pressure_bar),
        flow: flow_factor(flow_rate_m3h),
    }
}

/// Hydrate formation risk in percent, clamped to [0, 100].
///
/// `risk = (0.5·T + 0.3·P + 0.2·F) × 100`
pub fn calculate_hydrate_risk(temperature_c: f64, pressure_bar: f64, flow_rate_m3h: f64) -> f64 {
    let f = risk_factors(temperature_c, pressure_bar, flow_rate_m3h);
    let risk = (f.temperature * WEIGHT_TEMPERATURE
        + f.pressure * WEIGHT_PRESSURE
        + f.flow * WEIGHT_FLOW)
        * 100.0;
    risk.clamp(0.0, 100.0)
}
