//! Threshold profiles per operating mode and quantity
//!
//! The store is built once from configuration at startup and is read-only
//! afterwards, so it can be shared as `Arc<ThresholdStore>` between the
//! polling task, the manual submitter and API handlers.

use serde::{Deserialize, Serialize};

use super::{OperatingMode, Quantity};
use crate::config::ConfigError;

/// Which side of the scale is dangerous for a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Larger values are more severe (pressure, flow rate, hydrate risk)
    HigherIsWorse,
    /// Smaller values are more severe (offshore temperature)
    LowerIsWorse,
}

/// Normal band and escalation limits for one quantity under one mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdProfile {
    pub direction: Direction,
    /// Lower edge of the normal operating band (display only)
    pub normal_min: f64,
    /// Upper edge of the normal operating band (display only)
    pub normal_max: f64,
    /// Warning limit, inclusive on the worse side
    pub warning: f64,
    /// Critical limit, inclusive on the worse side
    pub critical: f64,
}

impl ThresholdProfile {
    pub const fn higher_is_worse(normal_min: f64, normal_max: f64, warning: f64, critical: f64) -> Self {
        Self {
            direction: Direction::HigherIsWorse,
            normal_min,
            normal_max,
            warning,
            critical,
        }
    }

    pub const fn lower_is_worse(normal_min: f64, normal_max: f64, warning: f64, critical: f64) -> Self {
        Self {
            direction: Direction::LowerIsWorse,
            normal_min,
            normal_max,
            warning,
            critical,
        }
    }

    /// True when `value` sits at `limit` or beyond it on the dangerous side.
    pub fn reaches(&self, value: f64, limit: f64) -> bool {
        match self.direction {
            Direction::HigherIsWorse => value >= limit,
            Direction::LowerIsWorse => value <= limit,
        }
    }

    /// Critical must be at least as severe as warning for the direction.
    fn check_escalation(&self, label: &str, errors: &mut Vec<String>) {
        if !self.warning.is_finite() || !self.critical.is_finite() {
            errors.push(format!("{label}: warning and critical must be finite numbers"));
            return;
        }
        if !self.reaches(self.critical, self.warning) {
            let relation = match self.direction {
                Direction::HigherIsWorse => ">=",
                Direction::LowerIsWorse => "<=",
            };
            errors.push(format!(
                "{label}: critical ({:.2}) must be {relation} warning ({:.2}) for {:?}",
                self.critical, self.warning, self.direction
            ));
        }
        if self.normal_min > self.normal_max {
            errors.push(format!(
                "{label}: normal_min ({:.2}) exceeds normal_max ({:.2})",
                self.normal_min, self.normal_max
            ));
        }
    }
}

/// The four profiles that apply under a single operating mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeThresholds {
    pub temperature: ThresholdProfile,
    pub pressure: ThresholdProfile,
    pub flow_rate: ThresholdProfile,
    pub hydrate_risk: ThresholdProfile,
}

impl ModeThresholds {
    pub const fn get(&self, quantity: Quantity) -> &ThresholdProfile {
        match quantity {
            Quantity::Temperature => &self.temperature,
            Quantity::Pressure => &self.pressure,
            Quantity::FlowRate => &self.flow_rate,
            Quantity::HydrateRisk => &self.hydrate_risk,
        }
    }

    /// Subsea profile: cold water makes low temperature the hazard.
    pub const fn offshore() -> Self {
        Self {
            temperature: ThresholdProfile::lower_is_worse(6.0, 30.0, 5.0, 3.0),
            pressure: ThresholdProfile::higher_is_worse(50.0, 250.0, 280.0, 350.0),
            flow_rate: ThresholdProfile::higher_is_worse(500.0, 1800.0, 1800.0, 2200.0),
            hydrate_risk: ThresholdProfile::higher_is_worse(0.0, 40.0, 40.0, 70.0),
        }
    }

    /// Surface profile: overheating and over-pressure are the hazards.
    pub const fn onshore() -> Self {
        Self {
            temperature: ThresholdProfile::higher_is_worse(10.0, 40.0, 45.0, 60.0),
            pressure: ThresholdProfile::higher_is_worse(20.0, 80.0, 90.0, 120.0),
            flow_rate: ThresholdProfile::higher_is_worse(100.0, 500.0, 600.0, 800.0),
            hydrate_risk: ThresholdProfile::higher_is_worse(0.0, 30.0, 30.0, 60.0),
        }
    }

    fn validate(&self, mode: OperatingMode, errors: &mut Vec<String>) {
        for quantity in Quantity::ALL {
            self.get(quantity)
                .check_escalation(&format!("thresholds.{mode}.{quantity}"), errors);
        }
    }
}

/// `[thresholds]` section: one table per operating mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdConfig {
    pub offshore: ModeThresholds,
    pub onshore: ModeThresholds,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            offshore: ModeThresholds::offshore(),
            onshore: ModeThresholds::onshore(),
        }
    }
}

impl ThresholdConfig {
    pub const fn for_mode(&self, mode: OperatingMode) -> &ModeThresholds {
        match mode {
            OperatingMode::Offshore => &self.offshore,
            OperatingMode::Onshore => &self.onshore,
        }
    }

    /// Collect escalation errors for every (mode, quantity) pair.
    pub fn validate(&self, errors: &mut Vec<String>) {
        self.offshore.validate(OperatingMode::Offshore, errors);
        self.onshore.validate(OperatingMode::Onshore, errors);
    }
}

/// Immutable threshold lookup built at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdStore {
    offshore: ModeThresholds,
    onshore: ModeThresholds,
}

impl Default for ThresholdStore {
    fn default() -> Self {
        Self {
            offshore: ModeThresholds::offshore(),
            onshore: ModeThresholds::onshore(),
        }
    }
}

impl ThresholdStore {
    /// Build the store, rejecting inconsistent escalation limits.
    pub fn from_config(config: &ThresholdConfig) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        config.validate(&mut errors);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        Ok(Self {
            offshore: config.offshore.clone(),
            onshore: config.onshore.clone(),
        })
    }

    /// All profiles for a mode.
    pub const fn for_mode(&self, mode: OperatingMode) -> &ModeThresholds {
        match mode {
            OperatingMode::Offshore => &self.offshore,
            OperatingMode::Onshore => &self.onshore,
        }
    }

    pub const fn profile_for(&self, mode: OperatingMode, quantity: Quantity) -> &ThresholdProfile {
        self.for_mode(mode).get(quantity)
    }

    /// String-keyed lookup; fails only for an unknown mode or quantity.
    pub fn lookup(&self, mode: &str, quantity: &str) -> Result<&ThresholdProfile, ConfigError> {
        let mode: OperatingMode = mode.parse()?;
        let quantity: Quantity = quantity.parse()?;
        Ok(self.profile_for(mode, quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        assert!(ThresholdStore::from_config(&ThresholdConfig::default()).is_ok());
    }

    #[test]
    fn offshore_temperature_is_inverted() {
        let store = ThresholdStore::default();
        let p = store.profile_for(OperatingMode::Offshore, Quantity::Temperature);
        assert_eq!(p.direction, Direction::LowerIsWorse);
        assert_eq!(p.warning, 5.0);
        assert_eq!(p.critical, 3.0);
    }

    #[test]
    fn offshore_hydrate_risk_limits() {
        let store = ThresholdStore::default();
        let p = store.lookup("offshore", "hydrate_risk").unwrap();
        assert_eq!((p.warning, p.critical), (40.0, 70.0));
    }

    #[test]
    fn lookup_rejects_unknown_keys() {
        let store = ThresholdStore::default();
        assert!(matches!(
            store.lookup("arctic", "pressure"),
            Err(ConfigError::UnknownMode(_))
        ));
        assert!(matches!(
            store.lookup("onshore", "salinity"),
            Err(ConfigError::UnknownQuantity(_))
        ));
    }

    #[test]
    fn inverted_escalation_is_rejected() {
        let mut config = ThresholdConfig::default();
        config.onshore.pressure.critical = 50.0; // below warning of 90
        config.offshore.temperature.critical = 8.0; // above warning of 5 on a lower-is-worse scale
        let err = ThresholdStore::from_config(&config).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().any(|e| e.contains("thresholds.onshore.pressure")));
                assert!(errors.iter().any(|e| e.contains("thresholds.offshore.temperature")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reaches_is_inclusive() {
        let hi = ThresholdProfile::higher_is_worse(0.0, 40.0, 40.0, 70.0);
        assert!(hi.reaches(40.0, hi.warning));
        assert!(!hi.reaches(39.99, hi.warning));
        let lo = ThresholdProfile::lower_is_worse(6.0, 30.0, 5.0, 3.0);
        assert!(lo.reaches(5.0, lo.warning));
        assert!(!lo.reaches(5.01, lo.warning));
    }
}
