//! Physics Engine Module
//!
//! Deterministic calculations for hydrate-risk monitoring.
//! All math here is closed-form; no estimation or learning involved.
//!
//! - `calculate_hydrate_risk()` - hydrate formation risk (%) from
//!   temperature, pressure and flow rate

pub mod hydrate;

pub use hydrate::{calculate_hydrate_risk, risk_factors, RiskFactors};
