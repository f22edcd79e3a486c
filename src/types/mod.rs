//! Shared data structures for the hydrate-risk monitoring core
//!
//! - `OperatingMode` / `Quantity`: what is measured and under which profile
//! - `ThresholdStore`: per-mode, per-quantity escalation limits
//! - `SensorReading` → `ClassifiedReading`: raw sample and its derived status
//! - `Alert`: edge-triggered hydrate-risk notifications

mod alert;
mod mode;
mod reading;
pub mod thresholds;

pub use alert::*;
pub use mode::*;
pub use reading::*;
pub use thresholds::*;
