//! Monitoring Pipeline Module
//!
//! ```text
//! PollingSource ──┐
//!                 ├──► MonitorState::ingest ──► Classifier ──► AlertAggregator
//! ManualReading ──┘
//! ```
//!
//! Both entry points hand readings by value to the same ingest path, so a
//! manually entered reading is classified and alerted exactly like a polled
//! one.

mod coordinator;
pub mod manual;
pub mod polling;
mod state;

pub use coordinator::{Monitor, MonitorStatus};
pub use manual::{FieldErrors, ManualReadingForm, ManualReadingSubmitter, SubmitError, ValidatedReading};
pub use polling::{
    HistoryView, PollError, PollErrorKind, PollOutcome, PollSnapshot, PollStats, PollTrigger, PollingSource,
    RefreshHandle,
};
pub use state::{Ingested, MonitorState, SharedMonitor};
