//! Simulation Ingestion Pipeline
//!
//! Drives one uploaded dataset through a linear workflow:
//!
//! ```text
//! Idle → FileSelected → Validating → Ready → Running → Complete
//!                           └──────────┬───────────┘
//!                                    Failed
//! ```
//!
//! At most one job exists at a time. A finished job (Complete or Failed)
//! must be reset before a new file is selected, and nothing can replace a
//! job while it is Running. On completion the polling source is asked to
//! refresh so the simulation's output shows up without waiting for a tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::acquisition::{parse_dataset, DatasetFormat, SensorApi};
use crate::config::UploadConfig;
use crate::pipeline::RefreshHandle;

// ============================================================================
// States and Transitions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    FileSelected,
    Validating,
    Ready,
    Running,
    Complete,
    Failed,
}

impl JobState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FileSelected => "file_selected",
            Self::Validating => "validating",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Complete or Failed: only a reset leaves these.
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triggers that move a job between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    /// `FileSelected → Validating`
    Validate,
    /// Content check passed (`Validating → Ready`)
    Accept,
    /// Content check failed (`Validating → Failed`)
    Reject,
    /// `Ready → Running`
    Run,
    /// Collaborator accepted the dataset (`Running → Complete`)
    Succeed,
    /// Collaborator refused the dataset (`Running → Failed`)
    Fail,
    /// Discard the job (anything but `Running` → `Idle`)
    Reset,
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validate => "validate",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Run => "run",
            Self::Succeed => "succeed",
            Self::Fail => "fail",
            Self::Reset => "reset",
        };
        f.write_str(s)
    }
}

/// Target state for `(current, action)`, or `None` if not allowed.
const fn next_state(current: JobState, action: JobAction) -> Option<JobState> {
    use JobAction as A;
    use JobState as S;
    match (current, action) {
        (S::FileSelected, A::Validate) => Some(S::Validating),
        (S::Validating, A::Accept) => Some(S::Ready),
        (S::Validating, A::Reject) => Some(S::Failed),
        (S::Ready, A::Run) => Some(S::Running),
        (S::Running, A::Succeed) => Some(S::Complete),
        (S::Running, A::Fail) => Some(S::Failed),
        (S::Running, A::Reset) => None,
        (_, A::Reset) => Some(S::Idle),
        _ => None,
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a selected file was refused before a job was created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileRejection {
    #[error("File name is required")]
    MissingName,
    #[error("Unsupported file type '{extension}' (allowed: {allowed})")]
    Extension { extension: String, allowed: String },
    #[error("File is {size} bytes; the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    #[error("File is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("{0}")]
    Validation(FileRejection),
    #[error("A simulation is running; wait for it to finish")]
    JobRunning,
    #[error("Reset the finished simulation before selecting another file")]
    ResetRequired,
    #[error("No simulation file selected")]
    NoJob,
    #[error("Cannot {action} a simulation that is {from}")]
    InvalidTransition { from: JobState, action: JobAction },
}

// ============================================================================
// Jobs
// ============================================================================

/// A dataset as received from the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug)]
struct SimulationJob {
    id: u64,
    file_name: String,
    format: DatasetFormat,
    bytes: Vec<u8>,
    state: JobState,
    record_count: Option<usize>,
    message: Option<String>,
    error: Option<String>,
    updated_at: DateTime<Utc>,
}

impl SimulationJob {
    fn apply(&mut self, action: JobAction) -> Result<JobState, SimulationError> {
        let to = next_state(self.state, action).ok_or(SimulationError::InvalidTransition {
            from: self.state,
            action,
        })?;
        info!(
            job = self.id,
            from = %self.state,
            to = %to,
            "[Simulation] {}",
            self.file_name
        );
        self.state = to;
        self.updated_at = Utc::now();
        Ok(to)
    }

    /// `FileSelected → Validating → Ready | Failed`, parsing the content.
    fn validate_content(&mut self) -> Result<(), SimulationError> {
        self.apply(JobAction::Validate)?;
        match parse_dataset(self.format, &self.bytes) {
            Ok(records) => {
                self.record_count = Some(records.len());
                self.apply(JobAction::Accept)?;
            }
            Err(e) => {
                warn!(job = self.id, error = %e, "[Simulation] Dataset rejected");
                self.error = Some(e.to_string());
                self.apply(JobAction::Reject)?;
            }
        }
        Ok(())
    }

    fn view(&self) -> SimulationJobView {
        SimulationJobView {
            state: self.state,
            job_id: Some(self.id),
            file_name: Some(self.file_name.clone()),
            size_bytes: Some(self.bytes.len() as u64),
            record_count: self.record_count,
            message: self.message.clone(),
            error: self.error.clone(),
            updated_at: Some(self.updated_at),
        }
    }
}

/// Immutable snapshot of the pipeline for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationJobView {
    pub state: JobState,
    pub job_id: Option<u64>,
    pub file_name: Option<String>,
    pub size_bytes: Option<u64>,
    pub record_count: Option<usize>,
    /// Collaborator's success message
    pub message: Option<String>,
    /// Validation or collaborator error retained for display
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SimulationJobView {
    const fn idle() -> Self {
        Self {
            state: JobState::Idle,
            job_id: None,
            file_name: None,
            size_bytes: None,
            record_count: None,
            message: None,
            error: None,
            updated_at: None,
        }
    }
}

/// Check extension and size against the upload limits.
pub fn check_file(limits: &UploadConfig, file: &UploadFile) -> Result<DatasetFormat, FileRejection> {
    let name = file.name.trim();
    if name.is_empty() {
        return Err(FileRejection::MissingName);
    }
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let allowed = limits.allowed_extensions.iter().any(|e| *e == extension);
    let format = DatasetFormat::from_file_name(name).filter(|_| allowed);
    let Some(format) = format else {
        return Err(FileRejection::Extension {
            extension: if extension.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{extension}")
            },
            allowed: limits
                .allowed_extensions
                .iter()
                .map(|e| format!(".{e}"))
                .collect::<Vec<_>>()
                .join(", "),
        });
    };

    let size = file.bytes.len() as u64;
    if size > limits.max_file_bytes {
        return Err(FileRejection::TooLarge {
            size,
            limit: limits.max_file_bytes,
        });
    }
    if size == 0 {
        return Err(FileRejection::Empty);
    }
    Ok(format)
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct SimulationPipeline {
    api: Arc<dyn SensorApi>,
    refresh: RefreshHandle,
    limits: UploadConfig,
    job: RwLock<Option<SimulationJob>>,
    next_id: AtomicU64,
}

impl SimulationPipeline {
    pub fn new(api: Arc<dyn SensorApi>, refresh: RefreshHandle, limits: UploadConfig) -> Self {
        Self {
            api,
            refresh,
            limits,
            job: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub const fn limits(&self) -> &UploadConfig {
        &self.limits
    }

    pub async fn snapshot(&self) -> SimulationJobView {
        self.job
            .read()
            .await
            .as_ref()
            .map_or_else(SimulationJobView::idle, SimulationJob::view)
    }

    /// Select a dataset. The file is checked before anything changes; a
    /// rejected file leaves the pipeline exactly as it was.
    pub async fn select_file(&self, file: UploadFile) -> Result<SimulationJobView, SimulationError> {
        let mut slot = self.job.write().await;
        if let Some(job) = slot.as_ref() {
            if job.state == JobState::Running {
                return Err(SimulationError::JobRunning);
            }
            if job.state.is_finished() {
                return Err(SimulationError::ResetRequired);
            }
        }

        let format = check_file(&self.limits, &file).map_err(|rejection| {
            info!(file = %file.name, reason = %rejection, "[Simulation] File rejected");
            SimulationError::Validation(rejection)
        })?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Some(prior) = slot.as_ref() {
            info!(job = prior.id, "[Simulation] Discarding unsent job for new selection");
        }
        let job = SimulationJob {
            id,
            file_name: file.name,
            format,
            bytes: file.bytes,
            state: JobState::FileSelected,
            record_count: None,
            message: None,
            error: None,
            updated_at: Utc::now(),
        };
        info!(job = id, file = %job.file_name, size = job.bytes.len(), "[Simulation] File selected");
        let view = job.view();
        *slot = Some(job);
        Ok(view)
    }

    /// Parse the selected dataset. A content error fails the job; the
    /// returned view carries the reason.
    pub async fn validate(&self) -> Result<SimulationJobView, SimulationError> {
        let mut slot = self.job.write().await;
        let job = slot.as_mut().ok_or(SimulationError::NoJob)?;
        if job.state != JobState::Ready {
            job.validate_content()?;
        }
        Ok(job.view())
    }

    /// Transmit the dataset to the backend. Validates first when needed.
    pub async fn run(&self) -> Result<SimulationJobView, SimulationError> {
        let (id, name, bytes) = {
            let mut slot = self.job.write().await;
            let job = slot.as_mut().ok_or(SimulationError::NoJob)?;
            if job.state == JobState::FileSelected {
                job.validate_content()?;
                if job.state == JobState::Failed {
                    return Ok(job.view());
                }
            }
            job.apply(JobAction::Run)?;
            (job.id, job.file_name.clone(), job.bytes.clone())
        };

        // The lock is released while the upload is in flight so status
        // reads and rejected selections are answered immediately.
        let result = self.api.upload(&name, bytes).await;

        let mut slot = self.job.write().await;
        let Some(job) = slot.as_mut().filter(|j| j.id == id) else {
            warn!(job = id, "[Simulation] Job vanished while running");
            return Err(SimulationError::NoJob);
        };
        match result {
            Ok(receipt) => {
                if receipt.count.is_some() {
                    job.record_count = receipt.count;
                }
                info!(job = id, message = %receipt.message, "[Simulation] Upload accepted");
                job.message = Some(receipt.message);
                job.apply(JobAction::Succeed)?;
                self.refresh.request();
            }
            Err(e) => {
                warn!(job = id, error = %e, "[Simulation] Upload failed");
                job.error = Some(e.detail());
                job.apply(JobAction::Fail)?;
            }
        }
        Ok(job.view())
    }

    /// Discard the job and its file. Refused while Running.
    pub async fn reset(&self) -> Result<SimulationJobView, SimulationError> {
        let mut slot = self.job.write().await;
        if let Some(job) = slot.as_mut() {
            job.apply(JobAction::Reset).map_err(|_| SimulationError::JobRunning)?;
        }
        *slot = None;
        Ok(SimulationJobView::idle())
    }
}
