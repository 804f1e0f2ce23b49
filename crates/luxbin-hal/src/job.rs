//! Jobs and their lifecycle.
//!
//! ```text
//!   submit ─▶ Queued ─▶ Running ─▶ Completed
//!               │          ├─────▶ Failed(reason)
//!               └──────────┴─────▶ Cancelled
//! ```
//!
//! A job never returns to an earlier state; the three terminal states are
//! final.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Wrap a provider id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Accepted, waiting for the device.
    Queued,
    /// Executing.
    Running,
    /// Finished with counts available.
    Completed,
    /// Finished without counts; carries the provider's reason.
    Failed(String),
    /// Stopped on request.
    Cancelled,
}

impl JobStatus {
    /// Completed, failed or cancelled.
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// Queued or running.
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => f.write_str("Queued"),
            JobStatus::Running => f.write_str("Running"),
            JobStatus::Completed => f.write_str("Completed"),
            JobStatus::Failed(reason) => write!(f, "Failed: {reason}"),
            JobStatus::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Bookkeeping for one submitted circuit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Identifier.
    pub id: JobId,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Shots requested.
    pub shots: u32,
    /// When the job was accepted.
    pub created_at: DateTime<Utc>,
    /// When it left the queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When it reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Backend that runs it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

impl Job {
    /// A queued job stamped with the current time.
    pub fn new(id: impl Into<JobId>, shots: u32) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            shots,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            backend: None,
        }
    }

    /// Record the backend name.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Move to `status`. Leaving the queue stamps `started_at`; reaching a
    /// terminal state stamps `finished_at`. Existing stamps are kept.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        let now = Utc::now();
        if status != JobStatus::Queued {
            self.started_at.get_or_insert(now);
        }
        if status.is_terminal() {
            self.finished_at.get_or_insert(now);
        }
        self.status = status;
        self
    }

    /// Time from leaving the queue to finishing, once both are known.
    pub fn run_time(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}
