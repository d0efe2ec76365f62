//! # Job data model.
//!
//! A job represents one request to decrement a resource's quantity by exactly
//! one unit. Ids are queue-assigned and monotonically increasing; a job
//! reaches a terminal state exactly once and is never reprocessed
//! automatically.

use std::fmt;

use serde_json::Value;

use crate::error::FailReason;

/// Queue-assigned job identifier (unique, monotonically assigned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a job.
///
/// ```text
/// Created ──► Active ──► Completed
///                   └──► Failed { reason }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Persisted, not yet picked up by a worker.
    Created,
    /// A worker is (or was) processing it.
    Active,
    /// Reservation applied.
    Completed,
    /// Terminal failure with its recorded reason.
    Failed {
        /// Why the job failed.
        reason: FailReason,
    },
}

impl JobStatus {
    /// `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed { .. })
    }
}

/// A dequeued job as handed to the consumer.
///
/// `status` reflects the record at dequeue time; a redelivered job that
/// already completed arrives with its terminal status so the consumer can
/// skip it without touching the counter.
#[derive(Debug, Clone)]
pub struct Job {
    /// Queue-assigned identifier.
    pub id: JobId,
    /// Job type this job was enqueued under.
    pub kind: String,
    /// Producer-supplied JSON payload.
    pub payload: Value,
    /// Status at dequeue time.
    pub status: JobStatus,
    /// Last reported progress percent, if any. Observational only.
    pub progress: Option<u8>,
}
