//! # Job queue contract.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{FailReason, QueueError};
use crate::queue::job::{Job, JobId, JobStatus};

/// # Ordered, at-least-once work queue.
///
/// ## Contract
/// - [`enqueue`](Self::enqueue) never blocks beyond persistence latency and
///   returns an id usable to track status. If the backing store is
///   unreachable it fails with [`QueueError::EnqueueFailed`]; the caller is
///   told "reservation failed", not "in process".
/// - [`dequeue`](Self::dequeue) is a blocking FIFO pop per job type; exactly
///   one consumer per type. Each persisted job is delivered at least once;
///   crash-duplicated delivery is possible and must be tolerated by
///   idempotent consumer logic.
/// - [`mark_completed`](Self::mark_completed) / [`mark_failed`](Self::mark_failed)
///   close out a job. Marking an already-terminal job is a no-op. A job that
///   never receives a terminal mark stays `Active`; that is an operational
///   fault surfaced by [`stuck_jobs`](Self::stuck_jobs), never silently
///   retried.
/// - [`report_progress`](Self::report_progress) is a purely observational
///   side channel with no correctness obligations.
///
/// Ordering is FIFO per job type; there is no global ordering guarantee
/// across types.
#[async_trait]
pub trait JobQueue: Send + Sync + 'static {
    /// Persists a job and returns its id.
    async fn enqueue(&self, kind: &str, payload: Value) -> Result<JobId, QueueError>;

    /// Waits for and returns the next job of the given type, transitioning it
    /// `Created → Active`. Redelivered terminal jobs are returned with their
    /// terminal status intact.
    async fn dequeue(&self, kind: &str) -> Result<Job, QueueError>;

    /// Records successful completion. Idempotent.
    async fn mark_completed(&self, id: JobId) -> Result<(), QueueError>;

    /// Records terminal failure with its reason. Idempotent.
    async fn mark_failed(&self, id: JobId, reason: FailReason) -> Result<(), QueueError>;

    /// Stores an observational progress percent for the job.
    async fn report_progress(&self, id: JobId, percent: u8) -> Result<(), QueueError>;

    /// Current status of the job.
    async fn status(&self, id: JobId) -> Result<JobStatus, QueueError>;

    /// Ids of jobs that have been `Active` longer than `older_than`.
    ///
    /// Operational alarm input only: retrying a job whose effect is unknown
    /// risks a double decrement, so nothing here is auto-resolved.
    async fn stuck_jobs(&self, older_than: Duration) -> Result<Vec<JobId>, QueueError>;

    /// Re-injects an existing job into its type's queue.
    ///
    /// Models the at-least-once crash duplicate; consumers must dedupe via
    /// the job status carried on delivery.
    async fn redeliver(&self, id: JobId) -> Result<(), QueueError>;

    /// Enqueues a batch of payloads under one job type, returning their ids
    /// in order.
    async fn enqueue_batch(&self, kind: &str, payloads: &[Value]) -> Result<Vec<JobId>, QueueError> {
        let mut ids = Vec::with_capacity(payloads.len());
        for payload in payloads {
            ids.push(self.enqueue(kind, payload.clone()).await?);
        }
        Ok(ids)
    }
}
