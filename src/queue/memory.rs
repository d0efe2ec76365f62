//! In-process job queue.
//!
//! One job table plus one FIFO of ready ids per job type. Durability is
//! bounded by the process lifetime; the [`JobQueue`] contract is otherwise
//! identical to the durable backend.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, Notify};

use crate::error::{FailReason, QueueError};
use crate::queue::job::{Job, JobId, JobStatus};
use crate::queue::queue::JobQueue;

struct Record {
    kind: String,
    payload: Value,
    status: JobStatus,
    progress: Option<u8>,
    started_at: Option<Instant>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    jobs: HashMap<JobId, Record>,
    ready: HashMap<String, VecDeque<JobId>>,
    closed: bool,
}

impl Inner {
    fn take_next(&mut self, kind: &str) -> Option<Job> {
        let id = self.ready.get_mut(kind)?.pop_front()?;
        let rec = self.jobs.get_mut(&id)?;
        if !rec.status.is_terminal() {
            rec.status = JobStatus::Active;
            // First delivery stamps the stuck-job clock; redelivery keeps it.
            rec.started_at.get_or_insert_with(Instant::now);
        }
        Some(Job {
            id,
            kind: rec.kind.clone(),
            payload: rec.payload.clone(),
            status: rec.status.clone(),
            progress: rec.progress,
        })
    }
}

/// In-memory [`JobQueue`] backend.
pub struct MemoryQueue {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
        }
    }

    /// Closes the queue: pending `dequeue` calls return
    /// [`QueueError::Closed`] and further enqueues are rejected.
    pub async fn close(&self) {
        self.inner.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    /// Number of jobs waiting to be delivered for the given type.
    pub async fn pending(&self, kind: &str) -> usize {
        self.inner
            .lock()
            .await
            .ready
            .get(kind)
            .map_or(0, VecDeque::len)
    }

    async fn finish(&self, id: JobId, status: JobStatus) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let rec = inner.jobs.get_mut(&id).ok_or(QueueError::UnknownJob { id })?;
        if rec.status.is_terminal() {
            return Ok(());
        }
        rec.status = status;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, kind: &str, payload: Value) -> Result<JobId, QueueError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(QueueError::EnqueueFailed {
                detail: "queue closed".into(),
            });
        }
        inner.next_id += 1;
        let id = JobId(inner.next_id);
        inner.jobs.insert(
            id,
            Record {
                kind: kind.to_string(),
                payload,
                status: JobStatus::Created,
                progress: None,
                started_at: None,
            },
        );
        inner.ready.entry(kind.to_string()).or_default().push_back(id);
        drop(inner);
        self.notify.notify_waiters();
        Ok(id)
    }

    async fn dequeue(&self, kind: &str) -> Result<Job, QueueError> {
        loop {
            // Arm the wakeup before checking state so an enqueue between the
            // check and the await cannot be missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock().await;
                if inner.closed {
                    return Err(QueueError::Closed);
                }
                if let Some(job) = inner.take_next(kind) {
                    return Ok(job);
                }
            }

            notified.await;
        }
    }

    async fn mark_completed(&self, id: JobId) -> Result<(), QueueError> {
        self.finish(id, JobStatus::Completed).await
    }

    async fn mark_failed(&self, id: JobId, reason: FailReason) -> Result<(), QueueError> {
        self.finish(id, JobStatus::Failed { reason }).await
    }

    async fn report_progress(&self, id: JobId, percent: u8) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let rec = inner.jobs.get_mut(&id).ok_or(QueueError::UnknownJob { id })?;
        rec.progress = Some(percent.min(100));
        Ok(())
    }

    async fn status(&self, id: JobId) -> Result<JobStatus, QueueError> {
        self.inner
            .lock()
            .await
            .jobs
            .get(&id)
            .map(|rec| rec.status.clone())
            .ok_or(QueueError::UnknownJob { id })
    }

    async fn stuck_jobs(&self, older_than: Duration) -> Result<Vec<JobId>, QueueError> {
        let inner = self.inner.lock().await;
        let mut stuck: Vec<JobId> = inner
            .jobs
            .iter()
            .filter(|(_, rec)| {
                rec.status == JobStatus::Active
                    && rec
                        .started_at
                        .is_some_and(|t| t.elapsed() >= older_than)
            })
            .map(|(id, _)| *id)
            .collect();
        stuck.sort_unstable();
        Ok(stuck)
    }

    async fn redeliver(&self, id: JobId) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let kind = inner
            .jobs
            .get(&id)
            .map(|rec| rec.kind.clone())
            .ok_or(QueueError::UnknownJob { id })?;
        inner.ready.entry(kind).or_default().push_back(id);
        drop(inner);
        self.notify.notify_waiters();
        Ok(())
    }
}
