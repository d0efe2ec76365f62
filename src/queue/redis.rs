//! Redis-backed job queue.
//!
//! Layout per namespace `ns`:
//! ```text
//! {ns}:jobs:seq        INCR counter assigning job ids
//! {ns}:job:{id}        HASH  kind / payload / status / reason_label /
//!                            reason_detail / progress / started_at
//! {ns}:queue:{kind}    LIST  ready job ids, FIFO (RPUSH / BLPOP)
//! {ns}:active          SET   ids currently Active (stuck-job scans)
//! ```
//!
//! Dequeue polls BLPOP with a short timeout so the consumer task stays
//! cancellable from the caller's select loop. Backend faults surface as
//! [`QueueError::Unavailable`] (or [`QueueError::EnqueueFailed`] on the
//! producer path).

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::Value;

use crate::error::{FailReason, QueueError};
use crate::queue::job::{Job, JobId, JobStatus};
use crate::queue::queue::JobQueue;

const BLPOP_TIMEOUT_SECS: f64 = 1.0;

/// Redis-backed [`JobQueue`].
pub struct RedisQueue {
    conn: ConnectionManager,
    ns: String,
}

impl RedisQueue {
    /// Connects to the given Redis URL under the default `reservq` namespace.
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        Self::connect_with_namespace(url, "reservq").await
    }

    /// Connects with an explicit key namespace.
    pub async fn connect_with_namespace(url: &str, ns: &str) -> Result<Self, QueueError> {
        let client = Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        Ok(Self {
            conn,
            ns: ns.to_string(),
        })
    }

    fn seq_key(&self) -> String {
        format!("{}:jobs:seq", self.ns)
    }

    fn job_key(&self, id: JobId) -> String {
        format!("{}:job:{id}", self.ns)
    }

    fn queue_key(&self, kind: &str) -> String {
        format!("{}:queue:{kind}", self.ns)
    }

    fn active_key(&self) -> String {
        format!("{}:active", self.ns)
    }

    async fn load(&self, id: JobId) -> Result<Option<(String, Job)>, QueueError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> =
            conn.hgetall(self.job_key(id)).await.map_err(unavailable)?;
        if fields.is_empty() {
            return Ok(None);
        }

        let kind = fields.get("kind").cloned().unwrap_or_default();
        let payload = fields
            .get("payload")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null);
        let progress = fields.get("progress").and_then(|p| p.parse().ok());
        let status = match fields.get("status").map(String::as_str) {
            Some("active") => JobStatus::Active,
            Some("completed") => JobStatus::Completed,
            Some("failed") => JobStatus::Failed {
                reason: FailReason::from_label(
                    fields.get("reason_label").map_or("", String::as_str),
                    fields.get("reason_detail").cloned().unwrap_or_default(),
                ),
            },
            _ => JobStatus::Created,
        };

        let job = Job {
            id,
            kind: kind.clone(),
            payload,
            status,
            progress,
        };
        Ok(Some((kind, job)))
    }

    async fn finish(
        &self,
        id: JobId,
        status: &str,
        reason: Option<&FailReason>,
    ) -> Result<(), QueueError> {
        let Some((_, job)) = self.load(id).await? else {
            return Err(QueueError::UnknownJob { id });
        };
        if job.status.is_terminal() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let mut fields = vec![("status", status.to_string())];
        if let Some(reason) = reason {
            fields.push(("reason_label", reason.as_label().to_string()));
            fields.push(("reason_detail", reason_detail(reason)));
        }
        conn.hset_multiple::<_, _, _, ()>(self.job_key(id), &fields)
            .await
            .map_err(unavailable)?;
        conn.srem::<_, _, ()>(self.active_key(), id.0)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

fn unavailable(err: redis::RedisError) -> QueueError {
    QueueError::Unavailable {
        detail: err.to_string(),
    }
}

fn reason_detail(reason: &FailReason) -> String {
    match reason {
        FailReason::StoreUnavailable { detail } | FailReason::InvalidPayload { detail } => {
            detail.clone()
        }
        _ => String::new(),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(&self, kind: &str, payload: Value) -> Result<JobId, QueueError> {
        let enqueue_failed = |err: redis::RedisError| QueueError::EnqueueFailed {
            detail: err.to_string(),
        };

        let mut conn = self.conn.clone();
        let raw: u64 = conn.incr(self.seq_key(), 1).await.map_err(enqueue_failed)?;
        let id = JobId(raw);

        conn.hset_multiple::<_, _, _, ()>(
            self.job_key(id),
            &[
                ("kind", kind.to_string()),
                ("payload", payload.to_string()),
                ("status", "created".to_string()),
            ],
        )
        .await
        .map_err(enqueue_failed)?;
        conn.rpush::<_, _, ()>(self.queue_key(kind), id.0)
            .await
            .map_err(enqueue_failed)?;
        Ok(id)
    }

    async fn dequeue(&self, kind: &str) -> Result<Job, QueueError> {
        let mut conn = self.conn.clone();
        loop {
            let popped: Option<(String, u64)> = conn
                .blpop(self.queue_key(kind), BLPOP_TIMEOUT_SECS)
                .await
                .map_err(unavailable)?;
            let Some((_, raw)) = popped else {
                continue;
            };
            let id = JobId(raw);

            let Some((_, job)) = self.load(id).await? else {
                // Record expired or was deleted out-of-band; skip the id.
                continue;
            };
            if job.status.is_terminal() {
                return Ok(job);
            }

            conn.hset::<_, _, _, ()>(self.job_key(id), "status", "active")
                .await
                .map_err(unavailable)?;
            conn.hset_nx::<_, _, _, ()>(self.job_key(id), "started_at", now_millis())
                .await
                .map_err(unavailable)?;
            conn.sadd::<_, _, ()>(self.active_key(), id.0)
                .await
                .map_err(unavailable)?;

            return Ok(Job {
                status: JobStatus::Active,
                ..job
            });
        }
    }

    async fn mark_completed(&self, id: JobId) -> Result<(), QueueError> {
        self.finish(id, "completed", None).await
    }

    async fn mark_failed(&self, id: JobId, reason: FailReason) -> Result<(), QueueError> {
        self.finish(id, "failed", Some(&reason)).await
    }

    async fn report_progress(&self, id: JobId, percent: u8) -> Result<(), QueueError> {
        if self.load(id).await?.is_none() {
            return Err(QueueError::UnknownJob { id });
        }
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(self.job_key(id), "progress", percent.min(100))
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn status(&self, id: JobId) -> Result<JobStatus, QueueError> {
        match self.load(id).await? {
            Some((_, job)) => Ok(job.status),
            None => Err(QueueError::UnknownJob { id }),
        }
    }

    async fn stuck_jobs(&self, older_than: Duration) -> Result<Vec<JobId>, QueueError> {
        let mut conn = self.conn.clone();
        let active: Vec<u64> = conn
            .smembers(self.active_key())
            .await
            .map_err(unavailable)?;
        let cutoff = now_millis().saturating_sub(older_than.as_millis() as u64);

        let mut stuck = Vec::new();
        for raw in active {
            let started: Option<u64> = conn
                .hget(self.job_key(JobId(raw)), "started_at")
                .await
                .map_err(unavailable)?;
            if started.is_some_and(|t| t <= cutoff) {
                stuck.push(JobId(raw));
            }
        }
        stuck.sort_unstable();
        Ok(stuck)
    }

    async fn redeliver(&self, id: JobId) -> Result<(), QueueError> {
        let Some((kind, _)) = self.load(id).await? else {
            return Err(QueueError::UnknownJob { id });
        };
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(self.queue_key(&kind), id.0)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
