//! # Reservation worker.
//!
//! Supervises consumption of one job type: for each delivered job the worker
//! applies **at most one** decrement against the counter store, then marks
//! the job completed or failed with a recorded reason.
//!
//! ## State machine per job
//! ```text
//! received ──► already terminal?  ──► skip (redelivery dedupe, no counter action)
//!          ──► payload invalid?   ──► Failed { InvalidPayload }
//!          ──► resource closed?   ──► Failed { ReservationsClosed }   (no store call)
//!          ──► try_decrement ─┬─► Applied   ──► Completed
//!                             ├─► Exhausted ──► Failed { OutOfStock } + close flag
//!                             └─► store down through retry budget
//!                                             ──► Failed { StoreUnavailable }
//! ```
//!
//! ## Rules
//! - The closed flag is a fast-fail optimization, reconstructible from the
//!   counter (`quantity == 0` implies closed). The atomic `try_decrement` is
//!   the **sole** guard against concurrent over-decrement; several workers
//!   may process the same resource concurrently without an external lock.
//! - A redelivered job that already completed never decrements twice: the
//!   delivery carries the terminal status and the worker skips it.
//! - Store faults are retried a bounded number of times with backoff, then
//!   recorded on the job; business outcomes (`OutOfStock`) are never retried,
//!   since retrying would not change the underlying count.
//! - Cancellation is checked at safe points (between jobs and during backoff
//!   sleeps); an issued `try_decrement` always completes or fails outright.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{FailReason, QueueError, StoreError};
use crate::policy::BackoffPolicy;
use crate::queue::{Job, JobId, JobQueue};
use crate::store::{CounterStore, Decrement};

/// Job type reservation jobs are enqueued under.
pub const RESERVE_KIND: &str = "reserve";

/// Payload of a reservation job: which counter to decrement by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRequest {
    /// Counter store key of the targeted resource.
    pub resource_id: String,
}

impl ReserveRequest {
    /// Builds the JSON payload a producer enqueues.
    pub fn payload(resource_id: &str) -> serde_json::Value {
        serde_json::json!({ "resource_id": resource_id })
    }
}

/// Consumes reservation jobs and finalizes each exactly once.
pub struct ReservationWorker {
    store: Arc<dyn CounterStore>,
    queue: Arc<dyn JobQueue>,
    kind: String,
    retries: u32,
    backoff: BackoffPolicy,
    closed: tokio::sync::RwLock<HashSet<String>>,
}

impl ReservationWorker {
    /// Creates a worker for [`RESERVE_KIND`] jobs.
    pub fn new(store: Arc<dyn CounterStore>, queue: Arc<dyn JobQueue>, cfg: &Config) -> Self {
        Self {
            store,
            queue,
            kind: RESERVE_KIND.to_string(),
            retries: cfg.store_retries,
            backoff: cfg.retry_backoff,
            closed: tokio::sync::RwLock::new(HashSet::new()),
        }
    }

    /// Overrides the consumed job type.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Runs the consumer loop until the queue closes or `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) {
        loop {
            let job = select! {
                _ = token.cancelled() => break,
                res = self.queue.dequeue(&self.kind) => match res {
                    Ok(job) => job,
                    Err(QueueError::Closed) => break,
                    Err(e) => {
                        log::warn!("dequeue failed, stopping worker: {e}");
                        break;
                    }
                },
            };
            self.process(job, &token).await;
        }
    }

    async fn process(&self, job: Job, token: &CancellationToken) {
        // Redelivery dedupe: a job that already reached a terminal state must
        // not touch the counter again.
        if job.status.is_terminal() {
            log::debug!("job {} redelivered in terminal state, skipping", job.id);
            return;
        }

        let request: ReserveRequest = match serde_json::from_value(job.payload.clone()) {
            Ok(req) => req,
            Err(e) => {
                self.fail(
                    job.id,
                    FailReason::InvalidPayload {
                        detail: e.to_string(),
                    },
                )
                .await;
                return;
            }
        };

        // Known-exhausted resource: fail fast without a store call.
        if self.closed.read().await.contains(&request.resource_id) {
            self.fail(job.id, FailReason::ReservationsClosed).await;
            return;
        }

        match self.decrement_with_retry(&request.resource_id, token).await {
            Ok(Decrement::Applied) => {
                // Observational side channel; completion does not depend on it.
                if let Err(e) = self.queue.report_progress(job.id, 100).await {
                    log::debug!("failed to report progress for job {}: {e}", job.id);
                }
                if let Err(e) = self.queue.mark_completed(job.id).await {
                    log::warn!("failed to mark job {} completed: {e}", job.id);
                }
            }
            Ok(Decrement::Exhausted) => {
                // Business outcome, not a fault.
                log::debug!("resource {} exhausted", request.resource_id);
                self.closed.write().await.insert(request.resource_id);
                self.fail(job.id, FailReason::OutOfStock).await;
            }
            Err(StoreError::Unavailable { detail }) => {
                self.fail(job.id, FailReason::StoreUnavailable { detail })
                    .await;
            }
        }
    }

    /// One `try_decrement` with a bounded retry budget for store faults.
    async fn decrement_with_retry(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> Result<Decrement, StoreError> {
        let mut attempt: u32 = 0;
        loop {
            match self.store.try_decrement(key).await {
                Ok(outcome) => return Ok(outcome),
                Err(StoreError::Unavailable { detail }) => {
                    if attempt >= self.retries || token.is_cancelled() {
                        return Err(StoreError::Unavailable { detail });
                    }
                    let delay = self.backoff.next(attempt);
                    log::warn!(
                        "counter store unavailable for {key} (attempt {}), retrying in {delay:?}: {detail}",
                        attempt + 1,
                    );
                    let sleep = time::sleep(delay);
                    tokio::pin!(sleep);
                    select! {
                        _ = &mut sleep => {}
                        _ = token.cancelled() => {
                            return Err(StoreError::Unavailable { detail });
                        }
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn fail(&self, id: JobId, reason: FailReason) {
        if !reason.is_business_outcome() {
            log::warn!("job {id} failed: {reason}");
        }
        if let Err(e) = self.queue.mark_failed(id, reason).await {
            log::warn!("failed to mark job {id} failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::policy::JitterPolicy;
    use crate::queue::{JobStatus, MemoryQueue};
    use crate::store::MemoryStore;

    fn fast_config() -> Config {
        let mut cfg = Config::default();
        cfg.retry_backoff = BackoffPolicy {
            first: Duration::from_millis(1),
            max: Duration::from_millis(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };
        cfg
    }

    async fn wait_terminal(queue: &MemoryQueue, id: JobId) -> JobStatus {
        for _ in 0..500 {
            let status = queue.status(id).await.unwrap();
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("job {id} never reached a terminal state");
    }

    fn spawn_worker(
        store: Arc<dyn CounterStore>,
        queue: Arc<MemoryQueue>,
    ) -> (Arc<ReservationWorker>, CancellationToken) {
        let worker = Arc::new(ReservationWorker::new(store, queue, &fast_config()));
        let token = CancellationToken::new();
        let handle = worker.clone();
        let child = token.clone();
        tokio::spawn(async move { handle.run(child).await });
        (worker, token)
    }

    #[tokio::test]
    async fn completes_while_stock_lasts_then_fails_out_of_stock() {
        let store = Arc::new(MemoryStore::new());
        store.initialize("item.3", 2).await.unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let (_worker, token) = spawn_worker(store.clone(), queue.clone());

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(
                queue
                    .enqueue(RESERVE_KIND, ReserveRequest::payload("item.3"))
                    .await
                    .unwrap(),
            );
        }

        assert_eq!(wait_terminal(&queue, ids[0]).await, JobStatus::Completed);
        assert_eq!(wait_terminal(&queue, ids[1]).await, JobStatus::Completed);
        assert_eq!(
            wait_terminal(&queue, ids[2]).await,
            JobStatus::Failed {
                reason: FailReason::OutOfStock
            }
        );
        assert_eq!(store.read("item.3").await.unwrap(), Some(0));
        token.cancel();
    }

    #[tokio::test]
    async fn closed_flag_fails_fast_without_store_call() {
        let store = Arc::new(MemoryStore::new());
        store.initialize("item.1", 1).await.unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let (_worker, token) = spawn_worker(store.clone(), queue.clone());

        // Drain the single unit, then trip the closed flag.
        let a = queue
            .enqueue(RESERVE_KIND, ReserveRequest::payload("item.1"))
            .await
            .unwrap();
        let b = queue
            .enqueue(RESERVE_KIND, ReserveRequest::payload("item.1"))
            .await
            .unwrap();
        assert_eq!(wait_terminal(&queue, a).await, JobStatus::Completed);
        assert_eq!(
            wait_terminal(&queue, b).await,
            JobStatus::Failed {
                reason: FailReason::OutOfStock
            }
        );

        // Refill behind the worker's back: the flag still fails jobs fast and
        // the counter stays untouched, proving no store call happened.
        store.initialize("item.1", 5).await.unwrap();
        let c = queue
            .enqueue(RESERVE_KIND, ReserveRequest::payload("item.1"))
            .await
            .unwrap();
        assert_eq!(
            wait_terminal(&queue, c).await,
            JobStatus::Failed {
                reason: FailReason::ReservationsClosed
            }
        );
        assert_eq!(store.read("item.1").await.unwrap(), Some(5));
        token.cancel();
    }

    #[tokio::test]
    async fn completed_job_carries_full_progress() {
        let store = Arc::new(MemoryStore::new());
        store.initialize("seat", 1).await.unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let worker = ReservationWorker::new(store, queue.clone(), &fast_config());
        let token = CancellationToken::new();

        let id = queue
            .enqueue(RESERVE_KIND, ReserveRequest::payload("seat"))
            .await
            .unwrap();
        let job = queue.dequeue(RESERVE_KIND).await.unwrap();
        worker.process(job, &token).await;
        assert_eq!(queue.status(id).await.unwrap(), JobStatus::Completed);

        // Redelivery exposes the recorded progress alongside the terminal state.
        queue.redeliver(id).await.unwrap();
        let record = queue.dequeue(RESERVE_KIND).await.unwrap();
        assert_eq!(record.progress, Some(100));
    }

    #[tokio::test]
    async fn consumes_only_its_configured_kind() {
        let store = Arc::new(MemoryStore::new());
        store.initialize("seat", 2).await.unwrap();
        let queue = Arc::new(MemoryQueue::new());

        let worker = Arc::new(
            ReservationWorker::new(store.clone(), queue.clone(), &fast_config())
                .with_kind("reserve-priority"),
        );
        let token = CancellationToken::new();
        let handle = worker.clone();
        let child = token.clone();
        tokio::spawn(async move { handle.run(child).await });

        // A job under the default kind is never picked up.
        let ignored = queue
            .enqueue(RESERVE_KIND, ReserveRequest::payload("seat"))
            .await
            .unwrap();
        let taken = queue
            .enqueue("reserve-priority", ReserveRequest::payload("seat"))
            .await
            .unwrap();

        assert_eq!(wait_terminal(&queue, taken).await, JobStatus::Completed);
        assert_eq!(queue.status(ignored).await.unwrap(), JobStatus::Created);
        assert_eq!(store.read("seat").await.unwrap(), Some(1));
        token.cancel();
    }

    #[tokio::test]
    async fn redelivered_completed_job_does_not_decrement_twice() {
        let store = Arc::new(MemoryStore::new());
        store.initialize("seat", 10).await.unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let (_worker, token) = spawn_worker(store.clone(), queue.clone());

        let id = queue
            .enqueue(RESERVE_KIND, ReserveRequest::payload("seat"))
            .await
            .unwrap();
        assert_eq!(wait_terminal(&queue, id).await, JobStatus::Completed);
        assert_eq!(store.read("seat").await.unwrap(), Some(9));

        queue.redeliver(id).await.unwrap();
        // Give the worker time to (wrongly) act on the duplicate.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.read("seat").await.unwrap(), Some(9));
        assert_eq!(queue.status(id).await.unwrap(), JobStatus::Completed);
        token.cancel();
    }

    #[tokio::test]
    async fn malformed_payload_fails_without_counter_action() {
        let store = Arc::new(MemoryStore::new());
        store.initialize("seat", 3).await.unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let (_worker, token) = spawn_worker(store.clone(), queue.clone());

        let id = queue
            .enqueue(RESERVE_KIND, json!({"wrong_field": true}))
            .await
            .unwrap();
        let status = wait_terminal(&queue, id).await;
        assert!(matches!(
            status,
            JobStatus::Failed {
                reason: FailReason::InvalidPayload { .. }
            }
        ));
        assert_eq!(store.read("seat").await.unwrap(), Some(3));
        token.cancel();
    }

    /// Store that fails a fixed number of times before recovering.
    struct FlakyStore {
        inner: MemoryStore,
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl CounterStore for FlakyStore {
        async fn initialize(&self, key: &str, quantity: u32) -> Result<(), StoreError> {
            self.inner.initialize(key, quantity).await
        }

        async fn read(&self, key: &str) -> Result<Option<u32>, StoreError> {
            self.inner.read(key).await
        }

        async fn try_decrement(&self, key: &str) -> Result<Decrement, StoreError> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Unavailable {
                    detail: "injected fault".into(),
                });
            }
            self.inner.try_decrement(key).await
        }
    }

    #[tokio::test]
    async fn transient_store_fault_is_retried_then_succeeds() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failures_left: AtomicU32::new(2),
        });
        store.initialize("seat", 1).await.unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let (_worker, token) = spawn_worker(store.clone(), queue.clone());

        let id = queue
            .enqueue(RESERVE_KIND, ReserveRequest::payload("seat"))
            .await
            .unwrap();
        assert_eq!(wait_terminal(&queue, id).await, JobStatus::Completed);
        assert_eq!(store.read("seat").await.unwrap(), Some(0));
        token.cancel();
    }

    #[tokio::test]
    async fn persistent_store_fault_exhausts_budget_and_records_reason() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failures_left: AtomicU32::new(u32::MAX),
        });
        store.initialize("seat", 1).await.unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let (_worker, token) = spawn_worker(store.clone(), queue.clone());

        let id = queue
            .enqueue(RESERVE_KIND, ReserveRequest::payload("seat"))
            .await
            .unwrap();
        let status = wait_terminal(&queue, id).await;
        assert!(matches!(
            status,
            JobStatus::Failed {
                reason: FailReason::StoreUnavailable { .. }
            }
        ));
        token.cancel();
    }
}
