//! # reservq
//!
//! **reservq** reserves units of a finite, shared resource (a seat pool or
//! per-item stock) on behalf of many concurrent callers. An asynchronous job
//! queue decouples "request to reserve" from "perform the reservation", and a
//! separate publish/subscribe channel delivers out-of-band control signals to
//! independent listeners.
//!
//! ## Architecture
//! ```text
//!  producers (request surface, excluded)          operators
//!      │  enqueue("reserve", {resource_id})           │ publish("ctrl", "KILL")
//!      ▼                                              ▼
//! ┌──────────────────────────────┐          ┌──────────────────────────┐
//! │  JobQueue (at-least-once,    │          │  SignalBus (best-effort, │
//! │  FIFO per kind, job table)   │          │  unpersisted broadcast)  │
//! └──────────────┬───────────────┘          └────────────┬─────────────┘
//!                │ dequeue                               │ recv (stops on KILL)
//!                ▼                                       ▼
//! ┌──────────────────────────────┐               independent listeners
//! │  ReservationWorker           │
//! │  - redelivery dedupe         │
//! │  - closed-flag fast fail     │
//! │  - bounded store retries     │
//! └──────────────┬───────────────┘
//!                │ try_decrement (single indivisible step)
//!                ▼
//! ┌──────────────────────────────┐
//! │  CounterStore                │◄── read (availability queries)
//! │  key → quantity, never < 0   │◄── initialize (startup, once per resource)
//! └──────────────────────────────┘
//! ```
//!
//! The queue and the signal bus carry **opposite** delivery guarantees and are
//! kept as separate abstractions: jobs are persisted and delivered at least
//! once; signals are fire-and-forget and lost if nobody is subscribed.
//!
//! Correctness rests on one primitive: [`CounterStore::try_decrement`], an
//! atomic check-and-decrement. Workers never read a count, hold it across an
//! await, and write it back.
//!
//! ## Features
//! | Area           | Description                                             | Key types                                  |
//! |----------------|---------------------------------------------------------|--------------------------------------------|
//! | **Counters**   | Atomic check-and-decrement per resource key.            | [`CounterStore`], [`MemoryStore`]          |
//! | **Jobs**       | Ordered at-least-once queue with explicit lifecycle.    | [`JobQueue`], [`MemoryQueue`], [`Job`]     |
//! | **Worker**     | At most one decrement per accepted job.                 | [`ReservationWorker`], [`Watchdog`]        |
//! | **Signals**    | Best-effort control channel with a kill payload.        | [`SignalBus`], [`SignalSub`], [`KILL`]     |
//! | **Catalog**    | Immutable resource facts and counter seeding.           | [`Catalog`], [`Resource`]                  |
//! | **Errors**     | Faults vs business outcomes, stable labels.             | [`StoreError`], [`QueueError`], [`FailReason`] |
//!
//! ## Optional features
//! - `redis`: Redis-backed `RedisStore` and `RedisQueue` (server-side Lua
//!   check-and-decrement; job hashes plus per-kind ready lists).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use reservq::{
//!     Config, CounterStore, MemoryQueue, MemoryStore, JobQueue,
//!     ReservationWorker, ReserveRequest, RESERVE_KIND,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let store: Arc<dyn CounterStore> = Arc::new(MemoryStore::new());
//!     store.initialize("seat", 50).await?;
//!     let queue = Arc::new(MemoryQueue::new());
//!
//!     let worker = Arc::new(ReservationWorker::new(store.clone(), queue.clone(), &cfg));
//!     let token = CancellationToken::new();
//!     let handle = {
//!         let worker = worker.clone();
//!         let token = token.clone();
//!         tokio::spawn(async move { worker.run(token).await })
//!     };
//!
//!     let id = queue
//!         .enqueue(RESERVE_KIND, ReserveRequest::payload("seat"))
//!         .await?;
//!     while !queue.status(id).await?.is_terminal() {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!     }
//!
//!     assert_eq!(store.read("seat").await?, Some(49));
//!     token.cancel();
//!     handle.await?;
//!     Ok(())
//! }
//! ```

mod catalog;
mod config;
mod error;
mod policy;
mod queue;
mod signal;
mod store;
mod worker;

// ---- Public re-exports ----

pub use catalog::{demo_catalog, Catalog, Resource};
pub use config::Config;
pub use error::{FailReason, QueueError, StoreError};
pub use policy::{BackoffPolicy, JitterPolicy};
pub use queue::{Job, JobId, JobQueue, JobStatus, MemoryQueue};
pub use signal::{Signal, SignalBus, SignalSub, KILL};
pub use store::{CounterStore, Decrement, MemoryStore};
pub use worker::{ReservationWorker, ReserveRequest, Watchdog, RESERVE_KIND};

// Optional: Redis-backed store and queue.
// Enable with: `--features redis`
#[cfg(feature = "redis")]
pub use queue::RedisQueue;
#[cfg(feature = "redis")]
pub use store::RedisStore;
