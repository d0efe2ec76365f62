//! Job queue: ordered, at-least-once work queue with explicit lifecycle.
//!
//! ## Contents
//! - [`Job`], [`JobId`], [`JobStatus`] the job data model
//! - [`JobQueue`] the backend contract (enqueue / dequeue / terminal marks /
//!   progress / stuck-job query / redelivery)
//! - [`MemoryQueue`] in-process backend
//! - `RedisQueue` durable backend (feature `redis`)
//!
//! ## Quick reference
//! ```text
//! producer ── enqueue(kind, payload) ──► [Created] ─┐
//!                                                   │ dequeue(kind)
//! worker  ◄──────────────────────────── [Active] ◄──┘
//!    │
//!    ├─ mark_completed(id) ──► [Completed]   (terminal, exactly once)
//!    └─ mark_failed(id, r) ──► [Failed{r}]   (terminal, exactly once)
//! ```
//!
//! Delivery is at-least-once: [`JobQueue::redeliver`] models the crash
//! duplicate, and terminal jobs come back with their terminal status intact
//! so the consumer can skip them. The queue itself never retries anything.

mod job;
mod memory;
mod queue;
#[cfg(feature = "redis")]
mod redis;

pub use job::{Job, JobId, JobStatus};
pub use memory::MemoryQueue;
pub use queue::JobQueue;
#[cfg(feature = "redis")]
pub use redis::RedisQueue;
