//! Counter store: durable key→integer map with atomic check-and-decrement.
//!
//! ## Contents
//! - [`CounterStore`] the backend contract ([`initialize`](CounterStore::initialize),
//!   [`read`](CounterStore::read), [`try_decrement`](CounterStore::try_decrement))
//! - [`Decrement`] outcome of a check-and-decrement
//! - [`MemoryStore`] in-process backend
//! - `RedisStore` durable backend (feature `redis`)
//!
//! ## Rules
//! - `try_decrement` is the **only** mutation after initialization, and it is
//!   a single indivisible step on every backend. A read-then-write pair would
//!   let two concurrent jobs both observe `1` and both decrement; that race is
//!   structurally impossible here.
//! - Callers never hold a counter value across an await and write it back.

mod counter;
mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use counter::{CounterStore, Decrement};
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;
