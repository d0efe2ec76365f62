//! Control channel: best-effort pub/sub for out-of-band signals.
//!
//! Carries short-lived operator signals (pause, shutdown) to any number of
//! listeners. Deliberately the opposite guarantee from the job queue:
//! at-most-once, unpersisted, fire-and-forget. The two must never be merged
//! into one abstraction.

mod bus;

pub use bus::{Signal, SignalBus, SignalSub, KILL};
