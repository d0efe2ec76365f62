//! # Global pipeline configuration.
//!
//! [`Config`] defines the runtime knobs shared by the worker and the signal
//! bus: store-fault retry budget and backoff, stuck-job deadline, watchdog
//! scan interval, and signal channel capacity.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use reservq::Config;
//!
//! let mut cfg = Config::default();
//! cfg.store_retries = 5;
//! cfg.stuck_after = Duration::from_secs(60);
//!
//! assert_eq!(cfg.store_retries, 5);
//! ```

use std::time::Duration;

use crate::policy::BackoffPolicy;

/// Global configuration for the reservation pipeline.
#[derive(Clone, Debug)]
pub struct Config {
    /// How many times the worker retries a `try_decrement` that hit
    /// [`StoreError::Unavailable`](crate::StoreError) before failing the job.
    pub store_retries: u32,
    /// Delay schedule between store-fault retries.
    pub retry_backoff: BackoffPolicy,
    /// An active job older than this is reported as stuck (never auto-retried).
    pub stuck_after: Duration,
    /// How often the watchdog scans for stuck jobs.
    pub watchdog_interval: Duration,
    /// Capacity of the control-signal broadcast channel.
    pub signal_capacity: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `store_retries = 3`
    /// - `retry_backoff = BackoffPolicy::default()` (100ms doubling, 5s cap)
    /// - `stuck_after = 30s`
    /// - `watchdog_interval = 5s`
    /// - `signal_capacity = 256`
    fn default() -> Self {
        Self {
            store_retries: 3,
            retry_backoff: BackoffPolicy::default(),
            stuck_after: Duration::from_secs(30),
            watchdog_interval: Duration::from_secs(5),
            signal_capacity: 256,
        }
    }
}
