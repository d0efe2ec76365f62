//! # Stuck-job watchdog.
//!
//! A job that never receives a terminal mark is an operational fault, not
//! something to retry: replaying a job whose effect is unknown risks a double
//! decrement. The watchdog therefore only *reports* — it scans the queue on an
//! interval and logs a warning once per newly stuck job.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::queue::{JobId, JobQueue};

/// Periodically scans for jobs stuck in `Active` past the configured deadline.
pub struct Watchdog {
    queue: Arc<dyn JobQueue>,
    deadline: Duration,
    interval: Duration,
    reported: tokio::sync::Mutex<HashSet<JobId>>,
}

impl Watchdog {
    /// Creates a watchdog over the given queue.
    pub fn new(queue: Arc<dyn JobQueue>, cfg: &Config) -> Self {
        Self {
            queue,
            deadline: cfg.stuck_after,
            interval: cfg.watchdog_interval,
            reported: tokio::sync::Mutex::new(HashSet::new()),
        }
    }

    /// Runs scan cycles until `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) {
        loop {
            let sleep = time::sleep(self.interval);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => break,
            }
            self.scan_once().await;
        }
    }

    /// One scan pass; exposed for tests and manual operator tooling.
    pub async fn scan_once(&self) -> Vec<JobId> {
        let stuck = match self.queue.stuck_jobs(self.deadline).await {
            Ok(ids) => ids,
            Err(e) => {
                log::warn!("stuck-job scan failed: {e}");
                return Vec::new();
            }
        };

        let mut reported = self.reported.lock().await;
        // Drop ids that left the stuck set so the table tracks live jobs only.
        reported.retain(|id| stuck.contains(id));
        let mut fresh = Vec::new();
        for id in stuck {
            if reported.insert(id) {
                log::warn!(
                    "job {id} active for more than {:?} without a terminal mark",
                    self.deadline
                );
                fresh.push(id);
            }
        }
        fresh
    }
}
