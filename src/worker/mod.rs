//! Reservation worker: consumes jobs and applies at most one decrement each.
//!
//! ## Contents
//! - [`ReservationWorker`] the consumer loop (dequeue → dedupe → fast-fail →
//!   atomic decrement → terminal mark)
//! - [`ReserveRequest`] the payload a producer enqueues
//! - [`Watchdog`] periodic stuck-job scan (operational alarm, log-only)
//! - [`RESERVE_KIND`] the job type reservation jobs are enqueued under

mod reservation;
mod watchdog;

pub use reservation::{ReservationWorker, ReserveRequest, RESERVE_KIND};
pub use watchdog::Watchdog;
