//! Error types used by the reservation pipeline.
//!
//! This module defines three taxonomies:
//!
//! - [`StoreError`] — faults raised by the counter store backend.
//! - [`QueueError`] — faults raised by the job queue (producer- and consumer-side).
//! - [`FailReason`] — terminal business outcomes recorded on failed jobs.
//!
//! `FailReason` is deliberately separate from the two fault enums: running out
//! of stock is an expected outcome, not an infrastructure problem, and
//! downstream consumers must be able to tell the two apart (a failed job always
//! carries its reason).
//!
//! All types provide `as_label()` returning a short stable snake_case string
//! for logs and metrics.

use thiserror::Error;

use crate::queue::JobId;

/// # Faults raised by the counter store.
///
/// Business outcomes (exhausted counter) are **not** errors; they are reported
/// through [`Decrement`](crate::store::Decrement).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backing store unreachable or refused the operation.
    ///
    /// Surfaced to the caller as a reservation failure after the worker's
    /// bounded retry budget is spent; never retried silently beyond that.
    #[error("counter store unavailable: {detail}")]
    Unavailable {
        /// Human-readable description of the underlying fault.
        detail: String,
    },
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Unavailable { .. } => "store_unavailable",
        }
    }
}

/// # Faults raised by the job queue.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QueueError {
    /// The job could not be persisted; the caller must be told "reservation
    /// failed", never "in process".
    #[error("enqueue failed: {detail}")]
    EnqueueFailed {
        /// Human-readable description of the underlying fault.
        detail: String,
    },

    /// No job with the given id exists.
    #[error("unknown job id {id}")]
    UnknownJob {
        /// The id that was looked up.
        id: JobId,
    },

    /// The queue has been closed; no further jobs will be delivered.
    #[error("queue closed")]
    Closed,

    /// The queue backend is unreachable.
    #[error("queue backend unavailable: {detail}")]
    Unavailable {
        /// Human-readable description of the underlying fault.
        detail: String,
    },
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::EnqueueFailed { .. } => "enqueue_failed",
            QueueError::UnknownJob { .. } => "unknown_job",
            QueueError::Closed => "queue_closed",
            QueueError::Unavailable { .. } => "queue_unavailable",
        }
    }
}

/// # Terminal reasons recorded on failed reservation jobs.
///
/// Every job that reaches `Failed` carries one of these so that consumers can
/// distinguish "no stock" from "infrastructure problem".
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// The counter was already at zero; expected business outcome.
    #[error("not enough stock available")]
    OutOfStock,

    /// The resource is known exhausted; the job was failed fast without
    /// touching the counter.
    #[error("reservations are closed")]
    ReservationsClosed,

    /// The counter store stayed unreachable through the retry budget.
    #[error("counter store unavailable: {detail}")]
    StoreUnavailable {
        /// Last fault observed before giving up.
        detail: String,
    },

    /// The job payload could not be decoded; no counter action was taken.
    #[error("malformed job payload: {detail}")]
    InvalidPayload {
        /// Decode error description.
        detail: String,
    },
}

impl FailReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FailReason::OutOfStock => "out_of_stock",
            FailReason::ReservationsClosed => "reservations_closed",
            FailReason::StoreUnavailable { .. } => "store_unavailable",
            FailReason::InvalidPayload { .. } => "invalid_payload",
        }
    }

    /// Reconstructs a reason from its stored `(label, detail)` pair.
    ///
    /// Used by durable queue backends that persist reasons as strings.
    /// Unknown labels map to [`FailReason::StoreUnavailable`] so that a
    /// corrupted record still reads as an infrastructure fault rather than a
    /// business outcome.
    pub fn from_label(label: &str, detail: String) -> Self {
        match label {
            "out_of_stock" => FailReason::OutOfStock,
            "reservations_closed" => FailReason::ReservationsClosed,
            "invalid_payload" => FailReason::InvalidPayload { detail },
            _ => FailReason::StoreUnavailable { detail },
        }
    }

    /// `true` when the failure is an expected business outcome rather than a
    /// fault (out of stock, reservations closed).
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            FailReason::OutOfStock | FailReason::ReservationsClosed
        )
    }
}
