//! # Counter store contract.
//!
//! [`CounterStore`] is the seam between the reservation worker and whatever
//! holds the quantities. Backends are shared as `Arc<dyn CounterStore>`.

use async_trait::async_trait;

use crate::error::StoreError;

/// Outcome of an atomic check-and-decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// The counter was positive and has been decremented by one.
    Applied,
    /// The counter was zero or absent; nothing was mutated.
    Exhausted,
}

impl Decrement {
    /// `true` when a unit was actually reserved.
    pub fn is_applied(&self) -> bool {
        matches!(self, Decrement::Applied)
    }
}

/// # Durable key→integer store holding current available quantity.
///
/// ## Contract
/// - [`initialize`](Self::initialize) sets an entry unconditionally; used once
///   per resource at startup, before any worker runs.
/// - [`read`](Self::read) is a non-blocking lookup; `None` means the key was
///   never initialized.
/// - [`try_decrement`](Self::try_decrement) is atomic with respect to all
///   concurrent callers: it decrements only if the current value is positive,
///   as one indivisible step. An absent key counts as zero. Launching `K`
///   concurrent calls against a counter holding `V < K` yields exactly `V`
///   [`Decrement::Applied`] results, regardless of interleaving.
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    /// Unconditionally sets the entry for `key`. Startup-only.
    async fn initialize(&self, key: &str, quantity: u32) -> Result<(), StoreError>;

    /// Returns the current quantity, or `None` for an unknown key.
    async fn read(&self, key: &str) -> Result<Option<u32>, StoreError>;

    /// Atomically decrements `key` if positive.
    ///
    /// Never drives a counter negative and never partially applies: once
    /// issued, the operation completes or fails outright.
    async fn try_decrement(&self, key: &str) -> Result<Decrement, StoreError>;
}
