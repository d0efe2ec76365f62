//! # Signal bus for broadcasting control messages.
//!
//! [`SignalBus`] is a thin wrapper around [`tokio::sync::broadcast`] carrying
//! named-channel [`Signal`]s from any number of publishers to any number of
//! listeners.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and never retries.
//! - **No persistence**: with no subscriber at publish time the signal is
//!   lost, by design.
//! - **Ordering**: a listener sees signals in publish order per publisher;
//!   there is no ordering guarantee across publishers.
//! - **Lag handling**: slow listeners skip the oldest signals
//!   (`RecvError::Lagged`), they never stall a publisher.
//! - **Termination**: the reserved [`KILL`] payload ends a subscription after
//!   delivery; it is a clean stop, not an error.

use std::sync::Arc;

use tokio::sync::broadcast;

/// Reserved payload that instructs a listener to stop consuming.
pub const KILL: &str = "KILL";

/// An ephemeral control message: a channel name and a payload string.
///
/// Has no identity and no relation to resources or jobs; it exists only for
/// the instant between publish and delivery.
#[derive(Debug, Clone)]
pub struct Signal {
    /// Channel the signal was published on.
    pub channel: Arc<str>,
    /// Payload string.
    pub payload: Arc<str>,
}

impl Signal {
    /// `true` when this is the reserved termination signal.
    pub fn is_kill(&self) -> bool {
        self.payload.as_ref() == KILL
    }
}

/// Broadcast bus for control signals.
///
/// Cheap to clone (the sender is `Arc`-backed internally). All named channels
/// share one ring buffer; subscribers filter by channel name.
#[derive(Clone, Debug)]
pub struct SignalBus {
    tx: broadcast::Sender<Signal>,
}

impl SignalBus {
    /// Creates a bus with the given ring-buffer capacity (clamped to >= 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a signal to all current subscribers of `channel`.
    ///
    /// Fire-and-forget: with no subscribers the signal is dropped and this
    /// still returns immediately.
    pub fn publish(&self, channel: &str, payload: &str) {
        let _ = self.tx.send(Signal {
            channel: Arc::from(channel),
            payload: Arc::from(payload),
        });
    }

    /// Subscribes to a named channel.
    ///
    /// The subscription only observes signals published after this call.
    pub fn subscribe(&self, channel: &str) -> SignalSub {
        SignalSub {
            rx: self.tx.subscribe(),
            channel: channel.to_string(),
            finished: false,
        }
    }
}

/// A live subscription to one named channel.
pub struct SignalSub {
    rx: broadcast::Receiver<Signal>,
    channel: String,
    finished: bool,
}

impl SignalSub {
    /// Waits for the next signal on this channel.
    ///
    /// Returns `None` once the subscription is finished: either the [`KILL`]
    /// payload was delivered (it is returned first, then the subscription
    /// ends) or every publisher handle was dropped.
    pub async fn recv(&mut self) -> Option<Signal> {
        if self.finished {
            return None;
        }
        loop {
            match self.rx.recv().await {
                Ok(sig) if sig.channel.as_ref() == self.channel => {
                    if sig.is_kill() {
                        self.finished = true;
                    }
                    return Some(sig);
                }
                // Signal for another channel; keep waiting.
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let bus = SignalBus::new(16);
        let mut sub = bus.subscribe("ctrl");

        bus.publish("ctrl", "pause");
        bus.publish("ctrl", "resume");

        assert_eq!(sub.recv().await.unwrap().payload.as_ref(), "pause");
        assert_eq!(sub.recv().await.unwrap().payload.as_ref(), "resume");
    }

    #[tokio::test]
    async fn filters_other_channels() {
        let bus = SignalBus::new(16);
        let mut sub = bus.subscribe("ctrl");

        bus.publish("audit", "noise");
        bus.publish("ctrl", "ping");

        assert_eq!(sub.recv().await.unwrap().payload.as_ref(), "ping");
    }

    #[tokio::test]
    async fn kill_ends_the_subscription() {
        let bus = SignalBus::new(16);
        let mut sub = bus.subscribe("ctrl");

        bus.publish("ctrl", KILL);
        bus.publish("ctrl", "after");

        let sig = sub.recv().await.unwrap();
        assert!(sig.is_kill());
        // Published after the kill, never seen.
        assert!(sub.recv().await.is_none());
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped() {
        let bus = SignalBus::new(16);
        // No error, no panic; the signal simply vanishes.
        bus.publish("ctrl", KILL);

        // A later subscriber does not see it.
        let mut sub = bus.subscribe("ctrl");
        bus.publish("ctrl", "fresh");
        assert_eq!(sub.recv().await.unwrap().payload.as_ref(), "fresh");
    }

    #[tokio::test]
    async fn independent_subscribers_each_get_a_copy() {
        let bus = SignalBus::new(16);
        let mut a = bus.subscribe("ctrl");
        let mut b = bus.subscribe("ctrl");

        bus.publish("ctrl", "halt");

        assert_eq!(a.recv().await.unwrap().payload.as_ref(), "halt");
        assert_eq!(b.recv().await.unwrap().payload.as_ref(), "halt");
    }
}
