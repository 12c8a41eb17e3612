//! # Event bus for runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. Publishing never blocks, so it is
//! safe from inside the coordinator loop, from registry methods that hold the
//! slot lock, and from source completion callbacks.
//!
//! ```text
//!   Coordinator ──┐
//!   Registry    ──┼──► Bus ──► subscriber listener ──► SubscriberSet
//!   Source runs ──┘        └─► MergedState::events() receivers
//! ```
//!
//! ## Rules
//! - Events are dropped when nobody is subscribed.
//! - Slow receivers observe `RecvError::Lagged(n)` and skip the `n` oldest events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus whose ring buffer holds `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
