//! # Engine-wide event bus.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so any component can publish
//! without blocking and without knowing who listens.
//!
//! ```text
//! Publishers (many):                  Receivers (any):
//!   settlement ────┐
//!   cancel/pause ──┼──────► Bus ──────► subscriber listener ──► SubscriberSet
//!   server mgr ────┤  (broadcast chan)  Engine::subscribe() receivers
//!   shutdown ──────┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - One ring buffer of `capacity` events is shared by all receivers.
//! - Slow receivers observe `RecvError::Lagged(n)` and skip the `n` oldest events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for engine events.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
