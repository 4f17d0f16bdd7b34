//! Broadcast channel for domain events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every accepted
//! mutation publishes a [`MarketEvent`] while it still holds the row lock,
//! so events about one record arrive in commit order.
//! WebSocket connections and the event log writer subscribe to it.

use tokio::sync::broadcast;

use super::MarketEvent;

/// Broadcast bus for [`MarketEvent`]s.
///
/// When the ring buffer is full the oldest events are dropped for lagging
/// receivers. Delivery is best-effort; the stored records stay the source of
/// truth.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that got the event. Without
    /// receivers the event is dropped.
    pub fn publish(&self, event: MarketEvent) -> usize {
        tracing::debug!(
            event_type = event.event_type_str(),
            topic = %event.topic(),
            "publishing market event"
        );
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a receiver for all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
