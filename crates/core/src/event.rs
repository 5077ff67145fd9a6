//! View event system — decoupled notification from the reconciliation
//! layer to whatever renders it.
//!
//! Events are published when a bound collection changes state or content.
//! The rendering collaborator subscribes and redraws; nothing in this layer
//! knows about widgets. A subscriber added after an event was published
//! does not retroactively receive it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::record::{CollectionRef, RecordKey};

/// What a fixed-height view of a bound collection should show right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    /// No collection is bound (logged out / no chatroom chosen)
    Unbound,
    /// A bind is in flight; show the loading placeholder
    Loading,
    /// Bound with at least one record
    Ready,
    /// Bound, backfill completed, collection is empty
    Empty,
    /// The bind failed terminally (missing remote document, exhausted retries)
    NotFound,
    /// The live subscription dropped; last-known-good view is still shown
    Reconnecting,
}

/// All events published by the reconciliation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ViewEvent {
    /// A feed binding changed display state
    StateChanged {
        collection: CollectionRef,
        state: DisplayState,
    },

    /// A bound collection's content changed (delta applied or membership replaced)
    CollectionUpdated {
        collection: CollectionRef,
        len: usize,
    },

    /// The active chatroom disappeared from the user's roster
    ActiveRoomRevoked { chatroom: RecordKey },
}

/// A broadcast-based event bus for view events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Publishing
/// with no subscribers is fine; slow subscribers may observe `Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<Arc<ViewEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: ViewEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events published from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ViewEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(ViewEvent::StateChanged {
            collection: CollectionRef::chatrooms(),
            state: DisplayState::Loading,
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            ViewEvent::StateChanged { state, .. } => {
                assert_eq!(*state, DisplayState::Loading);
            }
            _ => panic!("Expected StateChanged event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(ViewEvent::CollectionUpdated {
            collection: CollectionRef::chatrooms(),
            len: 0,
        });
    }

    #[tokio::test]
    async fn late_subscriber_does_not_see_earlier_events() {
        let bus = EventBus::new(16);
        bus.publish(ViewEvent::ActiveRoomRevoked {
            chatroom: "r1".into(),
        });

        let mut rx = bus.subscribe();
        bus.publish(ViewEvent::CollectionUpdated {
            collection: CollectionRef::chatrooms(),
            len: 3,
        });

        // Only the event published after subscribing arrives.
        let event = rx.recv().await.unwrap();
        assert!(matches!(event.as_ref(), ViewEvent::CollectionUpdated { len: 3, .. }));
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
