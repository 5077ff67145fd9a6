//! The chatroom roster.
//!
//! The user's chatroom list is just another reconciled collection, so it
//! rides the same [`FeedBinding`] engine as chat history. On top of the
//! binding it adds the revocation check: if the active chatroom disappears
//! from the roster, the session is bounced back to "no room chosen".

use std::sync::Arc;

use parley_core::{CollectionRef, EventBus, FeedSource, RecordKey, SessionError, ViewEvent};
use tracing::warn;

use crate::binding::FeedBinding;
use crate::context::SessionContext;

const NAME_FIELD: &str = "chatroom_name";

/// Live view of the chatrooms the user belongs to.
pub struct RoomRoster {
    binding: FeedBinding,
    events: Arc<EventBus>,
}

impl RoomRoster {
    pub fn new(feed: Arc<dyn FeedSource>, events: Arc<EventBus>) -> Self {
        let binding =
            FeedBinding::new(feed, Arc::clone(&events)).with_required_fields([NAME_FIELD]);
        Self { binding, events }
    }

    /// Bind to the chatroom roster collection.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.binding.bind(CollectionRef::chatrooms()).await
    }

    /// Tear the roster binding down (logout).
    pub async fn stop(&mut self) {
        self.binding.unbind().await;
    }

    /// The rooms in display order as `(id, name)` pairs.
    pub async fn rooms(&self) -> Vec<(RecordKey, String)> {
        self.binding
            .snapshot()
            .await
            .into_iter()
            .map(|record| {
                let name = record
                    .str_field(NAME_FIELD)
                    .unwrap_or("(unnamed)")
                    .to_string();
                (record.key, name)
            })
            .collect()
    }

    /// Check the session's active chatroom against the roster.
    ///
    /// If the user was removed from the room (it no longer appears in the
    /// reconciled roster), clears the active room and publishes
    /// [`ViewEvent::ActiveRoomRevoked`]. Returns whether a revocation
    /// happened.
    pub async fn reconcile_active(&self, ctx: &mut SessionContext) -> bool {
        let Some(active) = ctx.active_chatroom().cloned() else {
            return false;
        };

        let still_member = self.binding.view().lock().await.collection.get(&active).is_some();
        if still_member {
            return false;
        }

        warn!(chatroom = %active, "active chatroom no longer in roster; leaving");
        ctx.leave_chatroom();
        self.events
            .publish(ViewEvent::ActiveRoomRevoked { chatroom: active });
        true
    }

    /// The underlying binding, for rendering the room list.
    pub fn binding(&self) -> &FeedBinding {
        &self.binding
    }
}
