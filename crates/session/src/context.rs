//! Explicit session state.
//!
//! Created at login, replaced on chatroom switch, cleared at logout.
//! Nothing here is process-global: whoever owns the session passes it to
//! the components that need it.

use parley_core::{CollectionRef, RecordKey};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub name: String,
}

impl UserProfile {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            name: name.into(),
        }
    }
}

/// Which remote collection is currently "live" for this user.
#[derive(Debug, Clone)]
pub struct SessionContext {
    user: UserProfile,
    active_chatroom: Option<RecordKey>,
}

impl SessionContext {
    /// A session exists exactly while a user is logged in.
    pub fn log_in(user: UserProfile) -> Self {
        Self {
            user,
            active_chatroom: None,
        }
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// Whether a sender id refers to the session user.
    pub fn is_me(&self, sender_id: &str) -> bool {
        self.user.user_id == sender_id
    }

    pub fn active_chatroom(&self) -> Option<&RecordKey> {
        self.active_chatroom.as_ref()
    }

    /// Switch to a chatroom; returns the message collection to bind.
    pub fn enter_chatroom(&mut self, chatroom: RecordKey) -> CollectionRef {
        let messages = CollectionRef::messages(&chatroom);
        self.active_chatroom = Some(chatroom);
        messages
    }

    /// Leave the active chatroom (kicked, or back to the room list).
    pub fn leave_chatroom(&mut self) {
        self.active_chatroom = None;
    }

    /// The message collection of the active chatroom, if any.
    pub fn active_messages(&self) -> Option<CollectionRef> {
        self.active_chatroom.as_ref().map(CollectionRef::messages)
    }
}
