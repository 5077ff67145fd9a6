//! The chat line formatter.
//!
//! Resolves a message record's sender id through a cached participant map
//! (populated once per room before binding, as the participant set rarely
//! changes mid-session), marks the session user's own messages, and runs
//! the censorship transform over the body.

use std::collections::HashMap;

use parley_core::Record;
use parley_view::{censor, Formatter};

use crate::context::SessionContext;

const UNKNOWN_SENDER: &str = "Unknown User";

/// Formats one chat message record into a `name: text` display line.
#[derive(Debug, Clone)]
pub struct ChatFormatter {
    participants: HashMap<String, String>,
    self_id: String,
    censor_bodies: bool,
}

impl ChatFormatter {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            participants: HashMap::new(),
            self_id: self_id.into(),
            censor_bodies: true,
        }
    }

    pub fn for_session(ctx: &SessionContext) -> Self {
        Self::new(ctx.user().user_id.clone())
    }

    /// Register a participant's display name.
    pub fn with_participant(
        mut self,
        user_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.participants.insert(user_id.into(), name.into());
        self
    }

    /// Turn body censorship off (config-driven; on by default).
    pub fn with_censorship(mut self, enabled: bool) -> Self {
        self.censor_bodies = enabled;
        self
    }
}

impl Formatter for ChatFormatter {
    fn format(&self, record: &Record) -> String {
        let sender_id = record.sender_id().unwrap_or_default();
        let sender = self
            .participants
            .get(sender_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SENDER);

        let display_name = if !sender_id.is_empty() && sender_id == self.self_id {
            format!("{sender} (me)")
        } else {
            sender.to_string()
        };

        let body = record.text().unwrap_or_default();
        let body = if self.censor_bodies {
            censor(body)
        } else {
            body.to_string()
        };
        format!("{display_name}: {body}")
    }
}
