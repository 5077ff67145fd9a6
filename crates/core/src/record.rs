//! Record and Delta domain types.
//!
//! These are the value objects the whole system reconciles over: a remote
//! collection is a set of keyed documents, and the change-feed reports each
//! observed change as one [`Delta`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, stable identity of one remote document.
///
/// The key never changes across updates to the same document; it is the
/// join point between the order list, the record map, and membership sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey(pub String);

impl RecordKey {
    /// Generate a fresh random key (for locally created records).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to one remote collection (e.g. the message history of a
/// chatroom, or the chatroom roster itself).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionRef(pub String);

impl CollectionRef {
    /// The message history of one chatroom.
    pub fn messages(chatroom_id: &RecordKey) -> Self {
        Self(format!("chatrooms/{}/messages", chatroom_id))
    }

    /// The top-level chatroom roster.
    pub fn chatrooms() -> Self {
        Self("chatrooms".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CollectionRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One remote document: a stable key, an arbitrary structured payload, and
/// an ordering key used only for initial/insert ordering.
///
/// The payload is deliberately schemaless (`serde_json::Map`); which fields
/// a given collection requires is decided by the reconciler that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable document identity
    pub key: RecordKey,

    /// Ordering key — the feed delivers new documents sorted by this, the
    /// reconciler never re-sorts per delta
    pub ordering: DateTime<Utc>,

    /// Document payload
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Create an empty record with the given key, ordered at `Utc::now()`.
    pub fn new(key: impl Into<RecordKey>) -> Self {
        Self {
            key: key.into(),
            ordering: Utc::now(),
            fields: serde_json::Map::new(),
        }
    }

    /// Create a chat message record with the conventional payload fields.
    pub fn message(
        key: impl Into<RecordKey>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(key)
            .with_field("sender_id", sender_id.into())
            .with_field("text", text.into())
    }

    /// Builder-style payload field setter.
    pub fn with_field(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Builder-style ordering key setter.
    pub fn with_ordering(mut self, ordering: DateTime<Utc>) -> Self {
        self.ordering = ordering;
        self
    }

    /// Fetch a payload field as a string, if present and a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }

    /// The `text` payload field (chat message body).
    pub fn text(&self) -> Option<&str> {
        self.str_field("text")
    }

    /// The `sender_id` payload field.
    pub fn sender_id(&self) -> Option<&str> {
        self.str_field("sender_id")
    }
}

/// One observed remote change for one keyed record.
///
/// Deltas arrive asynchronously and are not guaranteed to pair up with
/// local expectations: a `Modified` or `Removed` for a key the local side
/// never saw must be treated as a no-op by the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Delta {
    /// A document appeared in the collection (may be redelivered)
    Added(Record),

    /// An existing document's payload changed
    Modified(Record),

    /// A document left the collection
    Removed(RecordKey),
}

impl Delta {
    /// The key this delta is about.
    pub fn key(&self) -> &RecordKey {
        match self {
            Delta::Added(r) | Delta::Modified(r) => &r.key,
            Delta::Removed(k) => k,
        }
    }
}
