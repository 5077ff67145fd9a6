//! Error types for the Parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Parley operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Feed errors ---
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    // --- View / reconciliation errors ---
    #[error("View error: {0}")]
    View(#[from] ViewError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors surfaced by a remote feed source.
///
/// `NotFound` is terminal for a bind attempt; the connection-shaped
/// variants are transient and retried by the feed binding with the view
/// held in its last-known-good state.
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    #[error("Collection not found: {0}")]
    NotFound(String),

    #[error("Feed disconnected: {0}")]
    Disconnected(String),

    #[error("Feed operation timed out: {0}")]
    Timeout(String),

    #[error("Unknown subscription handle: {0}")]
    UnknownSubscription(u64),
}

impl FeedError {
    /// Whether a retry with the same arguments could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::Disconnected(_) | FeedError::Timeout(_))
    }
}

/// Programming invariant violations inside an ordered collection.
///
/// These are fatal to the reconciler instance: the owning binding must
/// reset it to empty and re-backfill rather than continue silently.
#[derive(Debug, Clone, Error)]
pub enum ViewError {
    #[error("Duplicate key in order list: {0}")]
    DuplicateKey(String),

    #[error("Order list and record map diverged: {order_len} ordered keys, {map_len} records")]
    Divergence { order_len: usize, map_len: usize },

    #[error("Key present but missing from position index: {0}")]
    UnindexedKey(String),
}

/// Errors from the session / feed-binding layer.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Bind failed for {collection}: {reason}")]
    BindFailed { collection: String, reason: String },
}
