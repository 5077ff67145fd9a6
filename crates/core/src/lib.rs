//! # Parley Core
//!
//! Domain types, traits, and error definitions for the Parley chat client.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The remote document store is reached only through the abstract
//! [`FeedSource`] and [`MembershipSource`] traits defined here. The
//! reconciliation engine, the session layer, and the in-memory test feed
//! all depend inward on this crate and never on each other's concretions.

pub mod error;
pub mod event;
pub mod feed;
pub mod record;

// Re-export key types at crate root for ergonomics
pub use error::{Error, FeedError, Result, SessionError, ViewError};
pub use event::{DisplayState, EventBus, ViewEvent};
pub use feed::{FeedSource, MembershipSource, MembershipSubscription, Subscription, SubscriptionHandle};
pub use record::{CollectionRef, Delta, Record, RecordKey};
