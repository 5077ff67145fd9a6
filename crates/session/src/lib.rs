//! # Parley Session
//!
//! Owns which remote collection is currently "live" and the lifecycle of
//! its feed subscription. [`FeedBinding`] is the Unbound/Binding/Bound
//! state machine tying one reconciled collection to one remote collection
//! reference, with an epoch token guarding against stale feeds after a
//! rebind. [`SessionContext`] replaces process-wide session statics with
//! an explicitly passed object.

pub mod binding;
pub mod context;
pub mod format;
pub mod roster;

pub use binding::{BindingState, FeedBinding, LiveView, RetryPolicy};
pub use context::{SessionContext, UserProfile};
pub use format::ChatFormatter;
pub use roster::RoomRoster;
