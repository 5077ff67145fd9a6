//! # Parley View
//!
//! The live-view reconciliation engine: turns an unordered stream of remote
//! change deltas into a stable, duplicate-free, correctly-ordered local
//! sequence fit for a fixed-height display.
//!
//! The pipeline runs one direction:
//!
//! ```text
//! remote feed → OrderedCollection → Projection → (filter, membership mark) → lines
//! ```
//!
//! Everything here is synchronous and single-owner; serialization of
//! concurrent delta callbacks is the session layer's job.

pub mod censor;
pub mod overlay;
pub mod project;
pub mod reconcile;

pub use censor::{censor, censor_robust, censor_simple};
pub use overlay::{filter_records, mark_membership, search_lines, FilteredView};
pub use project::{project, Formatter, Projection, FILLER_GLYPH};
pub use reconcile::{Applied, OrderedCollection};
