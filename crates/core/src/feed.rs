//! Feed traits — the abstraction over the remote document store.
//!
//! A [`FeedSource`] delivers one ordered backfill plus a live stream of
//! [`Delta`]s per subscription; a [`MembershipSource`] delivers full-replace
//! key sets (the remote sends the whole set each time, not deltas). The
//! real database client and the in-process test feed both implement these.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::FeedError;
use crate::record::{CollectionRef, Delta, Record, RecordKey};

/// Identifies one live subscription so it can be torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

impl std::fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A live delta subscription: the handle for teardown plus the receiver
/// the source delivers into.
///
/// Deltas arrive in delivery order on this receiver; dropping the receiver
/// alone is not a substitute for [`FeedSource::unsubscribe`], which must
/// complete before a successor subscription's backfill begins.
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub deltas: mpsc::Receiver<Delta>,
}

/// A live membership subscription delivering full-replace key sets.
pub struct MembershipSubscription {
    pub handle: SubscriptionHandle,
    pub sets: mpsc::Receiver<HashSet<RecordKey>>,
}

/// The remote change-feed source.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the current contents of a collection, ordered by ordering key.
    ///
    /// Used to populate an ordered collection before going live. Returns
    /// `FeedError::NotFound` if the collection does not exist remotely.
    async fn backfill(&self, collection: &CollectionRef) -> Result<Vec<Record>, FeedError>;

    /// Open a live delta subscription on a collection.
    async fn subscribe(&self, collection: &CollectionRef) -> Result<Subscription, FeedError>;

    /// Tear down a subscription.
    ///
    /// After this resolves the source must deliver no further deltas on
    /// the subscription's receiver.
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), FeedError>;
}

/// A separately tracked membership set (e.g. pinned message ids).
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Fetch the current membership set for a collection.
    async fn fetch_membership(
        &self,
        collection: &CollectionRef,
    ) -> Result<HashSet<RecordKey>, FeedError>;

    /// Subscribe to full-replace membership snapshots.
    async fn subscribe_membership(
        &self,
        collection: &CollectionRef,
    ) -> Result<MembershipSubscription, FeedError>;

    /// Tear down a membership subscription.
    async fn unsubscribe_membership(&self, handle: SubscriptionHandle) -> Result<(), FeedError>;
}
