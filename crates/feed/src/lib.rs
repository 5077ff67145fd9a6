//! # Parley Feed
//!
//! An in-process [`FeedSource`] + [`MembershipSource`] backed by plain
//! maps and mpsc fan-out. This is the stand-in for the real document
//! database client: integration tests and the demo binary drive it with
//! the mutation helpers, and every live subscriber observes the same
//! add/modify/remove deltas the remote feed would deliver.
//!
//! Delivery is per-subscription FIFO; nothing here reorders deltas.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parley_core::{
    CollectionRef, Delta, FeedError, FeedSource, MembershipSource, MembershipSubscription,
    Record, RecordKey, Subscription, SubscriptionHandle,
};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct Inner {
    /// Per-collection records in ordering-key order (insertion order here)
    collections: HashMap<CollectionRef, Vec<Record>>,

    /// Per-collection membership sets (full-replace semantics)
    membership: HashMap<CollectionRef, HashSet<RecordKey>>,

    delta_subs: HashMap<u64, (CollectionRef, mpsc::Sender<Delta>)>,
    member_subs: HashMap<u64, (CollectionRef, mpsc::Sender<HashSet<RecordKey>>)>,
}

/// In-memory change-feed over named collections.
#[derive(Default)]
pub struct MemoryFeed {
    inner: Mutex<Inner>,
    next_handle: AtomicU64,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    /// Create a collection (empty unless seeded), so backfills find it.
    pub async fn create_collection(&self, collection: &CollectionRef) {
        let mut inner = self.inner.lock().await;
        inner.collections.entry(collection.clone()).or_default();
    }

    /// Create and populate a collection without notifying subscribers.
    pub async fn seed(&self, collection: &CollectionRef, records: Vec<Record>) {
        let mut inner = self.inner.lock().await;
        inner.collections.insert(collection.clone(), records);
    }

    /// Append a record and fan out `Added` to live subscribers.
    pub async fn add_record(&self, collection: &CollectionRef, record: Record) {
        let mut inner = self.inner.lock().await;
        inner
            .collections
            .entry(collection.clone())
            .or_default()
            .push(record.clone());
        fan_out_delta(&mut inner, collection, Delta::Added(record)).await;
    }

    /// Replace a stored record's payload and fan out `Modified`.
    ///
    /// Unknown keys still fan out (the remote store would notify even if
    /// our snapshot predates the document).
    pub async fn modify_record(&self, collection: &CollectionRef, record: Record) {
        let mut inner = self.inner.lock().await;
        if let Some(records) = inner.collections.get_mut(collection) {
            if let Some(existing) = records.iter_mut().find(|r| r.key == record.key) {
                *existing = record.clone();
            }
        }
        fan_out_delta(&mut inner, collection, Delta::Modified(record)).await;
    }

    /// Remove a record and fan out `Removed`.
    pub async fn remove_record(&self, collection: &CollectionRef, key: &RecordKey) {
        let mut inner = self.inner.lock().await;
        if let Some(records) = inner.collections.get_mut(collection) {
            records.retain(|r| r.key != *key);
        }
        fan_out_delta(&mut inner, collection, Delta::Removed(key.clone())).await;
    }

    /// Replace a collection's membership set and fan out the whole set.
    pub async fn set_membership(&self, collection: &CollectionRef, set: HashSet<RecordKey>) {
        let mut inner = self.inner.lock().await;
        inner.membership.insert(collection.clone(), set.clone());

        let mut dead = Vec::new();
        for (id, (sub_collection, tx)) in &inner.member_subs {
            if sub_collection == collection && tx.send(set.clone()).await.is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            inner.member_subs.remove(&id);
        }
    }

    /// Drop a collection entirely; later backfills see `NotFound`.
    pub async fn drop_collection(&self, collection: &CollectionRef) {
        let mut inner = self.inner.lock().await;
        inner.collections.remove(collection);
        inner.membership.remove(collection);
    }

    /// Drop every live sender without touching stored data, as a remote
    /// disconnect would. Subscribers observe a closed channel.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        inner.delta_subs.clear();
        inner.member_subs.clear();
    }

    /// Number of live delta subscriptions (test observability).
    pub async fn live_subscriptions(&self) -> usize {
        self.inner.lock().await.delta_subs.len()
    }
}

async fn fan_out_delta(inner: &mut Inner, collection: &CollectionRef, delta: Delta) {
    let mut dead = Vec::new();
    for (id, (sub_collection, tx)) in &inner.delta_subs {
        if sub_collection == collection && tx.send(delta.clone()).await.is_err() {
            dead.push(*id);
        }
    }
    for id in dead {
        debug!(handle = id, "dropping dead delta subscription");
        inner.delta_subs.remove(&id);
    }
}

#[async_trait]
impl FeedSource for MemoryFeed {
    async fn backfill(&self, collection: &CollectionRef) -> Result<Vec<Record>, FeedError> {
        let inner = self.inner.lock().await;
        inner
            .collections
            .get(collection)
            .cloned()
            .ok_or_else(|| FeedError::NotFound(collection.to_string()))
    }

    async fn subscribe(&self, collection: &CollectionRef) -> Result<Subscription, FeedError> {
        let handle = self.handle();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut inner = self.inner.lock().await;
        if !inner.collections.contains_key(collection) {
            return Err(FeedError::NotFound(collection.to_string()));
        }
        inner.delta_subs.insert(handle.0, (collection.clone(), tx));
        Ok(Subscription { handle, deltas: rx })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), FeedError> {
        let mut inner = self.inner.lock().await;
        inner
            .delta_subs
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(FeedError::UnknownSubscription(handle.0))
    }
}

#[async_trait]
impl MembershipSource for MemoryFeed {
    async fn fetch_membership(
        &self,
        collection: &CollectionRef,
    ) -> Result<HashSet<RecordKey>, FeedError> {
        let inner = self.inner.lock().await;
        Ok(inner.membership.get(collection).cloned().unwrap_or_default())
    }

    async fn subscribe_membership(
        &self,
        collection: &CollectionRef,
    ) -> Result<MembershipSubscription, FeedError> {
        let handle = self.handle();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut inner = self.inner.lock().await;
        inner.member_subs.insert(handle.0, (collection.clone(), tx));
        Ok(MembershipSubscription { handle, sets: rx })
    }

    async fn unsubscribe_membership(&self, handle: SubscriptionHandle) -> Result<(), FeedError> {
        let mut inner = self.inner.lock().await;
        inner
            .member_subs
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(FeedError::UnknownSubscription(handle.0))
    }
}
