//! The feed binding state machine.
//!
//! One [`FeedBinding`] owns at most one live feed subscription and the
//! [`LiveView`] it reconciles into. All mutation of the view goes through
//! the binding's pumps, serialized behind one async mutex; external code
//! only snapshots.
//!
//! Rebinding is race-free: teardown bumps the epoch counter *before* the
//! unsubscribe round-trip, every pump re-checks the current epoch under
//! the view lock before applying a delta, and the old feed's
//! unsubscription completes before the new backfill begins. A misbehaving
//! feed that keeps delivering after unsubscribe therefore cannot land
//! deltas in a successor collection.
//!
//! A delta channel that closes while its epoch is still current is a live
//! disconnect, not a teardown: the pump holds the last-known-good view
//! behind a `Reconnecting` indicator and drives a resubscribe plus
//! re-backfill per the retry policy.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parley_core::{
    CollectionRef, Delta, DisplayState, EventBus, FeedError, FeedSource, MembershipSource,
    Record, RecordKey, SessionError, ViewEvent,
};
use parley_view::{
    mark_membership, search_lines, Formatter, OrderedCollection, Projection, FILLER_GLYPH,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

/// The reconciled state a binding owns exclusively: the ordered collection
/// plus its membership set (e.g. pinned message ids).
#[derive(Default)]
pub struct LiveView {
    pub collection: OrderedCollection,
    pub membership: HashSet<RecordKey>,
}

/// Lifecycle of a feed binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingState {
    /// No collection bound (logged out / nothing chosen)
    Unbound,
    /// Teardown done, backfill in flight
    Binding(CollectionRef),
    /// Backfill applied and live subscription running
    Bound(CollectionRef),
}

/// Retry policy for transient backfill/subscribe failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

struct ActiveFeed {
    feed_handle: parley_core::SubscriptionHandle,
    membership_handle: Option<parley_core::SubscriptionHandle>,
}

/// Binds one reconciled collection to one remote collection reference.
pub struct FeedBinding {
    feed: Arc<dyn FeedSource>,
    membership_source: Option<Arc<dyn MembershipSource>>,
    events: Arc<EventBus>,
    view: Arc<Mutex<LiveView>>,

    /// Bumped on every teardown; pumps compare against their creation epoch
    epoch: Arc<AtomicU64>,

    state: BindingState,

    /// Shared with the delta pump, which swaps in the replacement handle
    /// after a live-disconnect resubscribe
    active: Arc<Mutex<Option<ActiveFeed>>>,
    required_fields: Vec<String>,
    retry: RetryPolicy,
    filler_glyph: String,
}

impl FeedBinding {
    pub fn new(feed: Arc<dyn FeedSource>, events: Arc<EventBus>) -> Self {
        Self {
            feed,
            membership_source: None,
            events,
            view: Arc::new(Mutex::new(LiveView::default())),
            epoch: Arc::new(AtomicU64::new(0)),
            state: BindingState::Unbound,
            active: Arc::new(Mutex::new(None)),
            required_fields: Vec::new(),
            retry: RetryPolicy::default(),
            filler_glyph: FILLER_GLYPH.to_string(),
        }
    }

    /// Attach a membership source (full-replace key sets).
    pub fn with_membership_source(mut self, source: Arc<dyn MembershipSource>) -> Self {
        self.membership_source = Some(source);
        self
    }

    /// Require payload fields; records missing any are dropped on apply.
    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Override the transient-failure retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the viewport filler glyph used by [`FeedBinding::render`].
    pub fn with_filler_glyph(mut self, glyph: impl Into<String>) -> Self {
        self.filler_glyph = glyph.into();
        self
    }

    pub fn state(&self) -> &BindingState {
        &self.state
    }

    /// Shared handle to the live view (read via lock; mutate never).
    pub fn view(&self) -> Arc<Mutex<LiveView>> {
        Arc::clone(&self.view)
    }

    /// Copy-on-read snapshot of the reconciled records in display order.
    pub async fn snapshot(&self) -> Vec<Record> {
        self.view.lock().await.collection.snapshot()
    }

    /// Current membership set.
    pub async fn membership(&self) -> HashSet<RecordKey> {
        self.view.lock().await.membership.clone()
    }

    /// Bind to a collection, tearing down any previous binding first.
    ///
    /// The old subscription is fully unsubscribed before the new backfill
    /// begins. On terminal failure the binding ends `Unbound` with a
    /// `NotFound` display state instead of an indefinite `Loading`.
    pub async fn bind(&mut self, collection: CollectionRef) -> Result<(), SessionError> {
        self.teardown().await;

        self.state = BindingState::Binding(collection.clone());
        {
            let mut view = self.view.lock().await;
            view.collection =
                OrderedCollection::with_required_fields(self.required_fields.clone());
            view.membership.clear();
        }
        self.emit(&collection, DisplayState::Loading);

        // Everything spawned for this bind carries this epoch.
        let epoch = self.epoch.load(Ordering::SeqCst);

        let records = match self.backfill_with_retry(&collection).await {
            Ok(records) => records,
            Err(e) => return self.fail_bind(collection, e).await,
        };

        let membership = match &self.membership_source {
            Some(source) => match source.fetch_membership(&collection).await {
                Ok(set) => set,
                Err(e) => {
                    warn!(%collection, error = %e, "membership fetch failed; starting empty");
                    HashSet::new()
                }
            },
            None => HashSet::new(),
        };

        {
            let mut view = self.view.lock().await;
            view.collection
                .apply_batch(records.into_iter().map(Delta::Added));
            if let Err(e) = view.collection.verify() {
                error!(%collection, error = %e, "invariant violation after backfill; resetting");
                view.collection.clear();
            }
            view.membership = membership;
        }

        let subscription = match self.subscribe_with_retry(&collection).await {
            Ok(sub) => sub,
            Err(e) => return self.fail_bind(collection, e).await,
        };
        self.spawn_delta_pump(collection.clone(), subscription.deltas, epoch);

        let membership_handle = match &self.membership_source {
            Some(source) => match source.subscribe_membership(&collection).await {
                Ok(sub) => {
                    self.spawn_membership_pump(collection.clone(), sub.sets, epoch);
                    Some(sub.handle)
                }
                Err(e) => {
                    warn!(%collection, error = %e, "membership subscribe failed; markers will be stale");
                    None
                }
            },
            None => None,
        };

        *self.active.lock().await = Some(ActiveFeed {
            feed_handle: subscription.handle,
            membership_handle,
        });

        let len = self.view.lock().await.collection.len();
        self.state = BindingState::Bound(collection.clone());
        info!(%collection, records = len, "feed bound");
        self.emit(
            &collection,
            if len == 0 {
                DisplayState::Empty
            } else {
                DisplayState::Ready
            },
        );
        Ok(())
    }

    /// Tear down to `Unbound` (logout / session clear).
    pub async fn unbind(&mut self) {
        let collection = match &self.state {
            BindingState::Binding(c) | BindingState::Bound(c) => Some(c.clone()),
            BindingState::Unbound => None,
        };
        self.teardown().await;
        {
            let mut view = self.view.lock().await;
            view.collection.clear();
            view.membership.clear();
        }
        self.state = BindingState::Unbound;
        if let Some(collection) = collection {
            info!(%collection, "feed unbound");
            self.emit(&collection, DisplayState::Unbound);
        }
    }

    /// Produce the display lines for the current view: format each record,
    /// apply membership markers, apply the search filter, then pad with
    /// filler sized to what survived the filter.
    pub async fn render(
        &self,
        formatter: &dyn Formatter,
        viewport_height: i32,
        query: &str,
        marker: char,
    ) -> Projection {
        let (records, keys, membership) = {
            let view = self.view.lock().await;
            (
                view.collection.snapshot(),
                view.collection.keys().to_vec(),
                view.membership.clone(),
            )
        };

        let mut lines: Vec<String> = records.iter().map(|r| formatter.format(r)).collect();
        mark_membership(&mut lines, &keys, &membership, marker);
        let filtered = search_lines(&keys, &lines, query);
        Projection::with_filler_glyph(filtered.lines, viewport_height, &self.filler_glyph)
    }

    async fn fail_bind(
        &mut self,
        collection: CollectionRef,
        e: FeedError,
    ) -> Result<(), SessionError> {
        warn!(%collection, error = %e, "bind failed");
        {
            // A backfill may already have landed; the unbound state and the
            // view must agree.
            let mut view = self.view.lock().await;
            view.collection.clear();
            view.membership.clear();
        }
        self.state = BindingState::Unbound;
        self.emit(&collection, DisplayState::NotFound);
        Err(SessionError::BindFailed {
            collection: collection.to_string(),
            reason: e.to_string(),
        })
    }

    async fn teardown(&mut self) {
        // Invalidate in-flight pumps before the unsubscribe round-trip, so
        // an already-queued delta cannot be applied to what comes next.
        self.epoch.fetch_add(1, Ordering::SeqCst);

        if let Some(active) = self.active.lock().await.take() {
            if let Err(e) = self.feed.unsubscribe(active.feed_handle).await {
                warn!(error = %e, "feed unsubscribe failed during teardown");
            }
            if let (Some(source), Some(handle)) =
                (&self.membership_source, active.membership_handle)
            {
                if let Err(e) = source.unsubscribe_membership(handle).await {
                    warn!(error = %e, "membership unsubscribe failed during teardown");
                }
            }
        }
    }

    async fn backfill_with_retry(
        &self,
        collection: &CollectionRef,
    ) -> Result<Vec<Record>, FeedError> {
        let mut attempt = 0;
        loop {
            match self.feed.backfill(collection).await {
                Ok(records) => return Ok(records),
                Err(e) if e.is_transient() && attempt + 1 < self.retry.attempts => {
                    attempt += 1;
                    warn!(%collection, error = %e, attempt, "backfill failed; retrying");
                    self.emit(collection, DisplayState::Reconnecting);
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn subscribe_with_retry(
        &self,
        collection: &CollectionRef,
    ) -> Result<parley_core::Subscription, FeedError> {
        let mut attempt = 0;
        loop {
            match self.feed.subscribe(collection).await {
                Ok(sub) => return Ok(sub),
                Err(e) if e.is_transient() && attempt + 1 < self.retry.attempts => {
                    attempt += 1;
                    warn!(%collection, error = %e, attempt, "subscribe failed; retrying");
                    self.emit(collection, DisplayState::Reconnecting);
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Pump deltas from one subscription into the view, one at a time, in
    /// arrival order. A channel that closes without a teardown is a live
    /// disconnect: the last-known-good view is held while a resubscribe is
    /// driven per the retry policy. Exits when the epoch moves on or the
    /// reconnect gives up.
    fn spawn_delta_pump(
        &self,
        collection: CollectionRef,
        mut deltas: mpsc::Receiver<Delta>,
        epoch: u64,
    ) {
        let view = Arc::clone(&self.view);
        let current_epoch = Arc::clone(&self.epoch);
        let events = Arc::clone(&self.events);
        let feed = Arc::clone(&self.feed);
        let active = Arc::clone(&self.active);
        let retry = self.retry.clone();

        tokio::spawn(async move {
            'live: loop {
                while let Some(delta) = deltas.recv().await {
                    let applied = {
                        let mut view = view.lock().await;
                        // Re-check under the lock: a teardown may have won
                        // the race since this delta was received.
                        if current_epoch.load(Ordering::SeqCst) != epoch {
                            warn!(%collection, "stale feed delivered a delta after rebind; stopping pump");
                            break 'live;
                        }
                        view.collection.apply(delta);
                        match view.collection.verify() {
                            Ok(()) => Some(view.collection.len()),
                            Err(e) => {
                                // Fatal to this reconciler instance: reset
                                // to empty and re-backfill rather than
                                // continue silently.
                                error!(%collection, error = %e, "invariant violation; resetting collection");
                                view.collection.clear();
                                None
                            }
                        }
                    };

                    // The re-backfill runs without the view lock held; the
                    // reset collection is repopulated under a fresh lock.
                    let len = match applied {
                        Some(len) => len,
                        None => match feed.backfill(&collection).await {
                            Ok(records) => {
                                let mut view = view.lock().await;
                                if current_epoch.load(Ordering::SeqCst) != epoch {
                                    break 'live;
                                }
                                view.collection
                                    .apply_batch(records.into_iter().map(Delta::Added));
                                view.collection.len()
                            }
                            Err(e) => {
                                warn!(%collection, error = %e, "re-backfill after reset failed");
                                events.publish(ViewEvent::StateChanged {
                                    collection: collection.clone(),
                                    state: DisplayState::NotFound,
                                });
                                break 'live;
                            }
                        },
                    };

                    events.publish(ViewEvent::CollectionUpdated {
                        collection: collection.clone(),
                        len,
                    });
                }

                // Channel closed. A deliberate teardown bumps the epoch
                // before unsubscribing; anything else is a live disconnect.
                if current_epoch.load(Ordering::SeqCst) != epoch {
                    break;
                }
                warn!(%collection, "live feed disconnected; reconnecting");
                events.publish(ViewEvent::StateChanged {
                    collection: collection.clone(),
                    state: DisplayState::Reconnecting,
                });
                match reconnect(&feed, &view, &events, &collection, &retry, epoch, &current_epoch)
                    .await
                {
                    Some(subscription) => {
                        if let Some(active) = active.lock().await.as_mut() {
                            active.feed_handle = subscription.handle;
                        }
                        deltas = subscription.deltas;
                    }
                    None => break,
                }
            }
        });
    }

    /// Pump full-replace membership sets into the view.
    fn spawn_membership_pump(
        &self,
        collection: CollectionRef,
        mut sets: mpsc::Receiver<HashSet<RecordKey>>,
        epoch: u64,
    ) {
        let view = Arc::clone(&self.view);
        let current_epoch = Arc::clone(&self.epoch);
        let events = Arc::clone(&self.events);

        tokio::spawn(async move {
            while let Some(set) = sets.recv().await {
                let mut view = view.lock().await;
                // Same check-under-lock discipline as the delta pump.
                if current_epoch.load(Ordering::SeqCst) != epoch {
                    warn!(%collection, "stale membership snapshot after rebind; stopping pump");
                    break;
                }
                view.membership = set;
                let len = view.collection.len();
                drop(view);
                events.publish(ViewEvent::CollectionUpdated {
                    collection: collection.clone(),
                    len,
                });
            }
        });
    }

    fn emit(&self, collection: &CollectionRef, state: DisplayState) {
        self.events.publish(ViewEvent::StateChanged {
            collection: collection.clone(),
            state,
        });
    }
}

/// Re-open a live subscription after a disconnect, then re-backfill to
/// cover whatever was missed while it was down. The view keeps its
/// last-known-good contents until the fresh backfill lands.
///
/// Returns `None` when the epoch moved on mid-reconnect or the feed failed
/// terminally (surfaced as `NotFound`).
async fn reconnect(
    feed: &Arc<dyn FeedSource>,
    view: &Arc<Mutex<LiveView>>,
    events: &Arc<EventBus>,
    collection: &CollectionRef,
    retry: &RetryPolicy,
    epoch: u64,
    current_epoch: &Arc<AtomicU64>,
) -> Option<parley_core::Subscription> {
    let mut attempt = 0;
    let subscription = loop {
        if current_epoch.load(Ordering::SeqCst) != epoch {
            return None;
        }
        match feed.subscribe(collection).await {
            Ok(sub) => break sub,
            Err(e) if e.is_transient() && attempt + 1 < retry.attempts => {
                attempt += 1;
                warn!(%collection, error = %e, attempt, "resubscribe failed; retrying");
                tokio::time::sleep(retry.backoff).await;
            }
            Err(e) => {
                warn!(%collection, error = %e, "resubscribe failed terminally");
                events.publish(ViewEvent::StateChanged {
                    collection: collection.clone(),
                    state: DisplayState::NotFound,
                });
                return None;
            }
        }
    };

    let mut attempt = 0;
    let records = loop {
        if current_epoch.load(Ordering::SeqCst) != epoch {
            return None;
        }
        match feed.backfill(collection).await {
            Ok(records) => break records,
            Err(e) if e.is_transient() && attempt + 1 < retry.attempts => {
                attempt += 1;
                warn!(%collection, error = %e, attempt, "backfill after reconnect failed; retrying");
                tokio::time::sleep(retry.backoff).await;
            }
            Err(e) => {
                warn!(%collection, error = %e, "backfill after reconnect failed terminally");
                events.publish(ViewEvent::StateChanged {
                    collection: collection.clone(),
                    state: DisplayState::NotFound,
                });
                return None;
            }
        }
    };

    let len = {
        let mut view = view.lock().await;
        if current_epoch.load(Ordering::SeqCst) != epoch {
            return None;
        }
        view.collection.clear();
        view.collection
            .apply_batch(records.into_iter().map(Delta::Added));
        view.collection.len()
    };
    info!(%collection, records = len, "feed reconnected");
    events.publish(ViewEvent::StateChanged {
        collection: collection.clone(),
        state: if len == 0 {
            DisplayState::Empty
        } else {
            DisplayState::Ready
        },
    });
    Some(subscription)
}
