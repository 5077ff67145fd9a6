//! The ordered reconciler.
//!
//! [`OrderedCollection`] maintains the authoritative local ordered view of
//! one remote collection from a stream of keyed deltas. It is the single
//! engine behind the three places the client needs this (chat history,
//! pinned-message list, chatroom roster).

use std::collections::HashMap;

use parley_core::{Delta, Record, RecordKey, ViewError};
use tracing::{debug, warn};

/// What applying one delta did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// New key appended to the end of the order list
    Inserted,
    /// Existing key's record replaced in place
    Updated,
    /// Key removed from order list and map
    Removed,
    /// No-op: unknown key on modify/remove, or malformed payload dropped
    Ignored,
}

/// The reconciled, duplicate-free, key-indexed, order-preserving local
/// representation of a remote collection.
///
/// Invariant: every key in the order list has exactly one entry in the
/// record map and the position index, and vice versa. [`verify`] checks
/// this; a divergence is fatal to the instance (the owner resets and
/// re-backfills rather than continuing silently).
///
/// New keys are appended: the feed delivers inserts in ordering-key order,
/// so observed order is display order and no per-delta re-sort happens.
///
/// [`verify`]: OrderedCollection::verify
#[derive(Debug, Default)]
pub struct OrderedCollection {
    /// Keys in display order
    order: Vec<RecordKey>,

    /// Key → record payload
    records: HashMap<RecordKey, Record>,

    /// Key → position in `order`; kept so position lookups never scan
    index: HashMap<RecordKey, usize>,

    /// Payload fields a record must carry to be accepted
    required_fields: Vec<String>,
}

impl OrderedCollection {
    /// Create an empty collection accepting any payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection that drops records missing any of the
    /// given payload fields.
    pub fn with_required_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Apply one delta.
    ///
    /// - `Added` for a present key is treated as `Modified` (the feed may
    ///   redeliver); otherwise the key is appended to the end of the order.
    /// - `Modified` for an absent key is ignored (late modify after remove).
    /// - `Removed` for an absent key is a no-op; applying it twice is
    ///   idempotent.
    ///
    /// Malformed records (missing a required field) are dropped with a
    /// warning and never leave the collection partially updated.
    pub fn apply(&mut self, delta: Delta) -> Applied {
        match delta {
            Delta::Added(record) => {
                if !self.payload_ok(&record) {
                    return Applied::Ignored;
                }
                if self.index.contains_key(&record.key) {
                    // Redelivery: same semantics as Modified, position kept.
                    self.records.insert(record.key.clone(), record);
                    Applied::Updated
                } else {
                    self.index.insert(record.key.clone(), self.order.len());
                    self.order.push(record.key.clone());
                    self.records.insert(record.key.clone(), record);
                    Applied::Inserted
                }
            }
            Delta::Modified(record) => {
                if !self.payload_ok(&record) {
                    return Applied::Ignored;
                }
                if self.index.contains_key(&record.key) {
                    self.records.insert(record.key.clone(), record);
                    Applied::Updated
                } else {
                    debug!(key = %record.key, "modify for unknown key ignored");
                    Applied::Ignored
                }
            }
            Delta::Removed(key) => match self.index.remove(&key) {
                Some(pos) => {
                    self.order.remove(pos);
                    self.records.remove(&key);
                    // Positions after the removed key all shift left by one.
                    for k in &self.order[pos..] {
                        if let Some(i) = self.index.get_mut(k) {
                            *i -= 1;
                        }
                    }
                    Applied::Removed
                }
                None => {
                    debug!(key = %key, "remove for unknown key ignored");
                    Applied::Ignored
                }
            },
        }
    }

    /// Apply a batch of deltas (e.g. a backfill expressed as `Added`s).
    pub fn apply_batch(&mut self, deltas: impl IntoIterator<Item = Delta>) {
        for delta in deltas {
            self.apply(delta);
        }
    }

    fn payload_ok(&self, record: &Record) -> bool {
        for field in &self.required_fields {
            if !record.fields.contains_key(field) {
                warn!(
                    key = %record.key,
                    missing = %field,
                    "dropping record with malformed payload"
                );
                return false;
            }
        }
        true
    }

    /// Number of reconciled records.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up a record by key.
    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.records.get(key)
    }

    /// Display position of a key, via the position index.
    pub fn position(&self, key: &RecordKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Key at a display position.
    pub fn key_at(&self, pos: usize) -> Option<&RecordKey> {
        self.order.get(pos)
    }

    /// Keys in display order.
    pub fn keys(&self) -> &[RecordKey] {
        &self.order
    }

    /// Records in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().filter_map(|k| self.records.get(k))
    }

    /// Cloned records in display order (copy-on-read snapshot).
    pub fn snapshot(&self) -> Vec<Record> {
        self.iter().cloned().collect()
    }

    /// Discard all records, keeping the required-field configuration.
    pub fn clear(&mut self) {
        self.order.clear();
        self.records.clear();
        self.index.clear();
    }

    /// Check the order-list/map/index invariant.
    ///
    /// An `Err` here means a programming bug, not bad remote data; the
    /// instance must not be used further without a reset.
    pub fn verify(&self) -> Result<(), ViewError> {
        if self.order.len() != self.records.len() {
            return Err(ViewError::Divergence {
                order_len: self.order.len(),
                map_len: self.records.len(),
            });
        }
        for (pos, key) in self.order.iter().enumerate() {
            if !self.records.contains_key(key) {
                return Err(ViewError::Divergence {
                    order_len: self.order.len(),
                    map_len: self.records.len(),
                });
            }
            match self.index.get(key) {
                Some(&i) if i == pos => {}
                Some(_) => return Err(ViewError::DuplicateKey(key.to_string())),
                None => return Err(ViewError::UnindexedKey(key.to_string())),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Delta;

    fn msg(key: &str, text: &str) -> Record {
        Record::message(key, "u1", text)
    }

    #[test]
    fn added_appends_in_arrival_order() {
        let mut c = OrderedCollection::new();
        assert_eq!(c.apply(Delta::Added(msg("a", "1"))), Applied::Inserted);
        assert_eq!(c.apply(Delta::Added(msg("b", "2"))), Applied::Inserted);
        assert_eq!(c.apply(Delta::Added(msg("c", "3"))), Applied::Inserted);

        let keys: Vec<_> = c.keys().iter().map(|k| k.as_str().to_string()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        c.verify().unwrap();
    }

    #[test]
    fn redelivered_added_is_treated_as_modified() {
        let mut c = OrderedCollection::new();
        c.apply(Delta::Added(msg("a", "old")));
        c.apply(Delta::Added(msg("b", "2")));

        assert_eq!(c.apply(Delta::Added(msg("a", "new"))), Applied::Updated);
        assert_eq!(c.len(), 2);
        assert_eq!(c.position(&"a".into()), Some(0));
        assert_eq!(c.get(&"a".into()).unwrap().text(), Some("new"));
        c.verify().unwrap();
    }

    #[test]
    fn modified_keeps_position() {
        let mut c = OrderedCollection::new();
        c.apply(Delta::Added(msg("a", "1")));
        c.apply(Delta::Added(msg("b", "2")));

        assert_eq!(c.apply(Delta::Modified(msg("a", "edited"))), Applied::Updated);
        assert_eq!(c.position(&"a".into()), Some(0));
        assert_eq!(c.get(&"a".into()).unwrap().text(), Some("edited"));
    }

    #[test]
    fn modified_for_absent_key_is_noop() {
        let mut c = OrderedCollection::new();
        c.apply(Delta::Added(msg("a", "1")));

        assert_eq!(c.apply(Delta::Modified(msg("ghost", "x"))), Applied::Ignored);
        assert_eq!(c.len(), 1);
        c.verify().unwrap();
    }

    #[test]
    fn removed_shifts_later_positions() {
        let mut c = OrderedCollection::new();
        c.apply(Delta::Added(msg("a", "1")));
        c.apply(Delta::Added(msg("b", "2")));
        c.apply(Delta::Added(msg("c", "3")));

        assert_eq!(c.apply(Delta::Removed("b".into())), Applied::Removed);
        assert_eq!(c.position(&"a".into()), Some(0));
        assert_eq!(c.position(&"c".into()), Some(1));
        assert_eq!(c.get(&"b".into()), None);
        c.verify().unwrap();
    }

    #[test]
    fn removed_twice_is_idempotent() {
        let mut c = OrderedCollection::new();
        c.apply(Delta::Added(msg("a", "1")));
        assert_eq!(c.apply(Delta::Removed("a".into())), Applied::Removed);
        assert_eq!(c.apply(Delta::Removed("a".into())), Applied::Ignored);
        assert!(c.is_empty());
        c.verify().unwrap();
    }

    #[test]
    fn malformed_record_is_dropped_whole() {
        let mut c = OrderedCollection::with_required_fields(["sender_id", "text"]);
        let bad = Record::new("bad").with_field("sender_id", "u1"); // no text
        assert_eq!(c.apply(Delta::Added(bad)), Applied::Ignored);
        assert!(c.is_empty());

        c.apply(Delta::Added(msg("a", "1")));
        let bad_edit = Record::new("a").with_field("text", "x"); // no sender_id
        assert_eq!(c.apply(Delta::Modified(bad_edit)), Applied::Ignored);
        assert_eq!(c.get(&"a".into()).unwrap().text(), Some("1"));
        c.verify().unwrap();
    }

    #[test]
    fn end_to_end_delta_scenario() {
        let mut c = OrderedCollection::with_required_fields(["text"]);
        c.apply(Delta::Added(msg("m1", "hello")));
        c.apply(Delta::Added(msg("m2", "fuck")));
        c.apply(Delta::Modified(msg("m1", "hi")));
        c.apply(Delta::Removed("m2".into()));

        assert_eq!(c.len(), 1);
        assert_eq!(c.key_at(0).unwrap().as_str(), "m1");
        assert_eq!(c.get(&"m1".into()).unwrap().text(), Some("hi"));
        c.verify().unwrap();
    }

    // Exhaustive-ish sequence check: interleaved adds/removes/redeliveries
    // never leave duplicates or divergence.
    #[test]
    fn invariant_holds_across_mixed_sequences() {
        let mut c = OrderedCollection::new();
        let keys = ["a", "b", "c", "d", "e"];
        for round in 0..4 {
            for (i, k) in keys.iter().enumerate() {
                c.apply(Delta::Added(msg(k, "v")));
                if (i + round) % 2 == 0 {
                    c.apply(Delta::Removed((*k).into()));
                }
                if (i + round) % 3 == 0 {
                    c.apply(Delta::Modified(msg(k, "w")));
                }
                c.verify().unwrap();
            }
        }
        // No duplicates regardless of redelivery.
        for k in keys {
            c.apply(Delta::Added(msg(k, "again")));
        }
        assert_eq!(c.len(), keys.len());
        c.verify().unwrap();
    }
}
