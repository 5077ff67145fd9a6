//! Non-destructive display overlays.
//!
//! The filter overlay derives a searched subsequence of the projected
//! lines without touching the base collection; the membership overlay
//! toggles a trailing marker glyph (e.g. '•' for pinned) idempotently.

use std::collections::HashSet;

use parley_core::{Record, RecordKey};

/// A filtered, order-preserving view: the surviving lines and the keys
/// that still back them, kept aligned so selection resolves to the right
/// record even while a search is active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilteredView {
    pub keys: Vec<RecordKey>,
    pub lines: Vec<String>,
}

impl FilteredView {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Filter formatted lines by a substring query.
///
/// A blank query means "no filter": the full base view comes back, not an
/// empty result. `keys` and `lines` must be parallel; pairs are kept or
/// dropped together.
pub fn search_lines(keys: &[RecordKey], lines: &[String], query: &str) -> FilteredView {
    if query.trim().is_empty() {
        return FilteredView {
            keys: keys.to_vec(),
            lines: lines.to_vec(),
        };
    }

    let (keys, lines) = keys
        .iter()
        .zip(lines.iter())
        .filter(|(_, line)| line.contains(query))
        .map(|(k, l)| (k.clone(), l.clone()))
        .unzip();

    FilteredView { keys, lines }
}

/// Filter records by an arbitrary predicate, order-preserving and
/// non-mutating.
pub fn filter_records<'a, P>(records: &'a [Record], predicate: P) -> Vec<&'a Record>
where
    P: Fn(&Record) -> bool,
{
    records.iter().filter(|r| predicate(r)).collect()
}

/// Toggle a trailing membership marker on each line.
///
/// Appends `glyph` once if the line's key is in `membership` and the glyph
/// is not already trailing; strips exactly one trailing glyph if the key
/// is absent. Idempotent: applying twice with the same set equals applying
/// once. Empty lines are skipped before the trailing-character inspection.
///
/// `keys` and `lines` are parallel; extra lines beyond `keys` (there should
/// be none — filler is added after marking) are left untouched.
pub fn mark_membership(
    lines: &mut [String],
    keys: &[RecordKey],
    membership: &HashSet<RecordKey>,
    glyph: char,
) {
    for (key, line) in keys.iter().zip(lines.iter_mut()) {
        if line.is_empty() {
            continue;
        }

        let is_member = membership.contains(key);
        let trailing = line.chars().next_back();

        if is_member {
            if trailing == Some(glyph) {
                continue;
            }
            line.push(glyph);
        } else if trailing == Some(glyph) {
            line.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIN: char = '\u{2022}'; // '•'

    fn keys(names: &[&str]) -> Vec<RecordKey> {
        names.iter().map(|n| RecordKey::from(*n)).collect()
    }

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn blank_query_returns_full_base() {
        let k = keys(&["a", "b"]);
        let l = lines(&["alice: hi", "bob: yo"]);
        for q in ["", "   ", "\t"] {
            let v = search_lines(&k, &l, q);
            assert_eq!(v.keys, k);
            assert_eq!(v.lines, l);
        }
    }

    #[test]
    fn search_preserves_order_and_alignment() {
        let k = keys(&["a", "b", "c"]);
        let l = lines(&["alice: hello", "bob: bye", "alice: hello again"]);
        let v = search_lines(&k, &l, "hello");
        assert_eq!(v.keys, keys(&["a", "c"]));
        assert_eq!(v.lines, lines(&["alice: hello", "alice: hello again"]));
    }

    #[test]
    fn search_with_no_matches_is_empty_not_full() {
        let v = search_lines(&keys(&["a"]), &lines(&["hi"]), "zzz");
        assert!(v.is_empty());
    }

    #[test]
    fn filter_records_by_predicate() {
        let records = vec![
            Record::message("a", "u1", "x"),
            Record::message("b", "u2", "y"),
            Record::message("c", "u1", "z"),
        ];
        let mine = filter_records(&records, |r| r.sender_id() == Some("u1"));
        let got: Vec<_> = mine.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(got, ["a", "c"]);
    }

    #[test]
    fn marks_members_and_strips_former_members() {
        let k = keys(&["a", "b"]);
        let mut l = lines(&["alice: hi", "bob: yo•"]);
        let membership: HashSet<RecordKey> = [RecordKey::from("a")].into();

        mark_membership(&mut l, &k, &membership, PIN);
        assert_eq!(l, lines(&["alice: hi•", "bob: yo"]));
    }

    #[test]
    fn marking_is_idempotent() {
        let k = keys(&["a", "b", "c"]);
        let mut l = lines(&["one", "two", "three•"]);
        let membership: HashSet<RecordKey> =
            [RecordKey::from("a"), RecordKey::from("c")].into();

        mark_membership(&mut l, &k, &membership, PIN);
        let once = l.clone();
        mark_membership(&mut l, &k, &membership, PIN);
        assert_eq!(l, once);
        assert_eq!(l, lines(&["one•", "two", "three•"]));
    }

    #[test]
    fn empty_lines_are_skipped() {
        let k = keys(&["a"]);
        let mut l = lines(&[""]);
        let membership: HashSet<RecordKey> = [RecordKey::from("a")].into();
        mark_membership(&mut l, &k, &membership, PIN);
        assert_eq!(l, lines(&[""]));
    }

    #[test]
    fn strips_exactly_one_trailing_glyph() {
        let k = keys(&["a"]);
        let mut l = lines(&["hi••"]);
        mark_membership(&mut l, &k, &HashSet::new(), PIN);
        assert_eq!(l, lines(&["hi•"]));
    }
}
