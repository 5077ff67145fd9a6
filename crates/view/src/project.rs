//! The display projector.
//!
//! Turns an ordered record sequence into a fixed-height sequence of display
//! lines: formats every record, then prepends filler lines so the viewport
//! is always fully populated. Filler is a display-fit concern only — index
//! math resolving a selection back to a record must go through
//! [`Projection::resolve`], which subtracts the filler count.

use parley_core::Record;

/// Placeholder glyph for viewport filler lines.
pub const FILLER_GLYPH: &str = ".";

/// Formats one record into one display line.
///
/// Supplied by the UI layer: sender-name resolution and censorship happen
/// behind this seam, not in the projector.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &Record) -> String;
}

impl<F> Formatter for F
where
    F: Fn(&Record) -> String + Send + Sync,
{
    fn format(&self, record: &Record) -> String {
        self(record)
    }
}

/// A projected, padded view of an ordered record sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    lines: Vec<String>,
    filler: usize,
}

impl Projection {
    /// Pad formatted lines to the viewport height.
    ///
    /// A height of 0 or negative yields no filler; no truncation ever
    /// happens here (scrolling is the renderer's job).
    pub fn new(lines: Vec<String>, viewport_height: i32) -> Self {
        Self::with_filler_glyph(lines, viewport_height, FILLER_GLYPH)
    }

    /// Like [`Projection::new`] with a custom filler glyph.
    pub fn with_filler_glyph(lines: Vec<String>, viewport_height: i32, glyph: &str) -> Self {
        let height = viewport_height.max(0) as usize;
        let filler = height.saturating_sub(lines.len());

        let mut padded = Vec::with_capacity(filler + lines.len());
        padded.extend(std::iter::repeat_n(glyph.to_string(), filler));
        padded.extend(lines);

        Self {
            lines: padded,
            filler,
        }
    }

    /// All display lines, filler first.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Number of leading filler lines.
    pub fn filler(&self) -> usize {
        self.filler
    }

    /// Total display lines (`max(height, record count)`).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Number of real (non-filler) records behind this projection.
    pub fn record_count(&self) -> usize {
        self.lines.len() - self.filler
    }

    /// Display index of the most recent entry, for the renderer's
    /// scroll-to-end hint.
    pub fn last_index(&self) -> Option<usize> {
        self.lines.len().checked_sub(1)
    }

    /// Map a selected display index back to a record index.
    ///
    /// Returns `None` for filler lines and out-of-range indices; callers
    /// never index a record list with an unchecked subtraction.
    pub fn resolve(&self, display_index: usize) -> Option<usize> {
        if display_index < self.filler || display_index >= self.lines.len() {
            return None;
        }
        Some(display_index - self.filler)
    }
}

/// Project an ordered record sequence through a formatter into a padded,
/// fixed-height line sequence.
pub fn project(records: &[Record], formatter: &dyn Formatter, viewport_height: i32) -> Projection {
    let lines = records.iter().map(|r| formatter.format(r)).collect();
    Projection::new(lines, viewport_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(record: &Record) -> String {
        record.text().unwrap_or_default().to_string()
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::message(format!("m{i}").as_str(), "u1", format!("msg {i}")))
            .collect()
    }

    #[test]
    fn pads_short_collections_with_leading_filler() {
        let p = project(&records(3), &plain, 10);
        assert_eq!(p.line_count(), 10);
        assert_eq!(p.filler(), 7);
        assert_eq!(p.lines()[..7], vec![FILLER_GLYPH.to_string(); 7][..]);
        assert_eq!(p.lines()[7], "msg 0");
        assert_eq!(p.record_count(), 3);
    }

    #[test]
    fn does_not_truncate_tall_collections() {
        let p = project(&records(12), &plain, 5);
        assert_eq!(p.line_count(), 12);
        assert_eq!(p.filler(), 0);
        assert_eq!(p.last_index(), Some(11));
    }

    #[test]
    fn line_count_is_max_of_height_and_records() {
        for (n, h) in [(0, 0), (0, 4), (3, 3), (5, 2), (2, 5)] {
            let p = project(&records(n), &plain, h);
            assert_eq!(p.line_count(), (h as usize).max(n));
        }
    }

    #[test]
    fn zero_or_negative_height_does_not_underflow() {
        let p = project(&records(2), &plain, 0);
        assert_eq!(p.filler(), 0);
        assert_eq!(p.line_count(), 2);

        let p = project(&records(2), &plain, -7);
        assert_eq!(p.filler(), 0);
        assert_eq!(p.line_count(), 2);

        let p = project(&[], &plain, -1);
        assert_eq!(p.line_count(), 0);
        assert_eq!(p.last_index(), None);
    }

    #[test]
    fn resolve_rejects_filler_and_out_of_range() {
        let p = project(&records(2), &plain, 5);
        assert_eq!(p.filler(), 3);
        assert_eq!(p.resolve(0), None);
        assert_eq!(p.resolve(2), None);
        assert_eq!(p.resolve(3), Some(0));
        assert_eq!(p.resolve(4), Some(1));
        assert_eq!(p.resolve(5), None);
    }

    #[test]
    fn custom_filler_glyph() {
        let p = Projection::with_filler_glyph(vec!["x".into()], 3, "~");
        assert_eq!(p.lines(), ["~", "~", "x"]);
    }
}
