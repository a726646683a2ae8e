//! Content-based footprint estimation.
//!
//! Footprints are estimated from text shape, never measured from rendered
//! output, so layout results do not depend on the paint backend.

use crate::config::FootprintMetrics;
use crate::model::entry::Entry;
use crate::model::geometry::{union_bounds, Bounds, Size};

/// Estimated width/height of `entry`.
///
/// Media entries use the fixed media box. Text entries are as wide as their
/// longest line (plus padding) and as tall as their line count, with a
/// minimum of one line.
pub fn estimate_footprint(entry: &Entry, metrics: &FootprintMetrics) -> Size {
    if entry.media.is_some() {
        return Size::new(metrics.media_width, metrics.media_height);
    }

    let mut line_count = 0usize;
    let mut widest = 0usize;
    for line in entry.lines() {
        line_count += 1;
        widest = widest.max(line.chars().count());
    }
    let line_count = line_count.max(1);
    Size::new(
        widest as f64 * metrics.char_width + metrics.text_padding * 2.0,
        line_count as f64 * metrics.line_height,
    )
}

/// Region covering the footprints of every entry, `None` when empty.
pub fn region_of<'a, I>(entries: I, metrics: &FootprintMetrics) -> Option<Bounds>
where
    I: IntoIterator<Item = &'a Entry>,
{
    union_bounds(
        entries
            .into_iter()
            .map(|entry| (entry.position, estimate_footprint(entry, metrics))),
    )
}
