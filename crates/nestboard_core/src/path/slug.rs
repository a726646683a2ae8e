//! Slug derivation and path resolution.
//!
//! # Responsibility
//! - Derive a short, human-readable path segment for each entry.
//! - Map entry chains to slug paths and slug paths back to entries.
//!
//! # Invariants
//! - `slug_of` is a pure function of entry content; nothing is cached.
//! - Slugs contain at most `MAX_SLUG_CHARS` characters from `[a-z0-9-]`
//!   plus lowercase non-ASCII alphanumerics.
//! - Resolution picks the first sibling in insertion order on slug collision.

use crate::model::entry::{Entry, EntryId, MediaCard};
use crate::store::entry_store::EntryStore;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum visible characters in one slug.
pub const MAX_SLUG_CHARS: usize = 17;
/// Slug for entries with no usable text.
pub const FALLBACK_ENTRY_SLUG: &str = "entry";
/// Slug for song/movie entries without a usable title.
pub const FALLBACK_MEDIA_SLUG: &str = "media";
/// Slug for entries whose text is only URLs.
pub const FALLBACK_LINK_SLUG: &str = "link";

const IMAGE_SLUG_PREFIX: &str = "image-";
const IMAGE_ID_SUFFIX_CHARS: usize = 6;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)[^\s]+").expect("valid url regex")
});

/// Derives the path segment for one entry.
///
/// Priority: image marker, media title, text with URLs stripped, then a
/// fixed fallback token.
pub fn slug_of(entry: &Entry) -> String {
    match &entry.media {
        Some(MediaCard::Image { .. }) => image_slug(entry.id),
        Some(media) => {
            let slug = media.title().map(slugify).unwrap_or_default();
            if slug.is_empty() {
                FALLBACK_MEDIA_SLUG.to_string()
            } else {
                slug
            }
        }
        None => {
            let stripped = URL_RE.replace_all(&entry.text, " ");
            let slug = slugify(&stripped);
            if !slug.is_empty() {
                slug
            } else if !entry.link_cards.is_empty() || URL_RE.is_match(&entry.text) {
                FALLBACK_LINK_SLUG.to_string()
            } else {
                FALLBACK_ENTRY_SLUG.to_string()
            }
        }
    }
}

/// Slug chain from the root-level ancestor down to `id`.
///
/// Returns an empty list for unknown ids.
pub fn path_of(store: &EntryStore, id: EntryId) -> Vec<String> {
    store.lineage(id).into_iter().map(slug_of).collect()
}

/// Walks the tree from the anchor following `segments`.
///
/// Returns `None` on the first segment that matches no child. An empty
/// segment list also returns `None`: the anchor is not an entry.
pub fn resolve_path<'a, S: AsRef<str>>(store: &'a EntryStore, segments: &[S]) -> Option<&'a Entry> {
    let resolution = resolve_deepest(store, segments);
    if resolution.is_complete() {
        resolution.entry
    } else {
        None
    }
}

/// Outcome of a best-effort path walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathResolution<'a> {
    /// Deepest entry reached, `None` when not even the first segment matched.
    pub entry: Option<&'a Entry>,
    /// Number of segments that matched.
    pub matched: usize,
    /// Total segments requested.
    pub requested: usize,
}

impl PathResolution<'_> {
    pub fn is_complete(&self) -> bool {
        self.matched == self.requested
    }
}

/// Walks as far as the segments resolve and reports where it stopped.
pub fn resolve_deepest<'a, S: AsRef<str>>(
    store: &'a EntryStore,
    segments: &[S],
) -> PathResolution<'a> {
    let mut current: Option<&Entry> = None;
    let mut matched = 0;
    for segment in segments {
        let parent_id = current.map(|entry| entry.id);
        let wanted = segment.as_ref();
        let next = store
            .children_of(parent_id)
            .into_iter()
            .find(|child| slug_of(child) == wanted);
        match next {
            Some(child) => {
                current = Some(child);
                matched += 1;
            }
            None => break,
        }
    }
    PathResolution {
        entry: current,
        matched,
        requested: segments.len(),
    }
}

/// Lowercases and collapses non-alphanumeric runs into single dashes.
fn slugify(source: &str) -> String {
    let mut slug = String::new();
    let mut count = 0;
    let mut pending_dash = false;
    for ch in source.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_dash && count > 0 {
                if count + 1 >= MAX_SLUG_CHARS {
                    break;
                }
                slug.push('-');
                count += 1;
            }
            pending_dash = false;
            slug.push(ch);
            count += 1;
            if count >= MAX_SLUG_CHARS {
                break;
            }
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn image_slug(id: EntryId) -> String {
    let simple = id.simple().to_string();
    let suffix_start = simple.len().saturating_sub(IMAGE_ID_SUFFIX_CHARS);
    format!("{IMAGE_SLUG_PREFIX}{}", &simple[suffix_start..])
}
