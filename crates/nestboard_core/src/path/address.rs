//! Human-readable address paths: `/<owner>/<slug_1>/<slug_2>/...`.
//!
//! Query strings and fragments are ignored when parsing. Empty segments
//! (double slashes, trailing slash) are dropped.

use crate::model::entry::EntryId;
use crate::path::slug::path_of;
use crate::store::entry_store::EntryStore;

/// Parsed address path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub owner: String,
    pub segments: Vec<String>,
}

/// Formats an address from an owner handle and slug segments.
pub fn format_address<S: AsRef<str>>(owner: &str, segments: &[S]) -> String {
    let mut path = format!("/{}", owner.trim().trim_matches('/'));
    for segment in segments {
        path.push('/');
        path.push_str(segment.as_ref());
    }
    path
}

/// Address of the view whose children are visible under `view_id`.
pub fn address_for_view(owner: &str, store: &EntryStore, view_id: Option<EntryId>) -> String {
    match view_id {
        Some(id) => format_address(owner, &path_of(store, id)),
        None => format_address::<&str>(owner, &[]),
    }
}

/// Splits an address into owner and segments.
///
/// Returns `None` when no owner segment is present.
pub fn parse_address(path: &str) -> Option<Address> {
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let mut parts = path
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty());
    let owner = parts.next()?.to_string();
    Some(Address {
        owner,
        segments: parts.map(str::to_string).collect(),
    })
}
