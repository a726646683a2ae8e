//! In-memory entry tree for the loaded workspace.
//!
//! # Responsibility
//! - Own every entry of the workspace and the parent -> children index.
//! - Enforce sibling text uniqueness and the forest invariant.
//! - Provide cascade delete/restore primitives used by undo.
//!
//! # Invariants
//! - Following `parent_id` from any entry reaches `None` in at most `len()` steps.
//! - Within one parent, no two entries share non-empty normalized text.
//! - Ids removed by `delete` are never handed out again by `create`.
//! - Descendant walks use an explicit worklist, never recursion.

use crate::model::entry::{
    normalize_text, Entry, EntryId, EntryPatch, EntryValidationError, NewEntry,
};
use crate::model::geometry::Point;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by entry store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from entry store operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A sibling with the same normalized text already exists.
    DuplicateSibling { existing: EntryId },
    /// Referenced parent does not exist.
    ParentNotFound(EntryId),
    /// Reparenting would make an entry its own ancestor.
    CycleDetected {
        entry_id: EntryId,
        parent_id: EntryId,
    },
    /// Restore target id is already present.
    EntryExists(EntryId),
    /// Entry record failed validation.
    Invalid(EntryValidationError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateSibling { existing } => {
                write!(f, "duplicate sibling text, existing entry: {existing}")
            }
            Self::ParentNotFound(id) => write!(f, "parent entry not found: {id}"),
            Self::CycleDetected {
                entry_id,
                parent_id,
            } => write!(
                f,
                "reparent would create cycle: entry {entry_id} under parent {parent_id}"
            ),
            Self::EntryExists(id) => write!(f, "entry already exists: {id}"),
            Self::Invalid(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EntryValidationError> for StoreError {
    fn from(value: EntryValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// How `delete` treats the children of the removed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Remove the entry and every descendant.
    Cascade,
    /// Remove the entry only; direct children move up to its parent.
    Dissolve,
}

/// Summary of a bulk `load`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Entries re-attached to root because their parent was missing or cyclic.
    pub rerooted: Vec<EntryId>,
    /// Entries dropped because they failed validation or repeated an id.
    pub rejected: usize,
}

/// Arena of entries keyed by id plus an insertion-ordered child index.
#[derive(Debug, Default, Clone)]
pub struct EntryStore {
    entries: HashMap<EntryId, Entry>,
    children: HashMap<Option<EntryId>, Vec<EntryId>>,
    retired: HashSet<EntryId>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Iterates entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Replaces the store content with persisted entries.
    ///
    /// Entries referencing a missing parent, or caught in a parent cycle, are
    /// re-rooted so the forest invariant holds afterwards.
    pub fn load(&mut self, entries: Vec<Entry>) -> LoadReport {
        self.entries.clear();
        self.children.clear();
        self.retired.clear();

        let mut report = LoadReport::default();
        let mut order = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.validate().is_err() || self.entries.contains_key(&entry.id) {
                report.rejected += 1;
                continue;
            }
            order.push(entry.id);
            self.entries.insert(entry.id, entry);
        }

        for id in &order {
            let parent_id = self.entries.get(id).and_then(|entry| entry.parent_id);
            if let Some(parent_id) = parent_id {
                if !self.entries.contains_key(&parent_id) {
                    self.set_parent_field(*id, None);
                    report.rerooted.push(*id);
                }
            }
        }

        for id in &order {
            if self.parent_chain_is_cyclic(*id) {
                self.set_parent_field(*id, None);
                report.rerooted.push(*id);
            }
        }

        for id in &order {
            let parent_id = self.entries.get(id).and_then(|entry| entry.parent_id);
            self.children.entry(parent_id).or_default().push(*id);
        }

        report.loaded = self.entries.len();
        if !report.rerooted.is_empty() || report.rejected > 0 {
            warn!(
                "event=store_load module=store status=repaired loaded={} rerooted={} rejected={}",
                report.loaded,
                report.rerooted.len(),
                report.rejected
            );
        } else {
            debug!(
                "event=store_load module=store status=ok loaded={}",
                report.loaded
            );
        }
        report
    }

    /// Creates a text entry under `parent_id`.
    pub fn create(
        &mut self,
        text: impl Into<String>,
        position: Point,
        parent_id: Option<EntryId>,
    ) -> StoreResult<Entry> {
        self.create_entry(NewEntry::text(text, position, parent_id))
    }

    /// Creates an entry from full creation input and assigns a fresh id.
    ///
    /// # Errors
    /// - `ParentNotFound` when the parent id is unknown.
    /// - `DuplicateSibling` when a sibling already has the same normalized text.
    pub fn create_entry(&mut self, new: NewEntry) -> StoreResult<Entry> {
        if let Some(parent_id) = new.parent_id {
            if !self.entries.contains_key(&parent_id) {
                return Err(StoreError::ParentNotFound(parent_id));
            }
        }
        if let Some(existing) = self.find_duplicate(&new.text, new.parent_id, None) {
            return Err(StoreError::DuplicateSibling {
                existing: existing.id,
            });
        }

        let entry = Entry::from_new(self.fresh_id(), new);
        entry.validate()?;
        self.attach(entry.clone());
        Ok(entry)
    }

    /// Applies a partial change.
    ///
    /// Returns `Ok(None)` when `id` is unknown. Text changes are checked for
    /// sibling duplicates; parent changes are checked for cycles.
    pub fn update(&mut self, id: EntryId, patch: &EntryPatch) -> StoreResult<Option<Entry>> {
        let Some(current) = self.entries.get(&id) else {
            return Ok(None);
        };

        let mut next = current.clone();
        patch.apply_to(&mut next);
        next.validate()?;

        if let Some(Some(parent_id)) = patch.parent_id {
            if !self.entries.contains_key(&parent_id) {
                return Err(StoreError::ParentNotFound(parent_id));
            }
            if self.would_create_cycle(id, parent_id) {
                return Err(StoreError::CycleDetected {
                    entry_id: id,
                    parent_id,
                });
            }
        }

        let text_changed = normalize_text(&next.text) != normalize_text(&current.text);
        let parent_changed = next.parent_id != current.parent_id;
        if text_changed || parent_changed {
            if let Some(existing) = self.find_duplicate(&next.text, next.parent_id, Some(id)) {
                return Err(StoreError::DuplicateSibling {
                    existing: existing.id,
                });
            }
        }

        let old_parent = current.parent_id;
        if parent_changed {
            self.unlink_child(old_parent, id);
            self.children.entry(next.parent_id).or_default().push(id);
        }
        self.entries.insert(id, next.clone());
        Ok(Some(next))
    }

    /// Moves `id` under `new_parent`.
    pub fn reparent(
        &mut self,
        id: EntryId,
        new_parent: Option<EntryId>,
    ) -> StoreResult<Option<Entry>> {
        self.update(id, &EntryPatch::parent(new_parent))
    }

    /// Removes `id` and returns every removed entry.
    ///
    /// With `DeleteMode::Cascade` the result is in post-order (children before
    /// their parent), so the last element is `id` itself. Unknown ids return
    /// an empty list.
    ///
    /// # Errors
    /// - `DuplicateSibling` when `DeleteMode::Dissolve` would lift a child next
    ///   to a sibling with the same normalized text. Nothing is changed.
    pub fn delete(&mut self, id: EntryId, mode: DeleteMode) -> StoreResult<Vec<Entry>> {
        let Some(target) = self.entries.get(&id) else {
            return Ok(Vec::new());
        };

        Ok(match mode {
            DeleteMode::Cascade => {
                let order = self.post_order(id);
                let mut removed = Vec::with_capacity(order.len());
                for entry_id in order {
                    if let Some(entry) = self.detach(entry_id) {
                        removed.push(entry);
                    }
                }
                removed
            }
            DeleteMode::Dissolve => {
                let new_parent = target.parent_id;
                let lifted = self.child_ids(Some(id)).to_vec();
                for child_id in &lifted {
                    let Some(child) = self.entries.get(child_id) else {
                        continue;
                    };
                    let clash = self.find_duplicate(&child.text, new_parent, Some(id));
                    if let Some(existing) = clash {
                        return Err(StoreError::DuplicateSibling {
                            existing: existing.id,
                        });
                    }
                }
                for child_id in lifted {
                    self.unlink_child(Some(id), child_id);
                    self.set_parent_field(child_id, new_parent);
                    self.children.entry(new_parent).or_default().push(child_id);
                }
                self.detach(id).into_iter().collect()
            }
        })
    }

    /// Re-inserts entries previously removed by `delete`, keeping their ids.
    ///
    /// Entries are inserted in the given order, so parents must precede their
    /// children. Entries whose parent is still missing, that fail validation,
    /// or whose text now collides with a live sibling are skipped with a
    /// warning; descendants of a skipped entry are skipped with it.
    pub fn restore(&mut self, entries: Vec<Entry>) -> Vec<Entry> {
        let mut restored = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.entries.contains_key(&entry.id) {
                warn!(
                    "event=store_restore module=store status=skip reason=exists entry_id={}",
                    entry.id
                );
                continue;
            }
            if let Some(parent_id) = entry.parent_id {
                if !self.entries.contains_key(&parent_id) {
                    warn!(
                        "event=store_restore module=store status=skip reason=parent_missing entry_id={} parent_id={}",
                        entry.id, parent_id
                    );
                    continue;
                }
            }
            if let Err(err) = entry.validate() {
                warn!(
                    "event=store_restore module=store status=skip reason=invalid entry_id={} error={err}",
                    entry.id
                );
                continue;
            }
            let clash = self.find_duplicate(&entry.text, entry.parent_id, Some(entry.id));
            if let Some(existing) = clash {
                warn!(
                    "event=store_restore module=store status=skip reason=duplicate entry_id={} existing_id={}",
                    entry.id, existing.id
                );
                continue;
            }
            self.retired.remove(&entry.id);
            self.attach(entry.clone());
            restored.push(entry);
        }
        restored
    }

    /// Entries directly under `parent_id`, in insertion order.
    pub fn children_of(&self, parent_id: Option<EntryId>) -> Vec<&Entry> {
        self.child_ids(parent_id)
            .iter()
            .filter_map(|id| self.entries.get(id))
            .collect()
    }

    /// Child ids directly under `parent_id`, in insertion order.
    pub fn child_ids(&self, parent_id: Option<EntryId>) -> &[EntryId] {
        self.children
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of transitive children of `id`. Unknown ids count zero.
    pub fn count_descendants(&self, id: EntryId) -> usize {
        let mut count = 0;
        let mut stack: Vec<EntryId> = self.child_ids(Some(id)).to_vec();
        while let Some(current) = stack.pop() {
            count += 1;
            stack.extend_from_slice(self.child_ids(Some(current)));
        }
        count
    }

    /// Finds a sibling under `parent_id` whose normalized text equals `text`.
    ///
    /// Blank text never matches, so pure-media entries do not collide.
    pub fn find_duplicate(
        &self,
        text: &str,
        parent_id: Option<EntryId>,
        exclude_id: Option<EntryId>,
    ) -> Option<&Entry> {
        let needle = normalize_text(text);
        if needle.is_empty() {
            return None;
        }
        self.children_of(parent_id).into_iter().find(|entry| {
            Some(entry.id) != exclude_id && normalize_text(&entry.text) == needle
        })
    }

    /// Entry chain from the root-level ancestor down to `id` (inclusive).
    ///
    /// Returns an empty list for unknown ids.
    pub fn lineage(&self, id: EntryId) -> Vec<&Entry> {
        let mut chain = Vec::new();
        let mut cursor = self.entries.get(&id);
        while let Some(entry) = cursor {
            if chain.len() > self.entries.len() {
                break;
            }
            chain.push(entry);
            cursor = entry.parent_id.and_then(|parent| self.entries.get(&parent));
        }
        chain.reverse();
        chain
    }

    /// Number of `parent_id` hops from `id` to the anchor.
    pub fn depth(&self, id: EntryId) -> Option<usize> {
        let lineage = self.lineage(id);
        if lineage.is_empty() {
            None
        } else {
            Some(lineage.len())
        }
    }

    fn fresh_id(&self) -> EntryId {
        loop {
            let id = Uuid::new_v4();
            if !self.entries.contains_key(&id) && !self.retired.contains(&id) {
                return id;
            }
        }
    }

    fn attach(&mut self, entry: Entry) {
        self.children
            .entry(entry.parent_id)
            .or_default()
            .push(entry.id);
        self.entries.insert(entry.id, entry);
    }

    fn detach(&mut self, id: EntryId) -> Option<Entry> {
        let entry = self.entries.remove(&id)?;
        self.unlink_child(entry.parent_id, id);
        self.children.remove(&Some(id));
        self.retired.insert(id);
        Some(entry)
    }

    fn unlink_child(&mut self, parent_id: Option<EntryId>, id: EntryId) {
        if let Some(siblings) = self.children.get_mut(&parent_id) {
            siblings.retain(|sibling| *sibling != id);
            if siblings.is_empty() {
                self.children.remove(&parent_id);
            }
        }
    }

    fn set_parent_field(&mut self, id: EntryId, parent_id: Option<EntryId>) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.parent_id = parent_id;
        }
    }

    /// Children-before-parent order of the subtree rooted at `id`.
    fn post_order(&self, id: EntryId) -> Vec<EntryId> {
        let mut pre = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            pre.push(current);
            stack.extend_from_slice(self.child_ids(Some(current)));
        }
        pre.reverse();
        pre
    }

    fn would_create_cycle(&self, id: EntryId, candidate_parent: EntryId) -> bool {
        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent);
        while let Some(current) = cursor {
            if current == id || !visited.insert(current) {
                return true;
            }
            cursor = self.entries.get(&current).and_then(|entry| entry.parent_id);
        }
        false
    }

    fn parent_chain_is_cyclic(&self, id: EntryId) -> bool {
        let mut visited = HashSet::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if !visited.insert(current) {
                return true;
            }
            cursor = self.entries.get(&current).and_then(|entry| entry.parent_id);
        }
        false
    }
}
