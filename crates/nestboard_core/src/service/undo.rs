//! Bounded undo/redo history over entry store mutations.
//!
//! # Responsibility
//! - Record enough data to exactly reverse create/edit/delete/reparent.
//! - Apply inverses (undo) and forward operations (redo) to the store.
//!
//! # Invariants
//! - Each stack holds at most `capacity` records; the oldest is dropped first.
//! - A cascading delete is one record holding the whole removed subtree.
//! - Recording a new operation clears the redo stack.

use crate::model::entry::{ContentSnapshot, Entry, EntryId, EntryPatch};
use crate::store::entry_store::{DeleteMode, EntryStore};
use log::{debug, warn};
use std::collections::VecDeque;

/// Reversible operation.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoRecord {
    /// Entry as created, so redo can recreate it with the same id.
    Create { entry: Entry },
    /// Content before and after an edit commit.
    Edit {
        id: EntryId,
        before: ContentSnapshot,
        after: ContentSnapshot,
    },
    /// Removed subtree in post-order (children before parents).
    Delete { removed: Vec<Entry> },
    /// Parent change of one entry; its subtree moves along.
    Reparent {
        id: EntryId,
        from: Option<EntryId>,
        to: Option<EntryId>,
    },
}

impl UndoRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Edit { .. } => "edit",
            Self::Delete { .. } => "delete",
            Self::Reparent { .. } => "reparent",
        }
    }
}

/// Store change produced by applying a history step.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEffect {
    /// Entries removed from the store, post-order.
    Removed(Vec<Entry>),
    /// Entries re-inserted with their original ids, parents first.
    Restored(Vec<Entry>),
    /// Entry content replaced.
    Updated(Entry),
    /// Entry moved under another parent.
    Reparented(Entry),
}

/// Undo and redo stacks sharing one capacity.
#[derive(Debug, Clone)]
pub struct UndoManager {
    undo_stack: VecDeque<UndoRecord>,
    redo_stack: VecDeque<UndoRecord>,
    capacity: usize,
}

impl UndoManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Most recent undoable record.
    pub fn peek(&self) -> Option<&UndoRecord> {
        self.undo_stack.back()
    }

    /// Pushes a record, dropping the oldest when full, and clears redo.
    pub fn record(&mut self, record: UndoRecord) {
        debug!(
            "event=undo_record module=undo status=ok kind={} depth={}",
            record.kind(),
            self.undo_stack.len() + 1
        );
        push_bounded(&mut self.undo_stack, record, self.capacity);
        self.redo_stack.clear();
    }

    /// Reverts the most recent record. Empty history is a no-op.
    ///
    /// Returns `None` when the history is empty or the inverse no longer
    /// applies (its record is dropped in that case).
    pub fn undo(&mut self, store: &mut EntryStore) -> Option<HistoryEffect> {
        let record = self.undo_stack.pop_back()?;
        let effect = apply_inverse(store, &record);
        match &effect {
            Some(_) => push_bounded(&mut self.redo_stack, record, self.capacity),
            None => warn!(
                "event=undo_apply module=undo status=skip kind={} reason=stale",
                record.kind()
            ),
        }
        effect
    }

    /// Re-applies the most recently undone record.
    pub fn redo(&mut self, store: &mut EntryStore) -> Option<HistoryEffect> {
        let record = self.redo_stack.pop_back()?;
        let effect = apply_forward(store, &record);
        match &effect {
            Some(_) => push_bounded(&mut self.undo_stack, record, self.capacity),
            None => warn!(
                "event=redo_apply module=undo status=skip kind={} reason=stale",
                record.kind()
            ),
        }
        effect
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

fn push_bounded(stack: &mut VecDeque<UndoRecord>, record: UndoRecord, capacity: usize) {
    if stack.len() >= capacity {
        stack.pop_front();
    }
    stack.push_back(record);
}

fn apply_inverse(store: &mut EntryStore, record: &UndoRecord) -> Option<HistoryEffect> {
    match record {
        UndoRecord::Create { entry } => remove_subtree(store, entry.id),
        UndoRecord::Delete { removed } => restore_subtree(store, removed),
        UndoRecord::Edit { id, before, .. } => replace_content(store, *id, before),
        UndoRecord::Reparent { id, from, .. } => move_under(store, *id, *from),
    }
}

fn apply_forward(store: &mut EntryStore, record: &UndoRecord) -> Option<HistoryEffect> {
    match record {
        UndoRecord::Create { entry } => restore_subtree(store, std::slice::from_ref(entry)),
        UndoRecord::Delete { removed } => {
            let root = removed.last()?;
            remove_subtree(store, root.id)
        }
        UndoRecord::Edit { id, after, .. } => replace_content(store, *id, after),
        UndoRecord::Reparent { id, to, .. } => move_under(store, *id, *to),
    }
}

fn remove_subtree(store: &mut EntryStore, id: EntryId) -> Option<HistoryEffect> {
    match store.delete(id, DeleteMode::Cascade) {
        Ok(removed) if !removed.is_empty() => Some(HistoryEffect::Removed(removed)),
        Ok(_) => None,
        Err(err) => {
            warn!("event=history_delete module=undo status=error entry_id={id} error={err}");
            None
        }
    }
}

fn restore_subtree(store: &mut EntryStore, post_order: &[Entry]) -> Option<HistoryEffect> {
    let parents_first: Vec<Entry> = post_order.iter().rev().cloned().collect();
    let restored = store.restore(parents_first);
    if restored.is_empty() {
        None
    } else {
        Some(HistoryEffect::Restored(restored))
    }
}

fn replace_content(
    store: &mut EntryStore,
    id: EntryId,
    content: &ContentSnapshot,
) -> Option<HistoryEffect> {
    match store.update(id, &EntryPatch::from(content.clone())) {
        Ok(Some(entry)) => Some(HistoryEffect::Updated(entry)),
        Ok(None) => None,
        Err(err) => {
            warn!("event=history_edit module=undo status=error entry_id={id} error={err}");
            None
        }
    }
}

fn move_under(
    store: &mut EntryStore,
    id: EntryId,
    parent_id: Option<EntryId>,
) -> Option<HistoryEffect> {
    match store.reparent(id, parent_id) {
        Ok(Some(entry)) => Some(HistoryEffect::Reparented(entry)),
        Ok(None) => None,
        Err(err) => {
            warn!("event=history_reparent module=undo status=error entry_id={id} error={err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{UndoManager, UndoRecord};
    use crate::model::entry::{Entry, NewEntry};
    use crate::model::geometry::Point;
    use crate::store::entry_store::EntryStore;
    use uuid::Uuid;

    fn record(text: &str) -> UndoRecord {
        UndoRecord::Create {
            entry: Entry::from_new(
                Uuid::new_v4(),
                NewEntry::text(text, Point::new(0.0, 0.0), None),
            ),
        }
    }

    #[test]
    fn capacity_drops_oldest_record() {
        let mut history = UndoManager::new(3);
        for text in ["a", "b", "c", "d"] {
            history.record(record(text));
        }
        assert_eq!(history.undo_len(), 3);
        match history.undo_stack.front().unwrap() {
            UndoRecord::Create { entry } => assert_eq!(entry.text, "b"),
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn undo_on_empty_history_is_noop() {
        let mut history = UndoManager::new(50);
        let mut store = EntryStore::new();
        assert!(history.undo(&mut store).is_none());
        assert!(history.redo(&mut store).is_none());
    }

    #[test]
    fn new_record_clears_redo() {
        let mut history = UndoManager::new(50);
        let mut store = EntryStore::new();
        let entry = store.create("a", Point::new(0.0, 0.0), None).unwrap();
        history.record(UndoRecord::Create { entry });
        history.undo(&mut store).unwrap();
        assert!(history.can_redo());

        history.record(record("b"));
        assert!(!history.can_redo());
    }
}
