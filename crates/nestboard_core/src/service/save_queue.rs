//! Coalescing queue for debounced position saves.
//!
//! Every `schedule` call for an id replaces the pending position and pushes
//! its due time to `now + window`, so only the last position inside the
//! window reaches storage.

use crate::gateway::PositionUpdate;
use crate::model::entry::EntryId;
use crate::model::geometry::Point;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct PendingSave {
    position: Point,
    due_at_ms: u64,
}

/// Trailing-debounce work queue keyed by entry id.
#[derive(Debug, Clone)]
pub struct SaveQueue {
    window_ms: u64,
    pending: HashMap<EntryId, PendingSave>,
}

impl SaveQueue {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            pending: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_pending(&self, id: EntryId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Queues (or re-queues) the latest position for `id`.
    pub fn schedule(&mut self, id: EntryId, position: Point, now_ms: u64) {
        self.pending.insert(
            id,
            PendingSave {
                position,
                due_at_ms: now_ms.saturating_add(self.window_ms),
            },
        );
    }

    /// Drops the pending save for `id`, returning whether one existed.
    pub fn cancel(&mut self, id: EntryId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Earliest due time among pending saves.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.pending.values().map(|save| save.due_at_ms).min()
    }

    /// Removes and returns every save due at `now_ms`, oldest first.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<PositionUpdate> {
        let mut due: Vec<(u64, PositionUpdate)> = self
            .pending
            .iter()
            .filter(|(_, save)| save.due_at_ms <= now_ms)
            .map(|(id, save)| {
                (
                    save.due_at_ms,
                    PositionUpdate {
                        id: *id,
                        position: save.position,
                    },
                )
            })
            .collect();
        for (_, update) in &due {
            self.pending.remove(&update.id);
        }
        due.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        due.into_iter().map(|(_, update)| update).collect()
    }

    /// Removes and returns every pending save regardless of due time.
    pub fn drain_all(&mut self) -> Vec<PositionUpdate> {
        self.drain_due(u64::MAX)
    }
}
