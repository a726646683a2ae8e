//! Canvas session facade.
//!
//! # Responsibility
//! - Own the entry store, navigation, history, save queue and pending layout
//!   for one loaded workspace.
//! - Route user actions through store -> history -> gateway -> navigation.
//!
//! # Invariants
//! - The store is the only copy of entry state; gateway writes mirror it.
//! - Gateway failures are logged and never roll back in-memory state.
//! - Duplicate checks and navigation run to completion before any gateway call.
//! - At most one hub layout is pending at a time.

use crate::config::{CanvasConfig, ConfigError};
use crate::gateway::hub::{parse_hub_groups, HubCandidate, HubSuggester};
use crate::gateway::{GatewayError, GatewayResult, PersistenceGateway, PositionUpdate};
use crate::layout::animation::{AnimationFrame, LayoutAnimation};
use crate::layout::hub::{plan_hub_layout, HubGroup, HubLayoutParams, HubLayoutPlan};
use crate::model::entry::{ContentSnapshot, Entry, EntryId, EntryPatch, LinkCard, MediaCard, NewEntry};
use crate::model::geometry::Point;
use crate::path::address::parse_address;
use crate::path::slug::resolve_deepest;
use crate::service::navigation::{NavigationController, NavigationOutcome};
use crate::service::save_queue::SaveQueue;
use crate::service::undo::{HistoryEffect, UndoManager, UndoRecord};
use crate::store::entry_store::{DeleteMode, EntryStore, LoadReport, StoreResult};
use log::{debug, error, info, warn};
use rand::Rng;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from opening a session.
#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    Gateway(GatewayError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Gateway(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Gateway(err) => Some(err),
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<GatewayError> for SessionError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

/// Result of a create request.
#[derive(Debug)]
pub enum CreateOutcome {
    /// Entry exists in the store. `persist_error` is set when the durable
    /// write failed; the entry is kept regardless.
    Created {
        entry: Entry,
        persist_error: Option<GatewayError>,
    },
    /// A sibling already holds the same normalized text; nothing was created.
    Duplicate { existing: Entry },
}

/// Result of an edit commit.
#[derive(Debug)]
pub enum EditOutcome {
    /// Target id is unknown.
    Missing,
    /// Content did not change.
    Unchanged(Entry),
    Updated(Entry),
    /// Edit left a text-only entry empty, so it was deleted with its subtree.
    Deleted(DeleteOutcome),
}

/// Result of a delete request.
#[derive(Debug)]
pub struct DeleteOutcome {
    /// Removed entries, children before parents.
    pub removed: Vec<Entry>,
    /// First durable delete failure, if any.
    pub persist_error: Option<GatewayError>,
}

/// Work performed by one `tick`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    /// Interpolated positions for the renderer.
    pub frames: Vec<AnimationFrame>,
    /// Debounced drag saves sent this tick.
    pub saved: Vec<PositionUpdate>,
    /// Layout positions committed to the store and batch-persisted this tick.
    pub committed: Vec<PositionUpdate>,
}

#[derive(Debug)]
struct PendingLayout {
    animation: LayoutAnimation,
    last_tick_ms: u64,
    commit_at_ms: u64,
}

/// One loaded workspace and its interaction state.
pub struct CanvasSession<G: PersistenceGateway> {
    config: CanvasConfig,
    store: EntryStore,
    navigation: NavigationController,
    history: UndoManager,
    saves: SaveQueue,
    pending_layout: Option<PendingLayout>,
    gateway: G,
}

impl<G: PersistenceGateway> CanvasSession<G> {
    /// Validates `config`, loads every entry from `gateway` and starts at root.
    pub fn open(config: CanvasConfig, gateway: G) -> Result<(Self, LoadReport), SessionError> {
        config.validate()?;
        let entries = gateway.list_all()?;
        let mut store = EntryStore::new();
        let report = store.load(entries);
        info!(
            "event=session_open module=session status=ok entries={} rerooted={}",
            report.loaded,
            report.rerooted.len()
        );

        let session = Self {
            navigation: NavigationController::new(&config),
            history: UndoManager::new(config.undo_capacity),
            saves: SaveQueue::new(config.save_debounce_ms),
            pending_layout: None,
            store,
            gateway,
            config,
        };
        Ok((session, report))
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.navigation
    }

    pub fn history(&self) -> &UndoManager {
        &self.history
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn pending_saves(&self) -> usize {
        self.saves.len()
    }

    pub fn has_pending_layout(&self) -> bool {
        self.pending_layout.is_some()
    }

    /// Outcome for the current view, re-derived from live entry content.
    pub fn current_view(&self) -> NavigationOutcome {
        self.navigation.describe(&self.store)
    }

    /// Number of descendants that a delete of `id` would also remove.
    pub fn descendant_count(&self, id: EntryId) -> usize {
        self.store.count_descendants(id)
    }

    /// Creates an entry unless a sibling already has the same text.
    ///
    /// # Errors
    /// - `ParentNotFound` / `Invalid` from the store.
    pub fn create_entry(&mut self, new: NewEntry) -> StoreResult<CreateOutcome> {
        if let Some(existing) = self.store.find_duplicate(&new.text, new.parent_id, None) {
            info!(
                "event=entry_create module=session status=duplicate existing_id={}",
                existing.id
            );
            return Ok(CreateOutcome::Duplicate {
                existing: existing.clone(),
            });
        }

        let entry = self.store.create_entry(new)?;
        self.history.record(UndoRecord::Create {
            entry: entry.clone(),
        });
        info!(
            "event=entry_create module=session status=ok entry_id={} parent_id={}",
            entry.id,
            display_parent(entry.parent_id)
        );
        let persist_error = log_gateway("create", entry.id, self.gateway.create(&entry));
        Ok(CreateOutcome::Created {
            entry,
            persist_error,
        })
    }

    /// Commits editor content for `id`.
    ///
    /// # Errors
    /// - `DuplicateSibling` when the new text collides with a sibling; the
    ///   caller should redirect to the existing entry.
    pub fn commit_edit(
        &mut self,
        id: EntryId,
        text: impl Into<String>,
        media: Option<MediaCard>,
        link_cards: Vec<LinkCard>,
    ) -> StoreResult<EditOutcome> {
        let Some(current) = self.store.get(id) else {
            return Ok(EditOutcome::Missing);
        };
        let before = current.content_snapshot();
        let after = ContentSnapshot {
            text: text.into(),
            media,
            link_cards,
        };
        if after == before {
            return Ok(EditOutcome::Unchanged(current.clone()));
        }
        if after.text.trim().is_empty() && after.media.is_none() {
            return Ok(match self.delete_entry(id) {
                Some(outcome) => EditOutcome::Deleted(outcome),
                None => EditOutcome::Missing,
            });
        }

        let patch = EntryPatch::from(after.clone());
        let Some(updated) = self.store.update(id, &patch)? else {
            return Ok(EditOutcome::Missing);
        };
        self.history.record(UndoRecord::Edit { id, before, after });
        debug!("event=entry_edit module=session status=ok entry_id={id}");
        log_gateway("update", id, self.gateway.update(id, &patch));
        Ok(EditOutcome::Updated(updated))
    }

    /// Moves `id` immediately and schedules a debounced position save.
    ///
    /// A drag takes `id` out of any pending layout, so the layout commit
    /// cannot overwrite the dragged position.
    pub fn move_entry(
        &mut self,
        id: EntryId,
        position: Point,
        now_ms: u64,
    ) -> StoreResult<Option<Entry>> {
        let moved = self.store.update(id, &EntryPatch::position(position))?;
        if moved.is_some() {
            self.saves.schedule(id, position, now_ms);
            let released = self
                .pending_layout
                .as_mut()
                .is_some_and(|pending| pending.animation.remove_track(id));
            if released {
                debug!("event=hub_layout module=session status=released entry_id={id}");
            }
        }
        Ok(moved)
    }

    /// Moves `id` under another parent (or root) as one undoable step.
    pub fn reparent_entry(
        &mut self,
        id: EntryId,
        new_parent: Option<EntryId>,
    ) -> StoreResult<Option<Entry>> {
        let Some(old_parent) = self.store.get(id).map(|entry| entry.parent_id) else {
            return Ok(None);
        };
        let moved = self.store.reparent(id, new_parent)?;
        if moved.is_some() && old_parent != new_parent {
            self.history.record(UndoRecord::Reparent {
                id,
                from: old_parent,
                to: new_parent,
            });
            info!(
                "event=entry_reparent module=session status=ok entry_id={id} parent_id={}",
                display_parent(new_parent)
            );
            log_gateway("update", id, self.gateway.update(id, &EntryPatch::parent(new_parent)));
        }
        Ok(moved)
    }

    /// Deletes `id` and its whole subtree as one undoable step.
    ///
    /// Returns `None` for unknown ids.
    pub fn delete_entry(&mut self, id: EntryId) -> Option<DeleteOutcome> {
        let removed = match self.store.delete(id, DeleteMode::Cascade) {
            Ok(removed) => removed,
            Err(err) => {
                warn!("event=entry_delete module=session status=error entry_id={id} error={err}");
                return None;
            }
        };
        if removed.is_empty() {
            return None;
        }
        self.history.record(UndoRecord::Delete {
            removed: removed.clone(),
        });
        info!(
            "event=entry_delete module=session status=ok entry_id={id} removed={}",
            removed.len()
        );

        let mut persist_error = None;
        for entry in &removed {
            if let Some(err) = log_gateway("delete", entry.id, self.gateway.delete(entry.id)) {
                persist_error.get_or_insert(err);
            }
        }
        self.navigation.prune(&self.store);
        Some(DeleteOutcome {
            removed,
            persist_error,
        })
    }

    pub fn undo(&mut self) -> Option<HistoryEffect> {
        let effect = self.history.undo(&mut self.store)?;
        self.persist_effect(&effect);
        self.navigation.prune(&self.store);
        Some(effect)
    }

    pub fn redo(&mut self) -> Option<HistoryEffect> {
        let effect = self.history.redo(&mut self.store)?;
        self.persist_effect(&effect);
        self.navigation.prune(&self.store);
        Some(effect)
    }

    pub fn navigate_to(&mut self, id: EntryId, now_ms: u64) -> Option<NavigationOutcome> {
        self.navigation.navigate_to(&self.store, id, true, now_ms)
    }

    pub fn navigate_to_root(&mut self, now_ms: u64) -> Option<NavigationOutcome> {
        self.navigation.navigate_to_root(&self.store, now_ms)
    }

    pub fn navigate_back(&mut self, now_ms: u64) -> Option<NavigationOutcome> {
        self.navigation.navigate_back(&self.store, now_ms)
    }

    pub fn sync_from_path<S: AsRef<str>>(
        &mut self,
        segments: &[S],
        now_ms: u64,
    ) -> Option<NavigationOutcome> {
        self.navigation.sync_from_path(&self.store, segments, now_ms)
    }

    pub fn complete_transition(&mut self, now_ms: u64) {
        self.navigation.complete_transition(now_ms);
    }

    pub fn can_place_editor(&self, now_ms: u64) -> bool {
        self.navigation.can_place_editor(now_ms)
    }

    /// Initial load from an address: shows the deepest resolvable ancestor.
    pub fn open_address(&mut self, path: &str, now_ms: u64) -> Option<NavigationOutcome> {
        let address = parse_address(path)?;
        let resolution = resolve_deepest(&self.store, &address.segments);
        if !resolution.is_complete() {
            info!(
                "event=open_address module=session status=partial matched={} requested={}",
                resolution.matched, resolution.requested
            );
        }
        match resolution.entry.map(|entry| entry.id) {
            Some(id) => self.navigation.navigate_to(&self.store, id, false, now_ms),
            None => self
                .navigation
                .sync_from_path::<&str>(&self.store, &[], now_ms),
        }
    }

    /// Visible entries described for the hub suggestion service.
    pub fn hub_candidates(&self) -> Vec<HubCandidate> {
        self.store
            .children_of(self.navigation.current_view_id())
            .into_iter()
            .map(HubCandidate::from)
            .collect()
    }

    /// Asks `suggester` for groups over the visible entries and starts a
    /// layout pass. Any service failure or malformed reply is a no-op.
    pub fn request_hub_layout<S, R>(
        &mut self,
        suggester: &S,
        rng: &mut R,
        now_ms: u64,
    ) -> Option<HubLayoutPlan>
    where
        S: HubSuggester + ?Sized,
        R: Rng + ?Sized,
    {
        if self.pending_layout.is_some() {
            debug!("event=hub_request module=session status=skip reason=layout_pending");
            return None;
        }
        let candidates = self.hub_candidates();
        if candidates.len() < 2 {
            return None;
        }
        let reply = match suggester.suggest(&candidates) {
            Ok(reply) => reply,
            Err(err) => {
                warn!("event=hub_request module=session status=error error={err}");
                return None;
            }
        };
        let groups = parse_hub_groups(&reply);
        self.apply_hub_groups(&groups, rng, now_ms)
    }

    /// Plans a layout for `groups` restricted to visible entries and starts
    /// its animation. The result is committed by `tick` after the commit delay.
    pub fn apply_hub_groups<R: Rng + ?Sized>(
        &mut self,
        groups: &[HubGroup],
        rng: &mut R,
        now_ms: u64,
    ) -> Option<HubLayoutPlan> {
        if self.pending_layout.is_some() {
            debug!("event=hub_layout module=session status=skip reason=layout_pending");
            return None;
        }
        let visible: HashSet<EntryId> = self
            .store
            .child_ids(self.navigation.current_view_id())
            .iter()
            .copied()
            .collect();
        let scoped: Vec<HubGroup> = groups
            .iter()
            .map(|group| HubGroup {
                entry_ids: group
                    .entry_ids
                    .iter()
                    .copied()
                    .filter(|id| visible.contains(id))
                    .collect(),
                direction: group.direction,
            })
            .collect();

        let params = HubLayoutParams::from(&self.config);
        let plan = plan_hub_layout(&self.store, &scoped, &params, rng);
        if plan.is_empty() {
            return None;
        }

        let animation = LayoutAnimation::new(
            &plan,
            self.config.animation_min_ms,
            self.config.animation_max_ms,
            rng,
        );
        self.pending_layout = Some(PendingLayout {
            animation,
            last_tick_ms: now_ms,
            commit_at_ms: now_ms.saturating_add(self.config.layout_commit_delay_ms),
        });
        info!(
            "event=hub_layout module=session status=started groups={} moves={}",
            plan.groups.len(),
            plan.moves().count()
        );
        Some(plan)
    }

    /// Advances time: flushes due saves, animates and commits pending layout.
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let mut report = TickReport {
            saved: self.flush_due_saves(now_ms),
            ..TickReport::default()
        };

        let commit_due = match self.pending_layout.as_mut() {
            Some(pending) => {
                let delta = now_ms.saturating_sub(pending.last_tick_ms);
                pending.last_tick_ms = now_ms;
                report.frames = pending.animation.on_tick(delta as f64);
                now_ms >= pending.commit_at_ms
            }
            None => false,
        };
        if commit_due {
            report.committed = self.commit_pending_layout();
        }
        report
    }

    /// Sends every pending save and commits any pending layout immediately.
    pub fn flush(&mut self) -> TickReport {
        let saved = self.saves.drain_all();
        self.send_saves(&saved);
        let committed = self.commit_pending_layout();
        TickReport {
            frames: Vec::new(),
            saved,
            committed,
        }
    }

    fn flush_due_saves(&mut self, now_ms: u64) -> Vec<PositionUpdate> {
        let due = self.saves.drain_due(now_ms);
        self.send_saves(&due);
        due
    }

    fn send_saves(&self, saves: &[PositionUpdate]) {
        for save in saves {
            log_gateway(
                "update",
                save.id,
                self.gateway.update(save.id, &EntryPatch::position(save.position)),
            );
        }
    }

    fn commit_pending_layout(&mut self) -> Vec<PositionUpdate> {
        let Some(pending) = self.pending_layout.take() else {
            return Vec::new();
        };
        let mut committed = Vec::new();
        for frame in pending.animation.final_frames() {
            match self.store.update(frame.id, &EntryPatch::position(frame.position)) {
                Ok(Some(_)) => {
                    // An older drag save would overwrite the committed position.
                    self.saves.cancel(frame.id);
                    committed.push(PositionUpdate {
                        id: frame.id,
                        position: frame.position,
                    });
                }
                Ok(None) => {}
                Err(err) => warn!(
                    "event=hub_commit module=session status=skip entry_id={} error={err}",
                    frame.id
                ),
            }
        }
        if let Err(err) = self.gateway.batch_update_positions(&committed) {
            error!(
                "event=hub_commit module=session status=error moves={} error={err}",
                committed.len()
            );
        } else {
            info!(
                "event=hub_commit module=session status=ok moves={}",
                committed.len()
            );
        }
        committed
    }

    fn persist_effect(&self, effect: &HistoryEffect) {
        match effect {
            HistoryEffect::Removed(entries) => {
                for entry in entries {
                    log_gateway("delete", entry.id, self.gateway.delete(entry.id));
                }
            }
            HistoryEffect::Restored(entries) => {
                for entry in entries {
                    log_gateway("create", entry.id, self.gateway.create(entry));
                }
            }
            HistoryEffect::Updated(entry) => {
                let patch = EntryPatch::from(entry.content_snapshot());
                log_gateway("update", entry.id, self.gateway.update(entry.id, &patch));
            }
            HistoryEffect::Reparented(entry) => {
                let patch = EntryPatch::parent(entry.parent_id);
                log_gateway("update", entry.id, self.gateway.update(entry.id, &patch));
            }
        }
    }
}

/// Logs a gateway failure and hands it back for callers that surface it.
fn log_gateway(op: &str, id: EntryId, result: GatewayResult<()>) -> Option<GatewayError> {
    match result {
        Ok(()) => None,
        Err(err) => {
            error!("event=gateway_{op} module=session status=error entry_id={id} error={err}");
            Some(err)
        }
    }
}

fn display_parent(parent_id: Option<EntryId>) -> String {
    parent_id.map_or_else(|| "root".to_string(), |id| id.to_string())
}
