//! View navigation state machine.
//!
//! # Responsibility
//! - Track which entry's children are visible and the back-stack.
//! - Derive visibility, breadcrumbs, the address path and the fit region.
//! - Drop overlapping navigation requests while a transition is in flight.
//!
//! # Invariants
//! - State changes only through this controller.
//! - The back-stack only receives the previous view when it differs from
//!   the target and history was requested.
//! - Time is supplied by the caller as milliseconds; no clock is read here.

use crate::config::{CanvasConfig, FootprintMetrics};
use crate::layout::footprint::region_of;
use crate::model::entry::{Entry, EntryId};
use crate::model::geometry::Bounds;
use crate::path::address::address_for_view;
use crate::path::slug::resolve_path;
use crate::store::entry_store::EntryStore;
use log::{debug, info};

/// Maximum breadcrumb label length including the ellipsis.
pub const MAX_BREADCRUMB_CHARS: usize = 30;
/// Label used when an entry has neither media title nor text.
pub const PLACEHOLDER_LABEL: &str = "Untitled";

/// Navigation state: the anchor or one entry's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Root,
    Viewing(EntryId),
}

impl ViewState {
    pub fn entry_id(self) -> Option<EntryId> {
        match self {
            Self::Root => None,
            Self::Viewing(id) => Some(id),
        }
    }
}

impl From<Option<EntryId>> for ViewState {
    fn from(value: Option<EntryId>) -> Self {
        value.map_or(Self::Root, Self::Viewing)
    }
}

/// One item of the ancestor trail. `target = None` routes to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub label: String,
    pub target: Option<EntryId>,
}

/// Everything downstream consumers need after a navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationOutcome {
    pub view: ViewState,
    /// Children of the current view; every other entry is hidden.
    pub visible: Vec<EntryId>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub address: String,
    /// Region the camera should fit, `None` for an empty view.
    pub fit_region: Option<Bounds>,
}

/// Owns `current_view_id`, the back-stack and transition timing.
#[derive(Debug, Clone)]
pub struct NavigationController {
    owner_name: String,
    current_view_id: Option<EntryId>,
    back_stack: Vec<Option<EntryId>>,
    transition_ms: u64,
    cooldown_ms: u64,
    in_flight_until: Option<u64>,
    cooldown_until: u64,
    metrics: FootprintMetrics,
}

impl NavigationController {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            owner_name: config.owner_name.trim().to_string(),
            current_view_id: None,
            back_stack: Vec::new(),
            transition_ms: config.navigation_transition_ms,
            cooldown_ms: config.navigation_cooldown_ms,
            in_flight_until: None,
            cooldown_until: 0,
            metrics: config.footprint,
        }
    }

    pub fn current_view_id(&self) -> Option<EntryId> {
        self.current_view_id
    }

    pub fn view(&self) -> ViewState {
        self.current_view_id.into()
    }

    /// Previously visited views, most recent last.
    pub fn back_stack(&self) -> &[Option<EntryId>] {
        &self.back_stack
    }

    /// `true` while a transition started less than the transition window ago.
    pub fn is_navigating(&self, now_ms: u64) -> bool {
        self.in_flight_until.is_some_and(|until| now_ms < until)
    }

    /// `false` while navigating and during the cool-down that follows.
    pub fn can_place_editor(&self, now_ms: u64) -> bool {
        !self.is_navigating(now_ms) && now_ms >= self.cooldown_until
    }

    /// Ends the in-flight transition early (e.g. camera animation finished).
    pub fn complete_transition(&mut self, now_ms: u64) {
        if self.in_flight_until.take().is_some() {
            self.cooldown_until = now_ms.saturating_add(self.cooldown_ms);
        }
    }

    /// Shows the children of `id`.
    ///
    /// Returns `None` when dropped: another navigation is in flight, or `id`
    /// is unknown.
    pub fn navigate_to(
        &mut self,
        store: &EntryStore,
        id: EntryId,
        push_history: bool,
        now_ms: u64,
    ) -> Option<NavigationOutcome> {
        if self.is_navigating(now_ms) {
            debug!("event=navigate module=navigation status=skip reason=in_flight");
            return None;
        }
        if !store.contains(id) {
            debug!("event=navigate module=navigation status=skip reason=not_found entry_id={id}");
            return None;
        }
        if push_history && self.current_view_id != Some(id) {
            self.back_stack.push(self.current_view_id);
        }
        Some(self.enter(store, Some(id), now_ms))
    }

    /// Shows root-level entries and clears the back-stack.
    pub fn navigate_to_root(
        &mut self,
        store: &EntryStore,
        now_ms: u64,
    ) -> Option<NavigationOutcome> {
        if self.is_navigating(now_ms) {
            debug!("event=navigate_root module=navigation status=skip reason=in_flight");
            return None;
        }
        self.back_stack.clear();
        Some(self.enter(store, None, now_ms))
    }

    /// Returns to the previous view; an empty stack or a root entry on it
    /// routes to the root.
    pub fn navigate_back(&mut self, store: &EntryStore, now_ms: u64) -> Option<NavigationOutcome> {
        if self.is_navigating(now_ms) {
            debug!("event=navigate_back module=navigation status=skip reason=in_flight");
            return None;
        }
        match self.back_stack.pop() {
            Some(Some(id)) if store.contains(id) => Some(self.enter(store, Some(id), now_ms)),
            _ => self.navigate_to_root(store, now_ms),
        }
    }

    /// Follows an externally changed address without touching history.
    ///
    /// An unresolvable path leaves the state unchanged. An empty path shows
    /// the root without clearing history.
    pub fn sync_from_path<S: AsRef<str>>(
        &mut self,
        store: &EntryStore,
        segments: &[S],
        now_ms: u64,
    ) -> Option<NavigationOutcome> {
        if segments.is_empty() {
            if self.is_navigating(now_ms) {
                return None;
            }
            return Some(self.enter(store, None, now_ms));
        }
        let Some(target) = resolve_path(store, segments) else {
            debug!(
                "event=sync_from_path module=navigation status=skip reason=resolution_miss segments={}",
                segments.len()
            );
            return None;
        };
        let target_id = target.id;
        self.navigate_to(store, target_id, false, now_ms)
    }

    /// Drops references to entries that no longer exist.
    ///
    /// A deleted current view falls back to its nearest surviving ancestor
    /// recorded on the back-stack, otherwise the root. Returns the new outcome
    /// when the view changed.
    pub fn prune(&mut self, store: &EntryStore) -> Option<NavigationOutcome> {
        self.back_stack
            .retain(|entry| entry.map_or(true, |id| store.contains(id)));
        match self.current_view_id {
            Some(id) if !store.contains(id) => {
                self.current_view_id = self.back_stack.pop().flatten();
                info!(
                    "event=navigation_prune module=navigation status=ok removed_view={id}"
                );
                Some(self.describe(store))
            }
            _ => None,
        }
    }

    /// Re-derives the outcome for the current view without navigating.
    pub fn describe(&self, store: &EntryStore) -> NavigationOutcome {
        let visible: Vec<EntryId> = store.child_ids(self.current_view_id).to_vec();
        let fit_region = region_of(
            visible.iter().filter_map(|id| store.get(*id)),
            &self.metrics,
        );
        NavigationOutcome {
            view: self.view(),
            visible,
            breadcrumbs: self.breadcrumbs(store),
            address: self.address(store),
            fit_region,
        }
    }

    /// Owner crumb followed by every ancestor down to the current view.
    pub fn breadcrumbs(&self, store: &EntryStore) -> Vec<Breadcrumb> {
        let mut crumbs = vec![Breadcrumb {
            label: self.owner_name.clone(),
            target: None,
        }];
        if let Some(id) = self.current_view_id {
            crumbs.extend(store.lineage(id).into_iter().map(|entry| Breadcrumb {
                label: breadcrumb_label(entry),
                target: Some(entry.id),
            }));
        }
        crumbs
    }

    pub fn address(&self, store: &EntryStore) -> String {
        address_for_view(&self.owner_name, store, self.current_view_id)
    }

    fn enter(
        &mut self,
        store: &EntryStore,
        view_id: Option<EntryId>,
        now_ms: u64,
    ) -> NavigationOutcome {
        self.current_view_id = view_id;
        let until = now_ms.saturating_add(self.transition_ms);
        self.in_flight_until = Some(until);
        self.cooldown_until = until.saturating_add(self.cooldown_ms);

        let outcome = self.describe(store);
        info!(
            "event=navigate module=navigation status=ok view={} visible={} depth={}",
            view_id.map_or_else(|| "root".to_string(), |id| id.to_string()),
            outcome.visible.len(),
            outcome.breadcrumbs.len() - 1
        );
        outcome
    }
}

/// Media title, else the first text line, else the placeholder.
pub fn breadcrumb_label(entry: &Entry) -> String {
    let source = entry
        .media
        .as_ref()
        .and_then(|media| media.title())
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .or_else(|| entry.first_line());
    match source {
        Some(text) => ellipsize(text, MAX_BREADCRUMB_CHARS),
        None => PLACEHOLDER_LABEL.to_string(),
    }
}

fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    clipped.truncate(clipped.trim_end().len());
    clipped.push('…');
    clipped
}
