use nestboard_core::{
    CanvasConfig, EntryStore, MediaCard, NavigationController, NewEntry, Point, ViewState,
};

const TRANSITION: u64 = 600;
const COOLDOWN: u64 = 300;

fn origin() -> Point {
    Point::new(0.0, 0.0)
}

fn controller() -> NavigationController {
    NavigationController::new(&CanvasConfig::default().with_owner("ana"))
}

#[test]
fn navigate_into_child_then_back_returns_to_root() {
    let mut store = EntryStore::new();
    let a = store.create("Groceries", origin(), None).unwrap();
    let b = store.create("Dairy", Point::new(40.0, 10.0), Some(a.id)).unwrap();
    let mut nav = controller();

    let outcome = nav.navigate_to(&store, a.id, true, 0).unwrap();
    assert_eq!(outcome.view, ViewState::Viewing(a.id));
    assert_eq!(outcome.visible, vec![b.id]);
    assert_eq!(outcome.address, "/ana/groceries");
    assert!(outcome.fit_region.is_some());
    assert_eq!(nav.back_stack(), &[None]);

    let back = nav.navigate_back(&store, TRANSITION).unwrap();
    assert_eq!(back.view, ViewState::Root);
    assert_eq!(back.visible, vec![a.id]);
    assert_eq!(back.address, "/ana");
    assert!(nav.back_stack().is_empty());
}

#[test]
fn overlapping_requests_are_dropped_while_in_flight() {
    let mut store = EntryStore::new();
    let a = store.create("a", origin(), None).unwrap();
    let b = store.create("b", origin(), None).unwrap();
    let mut nav = controller();

    nav.navigate_to(&store, a.id, true, 1_000).unwrap();
    assert!(nav.is_navigating(1_000 + TRANSITION - 1));
    assert!(nav.navigate_to(&store, b.id, true, 1_100).is_none());
    assert_eq!(nav.current_view_id(), Some(a.id));

    assert!(!nav.can_place_editor(1_000 + TRANSITION));
    assert!(nav.can_place_editor(1_000 + TRANSITION + COOLDOWN));
    assert!(nav.navigate_to(&store, b.id, true, 1_000 + TRANSITION).is_some());
}

#[test]
fn complete_transition_starts_cooldown_early() {
    let mut store = EntryStore::new();
    let a = store.create("a", origin(), None).unwrap();
    let mut nav = controller();

    nav.navigate_to(&store, a.id, true, 0).unwrap();
    nav.complete_transition(200);
    assert!(!nav.is_navigating(200));
    assert!(!nav.can_place_editor(200 + COOLDOWN - 1));
    assert!(nav.can_place_editor(200 + COOLDOWN));
}

#[test]
fn same_view_navigation_does_not_grow_history() {
    let mut store = EntryStore::new();
    let a = store.create("a", origin(), None).unwrap();
    let mut nav = controller();

    nav.navigate_to(&store, a.id, true, 0).unwrap();
    nav.navigate_to(&store, a.id, true, TRANSITION).unwrap();
    assert_eq!(nav.back_stack().len(), 1);
}

#[test]
fn breadcrumbs_start_with_owner_and_use_labels() {
    let mut store = EntryStore::new();
    let a = store
        .create("A rather long first line that keeps going\nsecond", origin(), None)
        .unwrap();
    let song = store
        .create_entry(
            NewEntry::text("lyrics", origin(), Some(a.id)).with_media(MediaCard::Song {
                title: "Blue in Green".to_string(),
                artist: None,
                cover_url: None,
            }),
        )
        .unwrap();
    let mut nav = controller();

    let outcome = nav.navigate_to(&store, song.id, true, 0).unwrap();
    let labels: Vec<&str> = outcome
        .breadcrumbs
        .iter()
        .map(|crumb| crumb.label.as_str())
        .collect();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels[0], "ana");
    assert!(labels[1].ends_with('…'));
    assert_eq!(labels[1].chars().count(), 30);
    assert_eq!(labels[2], "Blue in Green");
    assert_eq!(outcome.breadcrumbs[0].target, None);
    assert_eq!(outcome.breadcrumbs[2].target, Some(song.id));
}

#[test]
fn sync_from_path_ignores_misses_and_keeps_history() {
    let mut store = EntryStore::new();
    let a = store.create("Alpha", origin(), None).unwrap();
    let b = store.create("Beta", origin(), Some(a.id)).unwrap();
    let mut nav = controller();

    nav.navigate_to(&store, a.id, true, 0).unwrap();
    assert!(nav.sync_from_path(&store, &["alpha", "nope"], TRANSITION).is_none());
    assert_eq!(nav.current_view_id(), Some(a.id));

    let synced = nav
        .sync_from_path(&store, &["alpha", "beta"], TRANSITION)
        .unwrap();
    assert_eq!(synced.view, ViewState::Viewing(b.id));
    assert_eq!(nav.back_stack(), &[None]);

    let root = nav
        .sync_from_path::<&str>(&store, &[], 2 * TRANSITION)
        .unwrap();
    assert_eq!(root.view, ViewState::Root);
    assert_eq!(nav.back_stack(), &[None]);
}

#[test]
fn unknown_target_is_ignored() {
    let store = EntryStore::new();
    let mut nav = controller();
    assert!(nav.navigate_to(&store, uuid::Uuid::new_v4(), true, 0).is_none());
    assert_eq!(nav.view(), ViewState::Root);
}
