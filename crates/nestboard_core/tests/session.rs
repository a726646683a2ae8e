use nestboard_core::{
    CanvasConfig, CanvasSession, CreateOutcome, EditOutcome, Entry, EntryId, EntryPatch,
    FootprintMetrics, GatewayError, GatewayResult, HistoryEffect, HubCandidate, HubGroup,
    HubServiceError, HubSuggester, NewEntry, PersistenceGateway, Point, PositionUpdate, Vector,
    ViewState,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};

#[derive(Default)]
struct RecordingGateway {
    calls: RefCell<Vec<String>>,
    batches: RefCell<Vec<Vec<PositionUpdate>>>,
    seed: Vec<Entry>,
    fail_writes: Cell<bool>,
}

impl RecordingGateway {
    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) -> GatewayResult<()> {
        self.calls.borrow_mut().push(call);
        if self.fail_writes.get() {
            Err(GatewayError::Unavailable("offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PersistenceGateway for RecordingGateway {
    fn create(&self, entry: &Entry) -> GatewayResult<()> {
        self.record(format!("create:{}", entry.text))
    }

    fn update(&self, id: EntryId, patch: &EntryPatch) -> GatewayResult<()> {
        let kind = if patch.position.is_some() {
            "position"
        } else if patch.parent_id.is_some() {
            "parent"
        } else {
            "content"
        };
        self.record(format!("update:{kind}:{id}"))
    }

    fn delete(&self, id: EntryId) -> GatewayResult<()> {
        self.record(format!("delete:{id}"))
    }

    fn list_all(&self) -> GatewayResult<Vec<Entry>> {
        Ok(self.seed.clone())
    }

    fn batch_update_positions(&self, updates: &[PositionUpdate]) -> GatewayResult<()> {
        self.batches.borrow_mut().push(updates.to_vec());
        self.record(format!("batch:{}", updates.len()))
    }
}

fn config() -> CanvasConfig {
    CanvasConfig {
        footprint: FootprintMetrics {
            char_width: 10.0,
            line_height: 20.0,
            text_padding: 0.0,
            media_width: 120.0,
            media_height: 120.0,
        },
        ..CanvasConfig::default()
    }
}

fn created(outcome: CreateOutcome) -> Entry {
    match outcome {
        CreateOutcome::Created { entry, .. } => entry,
        CreateOutcome::Duplicate { existing } => panic!("unexpected duplicate of {}", existing.id),
    }
}

fn add(
    session: &mut CanvasSession<&RecordingGateway>,
    text: &str,
    x: f64,
    parent: Option<EntryId>,
) -> Entry {
    created(
        session
            .create_entry(NewEntry::text(text, Point::new(x, 0.0), parent))
            .unwrap(),
    )
}

#[test]
fn open_loads_entries_from_gateway() {
    let mut store_seed = nestboard_core::EntryStore::new();
    let a = store_seed.create("alpha", Point::new(0.0, 0.0), None).unwrap();
    let b = store_seed.create("beta", Point::new(0.0, 0.0), Some(a.id)).unwrap();
    let gateway = RecordingGateway {
        seed: vec![a.clone(), b.clone()],
        ..RecordingGateway::default()
    };

    let (session, report) = CanvasSession::open(config(), &gateway).unwrap();
    assert_eq!(report.loaded, 2);
    assert!(report.rerooted.is_empty());
    assert_eq!(session.store().child_ids(Some(a.id)), &[b.id]);
}

#[test]
fn open_rejects_invalid_config() {
    let gateway = RecordingGateway::default();
    let bad = CanvasConfig {
        jitter_min: 20.0,
        jitter_max: 10.0,
        ..config()
    };
    assert!(CanvasSession::open(bad, &gateway).is_err());
}

#[test]
fn duplicate_create_is_redirected_without_persisting() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();

    let first = add(&mut session, "buy milk", 100.0, None);
    let outcome = session
        .create_entry(NewEntry::text("  Buy Milk ", Point::new(300.0, 0.0), None))
        .unwrap();

    match outcome {
        CreateOutcome::Duplicate { existing } => assert_eq!(existing.id, first.id),
        other => panic!("expected duplicate, got {other:?}"),
    }
    assert_eq!(session.store().len(), 1);
    assert_eq!(gateway.calls(), vec!["create:buy milk".to_string()]);
    assert_eq!(session.history().undo_len(), 1);
}

#[test]
fn persist_failure_keeps_entry_in_memory() {
    let gateway = RecordingGateway::default();
    gateway.fail_writes.set(true);
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();

    let outcome = session
        .create_entry(NewEntry::text("offline note", Point::new(0.0, 0.0), None))
        .unwrap();
    match outcome {
        CreateOutcome::Created {
            entry,
            persist_error,
        } => {
            assert!(persist_error.is_some());
            assert!(session.store().contains(entry.id));
        }
        other => panic!("expected created, got {other:?}"),
    }
}

#[test]
fn edit_to_empty_deletes_and_undo_restores() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();
    let parent = add(&mut session, "trip", 0.0, None);
    let child = add(&mut session, "tickets", 0.0, Some(parent.id));

    let outcome = session.commit_edit(parent.id, "   ", None, Vec::new()).unwrap();
    match outcome {
        EditOutcome::Deleted(deleted) => assert_eq!(deleted.removed.len(), 2),
        other => panic!("expected delete, got {other:?}"),
    }
    assert!(session.store().is_empty());

    match session.undo() {
        Some(HistoryEffect::Restored(restored)) => assert_eq!(restored.len(), 2),
        other => panic!("expected restore, got {other:?}"),
    }
    assert_eq!(session.store().child_ids(Some(parent.id)), &[child.id]);
    let calls = gateway.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &["create:trip".to_string(), "create:tickets".to_string()]
    );
}

#[test]
fn edit_commit_records_history_and_redo() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();
    let entry = add(&mut session, "draft", 0.0, None);

    let outcome = session.commit_edit(entry.id, "final", None, Vec::new()).unwrap();
    assert!(matches!(outcome, EditOutcome::Updated(ref updated) if updated.text == "final"));
    assert!(matches!(
        session.commit_edit(entry.id, "final", None, Vec::new()).unwrap(),
        EditOutcome::Unchanged(_)
    ));

    session.undo().unwrap();
    assert_eq!(session.store().get(entry.id).unwrap().text, "draft");
    session.redo().unwrap();
    assert_eq!(session.store().get(entry.id).unwrap().text, "final");
}

#[test]
fn deleting_current_view_returns_to_root() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();
    let parent = add(&mut session, "area", 0.0, None);
    add(&mut session, "inner", 0.0, Some(parent.id));
    assert_eq!(session.descendant_count(parent.id), 1);

    session.navigate_to(parent.id, 0).unwrap();
    let deleted = session.delete_entry(parent.id).unwrap();
    assert_eq!(deleted.removed.len(), 2);
    assert!(deleted.persist_error.is_none());
    assert_eq!(session.navigation().view(), ViewState::Root);
    assert_eq!(session.current_view().address, "/me");
}

#[test]
fn drag_saves_are_debounced_to_last_position() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();
    let entry = add(&mut session, "card", 0.0, None);

    for (step, now) in [0_u64, 100, 200].into_iter().enumerate() {
        let position = Point::new(step as f64 * 10.0, 5.0);
        session.move_entry(entry.id, position, now).unwrap();
    }
    assert_eq!(session.store().get(entry.id).unwrap().position, Point::new(20.0, 5.0));

    assert!(session.tick(600).saved.is_empty());
    let report = session.tick(700);
    assert_eq!(report.saved.len(), 1);
    assert_eq!(report.saved[0].position, Point::new(20.0, 5.0));
    assert_eq!(session.pending_saves(), 0);
    let position_updates = gateway
        .calls()
        .iter()
        .filter(|call| call.starts_with("update:position"))
        .count();
    assert_eq!(position_updates, 1);
}

#[test]
fn hub_layout_animates_then_commits_once() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();
    let left = add(&mut session, "aaaaaa", 0.0, None);
    let right = add(&mut session, "bbbbbb", 40.0, None);
    let group = HubGroup {
        entry_ids: vec![left.id, right.id],
        direction: Vector::new(1.0, 0.0),
    };
    let mut rng = StdRng::seed_from_u64(7);

    let plan = session
        .apply_hub_groups(std::slice::from_ref(&group), &mut rng, 1_000)
        .unwrap();
    assert_eq!(plan.moves().count(), 2);
    assert!(session.has_pending_layout());
    assert!(session
        .apply_hub_groups(std::slice::from_ref(&group), &mut rng, 1_010)
        .is_none());

    let mid = session.tick(1_100);
    assert_eq!(mid.frames.len(), 2);
    assert!(mid.committed.is_empty());
    assert_eq!(session.store().get(right.id).unwrap().position, Point::new(40.0, 0.0));

    let done = session.tick(1_950);
    assert_eq!(done.committed.len(), 2);
    assert!(!session.has_pending_layout());
    assert_eq!(gateway.batches.borrow().len(), 1);

    let left_x = session.store().get(left.id).unwrap().position.x;
    let right_x = session.store().get(right.id).unwrap().position.x;
    assert!(right_x - left_x >= 60.0 + 22.0 - 1e-9);
}

#[test]
fn drag_during_pending_layout_survives_commit() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();
    let left = add(&mut session, "aaaaaa", 0.0, None);
    let right = add(&mut session, "bbbbbb", 40.0, None);
    let group = HubGroup {
        entry_ids: vec![left.id, right.id],
        direction: Vector::new(1.0, 0.0),
    };
    session
        .apply_hub_groups(&[group], &mut StdRng::seed_from_u64(7), 0)
        .unwrap();

    let dragged = Point::new(500.0, 500.0);
    session.move_entry(right.id, dragged, 900).unwrap();
    assert_eq!(session.tick(920).frames.len(), 1);

    let commit = session.tick(950);
    assert_eq!(commit.committed.len(), 1);
    assert_eq!(commit.committed[0].id, left.id);
    assert!(gateway.batches.borrow()[0]
        .iter()
        .all(|update| update.id != right.id));
    assert_eq!(session.store().get(right.id).unwrap().position, dragged);

    let saved = session.tick(1_500).saved;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, right.id);
    assert_eq!(saved[0].position, session.store().get(right.id).unwrap().position);
}

#[test]
fn layout_commit_supersedes_older_drag_save() {
    let gateway = RecordingGateway::default();
    let slow_saves = CanvasConfig {
        save_debounce_ms: 2_000,
        ..config()
    };
    let (mut session, _) = CanvasSession::open(slow_saves, &gateway).unwrap();
    let left = add(&mut session, "aaaaaa", 0.0, None);
    let right = add(&mut session, "bbbbbb", 40.0, None);
    session.move_entry(right.id, Point::new(45.0, 0.0), 0).unwrap();
    assert_eq!(session.pending_saves(), 1);

    let group = HubGroup {
        entry_ids: vec![left.id, right.id],
        direction: Vector::new(1.0, 0.0),
    };
    session
        .apply_hub_groups(&[group], &mut StdRng::seed_from_u64(5), 10)
        .unwrap();
    let commit = session.tick(960);
    assert_eq!(commit.committed.len(), 2);
    assert_eq!(session.pending_saves(), 0);

    assert!(session.tick(2_500).saved.is_empty());
    let committed_right = commit
        .committed
        .iter()
        .find(|update| update.id == right.id)
        .unwrap();
    assert_eq!(
        session.store().get(right.id).unwrap().position,
        committed_right.position
    );
}

#[test]
fn reparent_is_undoable_without_losing_entries() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();
    let task = add(&mut session, "task", 0.0, None);
    let project = add(&mut session, "project", 50.0, None);

    session.reparent_entry(task.id, Some(project.id)).unwrap();
    assert_eq!(session.history().undo_len(), 3);

    match session.undo() {
        Some(HistoryEffect::Reparented(entry)) => assert_eq!(entry.id, task.id),
        other => panic!("expected reparent undo, got {other:?}"),
    }
    assert!(session.store().contains(task.id));
    assert!(session.store().contains(project.id));
    assert_eq!(session.store().get(task.id).unwrap().parent_id, None);
    assert_eq!(
        gateway.calls().last().unwrap(),
        &format!("update:parent:{}", task.id)
    );

    session.redo().unwrap();
    assert_eq!(session.store().get(task.id).unwrap().parent_id, Some(project.id));

    session.undo().unwrap();
    assert!(matches!(session.undo(), Some(HistoryEffect::Removed(ref gone)) if gone.len() == 1));
    assert!(session.store().contains(task.id));
    assert!(!session.store().contains(project.id));
}

#[test]
fn hub_groups_outside_current_view_are_ignored() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();
    let parent = add(&mut session, "box", 0.0, None);
    let hidden_a = add(&mut session, "one", 0.0, Some(parent.id));
    let hidden_b = add(&mut session, "two", 10.0, Some(parent.id));
    let group = HubGroup {
        entry_ids: vec![hidden_a.id, hidden_b.id],
        direction: Vector::new(1.0, 0.0),
    };
    let mut rng = StdRng::seed_from_u64(1);

    assert!(session.apply_hub_groups(&[group], &mut rng, 0).is_none());
    assert!(!session.has_pending_layout());
}

struct FixedSuggester(Result<Value, HubServiceError>);

impl HubSuggester for FixedSuggester {
    fn suggest(&self, candidates: &[HubCandidate]) -> Result<Value, HubServiceError> {
        assert!(candidates.len() >= 2);
        self.0.clone()
    }
}

#[test]
fn hub_request_tolerates_service_failure_and_bad_replies() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();
    let a = add(&mut session, "apples", 0.0, None);
    let b = add(&mut session, "pears", 30.0, None);
    let mut rng = StdRng::seed_from_u64(3);

    let failing = FixedSuggester(Err(HubServiceError("timeout".to_string())));
    assert!(session.request_hub_layout(&failing, &mut rng, 0).is_none());
    let garbage = FixedSuggester(Ok(json!({"groups": 42})));
    assert!(session.request_hub_layout(&garbage, &mut rng, 0).is_none());
    assert!(!session.has_pending_layout());

    let good = FixedSuggester(Ok(json!({
        "groups": [{"entryIds": [a.id.to_string(), b.id.to_string()], "direction": {"x": 1, "y": 0}}]
    })));
    assert!(session.request_hub_layout(&good, &mut rng, 0).is_some());
    let flushed = session.flush();
    assert_eq!(flushed.committed.len(), 2);
}

#[test]
fn open_address_stops_at_deepest_match() {
    let gateway = RecordingGateway::default();
    let (mut session, _) = CanvasSession::open(config(), &gateway).unwrap();
    let garden = add(&mut session, "Garden", 0.0, None);
    add(&mut session, "Beds", 0.0, Some(garden.id));

    let outcome = session.open_address("/me/garden/missing", 0).unwrap();
    assert_eq!(outcome.view, ViewState::Viewing(garden.id));
    assert_eq!(outcome.address, "/me/garden");
    assert!(session.navigation().back_stack().is_empty());

    let root = session.open_address("/me/nothing", 1_000).unwrap();
    assert_eq!(root.view, ViewState::Root);
}
