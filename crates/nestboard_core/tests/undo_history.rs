use nestboard_core::{
    ContentSnapshot, DeleteMode, EntryStore, HistoryEffect, LinkCard, Point, UndoManager,
    UndoRecord,
};

fn origin() -> Point {
    Point::new(0.0, 0.0)
}

#[test]
fn undo_create_restores_previous_state_and_redo_recreates_same_id() {
    let mut store = EntryStore::new();
    let mut history = UndoManager::new(50);
    let entry = store.create("idea", origin(), None).unwrap();
    history.record(UndoRecord::Create {
        entry: entry.clone(),
    });

    assert!(matches!(history.undo(&mut store), Some(HistoryEffect::Removed(_))));
    assert!(store.is_empty());

    assert!(matches!(history.redo(&mut store), Some(HistoryEffect::Restored(_))));
    assert_eq!(store.get(entry.id).unwrap().text, "idea");
}

#[test]
fn undo_cascade_delete_restores_whole_subtree() {
    let mut store = EntryStore::new();
    let mut history = UndoManager::new(50);
    let a = store.create("A", origin(), None).unwrap();
    let b = store.create("B", Point::new(10.0, 0.0), Some(a.id)).unwrap();
    let c = store.create("C", Point::new(20.0, 0.0), Some(b.id)).unwrap();
    let sibling = store.create("D", origin(), Some(a.id)).unwrap();

    let removed = store.delete(a.id, DeleteMode::Cascade).unwrap();
    assert_eq!(removed.len(), 4);
    history.record(UndoRecord::Delete { removed });
    assert!(store.is_empty());

    match history.undo(&mut store) {
        Some(HistoryEffect::Restored(restored)) => {
            assert_eq!(restored.len(), 4);
            assert_eq!(restored[0].id, a.id);
        }
        other => panic!("unexpected effect: {other:?}"),
    }
    assert_eq!(store.get(c.id).unwrap().parent_id, Some(b.id));
    assert_eq!(store.get(c.id).unwrap().position, Point::new(20.0, 0.0));
    let mut children = store.child_ids(Some(a.id)).to_vec();
    children.sort();
    let mut expected = vec![b.id, sibling.id];
    expected.sort();
    assert_eq!(children, expected);

    assert!(matches!(history.redo(&mut store), Some(HistoryEffect::Removed(ref gone)) if gone.len() == 4));
    assert!(store.is_empty());
}

#[test]
fn edit_undo_restores_text_media_and_links() {
    let mut store = EntryStore::new();
    let mut history = UndoManager::new(50);
    let entry = store.create("before", origin(), None).unwrap();
    let before = entry.content_snapshot();
    let after = ContentSnapshot {
        text: "after".to_string(),
        media: None,
        link_cards: vec![LinkCard::new("https://example.com")],
    };
    store.update(entry.id, &after.clone().into()).unwrap();
    history.record(UndoRecord::Edit {
        id: entry.id,
        before,
        after,
    });

    history.undo(&mut store).unwrap();
    let restored = store.get(entry.id).unwrap();
    assert_eq!(restored.text, "before");
    assert!(restored.link_cards.is_empty());

    history.redo(&mut store).unwrap();
    assert_eq!(store.get(entry.id).unwrap().link_cards.len(), 1);
}

#[test]
fn history_is_bounded_by_capacity() {
    let mut store = EntryStore::new();
    let mut history = UndoManager::new(3);
    for index in 0..5 {
        let entry = store.create(format!("n{index}"), origin(), None).unwrap();
        history.record(UndoRecord::Create { entry });
    }
    assert_eq!(history.undo_len(), 3);

    while history.undo(&mut store).is_some() {}
    assert_eq!(store.len(), 2);
    assert_eq!(history.redo_len(), 3);
}

#[test]
fn reparent_undo_moves_entry_back_and_redo_moves_it_again() {
    let mut store = EntryStore::new();
    let mut history = UndoManager::new(50);
    let inbox = store.create("inbox", origin(), None).unwrap();
    let task = store.create("task", origin(), None).unwrap();
    store.reparent(task.id, Some(inbox.id)).unwrap();
    history.record(UndoRecord::Reparent {
        id: task.id,
        from: None,
        to: Some(inbox.id),
    });

    match history.undo(&mut store) {
        Some(HistoryEffect::Reparented(entry)) => assert_eq!(entry.parent_id, None),
        other => panic!("unexpected effect: {other:?}"),
    }
    assert_eq!(store.child_ids(None), &[inbox.id, task.id]);

    assert!(matches!(
        history.redo(&mut store),
        Some(HistoryEffect::Reparented(ref entry)) if entry.parent_id == Some(inbox.id)
    ));
    assert_eq!(store.child_ids(Some(inbox.id)), &[task.id]);
}
