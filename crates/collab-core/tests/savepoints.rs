//! Savepoints working against a live history.

use std::sync::Arc;
use std::time::SystemTime;

use collab_core::{
    ChangeSet, Error, History, HookPoint, Rope, SavepointMeta, SavepointStore, Transaction,
};

fn edit(doc: &Rope, pos: usize, insert: &str) -> (Transaction, Rope) {
    let len = doc.len_utf16();
    let change = ChangeSet::builder(len)
        .retain(pos)
        .insert(insert)
        .retain(len - pos)
        .build()
        .unwrap();
    let next = change.apply(doc).unwrap();
    (Transaction::new(change), next)
}

#[test]
fn test_savepoint_round_trip_with_history() {
    let history = Arc::new(History::new());
    let store = SavepointStore::with_history(history.clone());

    let mut doc = Rope::from_text("draft one");
    store.create(
        "checkpoint-1",
        &doc,
        history.current_index(),
        SavepointMeta {
            description: Some("before rewrite".to_string()),
            ..SavepointMeta::default()
        },
    );

    // Keep editing past the savepoint.
    let (t1, next) = edit(&doc, 9, " plus more");
    history.commit(t1, &doc).unwrap();
    doc = next;
    assert_eq!(doc.text(), "draft one plus more");

    // Restoring now fails: the document moved on.
    assert!(matches!(
        store.restore("checkpoint-1", &doc),
        Err(Error::LengthMismatch { .. })
    ));

    // Undo back to the snapshot's shape, then restore cleanly.
    let undo = history.undo().unwrap();
    doc = undo.apply(&doc).unwrap();
    let restored = store.restore("checkpoint-1", &doc).unwrap();
    assert_eq!(restored.text(), "draft one");
    assert_eq!(restored.hash64(), doc.hash64());
}

#[test]
fn test_dedup_returns_existing_id() {
    let store = SavepointStore::new();
    let doc = Rope::from_text("identical");
    let original = store.create("first", &doc, 0, SavepointMeta::default());

    // Different chunking, same content: still a duplicate.
    let rebuilt = Rope::from_text("identi").concat(&Rope::from_text("cal"));
    let coalesced = store.create("second", &rebuilt, 5, SavepointMeta::default());
    assert_eq!(original, coalesced);
    assert_eq!(store.len(), 1);
    assert!(store.get("second").is_none());
}

#[test]
fn test_queries_compose() {
    let store = SavepointStore::new();
    for (i, (user, view, tag)) in [
        ("alice", "editor", "wip"),
        ("alice", "preview", "release"),
        ("bob", "editor", "wip"),
    ]
    .iter()
    .enumerate()
    {
        store.create(
            &format!("sp-{}", i),
            &Rope::from_text(&format!("content {}", i)),
            i as isize,
            SavepointMeta {
                user_id: Some(user.to_string()),
                view_id: Some(view.to_string()),
                tags: vec![tag.to_string()],
                description: None,
            },
        );
    }

    assert_eq!(store.by_user("alice").len(), 2);
    assert_eq!(store.by_view("editor").len(), 2);
    assert_eq!(store.by_tag("wip").len(), 2);
    assert_eq!(store.by_tag("release").len(), 1);
    assert_eq!(
        store
            .in_time_range(SystemTime::UNIX_EPOCH, SystemTime::now())
            .len(),
        3
    );
}

#[test]
fn test_hook_points_fire_for_savepoints() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let history = Arc::new(History::new());
    let events = Arc::new(AtomicUsize::new(0));
    for point in [HookPoint::SavepointCreated, HookPoint::SavepointRestored] {
        let events = events.clone();
        history.register_hook(
            point,
            0,
            Box::new(move |_| {
                events.fetch_add(1, Ordering::Relaxed);
            }),
        );
    }

    let store = SavepointStore::with_history(history);
    let doc = Rope::from_text("watched");
    store.create("sp", &doc, -1, SavepointMeta::default());
    store.restore("sp", &doc).unwrap();
    assert_eq!(events.load(Ordering::Relaxed), 2);
}
