//! End-to-end history flows: commit, undo/redo round trips, branching,
//! multi-step navigation and pruning, all driving a real document.

use collab_core::{ChangeSet, History, Rope, Transaction};

/// A tiny editor: a document plus its history, committing through both.
struct Editor {
    doc: Rope,
    history: History,
}

impl Editor {
    fn new(text: &str) -> Self {
        Editor {
            doc: Rope::from_text(text),
            history: History::new(),
        }
    }

    fn edit(&mut self, pos: usize, delete: usize, insert: &str) {
        let len = self.doc.len_utf16();
        let change = ChangeSet::builder(len)
            .retain(pos)
            .delete(delete)
            .insert(insert)
            .retain(len - pos - delete)
            .build()
            .unwrap();
        let next = change.apply(&self.doc).unwrap();
        self.history
            .commit(Transaction::new(change), &self.doc)
            .unwrap();
        self.doc = next;
    }

    fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(transaction) => {
                self.doc = transaction.apply(&self.doc).unwrap();
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(transaction) => {
                self.doc = transaction.apply(&self.doc).unwrap();
                true
            }
            None => false,
        }
    }
}

#[test]
fn test_undo_redo_restores_content_hash() {
    let mut editor = Editor::new("The quick brown fox");
    let h0 = editor.doc.hash64();

    editor.edit(4, 5, "slow");
    let h1 = editor.doc.hash64();
    editor.edit(9, 5, "red");
    let h2 = editor.doc.hash64();
    assert_eq!(editor.doc.text(), "The slow red fox");

    assert!(editor.undo());
    assert_eq!(editor.doc.hash64(), h1);
    assert!(editor.undo());
    assert_eq!(editor.doc.hash64(), h0);
    assert!(!editor.undo());

    assert!(editor.redo());
    assert_eq!(editor.doc.hash64(), h1);
    assert!(editor.redo());
    assert_eq!(editor.doc.hash64(), h2);
    assert!(!editor.redo());
}

#[test]
fn test_deep_session_round_trips() {
    let mut editor = Editor::new("");
    let mut hashes = vec![editor.doc.hash64()];
    for i in 0..60 {
        let pos = editor.doc.len_utf16() / 2;
        editor.edit(pos, 0, &format!("<{}>", i));
        hashes.push(editor.doc.hash64());
    }
    for expected in hashes.iter().rev().skip(1) {
        assert!(editor.undo());
        assert_eq!(editor.doc.hash64(), *expected);
    }
    for expected in hashes.iter().skip(1) {
        assert!(editor.redo());
        assert_eq!(editor.doc.hash64(), *expected);
    }
}

#[test]
fn test_branching_keeps_both_futures() {
    let mut editor = Editor::new("root");

    editor.edit(4, 0, "-a");
    assert_eq!(editor.doc.text(), "root-a");
    editor.undo();

    editor.edit(4, 0, "-b");
    assert_eq!(editor.doc.text(), "root-b");

    // Redo after another undo follows the newest branch.
    editor.undo();
    assert_eq!(editor.doc.text(), "root");
    editor.redo();
    assert_eq!(editor.doc.text(), "root-b");

    // The first branch is still reachable through goto.
    let transition = editor.history.goto(0).unwrap().unwrap();
    editor.doc = transition.apply(&editor.doc).unwrap();
    assert_eq!(editor.doc.text(), "root-a");
}

#[test]
fn test_earlier_later_compose_across_steps() {
    let mut editor = Editor::new("");
    editor.edit(0, 0, "a");
    editor.edit(1, 0, "b");
    editor.edit(2, 0, "c");
    assert_eq!(editor.doc.text(), "abc");

    let back = editor.history.earlier(2).unwrap().unwrap();
    editor.doc = back.apply(&editor.doc).unwrap();
    assert_eq!(editor.doc.text(), "a");
    assert_eq!(editor.history.current_index(), 0);

    let forward = editor.history.later(2).unwrap().unwrap();
    editor.doc = forward.apply(&editor.doc).unwrap();
    assert_eq!(editor.doc.text(), "abc");
}

#[test]
fn test_single_step_accessors_match_undo_redo() {
    let mut editor = Editor::new("");
    editor.edit(0, 0, "x");
    editor.edit(1, 0, "y");

    let stepped = editor.history.earlier_step().unwrap();
    editor.doc = stepped.apply(&editor.doc).unwrap();
    assert_eq!(editor.doc.text(), "x");

    let stepped = editor.history.later_step().unwrap();
    editor.doc = stepped.apply(&editor.doc).unwrap();
    assert_eq!(editor.doc.text(), "xy");
}

#[test]
fn test_goto_across_distant_branches() {
    let mut editor = Editor::new("");
    editor.edit(0, 0, "common ");
    editor.edit(7, 0, "left");
    editor.edit(11, 0, " deep");
    assert_eq!(editor.doc.text(), "common left deep");

    // Jump back two revisions, branch, build a second line of history.
    editor.undo();
    editor.undo();
    editor.edit(7, 0, "right");
    assert_eq!(editor.doc.text(), "common right");

    // Cross from the right branch tip to the left branch tip in one move.
    let transition = editor.history.goto(2).unwrap().unwrap();
    editor.doc = transition.apply(&editor.doc).unwrap();
    assert_eq!(editor.doc.text(), "common left deep");

    // And back again.
    let transition = editor.history.goto(3).unwrap().unwrap();
    editor.doc = transition.apply(&editor.doc).unwrap();
    assert_eq!(editor.doc.text(), "common right");
}

#[test]
fn test_pruned_history_still_navigates() {
    let mut editor = Editor::new("");
    editor.history.set_max_size(10);
    for i in 0..25 {
        editor.edit(editor.doc.len_utf16(), 0, &format!("{},", i % 10));
    }
    assert_eq!(editor.history.revision_count(), 10);

    // Only the surviving window can be undone.
    let mut undone = 0;
    while editor.undo() {
        undone += 1;
    }
    assert_eq!(undone, 10);
    assert!(editor.history.at_root());

    while editor.redo() {}
    assert_eq!(editor.doc.text().matches(',').count(), 25);
}

#[test]
fn test_transactions_carry_selections() {
    let doc = Rope::from_text("hello");
    let change = ChangeSet::builder(5).retain(5).insert("!").build().unwrap();
    let selection = collab_core::Selection::point(5);
    let transaction = Transaction::new(change).with_selection(selection.clone());
    assert_eq!(transaction.selection(), Some(&selection));

    let history = History::new();
    history.commit(transaction, &doc).unwrap();
    let stored = history.revision(0).unwrap();
    assert_eq!(stored.forward().selection(), Some(&selection));
}
