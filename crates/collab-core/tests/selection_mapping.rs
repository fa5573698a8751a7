//! Multi-cursor selections carried through edits.

use collab_core::{Assoc, ChangeSet, PositionMapper, Rope, SelRange, Selection};

#[test]
fn test_multi_cursor_insert_scenario() {
    // Carets on "Line 1\nLine 2\nLine 3" at 6 and 13; inserting "X" at 6
    // keeps the first caret (Before) and shifts the second.
    let doc = Rope::from_text("Line 1\nLine 2\nLine 3");
    let len = doc.len_utf16();
    let change = ChangeSet::builder(len)
        .retain(6)
        .insert("X")
        .retain(len - 6)
        .build()
        .unwrap();

    let selection = Selection::from_ranges(
        vec![SelRange::point(6), SelRange::point(13)],
        0,
    );
    let mapped = selection.map_through(&change, None);
    let cursors: Vec<usize> = mapped.ranges().iter().map(|r| r.cursor()).collect();
    assert_eq!(cursors, vec![6, 14]);
}

#[test]
fn test_before_and_after_at_same_insert() {
    let doc = Rope::from_text("ab");
    let change = ChangeSet::builder(2).retain(1).insert("--").retain(1).build().unwrap();
    assert_eq!(change.apply(&doc).unwrap().text(), "a--b");

    assert_eq!(change.map_pos(1, Assoc::Before), 1);
    assert_eq!(change.map_pos(1, Assoc::After), 3);
}

#[test]
fn test_selection_survives_full_editing_round() {
    let doc = Rope::from_text("fn alpha() {}\nfn beta() {}");
    let len = doc.len_utf16();

    // Cursors at the start of both function names.
    let selection = Selection::from_ranges(
        vec![
            SelRange::point(3).with_assoc(Assoc::After),
            SelRange::point(17).with_assoc(Assoc::After),
        ],
        1,
    );

    // Prefix both names (simulating a multi-cursor typed character).
    let change = ChangeSet::builder(len)
        .retain(3)
        .insert("x")
        .retain(14)
        .insert("x")
        .retain(len - 17)
        .build()
        .unwrap();
    let after = change.apply(&doc).unwrap();
    assert_eq!(after.text(), "fn xalpha() {}\nfn xbeta() {}");

    let mapped = selection.map_through(&change, Some(&after));
    assert_eq!(mapped.ranges()[0].cursor(), 4);
    assert_eq!(mapped.ranges()[1].cursor(), 19);
    assert_eq!(mapped.primary_index(), 1);
}

#[test]
fn test_cursor_inside_deleted_region() {
    let doc = Rope::from_text("keep REMOVED keep");
    let len = doc.len_utf16();
    let change = ChangeSet::builder(len)
        .retain(5)
        .delete(8)
        .retain(len - 13)
        .build()
        .unwrap();
    assert_eq!(change.apply(&doc).unwrap().text(), "keep keep");

    for assoc in [Assoc::Before, Assoc::After] {
        assert_eq!(change.map_pos(9, assoc), 5);
    }
}

#[test]
fn test_word_snapping_inside_deletion() {
    let doc = Rope::from_text("alpha beta gamma");
    let len = doc.len_utf16();
    // Delete "ta gam" — a span straddling two words.
    let change = ChangeSet::builder(len)
        .retain(8)
        .delete(6)
        .retain(len - 14)
        .build()
        .unwrap();
    let after = change.apply(&doc).unwrap();
    assert_eq!(after.text(), "alpha bema");

    let mapped_prev = change.map_pos_in(Some(&after), 10, Assoc::BeforeWord);
    assert_eq!(mapped_prev, 6);

    let mapped_next = change.map_pos_in(Some(&after), 10, Assoc::AfterWord);
    assert_eq!(mapped_next, after.len_utf16());
}

#[test]
fn test_exact_size_replacement_keeps_cursor_column() {
    // Replace a word with another of the same length; a sticky cursor in
    // the middle keeps its column, a plain one collapses.
    let doc = Rope::from_text("color = red;");
    let len = doc.len_utf16();
    let change = ChangeSet::builder(len)
        .retain(8)
        .delete(3)
        .insert("BLU")
        .retain(len - 11)
        .build()
        .unwrap();
    assert_eq!(change.apply(&doc).unwrap().text(), "color = BLU;");

    assert_eq!(change.map_pos(9, Assoc::BeforeSticky), 9);
    assert_eq!(change.map_pos(10, Assoc::AfterSticky), 10);
    assert_eq!(change.map_pos(9, Assoc::Before), 8);
}

#[test]
fn test_merge_then_map_pipeline() {
    let doc = Rope::from_text("abcdefghij");
    let selection = Selection::from_ranges(
        vec![
            SelRange::new(0, 4),
            SelRange::new(3, 7),
            SelRange::point(9),
        ],
        2,
    )
    .merge_overlapping();
    assert_eq!(selection.len(), 2);

    let change = ChangeSet::builder(10).retain(5).insert("XX").retain(5).build().unwrap();
    let mapped = selection.map_through(&change, None);
    // The merged range's head sat past the insert and was pushed right.
    assert_eq!(mapped.ranges()[0], SelRange::new(0, 9));
    assert_eq!(mapped.ranges()[1].cursor(), 11);
}

#[test]
fn test_large_sorted_batch_uses_stream_path() {
    let len = 10_000usize;
    let mut builder = ChangeSet::builder(len);
    // An edit every 100 units.
    for _ in 0..(len / 100) {
        builder = builder.retain(90).delete(10).insert("12345");
    }
    let change = builder.build().unwrap();

    let positions: Vec<(usize, Assoc)> =
        (0..=len).step_by(7).map(|p| (p, Assoc::Before)).collect();
    let mapper = PositionMapper::new(&change);
    let batch = mapper.map(&positions);
    for (i, &(pos, assoc)) in positions.iter().enumerate() {
        assert_eq!(batch[i], change.map_pos(pos, assoc), "position {}", pos);
    }
}
