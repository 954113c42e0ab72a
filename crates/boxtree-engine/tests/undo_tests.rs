//! Undo/redo over the versioned tree.

mod common;

use boxtree_engine::{Direction, dump_tree};
use common::{manager, type_str};

#[test]
fn simple_undo_redo_walks_the_text_history() {
    let mut tm = manager("Calc");
    tm.insert('1');
    tm.undo_snapshot();
    tm.insert('+');
    tm.undo_snapshot();
    tm.insert('2');
    assert_eq!(tm.export_as_text(), "1+2");

    tm.undo();
    assert_eq!(tm.export_as_text(), "1+");
    tm.undo();
    assert_eq!(tm.export_as_text(), "1");
    tm.undo();
    assert_eq!(tm.export_as_text(), "");

    tm.redo();
    assert_eq!(tm.export_as_text(), "1");
    tm.redo();
    assert_eq!(tm.export_as_text(), "1+");
    tm.redo();
    assert_eq!(tm.export_as_text(), "1+2");
    assert!(tm.last_status());
}

#[test]
fn undo_restores_parse_status() {
    let mut tm = manager("Calc");
    type_str(&mut tm, "1+2");
    tm.undo_snapshot();
    assert!(tm.last_status());

    tm.insert('+');
    assert!(!tm.last_status());

    tm.undo();
    assert_eq!(tm.export_as_text(), "1+2");
    assert!(tm.last_status());
}

#[test]
fn undo_after_edits_matches_a_fresh_parse_of_the_same_text() {
    let program = "class X:\n    def x():\n        pass\n    def y():\n        pass";
    let mut tm = manager("MiniPy");
    tm.import_file(program);
    assert!(tm.last_status());
    let root = tm.outer_record().root;
    let snapshot = dump_tree(tm.arena(), root);

    // A burst of edits, then undo back to the import point.
    tm.end();
    tm.undo_snapshot();
    type_str(&mut tm, "\nzzz");
    tm.undo_snapshot();
    tm.backspace();
    tm.backspace();
    assert_ne!(tm.export_as_text(), program);

    tm.undo();
    tm.undo();
    assert_eq!(tm.export_as_text(), program);

    // Same root object, node-symbol-equal to the original tree and to a
    // fresh parse of the same text.
    assert_eq!(tm.outer_record().root, root);
    assert_eq!(dump_tree(tm.arena(), root), snapshot);

    let mut fresh = manager("MiniPy");
    fresh.import_file(program);
    assert!(tm.tree_equals(&fresh));
}

#[test]
fn full_undo_then_full_redo_round_trips_the_tree() {
    let mut tm = manager("Calc");
    type_str(&mut tm, "1*2");
    tm.undo_snapshot();
    type_str(&mut tm, "+3");
    tm.undo_snapshot();
    tm.move_cursor(Direction::Left);
    tm.backspace();
    assert_eq!(tm.export_as_text(), "1*23");

    let final_dump = dump_tree(tm.arena(), tm.outer_record().root);
    let final_status = tm.last_status();

    tm.undo();
    tm.undo();
    tm.undo();
    assert_eq!(tm.export_as_text(), "");

    tm.redo();
    tm.redo();
    tm.redo();
    assert_eq!(tm.export_as_text(), "1*23");
    assert_eq!(dump_tree(tm.arena(), tm.outer_record().root), final_dump);
    assert_eq!(tm.last_status(), final_status);
}

#[test]
fn new_edits_after_undo_drop_the_redo_branch() {
    let mut tm = manager("Calc");
    type_str(&mut tm, "12");
    tm.undo_snapshot();
    type_str(&mut tm, "+34");
    assert_eq!(tm.export_as_text(), "12+34");

    tm.undo();
    assert_eq!(tm.export_as_text(), "12");

    type_str(&mut tm, "*56");
    assert_eq!(tm.export_as_text(), "12*56");
    assert!(tm.last_status());

    // Redo has nothing to restore.
    tm.redo();
    assert_eq!(tm.export_as_text(), "12*56");
}

#[test]
fn undo_underflow_is_a_noop() {
    let mut tm = manager("Calc");
    tm.undo();
    tm.undo();
    assert_eq!(tm.export_as_text(), "");
    tm.insert('7');
    assert!(tm.last_status());
}
