//! Language boxes: manual insertion, automatic insertion and removal, undo.

mod common;

use boxtree_engine::{EngineOptions, TreeManager};
use common::{manager, type_str};

fn active_parsers(tm: &TreeManager) -> Vec<(String, bool)> {
    tm.parsers()
}

#[test]
fn manual_box_hosts_an_inner_document() {
    let mut tm = manager("PySql");
    type_str(&mut tm, "x = ");
    assert!(!tm.last_status());

    tm.add_language_box("SQL").unwrap();
    assert_eq!(active_parsers(&tm).len(), 2);
    // Empty inner document: neither parser is satisfied yet.
    assert!(!tm.last_status());

    type_str(&mut tm, "SELECT * FROM t");
    let parsers = active_parsers(&tm);
    assert_eq!(parsers.len(), 2);
    assert!(parsers.iter().all(|(_, ok)| *ok));
    assert!(tm.last_status());
    assert_eq!(tm.export_as_text(), "x = SELECT * FROM t");
}

#[test]
fn leave_box_returns_to_the_outer_document() {
    let mut tm = manager("PySql");
    type_str(&mut tm, "x = ");
    tm.add_language_box("SQL").unwrap();
    type_str(&mut tm, "SELECT n FROM t");
    assert!(tm.last_status());

    tm.leave_language_box();
    // Typing continues in the outer grammar after the box.
    type_str(&mut tm, "\ny = z");
    assert!(tm.last_status());
    assert_eq!(tm.export_as_text(), "x = SELECT n FROM t\ny = z");
}

#[test]
fn emptied_manual_box_survives() {
    let mut tm = manager("PySql");
    type_str(&mut tm, "x = ");
    tm.add_language_box("SQL").unwrap();
    tm.insert('a');
    tm.backspace();

    assert_eq!(tm.export_as_text(), "x = ");
    assert_eq!(active_parsers(&tm).len(), 2);
}

#[test]
fn auto_insertion_wraps_the_failing_span() {
    let mut tm = manager("PySql");
    tm.set_options(EngineOptions {
        autobox_insert: true,
    });

    type_str(&mut tm, "x = SELECT * FROM t");

    let parsers = active_parsers(&tm);
    assert_eq!(parsers.len(), 2);
    assert_eq!(parsers[1].0, "SQL");
    assert!(parsers.iter().all(|(_, ok)| *ok));
    assert!(tm.last_status());
    assert_eq!(tm.export_as_text(), "x = SELECT * FROM t");
}

#[test]
fn auto_inserted_box_is_removed_when_emptied() {
    let mut tm = manager("PySql");
    tm.set_options(EngineOptions {
        autobox_insert: true,
    });

    type_str(&mut tm, "x = SELECT * FROM t");
    assert_eq!(active_parsers(&tm).len(), 2);

    for _ in 0.."SELECT * FROM t".len() {
        tm.backspace();
    }
    assert_eq!(tm.export_as_text(), "x = ");
    assert_eq!(active_parsers(&tm).len(), 1);
}

#[test]
fn undo_past_box_insertion_deactivates_the_inner_parser() {
    let mut tm = manager("PySql");
    tm.set_options(EngineOptions {
        autobox_insert: true,
    });

    type_str(&mut tm, "x = y");
    assert!(tm.last_status());
    tm.undo_snapshot();

    for _ in 0.."y".len() {
        tm.backspace();
    }
    type_str(&mut tm, "SELECT * FROM t");
    assert_eq!(active_parsers(&tm).len(), 2);
    tm.undo_snapshot();

    tm.undo();
    assert_eq!(tm.export_as_text(), "x = y");
    assert_eq!(active_parsers(&tm).len(), 1);
    assert!(tm.last_status());

    tm.redo();
    assert_eq!(tm.export_as_text(), "x = SELECT * FROM t");
    assert_eq!(active_parsers(&tm).len(), 2);
}
