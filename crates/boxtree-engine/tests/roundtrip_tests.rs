//! Round-trip laws: text import/export and document serialization.

mod common;

use boxtree_engine::{EngineOptions, serialize};
use common::{manager, type_str};

#[test]
fn export_import_is_identity_on_text() {
    let samples = [
        ("Calc", "1+2*3"),
        ("Calc", "1 + 2\n+4+5\n+6+789"),
        ("MiniPy", "class X:\n    def x():\n        pass"),
        ("MiniPy", "x\n\"\"\"a\nb\"\"\"\npass"),
        ("MiniPy", ""),
    ];
    for (grammar, text) in samples {
        let mut tm = manager(grammar);
        tm.import_file(text);
        assert_eq!(tm.export_as_text(), text, "grammar {grammar}");
    }
}

#[test]
fn export_import_preserves_broken_documents_too() {
    let mut tm = manager("Calc");
    tm.import_file("1++$2");
    assert!(!tm.last_status());
    assert_eq!(tm.export_as_text(), "1++$2");
}

#[test]
fn serialized_document_reloads_identically() {
    let mut tm = manager("MiniPy");
    tm.import_file("class X:\n    def x():\n        pass\n    pass");
    assert!(tm.last_status());

    let json = serialize::save(&tm).unwrap();
    let reloaded = serialize::load(&json).unwrap();

    assert_eq!(reloaded.export_as_text(), tm.export_as_text());
    assert_eq!(reloaded.last_status(), tm.last_status());
    assert!(reloaded.tree_equals(&tm));
}

#[test]
fn serialization_preserves_language_boxes() {
    let mut tm = manager("PySql");
    tm.set_options(EngineOptions {
        autobox_insert: true,
    });
    type_str(&mut tm, "x = SELECT * FROM t");
    assert_eq!(tm.parsers().len(), 2);
    assert!(tm.last_status());

    let json = serialize::save(&tm).unwrap();
    let reloaded = serialize::load(&json).unwrap();

    assert_eq!(reloaded.export_as_text(), "x = SELECT * FROM t");
    assert_eq!(reloaded.parsers().len(), 2);
    assert!(reloaded.last_status());
    assert!(reloaded.tree_equals(&tm));
}

#[test]
fn status_after_edits_equals_a_fresh_parse_of_the_export() {
    let mut tm = manager("Calc");
    for edit in ["1", "+", "2", "*", "3"] {
        type_str(&mut tm, edit);

        let mut fresh = manager("Calc");
        fresh.import_file(&tm.export_as_text());
        assert_eq!(tm.last_status(), fresh.last_status());
    }
}
