//! Multi-line tokens (MultiText containers and their segments).

mod common;

use boxtree_core::NodeKind;
use common::{manager, type_str};

#[test]
fn a_token_crossing_newlines_is_one_unit() {
    let mut tm = manager("MiniPy");
    tm.import_file("class X:\n    \"\"\"a\nb\"\"\"\n    pass");
    assert!(tm.last_status());

    // Exactly one MultiText container exists and its symbol is the string
    // class.
    let arena = tm.arena();
    let containers: Vec<_> = (0..arena.len() as u32)
        .map(boxtree_core::NodeId::from_raw)
        .filter(|&id| {
            arena.kind(id) == NodeKind::MultiText && arena.parent(id).is_some()
        })
        .collect();
    assert_eq!(containers.len(), 1);
    assert_eq!(arena.symbol_name(containers[0]), "str");

    // Segments carry the text, split at the newline.
    let segments: Vec<String> = arena
        .children(containers[0])
        .iter()
        .map(|&s| arena.lexeme(s).to_owned())
        .collect();
    assert_eq!(segments, vec!["\"\"\"a", "\n", "b\"\"\""]);
}

#[test]
fn editing_inside_a_multiline_token_relexes_the_whole_run() {
    let mut tm = manager("MiniPy");
    tm.import_file("class X:\n    \"\"\"a\nb\"\"\"\n    pass");
    assert!(tm.last_status());

    // Insert inside the first string segment: after `"""a`.
    let pos = tm.export_as_text().find('a').unwrap() + 1;
    for _ in 0..pos {
        tm.move_cursor(boxtree_engine::Direction::Right);
    }
    tm.insert('z');
    assert!(tm.last_status());
    assert!(tm.export_as_text().contains("\"\"\"az\nb\"\"\""));
}

#[test]
fn closing_quotes_join_the_lines_into_one_token() {
    let mut tm = manager("MiniPy");
    // An unterminated string leaves the document broken.
    tm.import_file("x\n\"\"\"a\nb");
    assert!(!tm.last_status());

    // Typing the closing quotes fuses the tail into a string token.
    tm.end();
    // Cursor sits at the start; move to the very end of the document.
    let len = tm.export_as_text().chars().count();
    while tm.cursor_position() < len {
        tm.move_cursor(boxtree_engine::Direction::Right);
    }
    type_str(&mut tm, "\"\"\"");
    assert!(tm.last_status());
    assert_eq!(tm.export_as_text(), "x\n\"\"\"a\nb\"\"\"");
}

#[test]
fn deleting_a_quote_splits_the_token_again() {
    let mut tm = manager("MiniPy");
    tm.import_file("x\n\"\"\"a\nb\"\"\"");
    assert!(tm.last_status());

    // Remove one closing quote: no longer a complete string.
    let len = tm.export_as_text().chars().count();
    while tm.cursor_position() < len {
        tm.move_cursor(boxtree_engine::Direction::Right);
    }
    tm.backspace();
    assert!(!tm.last_status());
    assert_eq!(tm.export_as_text(), "x\n\"\"\"a\nb\"\"");
}
