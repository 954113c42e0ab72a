//! Indentation engine behavior over the MiniPy grammar.

mod common;

use boxtree_engine::TreeManager;
use common::{manager, type_str};

/// Chain as (symbol, lexeme) pairs from BOS to EOS.
fn chain(tm: &TreeManager) -> Vec<(String, String)> {
    let arena = tm.arena();
    let mut out = Vec::new();
    let mut cursor = Some(tm.outer_record().bos);
    while let Some(node) = cursor {
        out.push((
            arena.symbol_name(node).to_owned(),
            arena.lexeme(node).to_owned(),
        ));
        cursor = arena.next_term(node);
    }
    out
}

fn symbols(tm: &TreeManager) -> Vec<String> {
    chain(tm).into_iter().map(|(s, _)| s).collect()
}

#[test]
fn virtual_tokens_thread_into_the_chain() {
    let mut tm = manager("MiniPy");
    tm.import_file("class X:\n    pass");
    assert!(tm.last_status());

    assert_eq!(
        symbols(&tm),
        vec![
            "bos", "kwclass", "ws", "name", "colon", "nl", "NEWLINE", "INDENT", "ws", "kwpass",
            "NEWLINE", "DEDENT", "eos",
        ]
    );
}

#[test]
fn trailing_dedents_come_after_the_final_newline() {
    let mut tm = manager("MiniPy");
    tm.import_file("class X:\n    def x():\n        pass");
    assert!(tm.last_status());

    let symbols = symbols(&tm);
    let tail: Vec<&str> = symbols.iter().rev().take(5).map(String::as_str).collect();
    // Reversed: eos, DEDENT, DEDENT, NEWLINE, kwpass.
    assert_eq!(tail, vec!["eos", "DEDENT", "DEDENT", "NEWLINE", "kwpass"]);
}

#[test]
fn removing_indentation_removes_the_bracket_tokens() {
    let mut tm = manager("MiniPy");
    tm.import_file("class X:\n    pass");
    assert!(tm.last_status());
    assert!(symbols(&tm).contains(&"INDENT".to_owned()));

    // Delete the four leading spaces of "pass".
    for _ in 0..9 {
        tm.move_cursor(boxtree_engine::Direction::Right);
    }
    for _ in 0..4 {
        tm.delete();
    }
    assert_eq!(tm.export_as_text(), "class X:\npass");

    // A header with no body is valid at file scope, and the INDENT/DEDENT
    // pair is gone.
    assert!(tm.last_status());
    let symbols = symbols(&tm);
    assert!(!symbols.contains(&"INDENT".to_owned()));
    assert!(!symbols.contains(&"DEDENT".to_owned()));
}

#[test]
fn unexpected_indentation_after_bos() {
    let mut tm = manager("MiniPy");
    type_str(&mut tm, "test");
    assert!(tm.last_status());

    tm.home();
    tm.insert(' ');
    assert!(!tm.last_status());

    tm.backspace();
    assert!(tm.last_status());
}

#[test]
fn blank_and_comment_lines_are_not_logical() {
    let mut tm = manager("MiniPy");
    tm.import_file("class X:\n    pass\n    \n# note\n    pass");
    assert!(tm.last_status());

    // Neither the blank line nor the comment line emitted brackets: one
    // INDENT total, for the block.
    let count = symbols(&tm).iter().filter(|s| *s == "INDENT").count();
    assert_eq!(count, 1);
}

#[test]
fn dedent_to_unknown_level_is_an_error() {
    let mut tm = manager("MiniPy");
    tm.import_file("class X:\n        pass\n    pass");
    assert!(!tm.last_status());
}

#[test]
fn multiline_strings_suspend_logical_lines() {
    let mut tm = manager("MiniPy");
    tm.import_file("class X:\n    \"\"\"a\nb\"\"\"\n    pass");
    assert!(tm.last_status());

    // The string is one token; the line starting inside it emitted no
    // NEWLINE of its own.
    let newline_count = symbols(&tm).iter().filter(|s| *s == "NEWLINE").count();
    // Boundaries: after the header, after the string statement, after pass.
    assert_eq!(newline_count, 3);
}

#[test]
fn undo_steps_restore_indentation_state() {
    let mut tm = manager("MiniPy");
    type_str(&mut tm, "class");
    tm.undo_snapshot();
    type_str(&mut tm, " X:");
    tm.undo_snapshot();
    type_str(&mut tm, "\n    ");
    tm.undo_snapshot();
    type_str(&mut tm, "pass");
    assert_eq!(tm.export_as_text(), "class X:\n    pass");
    assert!(tm.last_status());

    tm.undo();
    assert_eq!(tm.export_as_text(), "class X:\n    ");
    tm.undo();
    assert_eq!(tm.export_as_text(), "class X:");
    tm.undo();
    assert_eq!(tm.export_as_text(), "class");

    tm.redo();
    tm.redo();
    tm.redo();
    assert_eq!(tm.export_as_text(), "class X:\n    pass");
    assert!(tm.last_status());

    let symbols = symbols(&tm);
    let tail: Vec<&str> = symbols.iter().rev().take(4).map(String::as_str).collect();
    assert_eq!(tail, vec!["eos", "DEDENT", "NEWLINE", "kwpass"]);
}
