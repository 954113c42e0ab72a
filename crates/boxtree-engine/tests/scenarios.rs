//! End-to-end editing scenarios over the calculator and token-collapse
//! grammars.

mod common;

use boxtree_engine::{Direction, dump_tree};
use common::{manager, type_str};

#[test]
fn typing_flips_status_per_keystroke() {
    let mut tm = manager("Calc");
    assert!(!tm.last_status());
    tm.insert('1');
    assert!(tm.last_status());
    tm.insert('+');
    assert!(!tm.last_status());
    tm.insert('2');
    assert!(tm.last_status());
    assert_eq!(tm.export_as_text(), "1+2");
}

#[test]
fn calculator_tree_shape() {
    let mut tm = manager("Calc");
    type_str(&mut tm, "1+2");
    assert!(tm.last_status());
    insta::assert_snapshot!(dump_tree(tm.arena(), tm.outer_record().root), @r#"
    Root
      bos
      E
        E
          T
            P
              INT "1"
        plus "+"
        T
          P
            INT "2"
      eos
    "#);
}

#[test]
fn error_and_repair_restore_the_original_tree() {
    let mut tm = manager("Calc");
    type_str(&mut tm, "1+2");
    assert!(tm.last_status());
    let before = dump_tree(tm.arena(), tm.outer_record().root);

    // "1+2" -> "1++2": one error node, status false.
    tm.move_cursor(Direction::Left);
    tm.insert('+');
    assert_eq!(tm.export_as_text(), "1++2");
    assert!(!tm.last_status());
    assert_eq!(tm.error_nodes().len(), 1);

    // Delete the inserted "+": the tree is node-symbol-identical again.
    tm.backspace();
    assert_eq!(tm.export_as_text(), "1+2");
    assert!(tm.last_status());
    assert!(tm.error_nodes().is_empty());
    let after = dump_tree(tm.arena(), tm.outer_record().root);
    assert_eq!(before, after);
}

#[test]
fn reductions_above_unchanged_input_are_reused() {
    let mut tm = manager("Calc");
    type_str(&mut tm, "1+2");
    assert!(tm.last_status());

    // The P/T/E chain over "1".
    let one = tm
        .arena()
        .next_term(tm.outer_record().bos)
        .expect("first terminal");
    assert_eq!(tm.arena().lexeme(one), "1");
    let p = tm.arena().parent(one).unwrap();
    let t = tm.arena().parent(p).unwrap();
    let e = tm.arena().parent(t).unwrap();
    assert_eq!(tm.arena().symbol_name(p), "P");
    assert_eq!(tm.arena().symbol_name(t), "T");
    assert_eq!(tm.arena().symbol_name(e), "E");

    // Extend on the right: "1+2" -> "1+2+3".
    tm.end();
    type_str(&mut tm, "+3");
    assert!(tm.last_status());

    // Identity above "1" survived the reparse.
    let one_after = tm
        .arena()
        .next_term(tm.outer_record().bos)
        .expect("first terminal");
    assert_eq!(one_after, one);
    assert_eq!(tm.arena().parent(one), Some(p));
    assert_eq!(tm.arena().parent(p), Some(t));
    assert_eq!(tm.arena().parent(t), Some(e));
}

#[test]
fn overlays_ride_along_with_reused_nodes() {
    let mut tm = manager("Calc");
    type_str(&mut tm, "1+2");
    assert!(tm.last_status());

    let one = tm
        .arena()
        .next_term(tm.outer_record().bos)
        .expect("first terminal");
    let p = tm.arena().parent(one).unwrap();
    tm.set_overlay(p, Some(42));

    tm.end();
    type_str(&mut tm, "+3");
    assert!(tm.last_status());
    assert_eq!(tm.arena().parent(one), Some(p));
    assert_eq!(tm.arena().overlay(p), Some(42));
}

#[test]
fn colon_colon_equals_collapses_into_one_token() {
    let mut tm = manager("ColonCollapse");

    tm.insert(':');
    let cursor = tm.cursor();
    assert_eq!(tm.arena().symbol_name(cursor.node), "colon");
    assert_eq!(tm.arena().lexeme(cursor.node), ":");
    assert_eq!(tm.arena().lookahead(cursor.node), 1);

    tm.insert(':');
    let cursor = tm.cursor();
    assert_eq!(tm.arena().symbol_name(cursor.node), "colon");
    assert_eq!(tm.arena().lexeme(cursor.node), ":");

    tm.insert('=');
    let cursor = tm.cursor();
    assert_eq!(tm.arena().symbol_name(cursor.node), "assign");
    assert_eq!(tm.arena().lexeme(cursor.node), "::=");
    assert_eq!(tm.export_as_text(), "::=");
}

#[test]
fn longer_token_absorbs_prefix_as_it_completes() {
    let mut tm = manager("Tags");

    tm.insert('<');
    let cursor = tm.cursor();
    assert_eq!(tm.arena().lexeme(cursor.node), "<");
    assert_eq!(tm.arena().lookahead(cursor.node), 1);

    type_str(&mut tm, "htm");
    assert_eq!(tm.arena().lexeme(tm.cursor().node), "htm");
    assert!(tm.last_status());

    tm.insert('l');
    assert_eq!(tm.arena().lexeme(tm.cursor().node), "<html");
    assert!(tm.last_status());

    tm.backspace();
    assert_eq!(tm.arena().lexeme(tm.cursor().node), "htm");
    assert_eq!(tm.export_as_text(), "<htm");
    assert!(tm.last_status());
}

#[test]
fn separate_edits_accumulate_error_nodes() {
    let mut tm = manager("Calc");
    tm.import_file("1*1+2+3*4+2");
    assert!(tm.last_status());

    // First break near the end.
    tm.end();
    for _ in 0..3 {
        tm.move_cursor(Direction::Left);
    }
    tm.insert('+');
    assert!(!tm.last_status());
    assert_eq!(tm.error_nodes().len(), 1);

    // Second break further left.
    for _ in 0..5 {
        tm.move_cursor(Direction::Left);
    }
    tm.insert('*');
    assert!(!tm.last_status());
    assert_eq!(tm.error_nodes().len(), 2);
}

#[test]
fn unlexable_span_becomes_an_error_terminal() {
    let mut tm = manager("Calc");
    type_str(&mut tm, "1+$2");
    assert_eq!(tm.export_as_text(), "1+$2");
    assert!(!tm.last_status());

    // Removing the garbage heals the document.
    tm.move_cursor(Direction::Left);
    tm.move_cursor(Direction::Left);
    tm.delete();
    assert_eq!(tm.export_as_text(), "1+2");
    assert!(tm.last_status());
}

#[test]
fn paste_is_one_parse_pass() {
    let mut tm = manager("Calc");
    tm.paste("1 + 2\n+4+5\n+6+789");
    assert!(tm.last_status());
    assert_eq!(tm.export_as_text(), "1 + 2\n+4+5\n+6+789");
}

#[test]
fn empty_document_parses_false_for_calc() {
    let tm = manager("Calc");
    assert!(!tm.last_status());
    assert_eq!(tm.export_as_text(), "");
}
