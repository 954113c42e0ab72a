//! Property tests: random edit sequences against a plain string buffer.

mod common;

use boxtree_engine::{Direction, TreeManager};
use common::manager;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(char),
    Left,
    Right,
    Backspace,
    Delete,
    Home,
    End,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::sample::select(vec!['1', '2', '3', '+', '*', ' ', '\n']).prop_map(Op::Insert),
        Just(Op::Left),
        Just(Op::Right),
        Just(Op::Backspace),
        Just(Op::Delete),
        Just(Op::Home),
        Just(Op::End),
    ]
}

/// Apply an op to the engine and to the reference buffer in lockstep.
fn apply(tm: &mut TreeManager, text: &mut Vec<char>, pos: &mut usize, op: &Op) {
    match *op {
        Op::Insert(c) => {
            tm.insert(c);
            text.insert(*pos, c);
            *pos += 1;
        }
        Op::Left => {
            tm.move_cursor(Direction::Left);
            *pos = pos.saturating_sub(1);
        }
        Op::Right => {
            tm.move_cursor(Direction::Right);
            *pos = (*pos + 1).min(text.len());
        }
        Op::Backspace => {
            tm.backspace();
            if *pos > 0 {
                *pos -= 1;
                text.remove(*pos);
            }
        }
        Op::Delete => {
            tm.delete();
            if *pos < text.len() {
                text.remove(*pos);
            }
        }
        Op::Home => {
            tm.home();
            while *pos > 0 && text[*pos - 1] != '\n' {
                *pos -= 1;
            }
        }
        Op::End => {
            tm.end();
            while *pos < text.len() && text[*pos] != '\n' {
                *pos += 1;
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn edits_agree_with_a_plain_buffer(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let mut tm = manager("Calc");
        let mut text: Vec<char> = Vec::new();
        let mut pos = 0usize;

        for op in &ops {
            apply(&mut tm, &mut text, &mut pos, op);
            prop_assert_eq!(tm.export_as_text(), text.iter().collect::<String>());
            prop_assert_eq!(tm.cursor_position(), pos);
        }

        // Status agrees with a fresh parse of the final text.
        let final_text: String = text.iter().collect();
        let mut fresh = manager("Calc");
        fresh.import_file(&final_text);
        prop_assert_eq!(tm.last_status(), fresh.last_status());
    }

    #[test]
    fn undo_all_empties_and_redo_all_restores(
        ops in proptest::collection::vec(op_strategy(), 1..25),
    ) {
        let mut tm = manager("Calc");
        let mut text: Vec<char> = Vec::new();
        let mut pos = 0usize;

        for op in &ops {
            apply(&mut tm, &mut text, &mut pos, op);
            tm.undo_snapshot();
        }
        let final_text = tm.export_as_text();
        let final_status = tm.last_status();

        while tm.arena().version() > 0 {
            tm.undo();
        }
        prop_assert_eq!(tm.export_as_text(), "");

        while tm.arena().version() < tm.arena().max_version() {
            tm.redo();
        }
        prop_assert_eq!(tm.export_as_text(), final_text);
        prop_assert_eq!(tm.last_status(), final_status);
    }
}
