//! Indentation engine for whitespace-sensitive grammars.
//!
//! Tracks logical lines and synthesizes virtual NEWLINE/INDENT/DEDENT
//! terminals, threaded into the chain with empty lexemes:
//!
//! - a NEWLINE is emitted at the newline that ends a logical line;
//! - INDENT/DEDENTs are emitted at the newline directly preceding a logical
//!   line whose width differs from the indent stack; a width matching no
//!   open level emits a zero-width error terminal;
//! - blank, comment-only, and in-string lines are not logical; a trailing
//!   backslash suppresses the NEWLINE and merges the next line;
//! - after the last logical line a final NEWLINE is synthesized, then all
//!   outstanding DEDENTs, all placed before EOS.
//!
//! Reconciliation is by diffing: each maximal virtual run in the chain is
//! compared with the desired run and spliced only where it differs, so
//! untouched line boundaries keep their node identity.

use indexmap::IndexMap;

use boxtree_core::{NodeArena, NodeId, NodeKind, SymbolId};

use crate::records::ParserRecord;
use crate::tokens::Classes;

/// Recompute virtual tokens for one whitespace-sensitive parser record.
pub fn reconcile(arena: &mut NodeArena, classes: &Classes, record: &ParserRecord) {
    let desired = desired_runs(arena, classes, record);
    apply_runs(arena, classes, record.bos, desired);
}

/// Width and content summary of one physical line.
struct LineScan {
    width: usize,
    has_visible: bool,
    ends_with_backslash: bool,
    /// Chain node that terminates the line: a newline terminal, a newline
    /// segment, or EOS.
    end: NodeId,
}

/// Compute the wanted virtual run after each real chain node.
fn desired_runs(
    arena: &NodeArena,
    classes: &Classes,
    record: &ParserRecord,
) -> IndexMap<NodeId, Vec<SymbolId>> {
    let mut desired: IndexMap<NodeId, Vec<SymbolId>> = IndexMap::new();
    let mut stack: Vec<usize> = vec![0];
    let mut statement_open = false;

    let mut boundary = record.bos;
    let mut boundary_is_segment = false;
    let mut last_real = record.bos;

    loop {
        let scan = scan_line(arena, classes, record, boundary);
        let line_start_in_string = boundary_is_segment;

        // Indent tokens at the boundary *starting* this line.
        if scan.has_visible && !statement_open && !line_start_in_string {
            let run = desired.entry(boundary).or_default();
            emit_indent_delta(classes, &mut stack, scan.width, run);
        }
        if scan.has_visible {
            statement_open = true;
        }

        // Walk to the line end, remembering the last real chain node.
        let mut cursor = boundary;
        while cursor != scan.end {
            cursor = arena.next_term(cursor).expect("line end is on the chain");
            if !classes.is_virtual(arena, cursor) && arena.kind(cursor) != NodeKind::Eos {
                last_real = cursor;
            }
        }

        if arena.kind(scan.end) == NodeKind::Eos {
            let run = desired.entry(last_real).or_default();
            if statement_open {
                run.push(classes.newline);
            }
            while stack.len() > 1 {
                stack.pop();
                run.push(classes.dedent);
            }
            break;
        }

        // NEWLINE at the boundary *ending* this line.
        let end_in_string = is_segment(arena, scan.end);
        if statement_open && !scan.ends_with_backslash && !end_in_string {
            desired.entry(scan.end).or_default().push(classes.newline);
            statement_open = false;
        }

        boundary = scan.end;
        boundary_is_segment = end_in_string;
    }

    desired
}

fn is_segment(arena: &NodeArena, id: NodeId) -> bool {
    matches!(arena.parent(id), Some(p) if arena.kind(p) == NodeKind::MultiText)
}

fn is_newline_slot(arena: &NodeArena, id: NodeId) -> bool {
    arena.kind(id) == NodeKind::Terminal && arena.lexeme(id) == "\n"
}

/// Scan one line starting after `boundary`.
fn scan_line(
    arena: &NodeArena,
    classes: &Classes,
    record: &ParserRecord,
    boundary: NodeId,
) -> LineScan {
    let mut width = 0usize;
    let mut counting_indent = true;
    let mut has_visible = false;
    let mut last_text_tail = false;

    let mut cursor = boundary;
    loop {
        cursor = match arena.next_term(cursor) {
            Some(n) => n,
            None => break,
        };
        if arena.kind(cursor) == NodeKind::Eos || is_newline_slot(arena, cursor) {
            return LineScan {
                width,
                has_visible,
                ends_with_backslash: last_text_tail,
                end: cursor,
            };
        }
        if classes.is_virtual(arena, cursor) {
            continue;
        }

        let text = arena.lexeme(cursor).to_owned();
        let hidden = record.is_hidden(arena, cursor);
        if counting_indent && hidden && text.chars().all(|c| c == ' ' || c == '\t') {
            width += text.chars().count();
        } else {
            counting_indent = false;
        }
        if !hidden || arena.kind(cursor) == NodeKind::Magic {
            has_visible = true;
        }
        if !text.is_empty() {
            last_text_tail = text.ends_with('\\');
        }
    }

    LineScan {
        width,
        has_visible,
        ends_with_backslash: last_text_tail,
        end: record.eos,
    }
}

fn emit_indent_delta(
    classes: &Classes,
    stack: &mut Vec<usize>,
    width: usize,
    run: &mut Vec<SymbolId>,
) {
    let top = *stack.last().expect("indent stack keeps its base level");
    if width > top {
        stack.push(width);
        run.push(classes.indent);
    } else if width < top {
        while *stack.last().unwrap() > width && stack.len() > 1 {
            stack.pop();
            run.push(classes.dedent);
        }
        if *stack.last().unwrap() != width {
            // No matching open level: indentation error.
            run.push(classes.error);
            stack.push(width);
        }
    }
}

/// Diff existing virtual runs against the desired ones and splice where they
/// differ.
fn apply_runs(
    arena: &mut NodeArena,
    classes: &Classes,
    bos: NodeId,
    desired: IndexMap<NodeId, Vec<SymbolId>>,
) {
    let mut r = bos;
    loop {
        // Existing run after r.
        let mut run = Vec::new();
        let mut cursor = arena.next_term(r);
        while let Some(n) = cursor {
            if classes.is_virtual(arena, n) {
                run.push(n);
                cursor = arena.next_term(n);
            } else {
                break;
            }
        }
        let after_run = cursor;

        let want = desired.get(&r).map(Vec::as_slice).unwrap_or(&[]);
        let have: Vec<SymbolId> = run.iter().map(|&n| arena.symbol(n)).collect();
        if have != want {
            splice_run(arena, r, &run, want, after_run);
        }

        match after_run {
            Some(next) if arena.kind(next) != NodeKind::Eos => r = next,
            _ => break,
        }
    }
}

fn splice_run(
    arena: &mut NodeArena,
    anchor: NodeId,
    existing: &[NodeId],
    want: &[SymbolId],
    after_run: Option<NodeId>,
) {
    for &old in existing {
        arena.mark_nested_upward(old);
        if let Some(p) = arena.parent(old) {
            arena.remove_child(p, old);
        }
    }

    // Chain insertion happens after `anchor`; tree insertion happens after
    // the unit it belongs to — a segment anchor places new tokens after its
    // MultiText container, never inside it.
    let tree_anchor = match arena.parent(anchor) {
        Some(p) if arena.kind(p) == NodeKind::MultiText => p,
        _ => anchor,
    };
    let parent = arena
        .parent(tree_anchor)
        .expect("chain anchors always have a parent");
    let base = arena
        .children(parent)
        .iter()
        .position(|&c| c == tree_anchor)
        .expect("anchor listed under its parent")
        + 1;

    let mut prev = anchor;
    for (i, &sym) in want.iter().enumerate() {
        let node = arena.new_node(NodeKind::Terminal, sym);
        arena.insert_child(parent, base + i, node);
        arena.mark_changed(node);
        arena.link_terms(prev, node);
        prev = node;
    }
    if let Some(next) = after_run {
        arena.link_terms(prev, next);
    }
}
