//! Error recovery: out-of-context analysis and subtree isolation.
//!
//! On an LR error the recovery loop first tries *out-of-context analysis*:
//! an ancestor of the offending terminal is strictly detached (parent set to
//! null, so the side parser cannot observe or mutate anything outside its
//! scope) and its yield is reparsed by a fresh sub-parser seeded with the
//! subtree's recorded entering state. Success splices the rebuilt subtree
//! into the old parent and the main parse restarts; failure reattaches the
//! subtree untouched and the next ancestor is tried.
//!
//! When no ancestor reparses, the subtree becomes an *iso-tree*: the pass is
//! rolled back, the nearest ancestor whose symbol is acceptable at its
//! recorded state is marked isolated, the offending terminal is recorded as
//! an error node, and the parse restarts treating the iso-tree as an opaque
//! token of its left-hand-side class.

use std::collections::HashMap;

use boxtree_core::{NodeArena, NodeId, NodeKind};
use boxtree_grammar::table::{Action, EOF};
use boxtree_grammar::TermId;

use crate::parser::{ErrorInfo, StackEntry, build_reduction, magic_acceptable};
use crate::records::ParserRecord;
use crate::tokens::{chain_last, unit_of};

const SUBPARSE_FUEL: u32 = 200_000;

/// Try out-of-context analysis for ancestors of the offending node, nearest
/// first. Returns true when a subtree was repaired and spliced.
pub fn out_of_context(
    arena: &mut NodeArena,
    record: &mut ParserRecord,
    magic_status: &HashMap<NodeId, bool>,
    info: &ErrorInfo,
) -> bool {
    let mut cursor = arena.parent(info.node);
    while let Some(candidate) = cursor {
        if candidate == record.root {
            break;
        }
        if arena.kind(candidate) == NodeKind::NonTerminal
            && !arena.is_isolated(candidate)
            && try_reparse(arena, record, magic_status, candidate)
        {
            return true;
        }
        cursor = arena.parent(candidate);
    }
    false
}

/// The subtree to isolate for an unrecoverable error at `error_node`: the
/// nearest non-terminal ancestor whose class is acceptable at its recorded
/// entering state, so the restarted parse can shift it opaquely.
/// Called after the pass rollback, on the restored structure.
pub fn isolation_candidate(
    arena: &NodeArena,
    record: &ParserRecord,
    error_node: NodeId,
) -> Option<NodeId> {
    let mut cursor = arena.parent(error_node);
    while let Some(candidate) = cursor {
        if candidate == record.root {
            return None;
        }
        if arena.kind(candidate) == NodeKind::NonTerminal {
            let name = arena.interner().resolve(arena.symbol(candidate));
            if let Some(nt) = record.grammar.table.nt_id(name) {
                if record
                    .grammar
                    .table
                    .goto(arena.state(candidate), nt)
                    .is_some()
                {
                    return Some(candidate);
                }
            }
        }
        cursor = arena.parent(candidate);
    }
    None
}

/// Detach `target`, reparse its yield from its recorded state, splice the
/// result back on success.
fn try_reparse(
    arena: &mut NodeArena,
    record: &mut ParserRecord,
    magic_status: &HashMap<NodeId, bool>,
    target: NodeId,
) -> bool {
    let Some(parent) = arena.parent(target) else {
        return false;
    };

    // Strict detachment: the sub-parser must not see the outer tree.
    arena.set_parent(target, None);
    let result = subparse(arena, record, magic_status, target);
    arena.set_parent(target, Some(parent));

    let Some(nodes) = result else {
        return false;
    };

    // Splice the rebuilt nodes in the old parent at the target's slot.
    let mut children = arena.children(parent).to_vec();
    let pos = children
        .iter()
        .position(|&c| c == target)
        .expect("target listed under its parent");
    let target_entering = arena.state(target);
    children.splice(pos..pos + 1, nodes.iter().copied());
    arena.set_children(parent, children);
    if !nodes.contains(&target) {
        arena.set_parent(target, None);
    }
    for &node in &nodes {
        arena.set_parent(node, Some(parent));
        arena.clear_changes(node);
    }
    if let Some(&top) = nodes.last() {
        arena.set_state(top, target_entering);
    }
    true
}

/// Reparse the yield of `target` with a fresh parser seeded by its recorded
/// entering state. Succeeds when the whole yield reduces to a single visible
/// node of the target's class under the lookahead that follows the subtree.
/// Returns the replacement nodes (leading hidden tokens plus the rebuilt
/// non-terminal) or `None`.
fn subparse(
    arena: &mut NodeArena,
    record: &mut ParserRecord,
    magic_status: &HashMap<NodeId, bool>,
    target: NodeId,
) -> Option<Vec<NodeId>> {
    let target_name = arena.interner().resolve(arena.symbol(target)).to_owned();
    let target_nt = record.grammar.table.nt_id(&target_name)?;
    let start_state = arena.state(target);

    let units = fringe_units(arena, target);
    let la = lookahead_after(arena, record, target)?;

    let mut stack: Vec<StackEntry> = vec![StackEntry {
        state: start_state,
        node: None,
        hidden: false,
    }];
    let mut fuel = SUBPARSE_FUEL;

    for unit in units {
        if record.is_hidden(arena, unit) {
            let state = stack.last().map_or(start_state, |e| e.state);
            arena.set_state(unit, state);
            stack.push(StackEntry {
                state,
                node: Some(unit),
                hidden: true,
            });
            continue;
        }
        if arena.kind(unit) == NodeKind::Magic
            && !magic_acceptable(arena, record, magic_status, unit)
        {
            return None;
        }
        let term = record.term_id(arena, arena.symbol(unit))?;
        if !feed(arena, record, &mut stack, &mut fuel, unit, term) {
            return None;
        }
    }

    // Reduce under the outer lookahead until only the target class remains.
    loop {
        if accepted(arena, record, &stack, target_nt) {
            break;
        }
        if fuel == 0 {
            return None;
        }
        fuel -= 1;
        let state = stack.last().map_or(start_state, |e| e.state);
        match record.grammar.table.action(state, la) {
            Action::Reduce(p) => {
                if !reduce(arena, record, &mut stack, p) {
                    return None;
                }
            }
            _ => return None,
        }
    }

    Some(stack.iter().skip(1).filter_map(|e| e.node).collect())
}

/// Shift one visible token, applying pending reductions first.
fn feed(
    arena: &mut NodeArena,
    record: &mut ParserRecord,
    stack: &mut Vec<StackEntry>,
    fuel: &mut u32,
    unit: NodeId,
    term: TermId,
) -> bool {
    loop {
        if *fuel == 0 {
            return false;
        }
        *fuel -= 1;
        let state = stack.last().map_or(0, |e| e.state);
        match record.grammar.table.action(state, term) {
            Action::Shift(next) => {
                arena.set_state(unit, state);
                stack.push(StackEntry {
                    state: next,
                    node: Some(unit),
                    hidden: false,
                });
                return true;
            }
            Action::Reduce(p) => {
                if !reduce(arena, record, stack, p) {
                    return false;
                }
            }
            Action::Accept | Action::Error => return false,
        }
    }
}

fn reduce(
    arena: &mut NodeArena,
    record: &ParserRecord,
    stack: &mut Vec<StackEntry>,
    p: u32,
) -> bool {
    let (lhs, arity) = {
        let prod = record.grammar.table.prod(p);
        (prod.lhs, prod.rhs.len())
    };

    let mut taken: Vec<StackEntry> = Vec::new();
    let mut visible = 0usize;
    while visible < arity {
        let Some(entry) = stack.pop() else {
            return false;
        };
        if entry.node.is_none() {
            return false;
        }
        if !entry.hidden {
            visible += 1;
        }
        taken.push(entry);
    }
    taken.reverse();
    let kids: Vec<NodeId> = taken.iter().filter_map(|e| e.node).collect();

    let entering = stack.last().map_or(0, |e| e.state);
    let node = build_reduction(arena, record, stack, lhs, &kids);
    arena.set_state(node, entering);

    let Some(target) = record.grammar.table.goto(entering, lhs) else {
        return false;
    };
    stack.push(StackEntry {
        state: target,
        node: Some(node),
        hidden: false,
    });
    true
}

/// Success shape: exactly one visible entry, of the target class. Leading
/// hidden tokens are allowed; they splice back alongside the result.
fn accepted(
    arena: &NodeArena,
    record: &ParserRecord,
    stack: &[StackEntry],
    target_nt: boxtree_grammar::NtId,
) -> bool {
    let visibles: Vec<NodeId> = stack
        .iter()
        .skip(1)
        .filter(|e| !e.hidden)
        .filter_map(|e| e.node)
        .collect();
    let &[only] = visibles.as_slice() else {
        return false;
    };
    if arena.kind(only) != NodeKind::NonTerminal {
        return false;
    }
    let name = arena.interner().resolve(arena.symbol(only));
    record.grammar.table.nt_id(name) == Some(target_nt)
}

/// Tokens of a subtree's fringe, in order. MultiText containers count as one
/// token; the walk never descends into language boxes.
fn fringe_units(arena: &NodeArena, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect(arena, root, &mut out);
    return out;

    fn collect(arena: &NodeArena, id: NodeId, out: &mut Vec<NodeId>) {
        match arena.kind(id) {
            NodeKind::NonTerminal => {
                for &child in arena.children(id) {
                    collect(arena, child, out);
                }
            }
            NodeKind::Terminal | NodeKind::Magic | NodeKind::MultiText => out.push(id),
            NodeKind::Bos | NodeKind::Eos => {}
        }
    }
}

/// Terminal class of the first visible token after the subtree's yield.
fn lookahead_after(
    arena: &NodeArena,
    record: &mut ParserRecord,
    target: NodeId,
) -> Option<TermId> {
    let mut last = target;
    while let Some(&child) = arena.children(last).last() {
        last = child;
    }
    let mut cursor = arena.next_term(chain_last(arena, last));
    while let Some(n) = cursor {
        let unit = unit_of(arena, n);
        if arena.kind(unit) == NodeKind::Eos {
            return Some(EOF);
        }
        if record.is_hidden(arena, unit) {
            cursor = arena.next_term(chain_last(arena, unit));
            continue;
        }
        return record.term_id(arena, arena.symbol(unit));
    }
    Some(EOF)
}
