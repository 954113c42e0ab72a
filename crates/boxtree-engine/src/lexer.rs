//! Incremental lexer.
//!
//! Given a changed terminal, re-tokenizes the minimal region around it:
//!
//! - the region starts at the changed unit's left neighbour, extended further
//!   left while earlier terminals' lookahead windows reach the edit (this is
//!   how `:` `:` `=` collapses into one `::=` token);
//! - scanning stops at the first token boundary that lines up with an
//!   unchanged old terminal past the edit, and the unchanged tail is spliced
//!   back without being touched;
//! - tokens whose class and lexeme are unchanged keep their node identity;
//!   the edited token keeps its identity when only its lexeme grew or shrank;
//! - an unlexable span becomes one error terminal; parsing proceeds over it
//!   and fails there;
//! - a token crossing newlines becomes a MultiText container whose segments
//!   occupy the chain.
//!
//! Relexing never crosses a language-box boundary: inner trees are lexed by
//! their own grammar's relex calls.

use boxtree_core::{NodeArena, NodeId, NodeKind, SymbolId};
use boxtree_grammar::CompiledGrammar;

use crate::tokens::{
    Classes, chain_first, chain_last, next_unit, prev_unit, unit_changed, unit_len, unit_of,
    unit_text,
};

/// Re-tokenize the neighbourhood of `changed` (a chain node). Safe to call
/// on a node that no longer needs lexing; such calls do nothing.
pub fn relex(
    arena: &mut NodeArena,
    classes: &Classes,
    grammar: &CompiledGrammar,
    changed: NodeId,
) {
    let changed_unit = unit_of(arena, changed);
    if !matches!(
        arena.kind(changed_unit),
        NodeKind::Terminal | NodeKind::MultiText
    ) || classes.is_virtual(arena, changed_unit)
    {
        return;
    }

    let start_unit = region_start(arena, classes, changed_unit);
    let (olds, tokens, stop_unit) = scan_region(arena, classes, grammar, start_unit, changed_unit);
    splice(arena, classes, grammar, &olds, stop_unit, tokens);
}

/// One token produced by the scan, before node resolution.
struct NewToken {
    start: usize,
    text: String,
    /// DFA rule index; `None` marks an unlexable span.
    rule: Option<usize>,
    lookahead: u32,
}

/// Walk left from the changed unit: always include the immediate real
/// neighbour, then keep including while lookahead windows reach the edit.
fn region_start(arena: &NodeArena, classes: &Classes, changed_unit: NodeId) -> NodeId {
    let mut start = changed_unit;
    let mut dist = 0usize;
    let mut first = true;
    let mut cursor = changed_unit;
    loop {
        let Some(p) = prev_unit(arena, cursor) else {
            break;
        };
        if matches!(arena.kind(p), NodeKind::Bos | NodeKind::Magic) {
            break;
        }
        if classes.is_virtual(arena, p) {
            cursor = p;
            continue;
        }
        if first || (arena.lookahead(p) as usize) > dist {
            start = p;
            dist += unit_len(arena, p);
            cursor = p;
            first = false;
        } else {
            break;
        }
    }
    start
}

/// Append the next real unit after `olds.last()` to the buffer. Returns
/// false at the tree edge (EOS) or a language-box boundary.
fn gather_one(
    arena: &NodeArena,
    classes: &Classes,
    olds: &mut Vec<NodeId>,
    old_starts: &mut Vec<usize>,
    buffer: &mut String,
) -> bool {
    let mut cursor = *olds.last().expect("region never empty");
    loop {
        let Some(next) = next_unit(arena, cursor) else {
            return false;
        };
        if matches!(arena.kind(next), NodeKind::Eos | NodeKind::Magic) {
            return false;
        }
        if classes.is_virtual(arena, next) {
            cursor = next;
            continue;
        }
        olds.push(next);
        old_starts.push(buffer.len());
        buffer.push_str(&unit_text(arena, next));
        return true;
    }
}

/// Scan tokens over the region text. Returns the consumed old units, the new
/// tokens, and the old unit the scan stopped in front of (the splice point),
/// if any.
fn scan_region(
    arena: &NodeArena,
    classes: &Classes,
    grammar: &CompiledGrammar,
    start_unit: NodeId,
    changed_unit: NodeId,
) -> (Vec<NodeId>, Vec<NewToken>, Option<NodeId>) {
    let mut olds = vec![start_unit];
    let mut old_starts = vec![0usize];
    let mut buffer = unit_text(arena, start_unit);

    while !olds.contains(&changed_unit) {
        if !gather_one(arena, classes, &mut olds, &mut old_starts, &mut buffer) {
            break;
        }
    }
    let changed_idx = olds
        .iter()
        .position(|&u| u == changed_unit)
        .unwrap_or(0);

    let mut tokens: Vec<NewToken> = Vec::new();
    let mut pos = 0usize;
    let mut stop: Option<usize> = None;

    loop {
        // Emptied units share their successor's offset; any aligned,
        // unchanged, non-empty unit past the edit is a valid splice point.
        if let Some(i) = old_starts.iter().enumerate().position(|(i, &s)| {
            s == pos
                && i > changed_idx
                && !unit_changed(arena, olds[i])
                && !unit_text(arena, olds[i]).is_empty()
        }) {
            stop = Some(i);
            break;
        }
        if pos == buffer.len()
            && !gather_one(arena, classes, &mut olds, &mut old_starts, &mut buffer)
        {
            break;
        }
        if pos == buffer.len() {
            continue;
        }

        match grammar.dfa.scan(&buffer, pos) {
            Some(m) => {
                // A match running to the buffer edge may extend given more
                // text.
                if pos + m.len == buffer.len()
                    && gather_one(arena, classes, &mut olds, &mut old_starts, &mut buffer)
                {
                    continue;
                }
                tokens.push(NewToken {
                    start: pos,
                    text: buffer[pos..pos + m.len].to_owned(),
                    rule: Some(m.rule),
                    lookahead: m.lookahead,
                });
                pos += m.len;
            }
            None => {
                if gather_one(arena, classes, &mut olds, &mut old_starts, &mut buffer) {
                    continue;
                }
                // Unlexable: the error terminal covers everything the
                // automaton examined, so an unterminated delimited token
                // swallows its tail and can fuse when completed later.
                let end = pos + grammar.dfa.garbage_extent(&buffer, pos);
                tokens.push(NewToken {
                    start: pos,
                    text: buffer[pos..end].to_owned(),
                    rule: None,
                    lookahead: 1,
                });
                pos = end;
            }
        }
    }

    let consumed = stop.unwrap_or(olds.len());
    let stop_unit = stop.map(|i| olds[i]);
    olds.truncate(consumed);
    (olds, tokens, stop_unit)
}

/// Replace the consumed old units with nodes for the new tokens, relinking
/// the chain and the tree around the region.
fn splice(
    arena: &mut NodeArena,
    classes: &Classes,
    grammar: &CompiledGrammar,
    consumed: &[NodeId],
    stop_unit: Option<NodeId>,
    tokens: Vec<NewToken>,
) {
    // Chain bounds of the region.
    let region_first = chain_first(arena, consumed[0]);
    let anchor_left = arena
        .prev_term(region_first)
        .expect("BOS bounds every chain on the left");
    let anchor_right = match stop_unit {
        Some(u) => chain_first(arena, u),
        None => {
            let mut cursor = arena
                .next_term(chain_last(arena, *consumed.last().expect("region never empty")))
                .expect("EOS bounds every chain on the right");
            // Trailing virtuals of a removed unit die with it.
            while classes.is_virtual(arena, cursor) {
                cursor = arena
                    .next_term(cursor)
                    .expect("EOS bounds every chain on the right");
            }
            cursor
        }
    };

    let mut old_chain = Vec::new();
    let mut cursor = region_first;
    while cursor != anchor_right {
        old_chain.push(cursor);
        cursor = arena
            .next_term(cursor)
            .expect("region chain reaches its right anchor");
    }

    // Byte offsets of the old units within the region text.
    let mut old_at: Vec<(usize, NodeId)> = Vec::new();
    let mut at = 0usize;
    for &unit in consumed {
        old_at.push((at, unit));
        at += unit_text(arena, unit).len();
    }

    // Resolve tokens to nodes.
    let mut emitted: Vec<(NodeId, bool)> = Vec::new(); // (unit, reused)
    for token in &tokens {
        let class_sym = match token.rule {
            Some(rule) => {
                let name = grammar.class_name(rule).to_owned();
                arena.intern(&name)
            }
            None => classes.error,
        };
        let node = resolve_token(arena, &old_at, &emitted, class_sym, token);
        match node {
            Resolved::Exact(old) => {
                arena.set_lookahead(old, token.lookahead);
                emitted.push((old, true));
            }
            Resolved::InPlace(old) => {
                arena.set_lexeme(old, token.text.clone());
                arena.set_lookahead(old, token.lookahead);
                arena.mark_changed(old);
                emitted.push((old, true));
            }
            Resolved::Fresh => {
                let node = if token.text.contains('\n') && token.text != "\n" {
                    new_multitext(arena, class_sym, token)
                } else {
                    let node = arena.new_terminal(class_sym, &token.text);
                    arena.set_lookahead(node, token.lookahead);
                    node
                };
                emitted.push((node, false));
            }
        }
    }

    let reused: Vec<NodeId> = emitted
        .iter()
        .filter(|&&(_, r)| r)
        .map(|&(u, _)| u)
        .collect();

    // Trailing virtual runs of reused units survive the splice.
    let mut kept_runs: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
    for &unit in &reused {
        let mut run = Vec::new();
        let mut cursor = arena.next_term(chain_last(arena, unit));
        while let Some(n) = cursor {
            if n != anchor_right && classes.is_virtual(arena, n) {
                run.push(n);
                cursor = arena.next_term(n);
            } else {
                break;
            }
        }
        kept_runs.push((unit, run));
    }

    // Tree placement: removed olds leave their parents; fresh units slot in
    // at the position of the first removed unit, trailing the last reused
    // unit once past one.
    let first_parent = arena
        .parent(consumed[0])
        .expect("real units always have a parent");
    let first_index = arena
        .children(first_parent)
        .iter()
        .position(|&c| c == consumed[0])
        .expect("unit listed under its parent");

    for &old in consumed {
        if !reused.contains(&old) {
            if let Some(p) = arena.parent(old) {
                arena.remove_child(p, old);
            }
            arena.set_changed(old, false);
        }
    }

    let mut slot = (first_parent, first_index.min(arena.children(first_parent).len()));
    for &(unit, was_reused) in &emitted {
        if was_reused {
            let p = arena.parent(unit).expect("reused unit stays in the tree");
            let i = arena
                .children(p)
                .iter()
                .position(|&c| c == unit)
                .expect("reused unit listed under its parent");
            slot = (p, i + 1);
        } else {
            arena.insert_child(slot.0, slot.1, unit);
            arena.mark_changed(unit);
            slot.1 += 1;
        }
    }

    // Chain relink: anchor, emitted units (with their kept virtual runs),
    // anchor.
    let mut sequence: Vec<NodeId> = Vec::new();
    for &(unit, _) in &emitted {
        if arena.kind(unit) == NodeKind::MultiText {
            sequence.extend(arena.children(unit).to_vec());
        } else {
            sequence.push(unit);
        }
        if let Some((_, run)) = kept_runs.iter().find(|&&(u, _)| u == unit) {
            sequence.extend(run.iter().copied());
        }
    }

    let mut prev = anchor_left;
    for &node in &sequence {
        arena.link_terms(prev, node);
        prev = node;
    }
    arena.link_terms(prev, anchor_right);

    // Dropped virtual tokens leave the tree; dropped segments stay under
    // their detached container.
    for node in old_chain {
        if sequence.contains(&node) {
            continue;
        }
        if let Some(p) = arena.parent(node) {
            if arena.kind(p) != NodeKind::MultiText {
                arena.remove_child(p, node);
            }
        }
    }
}

enum Resolved {
    /// Same class, same lexeme, same shape: full identity reuse.
    Exact(NodeId),
    /// Same class at the same position, lexeme rewritten in place.
    InPlace(NodeId),
    Fresh,
}

fn resolve_token(
    arena: &NodeArena,
    old_at: &[(usize, NodeId)],
    emitted: &[(NodeId, bool)],
    class_sym: SymbolId,
    token: &NewToken,
) -> Resolved {
    let taken = |u: NodeId| emitted.iter().any(|&(e, _)| e == u);
    let multiline = token.text.contains('\n') && token.text != "\n";

    let mut in_place: Option<NodeId> = None;
    for &(start, old) in old_at {
        if start != token.start || taken(old) || arena.symbol(old) != class_sym {
            continue;
        }
        let old_multiline = arena.kind(old) == NodeKind::MultiText;
        if unit_text(arena, old) == token.text && old_multiline == multiline {
            return Resolved::Exact(old);
        }
        if in_place.is_none()
            && !multiline
            && arena.kind(old) == NodeKind::Terminal
            && (unit_changed(arena, old) || unit_text(arena, old).is_empty())
        {
            in_place = Some(old);
        }
    }
    match in_place {
        Some(old) => Resolved::InPlace(old),
        None => Resolved::Fresh,
    }
}

fn new_multitext(arena: &mut NodeArena, class_sym: SymbolId, token: &NewToken) -> NodeId {
    let container = arena.new_node(NodeKind::MultiText, class_sym);
    arena.set_lookahead(container, token.lookahead);

    let mut segments = Vec::new();
    let mut rest = token.text.as_str();
    while !rest.is_empty() {
        let piece = match rest.find('\n') {
            Some(0) => "\n",
            Some(i) => &rest[..i],
            None => rest,
        };
        let segment = arena.new_node(NodeKind::Terminal, class_sym);
        arena.set_lexeme(segment, piece.to_owned());
        arena.set_parent(segment, Some(container));
        segments.push(segment);
        rest = &rest[piece.len()..];
    }
    arena.set_children(container, segments);
    container
}
