//! Automatic language-box insertion.
//!
//! When the outermost parse fails, each composition rule of the outer
//! grammar proposes spans of the error line that parse cleanly under its
//! inner grammar. A winning span is wrapped in a magic terminal backed by a
//! fresh inner tree, and the outer parse is re-run; the wrap is undone when
//! it does not repair the outer parse.
//!
//! Candidates are ranked by (grammar declaration order, longer span, fewer
//! outer tokens left between span end and end of line). Include/exclude
//! token filters run against the inner tokenization of the span.

use std::collections::HashMap;

use boxtree_core::{NodeArena, NodeId, NodeKind};
use boxtree_grammar::table::Action;
use boxtree_grammar::{CompiledGrammar, Grammar, registry};

use crate::lexer::relex;
use crate::parser;
use crate::records::ParserRecord;
use crate::tokens::{Classes, chain_first, chain_last, next_unit, unit_of, unit_text};
use crate::tree_manager::EngineOptions;

/// Try to repair the outer parse by wrapping a span in a language box.
/// On success the magic terminal is in place and the new (parsed) record is
/// returned for registration.
pub fn try_insert(
    arena: &mut NodeArena,
    classes: &Classes,
    records: &mut [ParserRecord],
    _options: &EngineOptions,
) -> Option<(NodeId, ParserRecord)> {
    let error = records[0]
        .error_nodes(arena)
        .first()
        .map(|&(_, e)| e)?;

    let line = error_line_units(arena, classes, &records[0], error);
    if line.is_empty() {
        return None;
    }
    let error_idx = line
        .iter()
        .position(|&u| u == unit_of(arena, error))
        .unwrap_or(line.len() - 1);

    let compositions = records[0].grammar.grammar.compositions.clone();
    let mut best: Option<(usize, usize, usize, usize)> = None; // (rule, s, e, span_chars)

    for (rule_idx, rule) in compositions.iter().enumerate() {
        let Some(inner) = registry::lookup(&rule.inner) else {
            continue;
        };
        for s in 0..=error_idx {
            for e in (error_idx..line.len()).rev() {
                let text: String = line[s..=e]
                    .iter()
                    .map(|&u| unit_text(arena, u))
                    .collect();
                if text.trim().is_empty() {
                    continue;
                }
                let Some(token_classes) = tokenize(&inner, &text) else {
                    continue;
                };
                if !filters_allow(rule, &token_classes) {
                    continue;
                }
                if !parses_cleanly(&inner, &token_classes) {
                    continue;
                }
                let span_chars = text.chars().count();
                let slack = line.len() - 1 - e;
                let key = (rule_idx, usize::MAX - span_chars, slack);
                let best_key = best.map(|(r, s2, e2, c)| {
                    let slack2 = line.len() - 1 - e2;
                    let _ = s2;
                    (r, usize::MAX - c, slack2)
                });
                if best_key.is_none_or(|bk| key < bk) {
                    best = Some((rule_idx, s, e, span_chars));
                }
            }
        }
    }

    let (rule_idx, s, e, _) = best?;
    let rule = &compositions[rule_idx];
    let inner = registry::lookup(&rule.inner)?;

    apply_wrap(arena, classes, records, &line[s..=e], inner)
}

/// Real units of the line holding the error node, in the outer chain.
fn error_line_units(
    arena: &NodeArena,
    classes: &Classes,
    record: &ParserRecord,
    error: NodeId,
) -> Vec<NodeId> {
    // Anchor: the error node if it is chained, else the last real unit.
    let anchor = if arena.kind(error) == NodeKind::Eos {
        match arena.prev_term(error) {
            Some(p) => unit_of(arena, p),
            None => return Vec::new(),
        }
    } else {
        unit_of(arena, error)
    };

    // Walk to the start of the line.
    let mut start = anchor;
    loop {
        let Some(prev) = crate::tokens::prev_unit(arena, start) else {
            break;
        };
        if arena.kind(prev) == NodeKind::Bos
            || unit_text(arena, prev).contains('\n')
        {
            break;
        }
        start = prev;
    }

    // Collect the line.
    let mut units = Vec::new();
    let mut cursor = Some(start);
    while let Some(unit) = cursor {
        if matches!(arena.kind(unit), NodeKind::Eos) || unit_text(arena, unit).contains('\n') {
            break;
        }
        if !classes.is_virtual(arena, unit) {
            units.push(unit);
        }
        cursor = next_unit(arena, unit);
    }
    units
}

/// Tokenize with the inner grammar. Returns every class name in order
/// (hidden included), or `None` if any span is unlexable.
fn tokenize(inner: &CompiledGrammar, text: &str) -> Option<Vec<String>> {
    let mut classes = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let m = inner.dfa.scan(text, pos)?;
        classes.push(inner.class_name(m.rule).to_owned());
        pos += m.len;
    }
    Some(classes)
}

fn filters_allow(rule: &boxtree_grammar::CompositionRule, token_classes: &[String]) -> bool {
    if token_classes
        .iter()
        .any(|c| rule.exclude.iter().any(|x| x == c))
    {
        return false;
    }
    if !rule.include.is_empty()
        && !token_classes
            .iter()
            .any(|c| rule.include.iter().any(|x| x == c))
    {
        return false;
    }
    true
}

/// Pure LR run over the visible token classes: does the inner grammar accept
/// the span outright?
fn parses_cleanly(inner: &CompiledGrammar, token_classes: &[String]) -> bool {
    let table = &inner.table;
    let mut terms = Vec::new();
    for class in token_classes {
        let ignored = inner
            .grammar
            .token_rule(class)
            .is_some_and(|rule| rule.ignored);
        if ignored {
            continue;
        }
        match table.term_id(class) {
            Some(t) => terms.push(t),
            None => return false,
        }
    }
    terms.push(boxtree_grammar::table::EOF);

    let mut stack = vec![0u32];
    let mut fuel = 100_000u32;
    for &term in &terms {
        loop {
            if fuel == 0 {
                return false;
            }
            fuel -= 1;
            let state = *stack.last().expect("bottom state never popped");
            match table.action(state, term) {
                Action::Shift(next) => {
                    stack.push(next);
                    break;
                }
                Action::Reduce(p) => {
                    let prod = table.prod(p);
                    if stack.len() <= prod.rhs.len() {
                        return false;
                    }
                    stack.truncate(stack.len() - prod.rhs.len());
                    let state = *stack.last().expect("bottom state never popped");
                    match table.goto(state, prod.lhs) {
                        Some(next) => stack.push(next),
                        None => return false,
                    }
                }
                Action::Accept => return true,
                Action::Error => return false,
            }
        }
    }
    false
}

/// Replace the span units with a magic terminal whose payload is a freshly
/// parsed inner tree, then re-run the outer parse. Undone if the outer
/// parse still fails.
fn apply_wrap(
    arena: &mut NodeArena,
    classes: &Classes,
    records: &mut [ParserRecord],
    span: &[NodeId],
    inner: std::sync::Arc<CompiledGrammar>,
) -> Option<(NodeId, ParserRecord)> {
    let text: String = span.iter().map(|&u| unit_text(arena, u)).collect();

    let first = *span.first()?;
    let last = *span.last()?;
    let chain_prev = arena.prev_term(chain_first(arena, first))?;
    let chain_next = arena.next_term(chain_last(arena, last))?;

    let parent = arena.parent(first)?;
    let index = arena.children(parent).iter().position(|&c| c == first)?;

    // Detach the span from tree and chain.
    for &unit in span {
        if let Some(p) = arena.parent(unit) {
            arena.remove_child(p, unit);
        }
    }

    let class = arena.intern(&Grammar::box_class(inner.name()));
    let magic = arena.new_node(NodeKind::Magic, class);
    arena.insert_child(parent, index.min(arena.children(parent).len()), magic);
    arena.link_terms(chain_prev, magic);
    arena.link_terms(magic, chain_next);
    arena.mark_changed(magic);

    // Build and parse the inner document.
    let mut record = ParserRecord::new(arena, inner, Some(magic), true);
    let seed = arena.new_terminal(classes.error, &text);
    let (bos, eos) = (record.bos, record.eos);
    arena.insert_child(record.root, 1, seed);
    arena.link_terms(bos, seed);
    arena.link_terms(seed, eos);
    arena.mark_changed(seed);
    relex(arena, classes, &record.grammar.clone(), seed);
    if record.grammar.grammar.indent_sensitive {
        crate::indent::reconcile(arena, classes, &record);
    }
    let inner_ok = parser::parse_record(arena, &mut record, &HashMap::new());

    // Re-run the outer parse with the box in place.
    let mut magic_status: HashMap<NodeId, bool> = records
        .iter()
        .filter_map(|r| r.magic.map(|m| (m, r.last_status(arena))))
        .collect();
    magic_status.insert(magic, inner_ok && record.error_nodes(arena).is_empty());

    let outer_ok = parser::parse_record(arena, &mut records[0], &magic_status);

    if outer_ok {
        return Some((magic, record));
    }

    // Undo the wrap: the magic leaves, the span text returns as plain
    // terminals.
    record.set_active(arena, false);
    if let Some(p) = arena.parent(magic) {
        arena.remove_child(p, magic);
    }
    let fresh = arena.new_terminal(classes.error, &text);
    arena.insert_child(parent, index.min(arena.children(parent).len()), fresh);
    arena.link_terms(chain_prev, fresh);
    arena.link_terms(fresh, chain_next);
    arena.mark_changed(fresh);
    let outer_grammar = records[0].grammar.clone();
    relex(arena, classes, &outer_grammar, fresh);
    let magic_status: HashMap<NodeId, bool> = records
        .iter()
        .filter_map(|r| r.magic.map(|m| (m, r.last_status(arena))))
        .collect();
    parser::parse_record(arena, &mut records[0], &magic_status);
    None
}
