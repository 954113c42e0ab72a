//! Token-unit helpers over the terminal chain.
//!
//! The chain threads BOS, EOS, plain terminals, magic terminals, and the
//! *segments* of multi-line tokens. The parser consumes *units*: a MultiText
//! container counts as one token even though its segments occupy the chain.

use boxtree_core::{NodeArena, NodeId, NodeKind, SymbolId};
use boxtree_grammar::types::{DEDENT, ERROR_CLASS, INDENT, NEWLINE};

/// Interned symbol ids for the classes the engine synthesizes itself.
#[derive(Debug, Clone, Copy)]
pub struct Classes {
    pub newline: SymbolId,
    pub indent: SymbolId,
    pub dedent: SymbolId,
    pub error: SymbolId,
}

impl Classes {
    pub fn install(arena: &mut NodeArena) -> Self {
        Self {
            newline: arena.intern(NEWLINE),
            indent: arena.intern(INDENT),
            dedent: arena.intern(DEDENT),
            error: arena.intern(ERROR_CLASS),
        }
    }

    /// Virtual terminals: zero-width tokens synthesized by the indentation
    /// engine (NEWLINE/INDENT/DEDENT and indentation errors).
    pub fn is_virtual(&self, arena: &NodeArena, id: NodeId) -> bool {
        arena.kind(id) == NodeKind::Terminal
            && arena.lexeme(id).is_empty()
            && [self.newline, self.indent, self.dedent, self.error].contains(&arena.symbol(id))
    }
}

/// The token unit a chain node belongs to: a MultiText segment maps to its
/// container, everything else to itself.
pub fn unit_of(arena: &NodeArena, chain_node: NodeId) -> NodeId {
    match arena.parent(chain_node) {
        Some(p) if arena.kind(p) == NodeKind::MultiText => p,
        _ => chain_node,
    }
}

/// First chain slot of a unit.
pub fn chain_first(arena: &NodeArena, unit: NodeId) -> NodeId {
    if arena.kind(unit) == NodeKind::MultiText {
        *arena
            .children(unit)
            .first()
            .expect("MultiText always has segments")
    } else {
        unit
    }
}

/// Last chain slot of a unit.
pub fn chain_last(arena: &NodeArena, unit: NodeId) -> NodeId {
    if arena.kind(unit) == NodeKind::MultiText {
        *arena
            .children(unit)
            .last()
            .expect("MultiText always has segments")
    } else {
        unit
    }
}

/// Unit following `unit` in the chain, if any.
pub fn next_unit(arena: &NodeArena, unit: NodeId) -> Option<NodeId> {
    arena
        .next_term(chain_last(arena, unit))
        .map(|n| unit_of(arena, n))
}

/// Unit preceding `unit` in the chain, if any.
pub fn prev_unit(arena: &NodeArena, unit: NodeId) -> Option<NodeId> {
    arena
        .prev_term(chain_first(arena, unit))
        .map(|n| unit_of(arena, n))
}

/// Lexeme of a unit. Magic terminals are zero-width at the outer level —
/// their text lives in the inner tree.
pub fn unit_text(arena: &NodeArena, unit: NodeId) -> String {
    match arena.kind(unit) {
        NodeKind::MultiText => arena
            .children(unit)
            .iter()
            .map(|&c| arena.lexeme(c))
            .collect(),
        _ => arena.lexeme(unit).to_owned(),
    }
}

/// Unit length in characters.
pub fn unit_len(arena: &NodeArena, unit: NodeId) -> usize {
    match arena.kind(unit) {
        NodeKind::MultiText => arena
            .children(unit)
            .iter()
            .map(|&c| arena.lexeme(c).chars().count())
            .sum(),
        _ => arena.lexeme(unit).chars().count(),
    }
}

/// Whether a unit carries a changed flag (MultiText: any segment or itself).
pub fn unit_changed(arena: &NodeArena, unit: NodeId) -> bool {
    if arena.is_changed(unit) {
        return true;
    }
    if arena.kind(unit) == NodeKind::MultiText {
        return arena.children(unit).iter().any(|&c| arena.is_changed(c));
    }
    false
}
