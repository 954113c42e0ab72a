//! Parser records: one per grammar instance inside a document.

use std::collections::HashMap;
use std::sync::Arc;

use boxtree_core::{NodeArena, NodeId, SymbolId, Version, Versioned};
use boxtree_grammar::{CompiledGrammar, TermId};

/// Per-grammar-instance state: the grammar, the tree it owns, the enclosing
/// magic terminal for language boxes, and versioned parse status so undo
/// restores it together with the tree.
pub struct ParserRecord {
    pub grammar: Arc<CompiledGrammar>,
    pub root: NodeId,
    pub bos: NodeId,
    pub eos: NodeId,
    /// Enclosing magic terminal; `None` for the outermost record.
    pub magic: Option<NodeId>,
    /// Inserted by auto language-box detection (candidate for auto-removal).
    pub auto_inserted: bool,
    created_at: Version,
    last_status: Versioned<bool>,
    active: Versioned<bool>,
    /// `(iso_root, error_terminal)` pairs; equal ids mark an unrecovered
    /// failure with no isolated subtree.
    error_nodes: Versioned<Vec<(NodeId, NodeId)>>,
    term_cache: HashMap<SymbolId, Option<TermId>>,
}

impl ParserRecord {
    /// Create a record with a fresh `Root [BOS, EOS]` tree.
    pub fn new(
        arena: &mut NodeArena,
        grammar: Arc<CompiledGrammar>,
        magic: Option<NodeId>,
        auto_inserted: bool,
    ) -> Self {
        let root_sym = arena.intern("Root");
        let (root, bos, eos) = arena.new_tree(root_sym);
        if let Some(magic) = magic {
            arena.set_magic_inner(magic, Some(root));
            arena.set_magic_outer(root, Some(magic));
        }
        let v = arena.write_version();
        Self {
            grammar,
            root,
            bos,
            eos,
            magic,
            auto_inserted,
            created_at: v,
            last_status: Versioned::new(v, false),
            active: Versioned::new(v, true),
            error_nodes: Versioned::new(v, Vec::new()),
            term_cache: HashMap::new(),
        }
    }

    /// Wrap an already-built tree (document deserialization).
    pub fn from_tree(
        arena: &mut NodeArena,
        grammar: Arc<CompiledGrammar>,
        root: NodeId,
        bos: NodeId,
        eos: NodeId,
        magic: Option<NodeId>,
        auto_inserted: bool,
    ) -> Self {
        if let Some(magic) = magic {
            arena.set_magic_inner(magic, Some(root));
            arena.set_magic_outer(root, Some(magic));
        }
        let v = arena.write_version();
        Self {
            grammar,
            root,
            bos,
            eos,
            magic,
            auto_inserted,
            created_at: v,
            last_status: Versioned::new(v, false),
            active: Versioned::new(v, true),
            error_nodes: Versioned::new(v, Vec::new()),
            term_cache: HashMap::new(),
        }
    }

    pub fn last_status(&self, arena: &NodeArena) -> bool {
        arena.version() >= self.created_at && *self.last_status.get(arena.version())
    }

    pub fn set_last_status(&mut self, arena: &mut NodeArena, value: bool) {
        let v = arena.write_version();
        self.last_status.set(v, value);
    }

    /// A record deactivates when its box is removed; undo past either the
    /// removal or the creation restores the right state.
    pub fn is_active(&self, arena: &NodeArena) -> bool {
        arena.version() >= self.created_at && *self.active.get(arena.version())
    }

    pub fn set_active(&mut self, arena: &mut NodeArena, value: bool) {
        let v = arena.write_version();
        self.active.set(v, value);
    }

    pub fn error_nodes(&self, arena: &NodeArena) -> &[(NodeId, NodeId)] {
        if arena.version() < self.created_at {
            return &[];
        }
        self.error_nodes.get(arena.version())
    }

    pub fn set_error_nodes(&mut self, arena: &mut NodeArena, pairs: Vec<(NodeId, NodeId)>) {
        let v = arena.write_version();
        self.error_nodes.set(v, pairs);
    }

    /// Table terminal id for a node's class symbol, memoized per record.
    pub fn term_id(&mut self, arena: &NodeArena, sym: SymbolId) -> Option<TermId> {
        if let Some(&cached) = self.term_cache.get(&sym) {
            return cached;
        }
        let id = self.grammar.table.term_id(arena.interner().resolve(sym));
        self.term_cache.insert(sym, id);
        id
    }

    /// Whether a chain node is invisible to this grammar's LR tables
    /// (ignored token class). Magic terminals are always visible.
    pub fn is_hidden(&self, arena: &NodeArena, id: NodeId) -> bool {
        if arena.kind(id) != boxtree_core::NodeKind::Terminal
            && arena.kind(id) != boxtree_core::NodeKind::MultiText
        {
            return false;
        }
        let name = arena.interner().resolve(arena.symbol(id));
        self.grammar
            .grammar
            .token_rule(name)
            .is_some_and(|rule| rule.ignored)
    }

    /// Drop versioned state newer than `v` (the redo branch being abandoned).
    pub fn truncate_after(&mut self, v: Version) {
        self.last_status.truncate_after(v);
        self.active.truncate_after(v);
        self.error_nodes.truncate_after(v);
    }
}
