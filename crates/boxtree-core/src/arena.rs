//! Arena-backed parse tree with versioned fields.
//!
//! # Architecture
//!
//! The parse tree is a cyclic pointer graph: parent links, ordered child
//! lists, and a `next_term`/`prev_term` chain threading every terminal in
//! document order. Nodes live in one arena and refer to each other through
//! [`NodeId`] handles; the arena owns everything, edges are plain integers.
//!
//! Every mutable field is a [`Versioned`] cell keyed by the arena's global
//! version counter. [`undo`](NodeArena::undo)/[`redo`](NodeArena::redo) move
//! the read pointer between snapshot boundaries; no structure is rebuilt.
//!
//! A *pass journal* ([`begin_pass`](NodeArena::begin_pass)) records every
//! write so a failing parse pass can be reverted exactly, leaving the relexed
//! terminals in place but restoring the last valid structure around them.

use crate::interner::{Interner, SymbolId};
use crate::versioned::{Rollback, Versioned};

/// Global version counter value. Each snapshot boundary is one version.
pub type Version = u32;

/// Handle to a node in a [`NodeArena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }

    /// Raw index for serialization/debugging.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Create a handle from a raw index. Only meaningful for indices
    /// obtained from the same arena.
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

/// Tagged node variant. Common header fields live on every node; the kind
/// decides which of them are meaningful.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    /// Begin-of-stream sentinel, first terminal of every (sub)tree.
    Bos,
    /// End-of-stream sentinel, last terminal of every (sub)tree.
    Eos,
    /// Ordinary terminal: token class + lexeme.
    Terminal,
    /// Non-terminal produced by a reduction.
    NonTerminal,
    /// Language box: a terminal whose payload is the root of an inner tree.
    Magic,
    /// Terminal whose lexeme spans line boundaries; children are the
    /// segments, threaded into the terminal chain in its place.
    MultiText,
}

impl NodeKind {
    /// Kinds that occupy a slot in the `next_term` chain.
    #[inline]
    pub fn is_chained(self) -> bool {
        !matches!(self, NodeKind::NonTerminal | NodeKind::MultiText)
    }

    /// Kinds the parser consumes as a single token.
    #[inline]
    pub fn is_token(self) -> bool {
        matches!(self, NodeKind::Terminal | NodeKind::Magic | NodeKind::MultiText)
    }
}

struct Node {
    kind: NodeKind,
    /// Token class (terminals) or production LHS (non-terminals).
    symbol: SymbolId,
    created_at: Version,
    lexeme: Versioned<String>,
    parent: Versioned<Option<NodeId>>,
    children: Versioned<Vec<NodeId>>,
    next_term: Versioned<Option<NodeId>>,
    prev_term: Versioned<Option<NodeId>>,
    /// Lexeme changed since the last successful parse.
    changed: Versioned<bool>,
    /// A change exists somewhere below this node.
    nested: Versioned<bool>,
    /// Characters past the lexeme end the lexer inspected before committing.
    lookahead: Versioned<u32>,
    /// LR state entering this node at the last parse that consumed it.
    state: Versioned<u32>,
    /// Subtree failed out-of-context analysis and is treated as opaque.
    isolated: Versioned<bool>,
    /// Semantic overlay slot, preserved across reuse.
    overlay: Versioned<Option<u32>>,
    /// Magic only: root of the inner tree.
    magic_inner: Versioned<Option<NodeId>>,
    /// Inner roots only: back-pointer to the enclosing magic terminal.
    magic_outer: Versioned<Option<NodeId>>,
}

enum JournalEntry {
    Lexeme(NodeId, Rollback<String>),
    Parent(NodeId, Rollback<Option<NodeId>>),
    Children(NodeId, Rollback<Vec<NodeId>>),
    NextTerm(NodeId, Rollback<Option<NodeId>>),
    PrevTerm(NodeId, Rollback<Option<NodeId>>),
    Changed(NodeId, Rollback<bool>),
    Nested(NodeId, Rollback<bool>),
    Lookahead(NodeId, Rollback<u32>),
    State(NodeId, Rollback<u32>),
    Isolated(NodeId, Rollback<bool>),
    Overlay(NodeId, Rollback<Option<u32>>),
    MagicInner(NodeId, Rollback<Option<NodeId>>),
    MagicOuter(NodeId, Rollback<Option<NodeId>>),
}

/// Owner of all nodes of a document: the outer tree and every language box.
pub struct NodeArena {
    nodes: Vec<Node>,
    interner: Interner,
    /// Current read version.
    current: Version,
    /// Highest committed version (redo ceiling).
    max: Version,
    /// Set by `undo_snapshot`; the next write opens a new version.
    sealed: bool,
    journal: Option<Vec<JournalEntry>>,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! field_setter {
    ($setter:ident, $field:ident, $entry:ident, $ty:ty) => {
        pub fn $setter(&mut self, id: NodeId, value: $ty) {
            let v = self.prepare_write();
            if let Some(rb) = self.nodes[id.idx()].$field.set(v, value) {
                if let Some(journal) = self.journal.as_mut() {
                    journal.push(JournalEntry::$entry(id, rb));
                }
            }
        }
    };
}

impl NodeArena {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            interner: Interner::new(),
            current: 0,
            max: 0,
            sealed: false,
            journal: None,
        }
    }

    pub fn intern(&mut self, name: &str) -> SymbolId {
        self.interner.intern(name)
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn symbol_name(&self, id: NodeId) -> &str {
        self.interner.resolve(self.symbol(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ----- construction -----

    pub fn new_node(&mut self, kind: NodeKind, symbol: SymbolId) -> NodeId {
        let v = self.prepare_write();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            symbol,
            created_at: v,
            lexeme: Versioned::new(v, String::new()),
            parent: Versioned::new(v, None),
            children: Versioned::new(v, Vec::new()),
            next_term: Versioned::new(v, None),
            prev_term: Versioned::new(v, None),
            changed: Versioned::new(v, false),
            nested: Versioned::new(v, false),
            lookahead: Versioned::new(v, 0),
            state: Versioned::new(v, 0),
            isolated: Versioned::new(v, false),
            overlay: Versioned::new(v, None),
            magic_inner: Versioned::new(v, None),
            magic_outer: Versioned::new(v, None),
        });
        id
    }

    pub fn new_terminal(&mut self, symbol: SymbolId, lexeme: &str) -> NodeId {
        let id = self.new_node(NodeKind::Terminal, symbol);
        if !lexeme.is_empty() {
            self.set_lexeme(id, lexeme.to_owned());
        }
        id
    }

    /// Create a fresh `Root [BOS, EOS]` tree with a linked terminal chain.
    /// Returns `(root, bos, eos)`.
    pub fn new_tree(&mut self, root_symbol: SymbolId) -> (NodeId, NodeId, NodeId) {
        let bos_sym = self.intern("bos");
        let eos_sym = self.intern("eos");
        let root = self.new_node(NodeKind::NonTerminal, root_symbol);
        let bos = self.new_node(NodeKind::Bos, bos_sym);
        let eos = self.new_node(NodeKind::Eos, eos_sym);
        self.set_children(root, vec![bos, eos]);
        self.set_parent(bos, Some(root));
        self.set_parent(eos, Some(root));
        self.link_terms(bos, eos);
        (root, bos, eos)
    }

    // ----- reads at the current version -----

    #[inline]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.idx()].kind
    }

    #[inline]
    pub fn symbol(&self, id: NodeId) -> SymbolId {
        self.nodes[id.idx()].symbol
    }

    #[inline]
    pub fn created_at(&self, id: NodeId) -> Version {
        self.nodes[id.idx()].created_at
    }

    pub fn lexeme(&self, id: NodeId) -> &str {
        self.nodes[id.idx()].lexeme.get(self.current)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        *self.nodes[id.idx()].parent.get(self.current)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes[id.idx()].children.get(self.current)
    }

    pub fn next_term(&self, id: NodeId) -> Option<NodeId> {
        *self.nodes[id.idx()].next_term.get(self.current)
    }

    pub fn prev_term(&self, id: NodeId) -> Option<NodeId> {
        *self.nodes[id.idx()].prev_term.get(self.current)
    }

    pub fn is_changed(&self, id: NodeId) -> bool {
        *self.nodes[id.idx()].changed.get(self.current)
    }

    pub fn has_nested_changes(&self, id: NodeId) -> bool {
        *self.nodes[id.idx()].nested.get(self.current)
    }

    pub fn lookahead(&self, id: NodeId) -> u32 {
        *self.nodes[id.idx()].lookahead.get(self.current)
    }

    pub fn state(&self, id: NodeId) -> u32 {
        *self.nodes[id.idx()].state.get(self.current)
    }

    pub fn is_isolated(&self, id: NodeId) -> bool {
        *self.nodes[id.idx()].isolated.get(self.current)
    }

    pub fn overlay(&self, id: NodeId) -> Option<u32> {
        *self.nodes[id.idx()].overlay.get(self.current)
    }

    pub fn magic_inner(&self, id: NodeId) -> Option<NodeId> {
        *self.nodes[id.idx()].magic_inner.get(self.current)
    }

    pub fn magic_outer(&self, id: NodeId) -> Option<NodeId> {
        *self.nodes[id.idx()].magic_outer.get(self.current)
    }

    // ----- reads at an explicit version (tree_compare, exports) -----

    pub fn lexeme_at(&self, id: NodeId, v: Version) -> &str {
        self.nodes[id.idx()].lexeme.get(v)
    }

    pub fn parent_at(&self, id: NodeId, v: Version) -> Option<NodeId> {
        *self.nodes[id.idx()].parent.get(v)
    }

    pub fn children_at(&self, id: NodeId, v: Version) -> &[NodeId] {
        self.nodes[id.idx()].children.get(v)
    }

    pub fn next_term_at(&self, id: NodeId, v: Version) -> Option<NodeId> {
        *self.nodes[id.idx()].next_term.get(v)
    }

    pub fn magic_inner_at(&self, id: NodeId, v: Version) -> Option<NodeId> {
        *self.nodes[id.idx()].magic_inner.get(v)
    }

    // ----- writes -----

    field_setter!(set_lexeme, lexeme, Lexeme, String);
    field_setter!(set_parent, parent, Parent, Option<NodeId>);
    field_setter!(set_children, children, Children, Vec<NodeId>);
    field_setter!(set_next_term, next_term, NextTerm, Option<NodeId>);
    field_setter!(set_prev_term, prev_term, PrevTerm, Option<NodeId>);
    field_setter!(set_changed, changed, Changed, bool);
    field_setter!(set_nested, nested, Nested, bool);
    field_setter!(set_lookahead, lookahead, Lookahead, u32);
    field_setter!(set_state, state, State, u32);
    field_setter!(set_isolated, isolated, Isolated, bool);
    field_setter!(set_overlay, overlay, Overlay, Option<u32>);
    field_setter!(set_magic_inner, magic_inner, MagicInner, Option<NodeId>);
    field_setter!(set_magic_outer, magic_outer, MagicOuter, Option<NodeId>);

    /// Link `a -> b` in the terminal chain (both directions).
    pub fn link_terms(&mut self, a: NodeId, b: NodeId) {
        self.set_next_term(a, Some(b));
        self.set_prev_term(b, Some(a));
    }

    /// Mark a node changed and flag `nested` up the parent chain, crossing
    /// language-box boundaries through the magic back-pointer.
    pub fn mark_changed(&mut self, id: NodeId) {
        self.set_changed(id, true);
        self.mark_nested_upward(id);
    }

    /// Flag `nested` on every ancestor of `id` (excluding `id` itself).
    pub fn mark_nested_upward(&mut self, id: NodeId) {
        let mut cursor = id;
        loop {
            let up = match self.parent(cursor) {
                Some(p) => p,
                None => match self.magic_outer(cursor) {
                    Some(magic) => magic,
                    None => break,
                },
            };
            if self.has_nested_changes(up) {
                break;
            }
            self.set_nested(up, true);
            cursor = up;
        }
    }

    /// Clear change flags below `root`, descending only into flagged nodes.
    /// Stops at language-box boundaries: every tree clears its own flags
    /// after its own successful parse.
    pub fn clear_changes(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.is_changed(id) {
                self.set_changed(id, false);
            }
            if self.has_nested_changes(id) {
                self.set_nested(id, false);
                stack.extend(self.children(id).to_vec());
            }
        }
    }

    /// Insert `child` into `parent`'s child list at `index`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let mut children = self.children(parent).to_vec();
        children.insert(index.min(children.len()), child);
        self.set_children(parent, children);
        self.set_parent(child, Some(parent));
    }

    /// Detach `child` from `parent`'s child list. No-op when absent.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let mut children = self.children(parent).to_vec();
        if let Some(pos) = children.iter().position(|&c| c == child) {
            children.remove(pos);
            self.set_children(parent, children);
            self.set_parent(child, None);
        }
    }

    /// Replace `old` with `new` in the child list of `parent`, fixing parent
    /// links on both.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        let mut children = self.children(parent).to_vec();
        let pos = children
            .iter()
            .position(|&c| c == old)
            .expect("replace_child: old is not a child of parent");
        children[pos] = new;
        self.set_children(parent, children);
        self.set_parent(old, None);
        self.set_parent(new, Some(parent));
    }

    // ----- versioning -----

    /// Current read version.
    pub fn version(&self) -> Version {
        self.current
    }

    /// Highest committed version (redo ceiling).
    pub fn max_version(&self) -> Version {
        self.max
    }

    /// Seal the current version: the next write opens a new one. Groups a
    /// burst of primitive edits into one undo step. Idempotent.
    pub fn undo_snapshot(&mut self) {
        self.sealed = true;
    }

    /// Move the read pointer to the previous snapshot boundary.
    /// Underflow is a no-op; returns whether anything happened.
    pub fn undo(&mut self) -> bool {
        debug_assert!(self.journal.is_none(), "undo during an open parse pass");
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        self.sealed = false;
        true
    }

    /// Move the read pointer forward again. Overflow is a no-op.
    pub fn redo(&mut self) -> bool {
        if self.current >= self.max {
            return false;
        }
        self.current += 1;
        true
    }

    /// Version the next write attaches to, opening it if necessary. Exposed
    /// so satellite versioned state (parser records) can attach to the same
    /// burst as the tree writes.
    pub fn write_version(&mut self) -> Version {
        self.prepare_write()
    }

    /// Version all writes of the current burst attach to, abandoning any
    /// redo branch first.
    fn prepare_write(&mut self) -> Version {
        if self.current < self.max {
            for node in &mut self.nodes {
                node.truncate_after(self.current);
            }
            self.max = self.current;
            self.sealed = true;
        }
        if self.sealed {
            self.current += 1;
            self.max = self.current;
            self.sealed = false;
        }
        self.current
    }

    /// Drop history older than `oldest`, releasing memory held for undo
    /// steps the host no longer offers. Does not move the read pointer.
    pub fn compact_history(&mut self, oldest: Version) {
        let oldest = oldest.min(self.current);
        for node in &mut self.nodes {
            node.compact(oldest);
        }
    }

    // ----- pass journal -----

    /// Start journaling writes so a failing parse pass can be reverted.
    pub fn begin_pass(&mut self) {
        debug_assert!(self.journal.is_none(), "nested parse pass");
        self.journal = Some(Vec::new());
    }

    /// Keep the pass's writes and stop journaling.
    pub fn commit_pass(&mut self) {
        debug_assert!(self.journal.is_some(), "commit without begin_pass");
        self.journal = None;
    }

    /// Revert every write since `begin_pass`, newest first.
    pub fn rollback_pass(&mut self) {
        let entries = self.journal.take().expect("rollback without begin_pass");
        for entry in entries.into_iter().rev() {
            match entry {
                JournalEntry::Lexeme(id, rb) => self.nodes[id.idx()].lexeme.revert(rb),
                JournalEntry::Parent(id, rb) => self.nodes[id.idx()].parent.revert(rb),
                JournalEntry::Children(id, rb) => self.nodes[id.idx()].children.revert(rb),
                JournalEntry::NextTerm(id, rb) => self.nodes[id.idx()].next_term.revert(rb),
                JournalEntry::PrevTerm(id, rb) => self.nodes[id.idx()].prev_term.revert(rb),
                JournalEntry::Changed(id, rb) => self.nodes[id.idx()].changed.revert(rb),
                JournalEntry::Nested(id, rb) => self.nodes[id.idx()].nested.revert(rb),
                JournalEntry::Lookahead(id, rb) => self.nodes[id.idx()].lookahead.revert(rb),
                JournalEntry::State(id, rb) => self.nodes[id.idx()].state.revert(rb),
                JournalEntry::Isolated(id, rb) => self.nodes[id.idx()].isolated.revert(rb),
                JournalEntry::Overlay(id, rb) => self.nodes[id.idx()].overlay.revert(rb),
                JournalEntry::MagicInner(id, rb) => self.nodes[id.idx()].magic_inner.revert(rb),
                JournalEntry::MagicOuter(id, rb) => self.nodes[id.idx()].magic_outer.revert(rb),
            }
        }
    }

    /// Whether a pass journal is currently open.
    pub fn in_pass(&self) -> bool {
        self.journal.is_some()
    }
}

impl Node {
    fn truncate_after(&mut self, v: Version) {
        self.lexeme.truncate_after(v);
        self.parent.truncate_after(v);
        self.children.truncate_after(v);
        self.next_term.truncate_after(v);
        self.prev_term.truncate_after(v);
        self.changed.truncate_after(v);
        self.nested.truncate_after(v);
        self.lookahead.truncate_after(v);
        self.state.truncate_after(v);
        self.isolated.truncate_after(v);
        self.overlay.truncate_after(v);
        self.magic_inner.truncate_after(v);
        self.magic_outer.truncate_after(v);
    }

    fn compact(&mut self, oldest: Version) {
        self.lexeme.compact(oldest);
        self.parent.compact(oldest);
        self.children.compact(oldest);
        self.next_term.compact(oldest);
        self.prev_term.compact(oldest);
        self.changed.compact(oldest);
        self.nested.compact(oldest);
        self.lookahead.compact(oldest);
        self.state.compact(oldest);
        self.isolated.compact(oldest);
        self.overlay.compact(oldest);
        self.magic_inner.compact(oldest);
        self.magic_outer.compact(oldest);
    }
}
