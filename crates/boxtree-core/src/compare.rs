//! Structural tree comparison.
//!
//! `tree_compare` walks two trees in lockstep and reports the first node
//! where symbol, kind, or lexeme disagree. Language boxes are compared
//! recursively through their inner roots. Because reads are version-indexed,
//! the two sides may be the same arena at different versions — that is how
//! the undo tests check that a rolled-back tree equals a fresh parse.

use crate::arena::{NodeArena, NodeId, NodeKind, Version};

/// A read-only view of one tree at a fixed version.
#[derive(Clone, Copy)]
pub struct TreeView<'a> {
    arena: &'a NodeArena,
    version: Version,
}

impl<'a> TreeView<'a> {
    pub fn new(arena: &'a NodeArena, version: Version) -> Self {
        Self { arena, version }
    }

    /// View of the arena at its current read version.
    pub fn current(arena: &'a NodeArena) -> Self {
        Self::new(arena, arena.version())
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.arena.kind(id)
    }

    pub fn symbol_name(&self, id: NodeId) -> &'a str {
        self.arena.interner().resolve(self.arena.symbol(id))
    }

    pub fn lexeme(&self, id: NodeId) -> &'a str {
        self.arena.lexeme_at(id, self.version)
    }

    pub fn children(&self, id: NodeId) -> &'a [NodeId] {
        self.arena.children_at(id, self.version)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.parent_at(id, self.version)
    }

    pub fn next_term(&self, id: NodeId) -> Option<NodeId> {
        self.arena.next_term_at(id, self.version)
    }

    pub fn magic_inner(&self, id: NodeId) -> Option<NodeId> {
        self.arena.magic_inner_at(id, self.version)
    }

    /// Next node in a pre-order walk bounded by `root`: first child, else
    /// the nearest right sibling found by climbing.
    pub fn next_node(&self, id: NodeId, root: NodeId) -> Option<NodeId> {
        let children = self.children(id);
        if let Some(&first) = children.first() {
            return Some(first);
        }
        let mut cursor = id;
        while cursor != root {
            let parent = self.parent(cursor)?;
            let siblings = self.children(parent);
            let pos = siblings.iter().position(|&c| c == cursor)?;
            if let Some(&right) = siblings.get(pos + 1) {
                return Some(right);
            }
            cursor = parent;
        }
        None
    }

    /// Concatenated lexemes of the terminal chain below `root`, descending
    /// into language boxes.
    pub fn text(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(root, &mut out);
        out
    }

    fn collect_text(&self, root: NodeId, out: &mut String) {
        let mut node = Some(root);
        while let Some(id) = node {
            match self.kind(id) {
                NodeKind::Magic => {
                    if let Some(inner) = self.magic_inner(id) {
                        self.collect_text(inner, out);
                    }
                }
                NodeKind::Terminal | NodeKind::Bos | NodeKind::Eos => {
                    out.push_str(self.lexeme(id));
                }
                NodeKind::NonTerminal | NodeKind::MultiText => {}
            }
            node = self.next_node(id, root);
        }
    }
}

/// First point of disagreement between two trees.
#[derive(Debug, Clone, thiserror::Error)]
#[error("trees differ at {left_symbol:?} ({left_lexeme:?}) vs {right_symbol:?} ({right_lexeme:?})")]
pub struct TreeMismatch {
    pub left_symbol: String,
    pub right_symbol: String,
    pub left_lexeme: String,
    pub right_lexeme: String,
}

/// Compare two trees node-symbol-wise, recursing into language boxes.
pub fn tree_compare(
    a: &TreeView<'_>,
    root_a: NodeId,
    b: &TreeView<'_>,
    root_b: NodeId,
) -> Result<(), TreeMismatch> {
    let mut left = Some(root_a);
    let mut right = Some(root_b);

    while let (Some(l), Some(r)) = (left, right) {
        check_node(a, l, b, r)?;

        if a.kind(l) == NodeKind::Magic {
            match (a.magic_inner(l), b.magic_inner(r)) {
                (Some(il), Some(ir)) => tree_compare(a, il, b, ir)?,
                (None, None) => {}
                _ => return Err(mismatch(a, l, b, r)),
            }
        }

        if a.kind(l) == NodeKind::Eos && b.kind(r) == NodeKind::Eos {
            let lp = a.parent(l);
            let rp = b.parent(r);
            // Stop at the EOS of the roots being compared.
            if lp == Some(root_a) || rp == Some(root_b) || (lp.is_none() && rp.is_none()) {
                return Ok(());
            }
        }

        left = a.next_node(l, root_a);
        right = b.next_node(r, root_b);
    }

    match (left, right) {
        (None, None) => Ok(()),
        (Some(l), _) => Err(TreeMismatch {
            left_symbol: a.symbol_name(l).to_owned(),
            right_symbol: "<end>".to_owned(),
            left_lexeme: a.lexeme(l).to_owned(),
            right_lexeme: String::new(),
        }),
        (_, Some(r)) => Err(TreeMismatch {
            left_symbol: "<end>".to_owned(),
            right_symbol: b.symbol_name(r).to_owned(),
            left_lexeme: String::new(),
            right_lexeme: b.lexeme(r).to_owned(),
        }),
    }
}

fn check_node(
    a: &TreeView<'_>,
    l: NodeId,
    b: &TreeView<'_>,
    r: NodeId,
) -> Result<(), TreeMismatch> {
    if a.kind(l) != b.kind(r)
        || a.symbol_name(l) != b.symbol_name(r)
        || a.lexeme(l) != b.lexeme(r)
        || a.children(l).len() != b.children(r).len()
    {
        return Err(mismatch(a, l, b, r));
    }
    Ok(())
}

fn mismatch(a: &TreeView<'_>, l: NodeId, b: &TreeView<'_>, r: NodeId) -> TreeMismatch {
    TreeMismatch {
        left_symbol: a.symbol_name(l).to_owned(),
        right_symbol: b.symbol_name(r).to_owned(),
        left_lexeme: a.lexeme(l).to_owned(),
        right_lexeme: b.lexeme(r).to_owned(),
    }
}
