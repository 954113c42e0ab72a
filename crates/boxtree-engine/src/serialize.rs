//! Persisted document format.
//!
//! A document is a forest of parse trees, one per nested grammar: grammar
//! id, node list with parent indices and terminal lexemes, and for each
//! magic terminal the index of its inner tree. Loading rebuilds the forest,
//! marks every terminal changed, and reparses, so statuses and states are
//! recomputed rather than trusted from disk.

use serde::{Deserialize, Serialize};

use boxtree_core::{NodeArena, NodeId, NodeKind};
use boxtree_grammar::registry;

use crate::records::ParserRecord;
use crate::tokens::Classes;
use crate::tree_manager::{Cursor, TreeManager};
use crate::{EngineError, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct DocFile {
    pub trees: Vec<TreeFile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TreeFile {
    pub grammar: String,
    #[serde(default)]
    pub auto_inserted: bool,
    pub nodes: Vec<NodeFile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeFile {
    pub kind: NodeKind,
    pub symbol: String,
    #[serde(default)]
    pub lexeme: String,
    pub parent: Option<usize>,
    /// Magic terminals: index of the inner tree in `DocFile::trees`.
    #[serde(default)]
    pub inner_tree: Option<usize>,
}

/// Serialize a document. Tree 0 is the outermost grammar.
pub fn save(manager: &TreeManager) -> Result<String> {
    let mut trees = Vec::new();
    let mut queue = vec![0usize];
    let mut record_order = Vec::new();
    while let Some(idx) = queue.pop() {
        record_order.push(idx);
        for (i, record) in manager.records.iter().enumerate() {
            if !record.is_active(&manager.arena) {
                continue;
            }
            if let Some(magic) = record.magic {
                if manager.records[idx].root == owner_root(&manager.arena, magic) {
                    queue.push(i);
                }
            }
        }
    }

    for &idx in &record_order {
        let record = &manager.records[idx];
        trees.push(save_tree(manager, record, &record_order));
    }
    Ok(serde_json::to_string_pretty(&DocFile { trees })?)
}

fn owner_root(arena: &NodeArena, node: NodeId) -> NodeId {
    let mut cursor = node;
    while let Some(p) = arena.parent(cursor) {
        cursor = p;
    }
    cursor
}

fn save_tree(manager: &TreeManager, record: &ParserRecord, record_order: &[usize]) -> TreeFile {
    let arena = &manager.arena;
    let mut nodes = Vec::new();
    let mut order: Vec<(NodeId, Option<usize>)> = Vec::new();
    preorder(arena, record.root, None, &mut order);

    for &(id, parent) in &order {
        let inner_tree = arena.magic_inner(id).and_then(|inner| {
            record_order
                .iter()
                .position(|&r| manager.records[r].root == inner)
        });
        nodes.push(NodeFile {
            kind: arena.kind(id),
            symbol: arena.interner().resolve(arena.symbol(id)).to_owned(),
            lexeme: arena.lexeme(id).to_owned(),
            parent,
            inner_tree,
        });
    }

    TreeFile {
        grammar: record.grammar.name().to_owned(),
        auto_inserted: record.auto_inserted,
        nodes,
    }
}

fn preorder(
    arena: &NodeArena,
    id: NodeId,
    parent: Option<usize>,
    out: &mut Vec<(NodeId, Option<usize>)>,
) {
    let index = out.len();
    out.push((id, parent));
    for &child in arena.children(id) {
        preorder(arena, child, Some(index), out);
    }
}

/// Rebuild a document from its serialized form and reparse it.
pub fn load(json: &str) -> Result<TreeManager> {
    let doc: DocFile = serde_json::from_str(json)?;
    if doc.trees.is_empty() {
        return Err(EngineError::Corrupt {
            message: "document has no trees".into(),
        });
    }

    let outer_grammar = &doc.trees[0].grammar;
    registry::lookup(outer_grammar).ok_or_else(|| EngineError::GrammarMissing {
        name: outer_grammar.clone(),
    })?;

    let mut arena = NodeArena::new();
    let classes = Classes::install(&mut arena);
    let mut records: Vec<ParserRecord> = Vec::new();
    build_tree(&mut arena, &doc, 0, None, &mut records)?;

    let cursor = Cursor {
        node: records[0].bos,
        offset: 0,
    };
    let mut manager = TreeManager {
        arena,
        classes,
        records,
        cursor,
        selection_anchor: None,
        options: Default::default(),
        dirty: Vec::new(),
    };
    manager.run_pipeline();
    manager.arena.undo_snapshot();
    Ok(manager)
}

fn build_tree(
    arena: &mut NodeArena,
    doc: &DocFile,
    tree_idx: usize,
    magic: Option<NodeId>,
    records: &mut Vec<ParserRecord>,
) -> Result<usize> {
    let tree = doc
        .trees
        .get(tree_idx)
        .ok_or_else(|| EngineError::Corrupt {
            message: format!("missing tree {tree_idx}"),
        })?;
    let grammar = registry::lookup(&tree.grammar).ok_or_else(|| EngineError::GrammarMissing {
        name: tree.grammar.clone(),
    })?;

    // Materialize nodes and child lists.
    let mut ids = Vec::with_capacity(tree.nodes.len());
    for node in &tree.nodes {
        let sym = arena.intern(&node.symbol);
        let id = arena.new_node(node.kind, sym);
        if !node.lexeme.is_empty() {
            arena.set_lexeme(id, node.lexeme.clone());
        }
        ids.push(id);
    }
    for (i, node) in tree.nodes.iter().enumerate() {
        if let Some(p) = node.parent {
            let parent = *ids.get(p).ok_or_else(|| EngineError::Corrupt {
                message: format!("node {i} has out-of-range parent {p}"),
            })?;
            let mut children = arena.children(parent).to_vec();
            children.push(ids[i]);
            arena.set_children(parent, children);
            arena.set_parent(ids[i], Some(parent));
        }
    }

    let root = ids[0];
    let children = arena.children(root);
    let (bos, eos) = match (children.first(), children.last()) {
        (Some(&b), Some(&e))
            if arena.kind(b) == NodeKind::Bos && arena.kind(e) == NodeKind::Eos =>
        {
            (b, e)
        }
        _ => {
            return Err(EngineError::Corrupt {
                message: format!("tree {tree_idx} lacks BOS/EOS sentinels"),
            });
        }
    };

    // Thread the terminal chain and mark terminals changed for the reparse.
    let mut fringe = Vec::new();
    collect_fringe(arena, root, &mut fringe);
    for pair in fringe.windows(2) {
        arena.link_terms(pair[0], pair[1]);
    }
    for &node in &fringe {
        if !matches!(arena.kind(node), NodeKind::Bos | NodeKind::Eos) {
            arena.mark_changed(node);
        }
    }

    let record_idx = records.len();
    records.push(ParserRecord::from_tree(
        arena,
        grammar,
        root,
        bos,
        eos,
        magic,
        tree.auto_inserted,
    ));

    // Inner trees, recursively.
    for (i, node) in tree.nodes.iter().enumerate() {
        if let Some(inner) = node.inner_tree {
            build_tree(arena, doc, inner, Some(ids[i]), records)?;
        }
    }

    Ok(record_idx)
}

fn collect_fringe(arena: &NodeArena, id: NodeId, out: &mut Vec<NodeId>) {
    match arena.kind(id) {
        NodeKind::NonTerminal => {
            for child in arena.children(id).to_vec() {
                collect_fringe(arena, child, out);
            }
        }
        NodeKind::MultiText => out.extend(arena.children(id).iter().copied()),
        _ => out.push(id),
    }
}
