//! Tree invariant checks, used by tests and debug builds.

use std::collections::HashSet;

use crate::arena::{NodeArena, NodeId, NodeKind};
use crate::compare::TreeView;

/// A violated tree invariant. These never fire in a correct build; the
/// engine treats them as fatal.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvariantViolation {
    #[error("terminal chain does not match the tree fringe: {0}")]
    ChainFringeMismatch(String),
    #[error("node {0:?} appears under two parents")]
    DoubleParent(NodeId),
    #[error("child {child:?} does not point back at parent {parent:?}")]
    ParentLink { parent: NodeId, child: NodeId },
    #[error("changed terminal {0:?} has an ancestor without the nested flag")]
    ChangedNotDominated(NodeId),
}

/// Check the structural invariants of the tree rooted at `root` at the
/// arena's current version.
pub fn check_tree(arena: &NodeArena, root: NodeId) -> Result<(), InvariantViolation> {
    let view = TreeView::current(arena);
    check_parent_links(&view, root)?;
    check_single_parent(&view, root)?;
    check_chain_matches_fringe(arena, &view, root)?;
    check_changed_dominance(arena, &view, root)?;
    Ok(())
}

fn check_parent_links(view: &TreeView<'_>, root: NodeId) -> Result<(), InvariantViolation> {
    let mut node = Some(root);
    while let Some(id) = node {
        for &child in view.children(id) {
            if view.parent(child) != Some(id) {
                return Err(InvariantViolation::ParentLink { parent: id, child });
            }
        }
        node = view.next_node(id, root);
    }
    Ok(())
}

fn check_single_parent(view: &TreeView<'_>, root: NodeId) -> Result<(), InvariantViolation> {
    let mut seen = HashSet::new();
    let mut node = Some(root);
    while let Some(id) = node {
        for &child in view.children(id) {
            if !seen.insert(child) {
                return Err(InvariantViolation::DoubleParent(child));
            }
        }
        node = view.next_node(id, root);
    }
    Ok(())
}

/// The `next_term` chain from BOS to EOS must visit exactly the terminals of
/// the tree fringe, in order.
fn check_chain_matches_fringe(
    arena: &NodeArena,
    view: &TreeView<'_>,
    root: NodeId,
) -> Result<(), InvariantViolation> {
    let mut fringe = Vec::new();
    collect_fringe(view, root, &mut fringe);

    let bos = *fringe.first().expect("tree always has BOS");
    let mut chain = Vec::new();
    let mut cursor = Some(bos);
    let mut guard = 0usize;
    while let Some(id) = cursor {
        chain.push(id);
        if arena.kind(id) == NodeKind::Eos && arena.parent(id) == Some(root) {
            break;
        }
        cursor = arena.next_term(id);
        guard += 1;
        if guard > arena.len() * 2 {
            return Err(InvariantViolation::ChainFringeMismatch(
                "cycle in next_term chain".to_owned(),
            ));
        }
    }

    if fringe != chain {
        return Err(InvariantViolation::ChainFringeMismatch(format!(
            "fringe has {} terminals, chain has {}",
            fringe.len(),
            chain.len()
        )));
    }
    Ok(())
}

/// Terminals in chain order. Language boxes keep their own chain below the
/// magic terminal, so the walk does not descend into them; MultiText
/// segments occupy chain slots in place of their container.
fn collect_fringe(view: &TreeView<'_>, id: NodeId, out: &mut Vec<NodeId>) {
    match view.kind(id) {
        NodeKind::NonTerminal => {
            for &child in view.children(id) {
                collect_fringe(view, child, out);
            }
        }
        NodeKind::MultiText => out.extend(view.children(id).iter().copied()),
        _ => out.push(id),
    }
}

fn check_changed_dominance(
    arena: &NodeArena,
    view: &TreeView<'_>,
    root: NodeId,
) -> Result<(), InvariantViolation> {
    let mut node = Some(root);
    while let Some(id) = node {
        if arena.is_changed(id) {
            let mut cursor = id;
            while let Some(parent) = view.parent(cursor) {
                if !arena.has_nested_changes(parent) {
                    return Err(InvariantViolation::ChangedNotDominated(id));
                }
                cursor = parent;
            }
        }
        node = view.next_node(id, root);
    }
    Ok(())
}
