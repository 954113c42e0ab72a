//! Debug tree renderer for snapshot tests and the CLI.

use boxtree_core::{NodeArena, NodeId, NodeKind};

/// Render a tree as an indented outline: non-terminals by symbol, terminals
/// as `symbol "lexeme"`, language boxes with their inner tree nested.
pub fn dump_tree(arena: &NodeArena, root: NodeId) -> String {
    let mut out = String::new();
    render(arena, root, 0, &mut out);
    out
}

fn render(arena: &NodeArena, id: NodeId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let symbol = arena.interner().resolve(arena.symbol(id));
    let lexeme = arena.lexeme(id);

    match arena.kind(id) {
        NodeKind::NonTerminal | NodeKind::MultiText => {
            out.push_str(&format!("{indent}{symbol}\n"));
            for &child in arena.children(id) {
                render(arena, child, depth + 1, out);
            }
        }
        NodeKind::Magic => {
            out.push_str(&format!("{indent}{symbol} [box]\n"));
            if let Some(inner) = arena.magic_inner(id) {
                render(arena, inner, depth + 1, out);
            }
        }
        NodeKind::Bos | NodeKind::Eos => {
            out.push_str(&format!("{indent}{symbol}\n"));
        }
        NodeKind::Terminal => {
            if lexeme.is_empty() {
                out.push_str(&format!("{indent}{symbol}\n"));
            } else {
                out.push_str(&format!("{indent}{symbol} {lexeme:?}\n"));
            }
        }
    }
}
