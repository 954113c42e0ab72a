//! Incremental LR parser.
//!
//! # Architecture
//!
//! The parser consumes the previous tree as its input stream. At each step
//! the lookahead is a whole subtree:
//!
//! - an unchanged non-terminal whose recorded entering state matches the
//!   current state is *shifted whole* through the goto table — the reuse
//!   primitive that preserves node identity;
//! - anything else is *broken down*: its children become the input;
//! - before a changed terminal is consumed, the stack is *right-broken-down*
//!   so no reused subtree keeps reductions that depended on stale lookahead;
//! - reductions reuse the previous non-terminal when the popped children are
//!   exactly its previous child list (same handles), which also gives
//!   top-down root reuse for free and makes double-parenting impossible;
//! - isolated subtrees (failed error recovery, see [`crate::recovery`]) are
//!   shifted opaquely while their yield and right context are unchanged, and
//!   right-breakdown never descends into them.
//!
//! Recovery control flow is explicit [`Step`] values; nothing unwinds. The
//! parse pass journals its writes and the recovery loop in [`parse_record`]
//! rolls them back before isolating and restarting.

use std::collections::{HashMap, HashSet};

use boxtree_core::{NodeArena, NodeId, NodeKind};
use boxtree_grammar::table::{Action, EOF};
use boxtree_grammar::{NtId, TermId};

use crate::records::ParserRecord;
use crate::recovery;
use crate::tokens::{chain_last, unit_changed, unit_of};

/// Result of one parser step, surfaced to the recovery loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Accept,
    Error(ErrorInfo),
}

/// An LR error action: the offending node and the state that rejected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub node: NodeId,
    pub state: u32,
}

/// One slot of the parse stack. `node` is `None` only for the bottom entry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StackEntry {
    pub state: u32,
    pub node: Option<NodeId>,
    /// Hidden tokens ride the stack without contributing to productions.
    pub hidden: bool,
}

enum RunResult {
    Accepted,
    Error(ErrorInfo),
}

const RECOVERY_BUDGET: u32 = 8;
const PARSE_FUEL: u32 = 4_000_000;

/// Parse one record incrementally. Returns the new status and updates the
/// record's error list. The tree is committed on acceptance (possibly with
/// isolated subtrees); a hard failure rolls every structural write back,
/// leaving the relexed terminals and the last valid structure in place.
pub fn parse_record(
    arena: &mut NodeArena,
    record: &mut ParserRecord,
    magic_status: &HashMap<NodeId, bool>,
) -> bool {
    let old_pairs: Vec<(NodeId, NodeId)> = record.error_nodes(arena).to_vec();

    arena.begin_pass();
    let mut frozen: HashSet<NodeId> = HashSet::new();
    let mut new_pairs: Vec<(NodeId, NodeId)> = Vec::new();
    let mut budget = RECOVERY_BUDGET;

    loop {
        let (result, skipped) = {
            let mut parser = IncParser {
                arena: &mut *arena,
                record: &mut *record,
                magic_status,
                frozen: &frozen,
                stack: Vec::new(),
                skipped_isos: Vec::new(),
                fuel: PARSE_FUEL,
            };
            let result = parser.run();
            (result, std::mem::take(&mut parser.skipped_isos))
        };

        match result {
            RunResult::Accepted => {
                arena.commit_pass();
                arena.clear_changes(record.root);

                let mut pairs: Vec<(NodeId, NodeId)> = old_pairs
                    .iter()
                    .filter(|(iso, _)| {
                        skipped.contains(iso) && !new_pairs.iter().any(|(n, _)| n == iso)
                    })
                    .copied()
                    .collect();
                pairs.extend(new_pairs);
                let ok = pairs.is_empty();
                record.set_error_nodes(arena, pairs);
                record.set_last_status(arena, ok);
                return ok;
            }
            RunResult::Error(info) => {
                if budget > 0 {
                    budget -= 1;

                    // Out-of-context analysis: detach an ancestor of the
                    // offending terminal, reparse it in isolation, splice on
                    // success, then restart within the same pass.
                    if recovery::out_of_context(arena, record, magic_status, &info) {
                        continue;
                    }

                    // Isolation: revert the pass, mark the subtree opaque,
                    // record the error, restart.
                    arena.rollback_pass();
                    if let Some(iso) = recovery::isolation_candidate(arena, record, info.node) {
                        arena.set_isolated(iso, true);
                        frozen.insert(iso);
                        new_pairs.push((iso, info.node));
                        arena.begin_pass();
                        continue;
                    }
                } else {
                    arena.rollback_pass();
                }

                // Hard failure: previous structure survives, error exposed.
                // Prior hard-failure markers (iso == error) are superseded;
                // real isolations keep their entries.
                let mut pairs: Vec<(NodeId, NodeId)> = old_pairs
                    .iter()
                    .filter(|(iso, e)| iso != e)
                    .copied()
                    .collect();
                pairs.extend(new_pairs.iter().copied());
                pairs.push((info.node, info.node));
                record.set_error_nodes(arena, pairs);
                record.set_last_status(arena, false);
                return false;
            }
        }
    }
}

struct IncParser<'a> {
    arena: &'a mut NodeArena,
    record: &'a mut ParserRecord,
    magic_status: &'a HashMap<NodeId, bool>,
    frozen: &'a HashSet<NodeId>,
    stack: Vec<StackEntry>,
    skipped_isos: Vec<NodeId>,
    fuel: u32,
}

enum NtStep {
    Shifted,
    Broken,
    Failed(ErrorInfo),
}

impl IncParser<'_> {
    fn run(&mut self) -> RunResult {
        self.stack = vec![StackEntry {
            state: 0,
            node: None,
            hidden: false,
        }];
        self.skipped_isos.clear();

        let mut la = self.next_subtree(self.record.bos);
        loop {
            if self.fuel == 0 {
                return RunResult::Error(ErrorInfo {
                    node: la.unwrap_or(self.record.eos),
                    state: self.state(),
                });
            }
            self.fuel -= 1;

            let node = la.unwrap_or(self.record.eos);

            if self.arena.kind(node) == NodeKind::Eos {
                return match self.process_token(node, EOF) {
                    Step::Continue => unreachable!("EOF is never shifted"),
                    Step::Accept => {
                        self.attach_root();
                        RunResult::Accepted
                    }
                    Step::Error(info) => RunResult::Error(info),
                };
            }

            match self.arena.kind(node) {
                NodeKind::NonTerminal => match self.handle_nonterminal(node) {
                    NtStep::Shifted => la = self.next_subtree(node),
                    NtStep::Broken => {
                        la = match self.arena.children(node).first() {
                            Some(&first) => Some(first),
                            None => self.next_subtree(node),
                        };
                    }
                    NtStep::Failed(info) => return RunResult::Error(info),
                },
                NodeKind::Terminal | NodeKind::Magic | NodeKind::MultiText => {
                    if self.record.is_hidden(self.arena, node) {
                        let state = self.state();
                        self.arena.set_state(node, state);
                        self.stack.push(StackEntry {
                            state,
                            node: Some(node),
                            hidden: true,
                        });
                        la = self.next_subtree(node);
                        continue;
                    }

                    if unit_changed(self.arena, node) {
                        if let Err(info) = self.right_breakdown() {
                            return RunResult::Error(info);
                        }
                    }

                    let Some(term) = self.token_term(node) else {
                        return RunResult::Error(ErrorInfo {
                            node,
                            state: self.state(),
                        });
                    };
                    match self.process_token(node, term) {
                        Step::Continue => la = self.next_subtree(node),
                        Step::Accept => unreachable!("accept only fires at end of input"),
                        Step::Error(info) => return RunResult::Error(info),
                    }
                }
                NodeKind::Bos => la = self.next_subtree(node),
                NodeKind::Eos => unreachable!("handled above"),
            }
        }
    }

    /// Apply table actions for one visible token until it is shifted (or the
    /// parse accepts/errors). Reductions keep the token as lookahead.
    fn process_token(&mut self, node: NodeId, term: TermId) -> Step {
        // A language box is only shiftable while its inner parse satisfies
        // the composition rule.
        if self.arena.kind(node) == NodeKind::Magic && !self.magic_acceptable(node) {
            return Step::Error(ErrorInfo {
                node,
                state: self.state(),
            });
        }

        loop {
            if self.fuel == 0 {
                return Step::Error(ErrorInfo {
                    node,
                    state: self.state(),
                });
            }
            self.fuel -= 1;

            match self.record.grammar.table.action(self.state(), term) {
                Action::Shift(next) => {
                    let entering = self.state();
                    self.arena.set_state(node, entering);
                    self.stack.push(StackEntry {
                        state: next,
                        node: Some(node),
                        hidden: false,
                    });
                    return Step::Continue;
                }
                Action::Reduce(p) => {
                    if self.reduce(p).is_err() {
                        return Step::Error(ErrorInfo {
                            node,
                            state: self.state(),
                        });
                    }
                }
                Action::Accept => return Step::Accept,
                Action::Error => {
                    return Step::Error(ErrorInfo {
                        node,
                        state: self.state(),
                    });
                }
            }
        }
    }

    fn handle_nonterminal(&mut self, node: NodeId) -> NtStep {
        let state = self.state();

        if self.arena.is_isolated(node) {
            let skippable = self.frozen.contains(&node)
                || (!self.has_changes(node) && !self.right_context_changed(node));
            if skippable {
                return match self.shift_nonterminal(node, state) {
                    Ok(()) => {
                        self.skipped_isos.push(node);
                        NtStep::Shifted
                    }
                    Err(()) => NtStep::Failed(ErrorInfo { node, state }),
                };
            }
            // Yield or right context changed: re-examine the subtree.
            self.arena.set_isolated(node, false);
            return NtStep::Broken;
        }

        let reusable = !self.has_changes(node) && self.arena.state(node) == state;
        if reusable && self.shift_nonterminal(node, state).is_ok() {
            return NtStep::Shifted;
        }
        NtStep::Broken
    }

    fn shift_nonterminal(&mut self, node: NodeId, entering: u32) -> Result<(), ()> {
        let nt = self.nt_of(node).ok_or(())?;
        let target = self.record.grammar.table.goto(entering, nt).ok_or(())?;
        self.arena.set_state(node, entering);
        self.stack.push(StackEntry {
            state: target,
            node: Some(node),
            hidden: false,
        });
        Ok(())
    }

    /// Re-expand reused structure on the stack top down to a terminal, so
    /// upcoming changed lookahead cannot hide behind stale reductions.
    /// Hidden tokens riding on top are lifted over the expansion; the walk
    /// cancels (successfully) at an isolated subtree.
    fn right_breakdown(&mut self) -> Result<(), ErrorInfo> {
        let mut lifted: Vec<NodeId> = Vec::new();
        loop {
            let Some(&top) = self.stack.last() else {
                break;
            };
            let Some(node) = top.node else {
                break;
            };
            if top.hidden {
                lifted.push(node);
                self.stack.pop();
                continue;
            }
            if self.arena.kind(node) != NodeKind::NonTerminal || self.arena.is_isolated(node) {
                break;
            }

            self.stack.pop();
            for child in self.arena.children(node).to_vec() {
                self.reshift(child).map_err(|()| ErrorInfo {
                    node: child,
                    state: self.state(),
                })?;
            }
        }

        for node in lifted.into_iter().rev() {
            let state = self.state();
            self.arena.set_state(node, state);
            self.stack.push(StackEntry {
                state,
                node: Some(node),
                hidden: true,
            });
        }
        Ok(())
    }

    /// Push a previously parsed node back onto the stack, recomputing its
    /// state from the tables.
    fn reshift(&mut self, node: NodeId) -> Result<(), ()> {
        let state = self.state();
        if self.record.is_hidden(self.arena, node) {
            self.arena.set_state(node, state);
            self.stack.push(StackEntry {
                state,
                node: Some(node),
                hidden: true,
            });
            return Ok(());
        }
        let target = match self.arena.kind(node) {
            NodeKind::NonTerminal => {
                let nt = self.nt_of(node).ok_or(())?;
                self.record.grammar.table.goto(state, nt).ok_or(())?
            }
            _ => {
                let term = self.token_term(node).ok_or(())?;
                match self.record.grammar.table.action(state, term) {
                    Action::Shift(target) => target,
                    _ => return Err(()),
                }
            }
        };
        self.arena.set_state(node, state);
        self.stack.push(StackEntry {
            state: target,
            node: Some(node),
            hidden: false,
        });
        Ok(())
    }

    fn reduce(&mut self, p: u32) -> Result<(), ()> {
        let (lhs, arity) = {
            let prod = self.record.grammar.table.prod(p);
            (prod.lhs, prod.rhs.len())
        };

        let mut taken: Vec<StackEntry> = Vec::new();
        let mut visible = 0usize;
        while visible < arity {
            let entry = self.stack.pop().ok_or(())?;
            if entry.node.is_none() {
                return Err(());
            }
            if !entry.hidden {
                visible += 1;
            }
            taken.push(entry);
        }
        taken.reverse();
        let kids: Vec<NodeId> = taken
            .iter()
            .map(|e| e.node.expect("bottom entry never popped"))
            .collect();

        let entering = self.state();
        let node = build_reduction(self.arena, self.record, &self.stack, lhs, &kids);
        self.arena.set_state(node, entering);

        let target = self.record.grammar.table.goto(entering, lhs).ok_or(())?;
        self.stack.push(StackEntry {
            state: target,
            node: Some(node),
            hidden: false,
        });
        Ok(())
    }

    fn attach_root(&mut self) {
        let mut children = vec![self.record.bos];
        children.extend(self.stack.iter().skip(1).filter_map(|e| e.node));
        children.push(self.record.eos);

        let root = self.record.root;
        if self.arena.children(root) != children.as_slice() {
            self.arena.set_children(root, children.clone());
        }
        for child in children {
            self.arena.set_parent(child, Some(root));
        }
    }

    /// Next input subtree after consuming `node` entirely: the right sibling
    /// found by climbing the (previous) tree. `None` means end of input.
    fn next_subtree(&self, node: NodeId) -> Option<NodeId> {
        let mut cursor = node;
        loop {
            let parent = self.arena.parent(cursor)?;
            let siblings = self.arena.children(parent);
            let pos = siblings.iter().position(|&c| c == cursor)?;
            if let Some(&right) = siblings.get(pos + 1) {
                return Some(right);
            }
            if parent == self.record.root {
                return None;
            }
            cursor = parent;
        }
    }

    fn state(&self) -> u32 {
        self.stack.last().map_or(0, |e| e.state)
    }

    fn has_changes(&self, node: NodeId) -> bool {
        self.arena.is_changed(node) || self.arena.has_nested_changes(node)
    }

    /// Whether the first token after `node`'s yield is changed.
    fn right_context_changed(&self, node: NodeId) -> bool {
        let mut last = node;
        while let Some(&child) = self.arena.children(last).last() {
            last = child;
        }
        match self.arena.next_term(chain_last(self.arena, last)) {
            Some(next) => unit_changed(self.arena, unit_of(self.arena, next)),
            None => false,
        }
    }

    fn nt_of(&self, node: NodeId) -> Option<NtId> {
        let name = self.arena.interner().resolve(self.arena.symbol(node));
        self.record.grammar.table.nt_id(name)
    }

    fn token_term(&mut self, node: NodeId) -> Option<TermId> {
        let sym = self.arena.symbol(node);
        self.record.term_id(self.arena, sym)
    }

    fn magic_acceptable(&self, magic: NodeId) -> bool {
        magic_acceptable(self.arena, self.record, self.magic_status, magic)
    }
}

/// Whether a language box satisfies the hosting grammar's composition rule.
pub(crate) fn magic_acceptable(
    arena: &NodeArena,
    record: &ParserRecord,
    magic_status: &HashMap<NodeId, bool>,
    magic: NodeId,
) -> bool {
    let class = arena.interner().resolve(arena.symbol(magic));
    let inner_name = class.trim_start_matches('<').trim_end_matches('>');
    let requires_valid = record
        .grammar
        .grammar
        .composition_for(inner_name)
        .map(|c| c.requires_valid)
        .unwrap_or(true);
    if !requires_valid {
        return true;
    }
    magic_status.get(&magic).copied().unwrap_or(false)
}

/// Reduce a child sequence to a non-terminal, reusing the previous node when
/// its child list is exactly the reduced sequence (same handles). Identity
/// reuse implies unchanged yield and position, so a retained node can never
/// end up under two parents; the debug assertion makes that a checked
/// invariant. Shared with the out-of-context sub-parser.
pub(crate) fn build_reduction(
    arena: &mut NodeArena,
    record: &ParserRecord,
    stack: &[StackEntry],
    lhs: NtId,
    kids: &[NodeId],
) -> NodeId {
    let lhs_name = record.grammar.table.nt_name(lhs).to_owned();
    let lhs_sym = arena.intern(&lhs_name);

    if let Some(&first) = kids.first() {
        if let Some(candidate) = arena.parent(first) {
            if arena.kind(candidate) == NodeKind::NonTerminal
                && arena.symbol(candidate) == lhs_sym
                && !arena.is_isolated(candidate)
                && arena.children(candidate) == kids
            {
                debug_assert!(
                    !stack.iter().any(|e| e.node == Some(candidate)),
                    "retainability violation: reused node is still on the stack"
                );
                return candidate;
            }
        }
    }

    let node = arena.new_node(NodeKind::NonTerminal, lhs_sym);
    arena.set_children(node, kids.to_vec());
    for &kid in kids {
        arena.set_parent(kid, Some(node));
    }
    node
}
