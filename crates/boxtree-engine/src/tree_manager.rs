//! Tree manager: the editor-facing surface.
//!
//! Owns the arena, the cursor, and the stack of parser records (outermost
//! grammar plus one per language box). Editor operations translate into
//! terminal-level edits followed by one pipeline run: relex → indentation →
//! parse (innermost records first) → auto language-box maintenance.
//!
//! Cursor motion is pure chain walking and never parses.

use std::collections::HashMap;

use boxtree_core::{NodeArena, NodeId, NodeKind, TreeView, tree_compare};
use boxtree_grammar::registry;

use crate::diagnostics::Diagnostics;
use crate::lexer::relex;
use crate::records::ParserRecord;
use crate::tokens::{Classes, chain_first, unit_of};
use crate::{EngineError, Result, autobox, indent, parser};

/// Cursor direction codes. Opaque enumerants per the host contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Engine options with editor-facing defaults.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Attempt automatic language-box insertion when the outer parse fails.
    pub autobox_insert: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            autobox_insert: false,
        }
    }
}

/// Cursor: a terminal plus a character offset into its lexeme. The cursor
/// sits *after* `offset` characters of `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub node: NodeId,
    pub offset: usize,
}

pub struct TreeManager {
    pub(crate) arena: NodeArena,
    pub(crate) classes: Classes,
    pub(crate) records: Vec<ParserRecord>,
    pub(crate) cursor: Cursor,
    pub(crate) selection_anchor: Option<Cursor>,
    pub(crate) options: EngineOptions,
    pub(crate) dirty: Vec<NodeId>,
}

impl TreeManager {
    /// Create an empty document for a registered grammar.
    pub fn new(grammar_name: &str) -> Result<Self> {
        let grammar = registry::lookup(grammar_name).ok_or_else(|| EngineError::GrammarMissing {
            name: grammar_name.to_owned(),
        })?;
        let mut arena = NodeArena::new();
        let classes = Classes::install(&mut arena);
        let record = ParserRecord::new(&mut arena, grammar, None, false);
        let cursor = Cursor {
            node: record.bos,
            offset: 0,
        };
        let mut manager = Self {
            arena,
            classes,
            records: vec![record],
            cursor,
            selection_anchor: None,
            options: EngineOptions::default(),
            dirty: Vec::new(),
        };
        // An empty document still gets an initial parse so last_status is
        // meaningful (false unless the grammar accepts the empty input).
        let bos = manager.records[0].bos;
        manager.arena.mark_changed(bos);
        manager.run_pipeline();
        manager.arena.undo_snapshot();
        Ok(manager)
    }

    pub fn set_options(&mut self, options: EngineOptions) {
        self.options = options;
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn outer_record(&self) -> &ParserRecord {
        &self.records[0]
    }

    /// Active parser records: (grammar name, last status).
    pub fn parsers(&self) -> Vec<(String, bool)> {
        self.records
            .iter()
            .filter(|r| r.is_active(&self.arena))
            .map(|r| (r.grammar.name().to_owned(), r.last_status(&self.arena)))
            .collect()
    }

    /// True iff every active parser's last parse succeeded with no
    /// outstanding error nodes.
    pub fn last_status(&self) -> bool {
        self.records
            .iter()
            .filter(|r| r.is_active(&self.arena))
            .all(|r| r.last_status(&self.arena) && r.error_nodes(&self.arena).is_empty())
    }

    /// Error terminals of every active record, in record order.
    pub fn error_nodes(&self) -> Vec<NodeId> {
        self.records
            .iter()
            .filter(|r| r.is_active(&self.arena))
            .flat_map(|r| r.error_nodes(&self.arena).iter().map(|&(_, e)| e))
            .collect()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Attach a semantic overlay id to a node. Overlays ride along with
    /// node identity: reuse paths keep them, rebuilt nodes start without.
    pub fn set_overlay(&mut self, node: NodeId, overlay: Option<u32>) {
        self.arena.set_overlay(node, overlay);
    }

    /// Lexeme of the token the cursor sits on.
    pub fn cursor_token_text(&self) -> String {
        self.arena.lexeme(self.cursor.node).to_owned()
    }

    // ----- text and positions -----

    /// The document's textual form: the terminal chain in document order,
    /// descending into language boxes, skipping zero-width tokens.
    pub fn export_as_text(&self) -> String {
        let mut out = String::new();
        for node in self.doc_chain() {
            out.push_str(self.arena.lexeme(node));
        }
        out
    }

    /// Chain nodes in document order (including sentinels, descending into
    /// language boxes at their magic terminals).
    fn doc_chain(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_chain(self.records[0].bos, &mut out);
        out
    }

    fn collect_chain(&self, bos: NodeId, out: &mut Vec<NodeId>) {
        let mut cursor = Some(bos);
        while let Some(node) = cursor {
            out.push(node);
            if self.arena.kind(node) == NodeKind::Magic {
                if let Some(inner) = self.arena.magic_inner(node) {
                    let inner_bos = self.arena.children(inner)[0];
                    self.collect_chain(inner_bos, out);
                }
            }
            if self.arena.kind(node) == NodeKind::Eos {
                return;
            }
            cursor = self.arena.next_term(node);
        }
    }

    /// Absolute character position of the cursor.
    pub fn cursor_position(&self) -> usize {
        let mut pos = 0usize;
        for node in self.doc_chain() {
            if node == self.cursor.node {
                return pos + self.cursor.offset;
            }
            pos += self.arena.lexeme(node).chars().count();
        }
        pos
    }

    fn doc_len(&self) -> usize {
        self.doc_chain()
            .iter()
            .map(|&n| self.arena.lexeme(n).chars().count())
            .sum()
    }

    /// Cursor for an absolute character position, preferring the end of the
    /// last text-bearing node over the start of the next.
    fn cursor_at(&self, target: usize) -> Cursor {
        let chain = self.doc_chain();
        let mut pos = 0usize;
        let mut best = Cursor {
            node: chain[0],
            offset: 0,
        };
        for &node in &chain {
            let len = self.arena.lexeme(node).chars().count();
            if len == 0 {
                continue;
            }
            if target <= pos + len {
                return Cursor {
                    node,
                    offset: target - pos,
                };
            }
            pos += len;
            best = Cursor { node, offset: len };
        }
        best
    }

    // ----- editing -----

    pub fn insert(&mut self, ch: char) {
        self.insert_text(&ch.to_string());
    }

    pub fn paste(&mut self, text: &str) {
        self.insert_text(text);
    }

    /// Insert text at the cursor: one lexeme splice, one pipeline run.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.selection_anchor.is_some() {
            self.delete_selection();
        }
        self.drop_redo_branch();
        let target_pos = self.cursor_position() + text.chars().count();

        let node = self.cursor.node;
        let editable = matches!(
            self.arena.kind(node),
            NodeKind::Terminal | NodeKind::MultiText
        ) && !self.classes.is_virtual(&self.arena, node)
            && !self.arena.lexeme(node).is_empty();

        if editable {
            let mut lexeme = self.arena.lexeme(node).to_owned();
            let at = char_to_byte(&lexeme, self.cursor.offset);
            lexeme.insert_str(at, text);
            self.arena.set_lexeme(node, lexeme);
            self.arena.mark_changed(node);
            self.dirty.push(node);
        } else {
            // Cursor on BOS, a magic terminal, or a zero-width token: a new
            // terminal is spliced in right after it and classified by relex.
            let fresh = self.arena.new_terminal(self.classes.error, text);
            self.splice_after(node, fresh);
            self.arena.mark_changed(fresh);
            self.dirty.push(fresh);
        }

        self.run_pipeline();
        self.cursor = self.cursor_at(target_pos.min(self.doc_len()));
    }

    pub fn backspace(&mut self) {
        if self.selection_anchor.is_some() {
            self.delete_selection();
            return;
        }
        let pos = self.cursor_position();
        if pos == 0 {
            return;
        }
        self.delete_range(pos - 1, pos);
    }

    pub fn delete(&mut self) {
        if self.selection_anchor.is_some() {
            self.delete_selection();
            return;
        }
        let pos = self.cursor_position();
        if pos >= self.doc_len() {
            return;
        }
        self.delete_range(pos, pos + 1);
    }

    pub fn delete_selection(&mut self) {
        let Some(anchor) = self.selection_anchor.take() else {
            return;
        };
        let a = self.position_of(anchor);
        let b = self.cursor_position();
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        if from < to {
            self.delete_range(from, to);
        }
    }

    fn position_of(&self, cursor: Cursor) -> usize {
        let mut pos = 0usize;
        for node in self.doc_chain() {
            if node == cursor.node {
                return pos + cursor.offset;
            }
            pos += self.arena.lexeme(node).chars().count();
        }
        pos
    }

    /// Remove the character range `[from, to)` as one batched edit.
    fn delete_range(&mut self, from: usize, to: usize) {
        self.drop_redo_branch();

        let chain = self.doc_chain();
        let mut pos = 0usize;
        for node in chain {
            let len = self.arena.lexeme(node).chars().count();
            let start = pos;
            let end = pos + len;
            pos = end;
            if len == 0 || end <= from {
                continue;
            }
            if start >= to {
                break;
            }

            let keep_front = from.saturating_sub(start);
            let keep_back = end.saturating_sub(to);
            let lexeme = self.arena.lexeme(node).to_owned();
            let front = char_prefix(&lexeme, keep_front).to_owned();
            let back = char_suffix(&lexeme, keep_back).to_owned();
            self.arena.set_lexeme(node, format!("{front}{back}"));
            self.arena.mark_changed(node);
            self.dirty.push(node);
        }

        // Magic terminals whose inner text emptied entirely by the deletion
        // are handled by auto-removal in the pipeline.
        self.run_pipeline();
        self.cursor = self.cursor_at(from.min(self.doc_len()));
    }

    // ----- cursor -----

    pub fn move_cursor(&mut self, direction: Direction) {
        self.selection_anchor = None;
        self.move_cursor_inner(direction);
    }

    pub fn select_to(&mut self, direction: Direction) {
        if self.selection_anchor.is_none() {
            self.selection_anchor = Some(self.cursor);
        }
        self.move_cursor_inner(direction);
    }

    fn move_cursor_inner(&mut self, direction: Direction) {
        let pos = self.cursor_position();
        let target = match direction {
            Direction::Left => pos.saturating_sub(1),
            Direction::Right => (pos + 1).min(self.doc_len()),
            Direction::Up | Direction::Down => {
                let text: Vec<char> = self.export_as_text().chars().collect();
                vertical_target(&text, pos, direction)
            }
        };
        self.cursor = self.cursor_at(target);
    }

    pub fn home(&mut self) {
        let text: Vec<char> = self.export_as_text().chars().collect();
        let pos = self.cursor_position();
        self.cursor = self.cursor_at(line_start(&text, pos));
    }

    pub fn end(&mut self) {
        let text: Vec<char> = self.export_as_text().chars().collect();
        let pos = self.cursor_position();
        self.cursor = self.cursor_at(line_end(&text, pos));
    }

    // ----- language boxes -----

    /// Insert a language box at the cursor and move into it.
    pub fn add_language_box(&mut self, grammar_name: &str) -> Result<()> {
        let grammar = registry::lookup(grammar_name).ok_or_else(|| EngineError::GrammarMissing {
            name: grammar_name.to_owned(),
        })?;
        self.drop_redo_branch();

        // Split the cursor terminal when the box lands mid-token.
        let at = self.cursor;
        let anchor = if at.offset > 0 && at.offset < self.arena.lexeme(at.node).chars().count() {
            let lexeme = self.arena.lexeme(at.node).to_owned();
            let split = char_to_byte(&lexeme, at.offset);
            let tail = lexeme[split..].to_owned();
            self.arena.set_lexeme(at.node, lexeme[..split].to_owned());
            self.arena.mark_changed(at.node);
            self.dirty.push(at.node);
            let rest = self.arena.new_terminal(self.classes.error, &tail);
            self.splice_after(at.node, rest);
            self.arena.mark_changed(rest);
            self.dirty.push(rest);
            at.node
        } else if at.offset == 0 {
            // Before the node: anchor on its chain predecessor.
            self.arena
                .prev_term(chain_first(&self.arena, unit_of(&self.arena, at.node)))
                .unwrap_or(at.node)
        } else {
            at.node
        };

        let class = self.arena.intern(&boxtree_grammar::Grammar::box_class(grammar.name()));
        let magic = self.arena.new_node(NodeKind::Magic, class);
        self.splice_after(anchor, magic);
        self.arena.mark_changed(magic);

        let record = ParserRecord::new(&mut self.arena, grammar, Some(magic), false);
        // The empty inner document parses once so its status is meaningful.
        self.arena.mark_changed(record.bos);
        self.cursor = Cursor {
            node: record.bos,
            offset: 0,
        };
        self.records.push(record);
        self.run_pipeline();
        Ok(())
    }

    /// Move the cursor out of the current language box, to just after its
    /// magic terminal.
    pub fn leave_language_box(&mut self) {
        let Some(idx) = self.record_of(self.cursor.node) else {
            return;
        };
        if let Some(magic) = self.records[idx].magic {
            self.cursor = Cursor {
                node: magic,
                offset: 0,
            };
        }
    }

    // ----- undo / redo -----

    /// Seal the current burst of edits into one undo step.
    pub fn undo_snapshot(&mut self) {
        self.arena.undo_snapshot();
    }

    pub fn undo(&mut self) {
        if self.arena.undo() {
            self.clamp_cursor();
        }
    }

    pub fn redo(&mut self) {
        if self.arena.redo() {
            self.clamp_cursor();
        }
    }

    fn clamp_cursor(&mut self) {
        let chain = self.doc_chain();
        if !chain.contains(&self.cursor.node)
            || self.cursor.offset > self.arena.lexeme(self.cursor.node).chars().count()
        {
            self.cursor = self.cursor_at(self.doc_len());
        }
        self.selection_anchor = None;
    }

    /// Satellite versioned state must drop its redo branch together with the
    /// arena's; called before every mutating operation.
    fn drop_redo_branch(&mut self) {
        if self.arena.version() < self.arena.max_version() {
            let v = self.arena.version();
            for record in &mut self.records {
                record.truncate_after(v);
            }
        }
    }

    // ----- document import / comparison -----

    /// Replace the whole document with `text` in one version step.
    pub fn import_file(&mut self, text: &str) {
        self.drop_redo_branch();
        self.arena.undo_snapshot();

        // Deactivate boxes and clear the outer tree down to its sentinels.
        for i in 1..self.records.len() {
            if self.records[i].is_active(&self.arena) {
                self.records[i].set_active(&mut self.arena, false);
            }
        }
        let (root, bos, eos) = {
            let r = &self.records[0];
            (r.root, r.bos, r.eos)
        };
        self.arena.set_children(root, vec![bos, eos]);
        self.arena.set_parent(bos, Some(root));
        self.arena.set_parent(eos, Some(root));
        self.arena.link_terms(bos, eos);
        self.arena.mark_changed(bos);

        self.cursor = Cursor {
            node: bos,
            offset: 0,
        };
        if !text.is_empty() {
            let fresh = self.arena.new_terminal(self.classes.error, text);
            self.splice_after(bos, fresh);
            self.arena.mark_changed(fresh);
            self.dirty.push(fresh);
        }
        self.run_pipeline();
        self.cursor = Cursor {
            node: bos,
            offset: 0,
        };
        self.arena.undo_snapshot();
    }

    /// Structural equality of this document against another, by node symbols
    /// and lexemes, descending into language boxes.
    pub fn tree_equals(&self, other: &TreeManager) -> bool {
        tree_compare(
            &TreeView::current(&self.arena),
            self.records[0].root,
            &TreeView::current(&other.arena),
            other.records[0].root,
        )
        .is_ok()
    }

    /// Diagnostics for every outstanding error node.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let text = self.export_as_text();
        for record in self.records.iter().filter(|r| r.is_active(&self.arena)) {
            for &(_, error) in record.error_nodes(&self.arena) {
                let pos = self.node_byte_position(error).min(text.len());
                let width = self.arena.lexeme(error).len().max(1);
                let expected = record
                    .grammar
                    .table
                    .expected(self.arena.state(error))
                    .iter()
                    .map(|s| (*s).to_owned())
                    .collect::<Vec<_>>();
                diagnostics
                    .error("parse error", pos..(pos + width).min(text.len() + 1))
                    .expected(expected)
                    .emit();
            }
        }
        diagnostics
    }

    fn node_byte_position(&self, node: NodeId) -> usize {
        let mut pos = 0usize;
        for n in self.doc_chain() {
            if n == node {
                return pos;
            }
            pos += self.arena.lexeme(n).len();
        }
        pos
    }

    // ----- pipeline -----

    pub(crate) fn run_pipeline(&mut self) {
        // 1. Relex the neighbourhood of every edited node, per owning
        //    grammar.
        let dirty = std::mem::take(&mut self.dirty);
        for node in dirty {
            if !self.in_chain(node) {
                continue;
            }
            let Some(idx) = self.record_of(node) else {
                continue;
            };
            let grammar = self.records[idx].grammar.clone();
            relex(&mut self.arena, &self.classes, &grammar, node);
        }

        // 2. Indentation reconciliation per whitespace-sensitive record.
        for i in 0..self.records.len() {
            if !self.records[i].is_active(&self.arena) {
                continue;
            }
            if self.records[i].grammar.grammar.indent_sensitive {
                let record = &self.records[i];
                indent::reconcile(&mut self.arena, &self.classes, record);
            }
        }

        // 3. Parse, innermost records first, then auto language-box
        //    maintenance; box changes trigger one more parse round.
        self.parse_round();
        if self.autobox_round() {
            self.parse_round();
        }
    }

    fn parse_round(&mut self) {
        let mut order: Vec<usize> = (0..self.records.len())
            .filter(|&i| self.records[i].is_active(&self.arena))
            .collect();
        order.sort_by_key(|&i| std::cmp::Reverse(self.record_depth(i)));

        for i in order {
            let root = self.records[i].root;
            if !self.arena.is_changed(root) && !self.arena.has_nested_changes(root) {
                continue;
            }
            let magic_status = self.magic_status_map();
            let record = &mut self.records[i];
            parser::parse_record(&mut self.arena, record, &magic_status);
        }
    }

    fn autobox_round(&mut self) -> bool {
        let mut changed = false;

        // Auto-removal: an auto-inserted box whose content emptied.
        for i in 1..self.records.len() {
            if !self.records[i].is_active(&self.arena) || !self.records[i].auto_inserted {
                continue;
            }
            if self.box_is_empty(i) {
                self.remove_box(i);
                changed = true;
            }
        }

        // Auto-insertion on outer failure.
        if self.options.autobox_insert && !self.records[0].last_status(&self.arena) {
            if let Some((magic, record)) = autobox::try_insert(
                &mut self.arena,
                &self.classes,
                &mut self.records,
                &self.options,
            ) {
                let _ = magic;
                self.records.push(record);
                changed = true;
            }
        }

        changed
    }

    /// Whether a box's chain carries no text and no nested boxes.
    fn box_is_empty(&self, idx: usize) -> bool {
        let record = &self.records[idx];
        let mut cursor = self.arena.next_term(record.bos);
        while let Some(node) = cursor {
            if node == record.eos {
                return true;
            }
            if !self.arena.lexeme(node).is_empty() || self.arena.kind(node) == NodeKind::Magic {
                return false;
            }
            cursor = self.arena.next_term(node);
        }
        true
    }

    /// Detach an (auto-inserted) box: the magic terminal leaves the chain
    /// and the tree, the record deactivates.
    fn remove_box(&mut self, idx: usize) {
        let Some(magic) = self.records[idx].magic else {
            return;
        };
        let cursor_inside = self
            .record_of(self.cursor.node)
            .map(|r| r == idx)
            .unwrap_or(false);

        let prev = self.arena.prev_term(magic);
        let next = self.arena.next_term(magic);
        if let (Some(prev), Some(next)) = (prev, next) {
            self.arena.link_terms(prev, next);
            // The neighbourhood changed: tokens may join across the gap.
            let prev_unit = unit_of(&self.arena, prev);
            if !matches!(self.arena.kind(prev_unit), NodeKind::Bos) {
                self.arena.mark_changed(prev_unit);
                self.dirty.push(prev_unit);
            } else {
                let next_unit = unit_of(&self.arena, next);
                if !matches!(self.arena.kind(next_unit), NodeKind::Eos) {
                    self.arena.mark_changed(next_unit);
                    self.dirty.push(next_unit);
                }
            }
        }
        if let Some(parent) = self.arena.parent(magic) {
            self.arena.mark_nested_upward(magic);
            self.arena.remove_child(parent, magic);
        }
        self.records[idx].set_active(&mut self.arena, false);

        if cursor_inside {
            self.cursor = self.cursor_at(self.doc_len());
        }

        // Relex the join and reparse.
        let dirty = std::mem::take(&mut self.dirty);
        for node in dirty {
            if self.in_chain(node) {
                if let Some(i) = self.record_of(node) {
                    let grammar = self.records[i].grammar.clone();
                    relex(&mut self.arena, &self.classes, &grammar, node);
                }
            }
        }
    }

    fn magic_status_map(&self) -> HashMap<NodeId, bool> {
        self.records
            .iter()
            .filter(|r| r.is_active(&self.arena))
            .filter_map(|r| {
                r.magic
                    .map(|m| (m, r.last_status(&self.arena) && r.error_nodes(&self.arena).is_empty()))
            })
            .collect()
    }

    fn record_depth(&self, idx: usize) -> usize {
        let mut depth = 0;
        let mut magic = self.records[idx].magic;
        while let Some(m) = magic {
            depth += 1;
            magic = self
                .record_of(m)
                .and_then(|i| self.records[i].magic);
        }
        depth
    }

    /// Index of the record whose tree contains `node`.
    fn record_of(&self, node: NodeId) -> Option<usize> {
        let mut cursor = node;
        loop {
            match self.arena.parent(cursor) {
                Some(p) => cursor = p,
                None => {
                    // At a root: match records; or hop out of a box.
                    if let Some(idx) = self
                        .records
                        .iter()
                        .position(|r| r.root == cursor && r.is_active(&self.arena))
                    {
                        return Some(idx);
                    }
                    match self.arena.magic_outer(cursor) {
                        Some(magic) => cursor = magic,
                        None => return None,
                    }
                }
            }
        }
    }

    /// Whether a node currently occupies a chain slot.
    fn in_chain(&self, node: NodeId) -> bool {
        let unit = unit_of(&self.arena, node);
        let first = chain_first(&self.arena, unit);
        match self.arena.prev_term(first) {
            Some(prev) => self.arena.next_term(prev) == Some(first),
            None => self.arena.kind(first) == NodeKind::Bos,
        }
    }

    /// Splice `fresh` into the chain and the tree right after `anchor`.
    fn splice_after(&mut self, anchor: NodeId, fresh: NodeId) {
        let old_next = self.arena.next_term(anchor);
        self.arena.link_terms(anchor, fresh);
        if let Some(next) = old_next {
            self.arena.link_terms(fresh, next);
        }

        // A MultiText segment anchor places the new node after its
        // container, not inside it.
        let anchor = match self.arena.parent(anchor) {
            Some(p) if self.arena.kind(p) == NodeKind::MultiText => p,
            _ => anchor,
        };
        let parent = self
            .arena
            .parent(anchor)
            .expect("chain anchors always have a parent");
        let index = self
            .arena
            .children(parent)
            .iter()
            .position(|&c| c == anchor)
            .expect("anchor listed under its parent")
            + 1;
        self.arena.insert_child(parent, index, fresh);
    }
}

// ----- text geometry helpers -----

fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn char_prefix(s: &str, chars: usize) -> &str {
    &s[..char_to_byte(s, chars)]
}

fn char_suffix(s: &str, chars: usize) -> &str {
    let total = s.chars().count();
    &s[char_to_byte(s, total - chars)..]
}

fn line_start(text: &[char], pos: usize) -> usize {
    let mut i = pos.min(text.len());
    while i > 0 && text[i - 1] != '\n' {
        i -= 1;
    }
    i
}

fn line_end(text: &[char], pos: usize) -> usize {
    let mut i = pos.min(text.len());
    while i < text.len() && text[i] != '\n' {
        i += 1;
    }
    i
}

fn vertical_target(text: &[char], pos: usize, direction: Direction) -> usize {
    let start = line_start(text, pos);
    let column = pos - start;
    match direction {
        Direction::Up => {
            if start == 0 {
                return pos;
            }
            let prev_start = line_start(text, start - 1);
            let prev_end = start - 1;
            (prev_start + column).min(prev_end)
        }
        Direction::Down => {
            let end = line_end(text, pos);
            if end >= text.len() {
                return pos;
            }
            let next_start = end + 1;
            let next_end = line_end(text, next_start);
            (next_start + column).min(next_end)
        }
        _ => pos,
    }
}
