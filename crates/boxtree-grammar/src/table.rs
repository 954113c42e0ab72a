//! Canonical LR(1) action/goto table construction.
//!
//! Tables are computed once per grammar and immutable afterwards. Conflicts
//! are resolved at generation time — shift beats reduce, the earlier
//! production beats the later — and every resolution is recorded so tooling
//! can surface it.

use std::collections::{BTreeSet, HashSet};

use indexmap::{IndexMap, IndexSet};

use crate::types::{DEDENT, Grammar, INDENT, NEWLINE, SymbolRef};
use crate::{GrammarError, Result};

/// Terminal class index into the table alphabet. Index 0 is end-of-input.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TermId(pub u16);

/// Non-terminal index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NtId(pub u16);

pub const EOF: TermId = TermId(0);
pub const EOF_NAME: &str = "<eof>";

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Sym {
    T(TermId),
    N(NtId),
}

#[derive(Debug, Clone)]
pub struct Prod {
    pub lhs: NtId,
    pub rhs: Vec<Sym>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Action {
    #[default]
    Error,
    Shift(u32),
    Reduce(u32),
    Accept,
}

/// A conflict resolved during table generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: u32,
    pub term: TermId,
    pub kept: Action,
    pub dropped: Action,
}

/// LR(1) item: production, dot position, lookahead terminal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
struct Item {
    prod: u32,
    dot: u32,
    la: TermId,
}

pub struct ParseTable {
    terms: IndexSet<String>,
    nts: IndexSet<String>,
    /// `prods[0]` is the augmented start production.
    prods: Vec<Prod>,
    actions: Vec<Vec<Action>>,
    gotos: Vec<Vec<Option<u32>>>,
    conflicts: Vec<Conflict>,
}

impl ParseTable {
    /// Build the table for a grammar whose box productions have already been
    /// synthesized. `extra_terms` supplies the box terminal classes.
    pub fn build(grammar: &Grammar, extra_terms: &[String]) -> Result<Self> {
        let mut terms = IndexSet::new();
        terms.insert(EOF_NAME.to_owned());
        for rule in grammar.tokens.iter().filter(|t| !t.ignored) {
            terms.insert(rule.name.clone());
        }
        if grammar.indent_sensitive {
            terms.insert(NEWLINE.to_owned());
            terms.insert(INDENT.to_owned());
            terms.insert(DEDENT.to_owned());
        }
        for name in extra_terms {
            terms.insert(name.clone());
        }

        let mut nts = IndexSet::new();
        for prod in &grammar.productions {
            nts.insert(prod.lhs.clone());
        }

        let mut prods = Vec::with_capacity(grammar.productions.len() + 1);
        let start = NtId(
            nts.get_index_of(grammar.start_symbol())
                .expect("start symbol always has a production") as u16,
        );
        prods.push(Prod {
            lhs: NtId(u16::MAX), // augmented pseudo-LHS, never reduced onto
            rhs: vec![Sym::N(start)],
        });
        for prod in &grammar.productions {
            let lhs = NtId(nts.get_index_of(&prod.lhs).unwrap() as u16);
            let mut rhs = Vec::with_capacity(prod.rhs.len());
            for sym in &prod.rhs {
                match sym {
                    SymbolRef::Terminal(name) => {
                        let id = terms.get_index_of(name).ok_or_else(|| {
                            GrammarError::UnknownTerminal {
                                name: name.clone(),
                                production: prod.lhs.clone(),
                            }
                        })?;
                        rhs.push(Sym::T(TermId(id as u16)));
                    }
                    SymbolRef::NonTerminal(name) => {
                        let id = nts.get_index_of(name).ok_or_else(|| {
                            GrammarError::UnknownNonTerminal {
                                name: name.clone(),
                                production: prod.lhs.clone(),
                            }
                        })?;
                        rhs.push(Sym::N(NtId(id as u16)));
                    }
                }
            }
            prods.push(Prod { lhs, rhs });
        }

        let builder = Builder {
            terms_len: terms.len(),
            nts_len: nts.len(),
            first: FirstSets::compute(&prods, nts.len()),
            prods: &prods,
        };
        let (actions, gotos, conflicts) = builder.build_states();

        Ok(Self {
            terms,
            nts,
            prods,
            actions,
            gotos,
            conflicts,
        })
    }

    pub fn term_id(&self, name: &str) -> Option<TermId> {
        self.terms.get_index_of(name).map(|i| TermId(i as u16))
    }

    pub fn term_name(&self, term: TermId) -> &str {
        self.terms
            .get_index(term.0 as usize)
            .expect("TermId from this table")
    }

    pub fn nt_id(&self, name: &str) -> Option<NtId> {
        self.nts.get_index_of(name).map(|i| NtId(i as u16))
    }

    pub fn nt_name(&self, nt: NtId) -> &str {
        self.nts.get_index(nt.0 as usize).expect("NtId from this table")
    }

    /// The real start symbol (not the augmented pseudo-symbol).
    pub fn start_nt(&self) -> NtId {
        match self.prods[0].rhs[0] {
            Sym::N(n) => n,
            Sym::T(_) => unreachable!("augmented production derives the start symbol"),
        }
    }

    pub fn action(&self, state: u32, term: TermId) -> Action {
        self.actions[state as usize][term.0 as usize]
    }

    pub fn goto(&self, state: u32, nt: NtId) -> Option<u32> {
        self.gotos[state as usize][nt.0 as usize]
    }

    pub fn prod(&self, p: u32) -> &Prod {
        &self.prods[p as usize]
    }

    pub fn num_states(&self) -> usize {
        self.actions.len()
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Terminal names with a non-error action in `state`, for diagnostics.
    pub fn expected(&self, state: u32) -> Vec<&str> {
        self.actions[state as usize]
            .iter()
            .enumerate()
            .filter(|(_, a)| !matches!(a, Action::Error))
            .map(|(i, _)| self.term_name(TermId(i as u16)))
            .collect()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }
}

struct FirstSets {
    sets: Vec<HashSet<TermId>>,
    nullable: Vec<bool>,
}

impl FirstSets {
    fn compute(prods: &[Prod], nts_len: usize) -> Self {
        let mut sets = vec![HashSet::new(); nts_len];
        let mut nullable = vec![false; nts_len];

        let mut changed = true;
        while changed {
            changed = false;
            for prod in prods.iter().skip(1) {
                let lhs = prod.lhs.0 as usize;
                let mut all_nullable = true;
                for sym in &prod.rhs {
                    match *sym {
                        Sym::T(t) => {
                            changed |= sets[lhs].insert(t);
                            all_nullable = false;
                        }
                        Sym::N(n) => {
                            let add: Vec<_> = sets[n.0 as usize].iter().copied().collect();
                            for t in add {
                                changed |= sets[lhs].insert(t);
                            }
                            if !nullable[n.0 as usize] {
                                all_nullable = false;
                            }
                        }
                    }
                    if !all_nullable {
                        break;
                    }
                }
                if all_nullable && !nullable[lhs] {
                    nullable[lhs] = true;
                    changed = true;
                }
            }
        }
        Self { sets, nullable }
    }

    /// FIRST of a symbol sequence followed by lookahead `la`.
    fn of_seq(&self, seq: &[Sym], la: TermId) -> HashSet<TermId> {
        let mut out = HashSet::new();
        for sym in seq {
            match *sym {
                Sym::T(t) => {
                    out.insert(t);
                    return out;
                }
                Sym::N(n) => {
                    out.extend(self.sets[n.0 as usize].iter().copied());
                    if !self.nullable[n.0 as usize] {
                        return out;
                    }
                }
            }
        }
        out.insert(la);
        out
    }
}

struct Builder<'g> {
    terms_len: usize,
    nts_len: usize,
    first: FirstSets,
    prods: &'g [Prod],
}

impl Builder<'_> {
    fn closure(&self, mut items: BTreeSet<Item>) -> BTreeSet<Item> {
        let mut worklist: Vec<Item> = items.iter().copied().collect();
        while let Some(item) = worklist.pop() {
            let prod = &self.prods[item.prod as usize];
            let Some(&Sym::N(nt)) = prod.rhs.get(item.dot as usize) else {
                continue;
            };
            let rest = &prod.rhs[item.dot as usize + 1..];
            let lookaheads = self.first.of_seq(rest, item.la);
            for (p, candidate) in self.prods.iter().enumerate() {
                if candidate.lhs != nt {
                    continue;
                }
                for &la in &lookaheads {
                    let new = Item {
                        prod: p as u32,
                        dot: 0,
                        la,
                    };
                    if items.insert(new) {
                        worklist.push(new);
                    }
                }
            }
        }
        items
    }

    fn build_states(&self) -> (Vec<Vec<Action>>, Vec<Vec<Option<u32>>>, Vec<Conflict>) {
        let start = self.closure(BTreeSet::from([Item {
            prod: 0,
            dot: 0,
            la: EOF,
        }]));

        let mut states: IndexMap<BTreeSet<Item>, u32> = IndexMap::new();
        states.insert(start, 0);

        let mut actions: Vec<Vec<Action>> = Vec::new();
        let mut gotos: Vec<Vec<Option<u32>>> = Vec::new();
        let mut conflicts = Vec::new();

        let mut pending = vec![0u32];
        while let Some(state) = pending.pop() {
            let items = states
                .get_index(state as usize)
                .map(|(k, _)| k.clone())
                .expect("state recorded before being queued");

            while actions.len() <= state as usize {
                actions.push(vec![Action::Error; self.terms_len]);
                gotos.push(vec![None; self.nts_len]);
            }

            // Transition targets, grouped by the symbol after the dot.
            let mut by_sym: IndexMap<Sym, BTreeSet<Item>> = IndexMap::new();
            for item in &items {
                let prod = &self.prods[item.prod as usize];
                match prod.rhs.get(item.dot as usize) {
                    Some(&sym) => {
                        by_sym.entry(sym).or_default().insert(Item {
                            prod: item.prod,
                            dot: item.dot + 1,
                            la: item.la,
                        });
                    }
                    None => {
                        let action = if item.prod == 0 {
                            Action::Accept
                        } else {
                            Action::Reduce(item.prod)
                        };
                        Self::merge_action(
                            &mut actions[state as usize][item.la.0 as usize],
                            action,
                            state,
                            item.la,
                            &mut conflicts,
                        );
                    }
                }
            }

            for (sym, kernel) in by_sym {
                let target_items = self.closure(kernel);
                let next_index = states.len() as u32;
                let target = match states.entry(target_items) {
                    indexmap::map::Entry::Occupied(e) => *e.get(),
                    indexmap::map::Entry::Vacant(e) => {
                        e.insert(next_index);
                        pending.push(next_index);
                        next_index
                    }
                };
                match sym {
                    Sym::T(t) => {
                        Self::merge_action(
                            &mut actions[state as usize][t.0 as usize],
                            Action::Shift(target),
                            state,
                            t,
                            &mut conflicts,
                        );
                    }
                    Sym::N(n) => gotos[state as usize][n.0 as usize] = Some(target),
                }
            }
        }

        (actions, gotos, conflicts)
    }

    /// Install `new` into `cell`, resolving conflicts: shift beats reduce,
    /// the earlier production beats the later.
    fn merge_action(
        cell: &mut Action,
        new: Action,
        state: u32,
        term: TermId,
        conflicts: &mut Vec<Conflict>,
    ) {
        let old = *cell;
        let kept = match (old, new) {
            (Action::Error, _) => {
                *cell = new;
                return;
            }
            (Action::Accept, _) => old,
            (_, Action::Accept) => new,
            (Action::Shift(_), Action::Reduce(_)) => old,
            (Action::Reduce(_), Action::Shift(_)) => new,
            (Action::Reduce(a), Action::Reduce(b)) => {
                if a <= b {
                    old
                } else {
                    new
                }
            }
            _ => old,
        };
        if kept != old || kept != new {
            let dropped = if kept == old { new } else { old };
            if dropped != kept {
                conflicts.push(Conflict {
                    state,
                    term,
                    kept,
                    dropped,
                });
            }
        }
        *cell = kept;
    }
}
