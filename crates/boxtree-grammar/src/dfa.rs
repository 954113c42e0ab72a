//! Merged token automaton.
//!
//! All token rules of a grammar compile into one multi-pattern DFA. Matching
//! is maximal munch: the scan keeps feeding bytes while any rule can still
//! match and commits the last accepting position; on a length tie the
//! earliest-declared rule wins.
//!
//! The scan also reports how many characters past the committed end it
//! inspected before giving up on a longer match — the lookahead counter the
//! incremental lexer stores on each terminal to know when a later edit can
//! retroactively change an earlier token.

use regex_automata::dfa::{Automaton, StartKind, dense};
use regex_automata::{Anchored, Input, MatchKind};

use crate::types::TokenRule;
use crate::{GrammarError, Result};

/// A committed token match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanMatch {
    /// Length of the lexeme in bytes.
    pub len: usize,
    /// Index of the winning rule in the grammar's token table.
    pub rule: usize,
    /// Characters inspected beyond the lexeme before committing. Reading
    /// end-of-input counts as one.
    pub lookahead: u32,
}

pub struct TokenDfa {
    dfa: dense::DFA<Vec<u32>>,
    num_rules: usize,
}

impl TokenDfa {
    pub fn build(rules: &[TokenRule]) -> Result<Self> {
        for rule in rules {
            validate_pattern(rule)?;
        }
        let patterns: Vec<&str> = rules.iter().map(|r| r.pattern.as_str()).collect();
        let dfa = dense::Builder::new()
            .configure(
                dense::Config::new()
                    .match_kind(MatchKind::All)
                    .start_kind(StartKind::Anchored)
                    .minimize(true),
            )
            .build_many(&patterns)
            .map_err(|e| GrammarError::DfaBuild {
                message: e.to_string(),
            })?;
        Ok(Self {
            dfa,
            num_rules: rules.len(),
        })
    }

    pub fn num_rules(&self) -> usize {
        self.num_rules
    }

    /// Scan one token starting at byte offset `start`. Returns `None` when
    /// no rule matches there (the caller emits an error terminal).
    pub fn scan(&self, text: &str, start: usize) -> Option<ScanMatch> {
        let haystack = &text.as_bytes()[start..];
        let input = Input::new(text).anchored(Anchored::Yes).range(start..);
        let mut sid = self
            .dfa
            .start_state_forward(&input)
            .expect("anchored start state exists for byte-oriented DFA");

        // Matches are delayed by one byte: a match ending at offset i becomes
        // visible after feeding the byte at i (or end-of-input).
        let mut last: Option<(usize, usize)> = None;
        let mut fed = 0usize;
        let mut consulted_eoi = false;

        for (i, &byte) in haystack.iter().enumerate() {
            sid = self.dfa.next_state(sid, byte);
            fed = i + 1;
            if self.dfa.is_special_state(sid) {
                if self.dfa.is_match_state(sid) {
                    last = Some((i, self.best_pattern(sid)));
                } else if self.dfa.is_dead_state(sid) || self.dfa.is_quit_state(sid) {
                    break;
                }
            }
        }
        if !self.dfa.is_dead_state(sid) && !self.dfa.is_quit_state(sid) {
            sid = self.dfa.next_eoi_state(sid);
            consulted_eoi = true;
            if self.dfa.is_match_state(sid) {
                last = Some((haystack.len(), self.best_pattern(sid)));
            }
        }

        let (end, rule) = last?;
        let beyond = text[start + end..start + fed].chars().count();
        Some(ScanMatch {
            len: end,
            rule,
            lookahead: beyond as u32 + u32::from(consulted_eoi),
        })
    }

    /// Bytes the automaton examined before rejecting a scan at `start`,
    /// rounded up to a character boundary, at least one character. This is
    /// the span an error terminal covers — an unterminated delimited token
    /// swallows everything it inspected, so a later edit near its end can
    /// still complete it.
    pub fn garbage_extent(&self, text: &str, start: usize) -> usize {
        let haystack = &text.as_bytes()[start..];
        let input = Input::new(text).anchored(Anchored::Yes).range(start..);
        let mut sid = self
            .dfa
            .start_state_forward(&input)
            .expect("anchored start state exists for byte-oriented DFA");

        let mut fed = 0usize;
        for &byte in haystack {
            sid = self.dfa.next_state(sid, byte);
            if self.dfa.is_dead_state(sid) || self.dfa.is_quit_state(sid) {
                break;
            }
            fed += 1;
        }

        let first = text[start..].chars().next().map_or(1, char::len_utf8);
        let mut len = fed.max(first).min(haystack.len().max(first));
        while len < haystack.len() && !text.is_char_boundary(start + len) {
            len += 1;
        }
        len
    }

    /// Earliest-declared rule among the patterns matching at this state.
    fn best_pattern(&self, sid: regex_automata::util::primitives::StateID) -> usize {
        (0..self.dfa.match_len(sid))
            .map(|j| self.dfa.match_pattern(sid, j).as_usize())
            .min()
            .expect("match state reports at least one pattern")
    }
}

fn validate_pattern(rule: &TokenRule) -> Result<()> {
    let hir = regex_syntax::Parser::new()
        .parse(&rule.pattern)
        .map_err(|e| GrammarError::BadPattern {
            name: rule.name.clone(),
            message: e.to_string(),
        })?;
    if hir.properties().minimum_len() == Some(0) {
        return Err(GrammarError::BadPattern {
            name: rule.name.clone(),
            message: "pattern matches the empty string".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(defs: &[(&str, &str)]) -> Vec<TokenRule> {
        defs.iter()
            .map(|(name, pattern)| TokenRule {
                name: (*name).into(),
                pattern: (*pattern).into(),
                ignored: false,
            })
            .collect()
    }

    #[test]
    fn longest_match_wins() {
        let dfa = TokenDfa::build(&rules(&[("assign", "::="), ("colon", ":"), ("eq", "=")]))
            .unwrap();
        let m = dfa.scan("::=", 0).unwrap();
        assert_eq!((m.len, m.rule), (3, 0));
    }

    #[test]
    fn priority_breaks_length_ties() {
        let dfa = TokenDfa::build(&rules(&[("kw", "if"), ("name", "[a-z]+")])).unwrap();
        let m = dfa.scan("if", 0).unwrap();
        assert_eq!(m.rule, 0);
        let m = dfa.scan("iff", 0).unwrap();
        assert_eq!((m.len, m.rule), (3, 1));
    }

    #[test]
    fn lookahead_counts_the_end_of_input_probe() {
        let dfa = TokenDfa::build(&rules(&[("assign", "::="), ("colon", ":")])).unwrap();
        // ":" alone: the scan probed end-of-input hoping for "::=".
        let m = dfa.scan(":", 0).unwrap();
        assert_eq!((m.len, m.lookahead), (1, 1));
        // "::": commits the first ":" after inspecting the second and EOI.
        let m = dfa.scan("::", 0).unwrap();
        assert_eq!((m.len, m.lookahead), (1, 2));
    }

    #[test]
    fn lookahead_stops_at_dead_states() {
        let dfa = TokenDfa::build(&rules(&[("colon", ":"), ("int", "[0-9]+")])).unwrap();
        let m = dfa.scan(":5x", 0).unwrap();
        // Committing ":" examined '5' (the delayed match byte) and 'x'
        // (which proved no longer rule applies); end-of-input was never probed.
        assert_eq!((m.len, m.lookahead), (1, 2));
    }

    #[test]
    fn unlexable_start_yields_none() {
        let dfa = TokenDfa::build(&rules(&[("int", "[0-9]+")])).unwrap();
        assert_eq!(dfa.scan("x1", 0), None);
        assert!(dfa.scan("x1", 1).is_some());
    }

    #[test]
    fn garbage_extent_covers_the_examined_prefix() {
        let dfa = TokenDfa::build(&rules(&[
            ("str", r#""""([^"]|"[^"]|""[^"])*""""#),
            ("int", "[0-9]+"),
        ]))
        .unwrap();
        // Nothing starts with '$': one character of garbage.
        assert_eq!(dfa.garbage_extent("$12", 0), 1);
        // An unterminated string was examined to the end of input.
        assert_eq!(dfa.garbage_extent("\"\"\"ab", 0), 5);
    }

    #[test]
    fn empty_matching_pattern_is_rejected() {
        let err = TokenDfa::build(&rules(&[("star", "a*")]));
        assert!(matches!(err, Err(GrammarError::BadPattern { .. })));
    }

    #[test]
    fn multiline_tokens_scan_across_newlines() {
        // Delimited tokens need explicit non-delimiter runs: a DFA commits
        // the longest accepting span, so lazy quantifiers have no effect.
        let dfa = TokenDfa::build(&rules(&[
            ("str", r#""""([^"]|"[^"]|""[^"])*""""#),
            ("int", "[0-9]+"),
        ]))
        .unwrap();
        let text = "\"\"\"a\nb\"\"\"7";
        let m = dfa.scan(text, 0).unwrap();
        assert_eq!((m.len, m.rule), (9, 0));
    }
}
