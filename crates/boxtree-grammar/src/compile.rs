//! Grammar compilation: description → tables + automaton.

use crate::dfa::TokenDfa;
use crate::parser::parse_grammar;
use crate::table::ParseTable;
use crate::types::{Grammar, Production, SymbolRef};
use crate::{GrammarError, Result};

/// A grammar ready for parsing: the (box-production-augmented) description,
/// its LR tables, and its token automaton. Immutable after construction.
pub struct CompiledGrammar {
    pub grammar: Grammar,
    pub table: ParseTable,
    pub dfa: TokenDfa,
}

impl CompiledGrammar {
    pub fn compile(source: &str) -> Result<Self> {
        let grammar = parse_grammar(source)?;
        Self::from_grammar(grammar)
    }

    pub fn from_grammar(mut grammar: Grammar) -> Result<Self> {
        // Composition rules synthesize one terminal class per inner grammar
        // and the production `host ::= "<Inner>"`.
        let mut box_classes = Vec::new();
        for comp in grammar.compositions.clone() {
            if !grammar.productions.iter().any(|p| p.lhs == comp.host) {
                return Err(GrammarError::UnknownHost {
                    name: comp.host.clone(),
                });
            }
            let class = Grammar::box_class(&comp.inner);
            grammar.productions.push(Production {
                lhs: comp.host.clone(),
                rhs: vec![SymbolRef::Terminal(class.clone())],
            });
            box_classes.push(class);
        }

        let table = ParseTable::build(&grammar, &box_classes)?;
        let dfa = TokenDfa::build(&grammar.tokens)?;
        Ok(Self {
            grammar,
            table,
            dfa,
        })
    }

    pub fn name(&self) -> &str {
        &self.grammar.name
    }

    /// Token class name of a DFA rule index.
    pub fn class_name(&self, rule: usize) -> &str {
        &self.grammar.tokens[rule].name
    }

    /// Whether a DFA rule produces a hidden terminal.
    pub fn class_ignored(&self, rule: usize) -> bool {
        self.grammar.tokens[rule].ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Action, EOF};
    use indoc::indoc;

    const CALC: &str = indoc! {r#"
        grammar Calc
        tokens {
            INT   = "[0-9]+"
            plus  = "\+"
            times = "\*"
            ws    = "[ \t\n]+" ignore
        }
        rules {
            E ::= E "plus" T | T ;
            T ::= T "times" P | P ;
            P ::= "INT" ;
        }
    "#};

    #[test]
    fn calc_tables_drive_a_parse() {
        let compiled = CompiledGrammar::compile(CALC).unwrap();
        let table = &compiled.table;

        let int = table.term_id("INT").unwrap();
        let plus = table.term_id("plus").unwrap();

        // Hand-run "1+2" through the tables.
        let mut stack = vec![0u32];
        let input = [int, plus, int, EOF];
        let mut pos = 0;
        loop {
            let state = *stack.last().unwrap();
            match table.action(state, input[pos]) {
                Action::Shift(next) => {
                    stack.push(next);
                    pos += 1;
                }
                Action::Reduce(p) => {
                    let prod = table.prod(p);
                    stack.truncate(stack.len() - prod.rhs.len());
                    let state = *stack.last().unwrap();
                    stack.push(table.goto(state, prod.lhs).unwrap());
                }
                Action::Accept => break,
                Action::Error => panic!("error at input {pos}"),
            }
        }
        assert_eq!(pos, 3);
    }

    #[test]
    fn error_cells_report_expected_terminals() {
        let compiled = CompiledGrammar::compile(CALC).unwrap();
        let table = &compiled.table;
        let int = table.term_id("INT").unwrap();
        let plus = table.term_id("plus").unwrap();

        // After "1 +", another "+" is an error; INT is expected.
        let mut state = 0;
        for term in [int, plus] {
            state = loop {
                match table.action(state, term) {
                    Action::Shift(next) => break next,
                    Action::Reduce(p) => {
                        // Single-symbol stacks suffice here: reductions in this
                        // prefix never pop past the start state.
                        let prod = table.prod(p);
                        assert_eq!(prod.rhs.len(), 1);
                        state = table.goto(0, prod.lhs).unwrap();
                    }
                    other => panic!("unexpected action {other:?}"),
                }
            };
        }
        assert_eq!(table.action(state, plus), Action::Error);
        let expected = table.expected(state);
        assert!(expected.contains(&"INT"));
        assert!(!expected.contains(&"plus"));
    }

    #[test]
    fn compositions_synthesize_box_productions() {
        let compiled = CompiledGrammar::compile(indoc! {r#"
            grammar Host
            tokens { name = "[a-z]+" eq = "=" }
            rules { stmt ::= "name" "eq" atom ; atom ::= "name" ; }
            compose { atom hosts SQL }
        "#})
        .unwrap();

        let table = &compiled.table;
        assert!(table.term_id("<SQL>").is_some());
        let last = compiled.grammar.productions.last().unwrap();
        assert_eq!(last.lhs, "atom");
        assert_eq!(last.rhs, vec![SymbolRef::Terminal("<SQL>".into())]);
    }

    #[test]
    fn unknown_terminal_in_rule_is_reported() {
        let err = CompiledGrammar::compile(indoc! {r#"
            grammar Bad
            tokens { a = "a" }
            rules { S ::= "b" ; }
        "#});
        assert!(matches!(err, Err(GrammarError::UnknownTerminal { .. })));
    }

    #[test]
    fn indent_option_extends_the_alphabet() {
        let compiled = CompiledGrammar::compile(indoc! {r#"
            grammar Py
            tokens {
                name = "[a-z]+"
                ws   = "[ ]+" ignore
                nl   = "\n" ignore
            }
            rules { file ::= file "name" "NEWLINE" | ; }
            options { indent }
        "#})
        .unwrap();
        assert!(compiled.table.term_id("NEWLINE").is_some());
        assert!(compiled.table.term_id("INDENT").is_some());
        assert!(compiled.table.term_id("DEDENT").is_some());
    }
}
