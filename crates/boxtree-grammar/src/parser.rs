//! Hand parser for the grammar description language.

use crate::lexer::{Token, TokenKind, lex, token_text, unquote};
use crate::types::{CompositionRule, Grammar, Production, SymbolRef, TokenRule};
use crate::{GrammarError, Result};

/// Parse a grammar file into its data model. Validation beyond syntax
/// (unknown terminals, bad regexes) happens when the grammar is compiled.
pub fn parse_grammar(source: &str) -> Result<Grammar> {
    let tokens = lex(source).map_err(|offset| GrammarError::Lex { offset })?;
    Parser {
        source,
        tokens,
        pos: 0,
    }
    .parse()
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn parse(mut self) -> Result<Grammar> {
        self.expect(TokenKind::KwGrammar, "grammar header")?;
        let name = self.ident("grammar name")?;

        let mut grammar = Grammar {
            name,
            tokens: Vec::new(),
            productions: Vec::new(),
            indent_sensitive: false,
            compositions: Vec::new(),
        };

        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::KwTokens => self.token_section(&mut grammar)?,
                TokenKind::KwRules => self.rule_section(&mut grammar)?,
                TokenKind::KwOptions => self.option_section(&mut grammar)?,
                TokenKind::KwCompose => self.compose_section(&mut grammar)?,
                _ => return Err(self.unexpected("a section keyword")),
            }
        }

        if grammar.tokens.is_empty() {
            return Err(GrammarError::Parse {
                message: "grammar declares no tokens".into(),
                offset: self.source.len(),
            });
        }
        if grammar.productions.is_empty() {
            return Err(GrammarError::Parse {
                message: "grammar declares no rules".into(),
                offset: self.source.len(),
            });
        }
        Ok(grammar)
    }

    fn token_section(&mut self, grammar: &mut Grammar) -> Result<()> {
        self.bump();
        self.expect(TokenKind::BraceOpen, "'{' after tokens")?;
        while !self.eat(TokenKind::BraceClose) {
            let name = self.ident("token name")?;
            self.expect(TokenKind::Equals, "'=' after token name")?;
            let pattern = self.string("token pattern")?;
            let ignored = self.eat(TokenKind::KwIgnore);
            if grammar.tokens.iter().any(|t| t.name == name) {
                return Err(GrammarError::DuplicateToken { name });
            }
            grammar.tokens.push(TokenRule {
                name,
                pattern,
                ignored,
            });
        }
        Ok(())
    }

    fn rule_section(&mut self, grammar: &mut Grammar) -> Result<()> {
        self.bump();
        self.expect(TokenKind::BraceOpen, "'{' after rules")?;
        while !self.eat(TokenKind::BraceClose) {
            let lhs = self.ident("rule left-hand side")?;
            self.expect(TokenKind::Derives, "'::=' after rule name")?;
            loop {
                let mut rhs = Vec::new();
                loop {
                    match self.peek().map(|t| t.kind) {
                        Some(TokenKind::Ident) => {
                            rhs.push(SymbolRef::NonTerminal(self.ident("symbol")?));
                        }
                        Some(TokenKind::Str) => {
                            rhs.push(SymbolRef::Terminal(self.string("terminal")?));
                        }
                        _ => break,
                    }
                }
                grammar.productions.push(Production {
                    lhs: lhs.clone(),
                    rhs,
                });
                if !self.eat(TokenKind::Pipe) {
                    break;
                }
            }
            self.expect(TokenKind::Semi, "';' ending the rule")?;
        }
        Ok(())
    }

    fn option_section(&mut self, grammar: &mut Grammar) -> Result<()> {
        self.bump();
        self.expect(TokenKind::BraceOpen, "'{' after options")?;
        while !self.eat(TokenKind::BraceClose) {
            if self.eat(TokenKind::KwIndent) {
                grammar.indent_sensitive = true;
            } else {
                return Err(self.unexpected("an option name"));
            }
        }
        Ok(())
    }

    fn compose_section(&mut self, grammar: &mut Grammar) -> Result<()> {
        self.bump();
        self.expect(TokenKind::BraceOpen, "'{' after compose")?;
        while !self.eat(TokenKind::BraceClose) {
            let host = self.ident("host non-terminal")?;
            self.expect(TokenKind::KwHosts, "'hosts' after host non-terminal")?;
            let inner = self.ident("inner grammar name")?;
            let mut rule = CompositionRule {
                host,
                inner,
                include: Vec::new(),
                exclude: Vec::new(),
                requires_valid: true,
            };
            loop {
                if self.eat(TokenKind::KwOptional) {
                    rule.requires_valid = false;
                } else if self.eat(TokenKind::KwInclude) {
                    rule.include = self.class_list()?;
                } else if self.eat(TokenKind::KwExclude) {
                    rule.exclude = self.class_list()?;
                } else {
                    break;
                }
            }
            grammar.compositions.push(rule);
        }
        Ok(())
    }

    fn class_list(&mut self) -> Result<Vec<String>> {
        self.expect(TokenKind::ParenOpen, "'(' before class list")?;
        let mut names = Vec::new();
        while !self.eat(TokenKind::ParenClose) {
            names.push(self.string("token class")?);
        }
        Ok(names)
    }

    // ----- primitives -----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().map(|t| t.kind) == Some(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => {
                let text = token_text(self.source, t).to_owned();
                self.bump();
                Ok(text)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn string(&mut self, what: &str) -> Result<String> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Str => {
                let text = unquote(token_text(self.source, t));
                self.bump();
                Ok(text)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, what: &str) -> GrammarError {
        let offset = self.peek().map_or(self.source.len(), |t| t.start);
        GrammarError::Parse {
            message: format!("expected {what}"),
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn parses_a_small_grammar() {
        let grammar = parse_grammar(indoc! {r#"
            grammar Calc

            tokens {
                INT  = "[0-9]+"
                plus = "\+"
                ws   = "[ \t]+" ignore
            }

            rules {
                E ::= E "plus" T | T ;
                T ::= "INT" ;
            }
        "#})
        .unwrap();

        assert_eq!(grammar.name, "Calc");
        assert_eq!(grammar.tokens.len(), 3);
        assert!(grammar.tokens[2].ignored);
        assert_eq!(grammar.productions.len(), 3);
        assert_eq!(grammar.start_symbol(), "E");
        assert_eq!(
            grammar.productions[0].rhs,
            vec![
                SymbolRef::NonTerminal("E".into()),
                SymbolRef::Terminal("plus".into()),
                SymbolRef::NonTerminal("T".into()),
            ]
        );
    }

    #[test]
    fn parses_empty_alternative() {
        let grammar = parse_grammar(indoc! {r#"
            grammar Opt
            tokens { a = "a" }
            rules { S ::= "a" S | ; }
        "#})
        .unwrap();
        assert_eq!(grammar.productions[1].rhs, vec![]);
    }

    #[test]
    fn parses_options_and_compose() {
        let grammar = parse_grammar(indoc! {r#"
            grammar Py
            tokens { name = "[a-z]+" nl = "\n" ignore }
            rules { file ::= "name" ; }
            options { indent }
            compose { file hosts SQL include("select") exclude("nl") }
        "#})
        .unwrap();
        assert!(grammar.indent_sensitive);
        let rule = &grammar.compositions[0];
        assert_eq!(rule.host, "file");
        assert_eq!(rule.inner, "SQL");
        assert_eq!(rule.include, vec!["select"]);
        assert_eq!(rule.exclude, vec!["nl"]);
        assert!(rule.requires_valid);
    }

    #[test]
    fn missing_semi_is_an_error() {
        let err = parse_grammar("grammar G tokens { a = \"a\" } rules { S ::= \"a\" }");
        assert!(matches!(err, Err(GrammarError::Parse { .. })));
    }
}
