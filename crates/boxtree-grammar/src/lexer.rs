//! Lexer for the grammar description language.
//!
//! Produces span-based tokens; text is sliced from source only when needed.

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r"#[^\n]*", allow_greedy = true))]
pub enum TokenKind {
    #[token("grammar")]
    KwGrammar,

    #[token("tokens")]
    KwTokens,

    #[token("rules")]
    KwRules,

    #[token("options")]
    KwOptions,

    #[token("compose")]
    KwCompose,

    #[token("hosts")]
    KwHosts,

    #[token("include")]
    KwInclude,

    #[token("exclude")]
    KwExclude,

    #[token("ignore")]
    KwIgnore,

    #[token("optional")]
    KwOptional,

    #[token("indent")]
    KwIndent,

    #[token("{")]
    BraceOpen,

    #[token("}")]
    BraceClose,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[token("::=")]
    Derives,

    #[token("=")]
    Equals,

    #[token("|")]
    Pipe,

    #[token(";")]
    Semi,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    Str,
}

/// Token with its byte span in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Tokenize a grammar file. Unrecognized characters are reported with their
/// byte offset.
pub fn lex(source: &str) -> Result<Vec<Token>, usize> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    while let Some(item) = lexer.next() {
        let span = lexer.span();
        match item {
            Ok(kind) => tokens.push(Token {
                kind,
                start: span.start,
                end: span.end,
            }),
            Err(()) => return Err(span.start),
        }
    }
    Ok(tokens)
}

/// The text of a token. O(1) slice into source.
#[inline]
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[token.span()]
}

/// Strip the quotes of a `Str` token and process DSL escapes: `\"` and `\\`
/// collapse, every other backslash sequence is preserved verbatim so regex
/// escapes pass through to the pattern compiler.
pub fn unquote(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push_str(r"\\"),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_a_token_section() {
        let tokens = lex(r#"tokens { INT = "[0-9]+" ws = "[ \t]+" ignore }"#).unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::KwTokens,
                TokenKind::BraceOpen,
                TokenKind::Ident,
                TokenKind::Equals,
                TokenKind::Str,
                TokenKind::Ident,
                TokenKind::Equals,
                TokenKind::Str,
                TokenKind::KwIgnore,
                TokenKind::BraceClose,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = lex("# header\nrules { }").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::KwRules);
    }

    #[test]
    fn unquote_preserves_regex_escapes() {
        assert_eq!(unquote(r#""\+""#), r"\+");
        assert_eq!(unquote(r#""\"quoted\"""#), r#""quoted""#);
        assert_eq!(unquote(r#""a\\b""#), r"a\\b");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(lex("rules @ {}"), Err(6));
    }
}
