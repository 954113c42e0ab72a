//! Grammar definitions for the boxtree editing core.
//!
//! A grammar file supplies a token table (name → regex, in priority order),
//! an EBNF-like production set, an optional indent-sensitivity flag, and
//! composition rules declaring which inner grammars a non-terminal may host.
//! Compiling a grammar produces:
//!
//! - a canonical LR(1) action/goto [`table::ParseTable`], with synthetic
//!   `NEWLINE`/`INDENT`/`DEDENT` terminals for whitespace-sensitive grammars
//!   and one synthetic terminal per hosted inner grammar;
//! - a merged maximal-munch token automaton ([`dfa::TokenDfa`]) that reports
//!   per-token lookahead distances for the incremental lexer.

pub mod compile;
pub mod dfa;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod table;
pub mod types;

pub use compile::CompiledGrammar;
pub use dfa::{ScanMatch, TokenDfa};
pub use parser::parse_grammar;
pub use table::{Action, NtId, ParseTable, TermId};
pub use types::{CompositionRule, Grammar, Production, SymbolRef, TokenRule};

/// Errors raised while parsing or compiling a grammar file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GrammarError {
    #[error("unrecognized character at byte {offset}")]
    Lex { offset: usize },

    #[error("{message} at byte {offset}")]
    Parse { message: String, offset: usize },

    #[error("token {name:?} is declared twice")]
    DuplicateToken { name: String },

    #[error("production {production} references unknown terminal {name:?}")]
    UnknownTerminal { name: String, production: String },

    #[error("production {production} references non-terminal {name} which has no rule")]
    UnknownNonTerminal { name: String, production: String },

    #[error("composition host {name} has no rule")]
    UnknownHost { name: String },

    #[error("token {name:?}: {message}")]
    BadPattern { name: String, message: String },

    #[error("token automaton construction failed: {message}")]
    DfaBuild { message: String },
}

/// Result type for grammar operations.
pub type Result<T> = std::result::Result<T, GrammarError>;
