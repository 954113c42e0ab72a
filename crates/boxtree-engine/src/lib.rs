//! Incremental lexing and parsing engine.
//!
//! # Architecture
//!
//! One [`TreeManager`] owns a document: a versioned node arena shared by the
//! outermost grammar and every nested language box, a cursor, and one parser
//! record per active grammar instance. Editor operations translate into
//! terminal-level tree edits, after which the pipeline runs:
//!
//! 1. the incremental lexer re-tokenizes the neighbourhood of the edit,
//!    guided by per-terminal lookahead counters;
//! 2. the indentation engine reconciles virtual NEWLINE/INDENT/DEDENT
//!    terminals for whitespace-sensitive grammars;
//! 3. the incremental LR parser walks the previous tree, shifting unchanged
//!    subtrees whole and breaking down the changed fringe;
//! 4. on a parse error, recovery runs out-of-context analysis on an ancestor
//!    of the offending terminal and, failing that, isolates the subtree;
//! 5. the version log groups the writes into one undo step.
//!
//! Recovery control flow is explicit: the parser produces
//! [`parser::Step`] values; nothing unwinds.

pub mod autobox;
pub mod diagnostics;
pub mod dump;
pub mod indent;
pub mod lexer;
pub mod parser;
pub mod recovery;
pub mod records;
pub mod serialize;
pub mod tokens;
pub mod tree_manager;

pub use diagnostics::{Diagnostics, DiagnosticsPrinter};
pub use dump::dump_tree;
pub use records::ParserRecord;
pub use tree_manager::{Direction, EngineOptions, TreeManager};

/// Errors surfaced by the engine API. Parse and lex failures are not errors:
/// they are document states reported through `last_status` and error nodes.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("grammar {name:?} is not registered")]
    GrammarMissing { name: String },

    #[error(transparent)]
    Grammar(#[from] boxtree_grammar::GrammarError),

    #[error("document deserialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("document file is inconsistent: {message}")]
    Corrupt { message: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
