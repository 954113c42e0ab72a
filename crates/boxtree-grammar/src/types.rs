//! Grammar description data model.
//!
//! A [`Grammar`] is the deserialized form of one grammar file: token rules in
//! priority order, productions, the indent-sensitivity flag, and composition
//! rules naming which inner grammars a non-terminal may host. The structures
//! round-trip through serde for caching and tooling.

use serde::{Deserialize, Serialize};

/// Names of the synthetic terminals of whitespace-sensitive grammars.
pub const NEWLINE: &str = "NEWLINE";
pub const INDENT: &str = "INDENT";
pub const DEDENT: &str = "DEDENT";

/// Token class of a maximal unlexable span.
pub const ERROR_CLASS: &str = "<error>";

/// One token rule: a name and the regex recognising it. Declaration order is
/// priority order (earlier wins length ties).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRule {
    pub name: String,
    pub pattern: String,
    /// Hidden class: threaded through the tree, invisible to the LR tables.
    pub ignored: bool,
}

/// A symbol occurrence on a production right-hand side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolRef {
    /// Quoted in the grammar file: a terminal class name.
    Terminal(String),
    /// Bare in the grammar file: a non-terminal.
    NonTerminal(String),
}

impl SymbolRef {
    pub fn name(&self) -> &str {
        match self {
            SymbolRef::Terminal(n) | SymbolRef::NonTerminal(n) => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub lhs: String,
    pub rhs: Vec<SymbolRef>,
}

/// `host hosts Inner include(..) exclude(..)` — registers an inner grammar
/// under a host non-terminal. Loading synthesizes the box terminal class
/// (`<Inner>`) and the production `host ::= "<Inner>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionRule {
    pub host: String,
    pub inner: String,
    /// Gate classes for auto-insertion: when non-empty, a span is only
    /// auto-boxed if it contains at least one of these inner token classes.
    #[serde(default)]
    pub include: Vec<String>,
    /// A span containing any of these inner token classes is rejected.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// The inner parse must be valid for the outer parse to succeed.
    #[serde(default = "default_true")]
    pub requires_valid: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grammar {
    pub name: String,
    pub tokens: Vec<TokenRule>,
    pub productions: Vec<Production>,
    /// Whitespace-sensitive: NEWLINE/INDENT/DEDENT join the table alphabet
    /// and the indentation engine runs for this grammar.
    #[serde(default)]
    pub indent_sensitive: bool,
    #[serde(default)]
    pub compositions: Vec<CompositionRule>,
}

impl Grammar {
    /// The start symbol: LHS of the first production.
    pub fn start_symbol(&self) -> &str {
        &self.productions[0].lhs
    }

    /// Synthetic terminal class for boxes of `inner` ("`<Inner>`").
    pub fn box_class(inner: &str) -> String {
        format!("<{inner}>")
    }

    pub fn token_rule(&self, name: &str) -> Option<&TokenRule> {
        self.tokens.iter().find(|t| t.name == name)
    }

    pub fn composition_for(&self, inner: &str) -> Option<&CompositionRule> {
        self.compositions.iter().find(|c| c.inner == inner)
    }
}
