//! Versioned arena parse tree for the boxtree editing core.
//!
//! Two layers:
//! - **Storage**: [`NodeArena`] owns every node of a document (outer tree
//!   and language boxes) and hands out integer [`NodeId`] handles. Parent,
//!   sibling, and terminal-chain edges are handles, so the cyclic pointer
//!   graph of a parse tree needs no reference counting.
//! - **History**: every mutable field is a version-keyed cell. Undo and redo
//!   move a read pointer between snapshot boundaries; a parse pass can
//!   journal its writes and roll them back when it fails.

mod arena;
mod compare;
mod interner;
mod invariants;
mod versioned;


pub use arena::{NodeArena, NodeId, NodeKind, Version};
pub use compare::{TreeMismatch, TreeView, tree_compare};
pub use interner::{Interner, SymbolId};
pub use invariants::{InvariantViolation, check_tree};
pub use versioned::{Rollback, Versioned};
