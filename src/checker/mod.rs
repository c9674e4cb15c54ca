//! Read-only verification of every structural invariant of a file tree.
//!
//! The checker re-derives the invariants from the node data instead of
//! trusting the mutators, and reports the first one it finds broken.

#[allow(clippy::module_inception)]
mod checker;

pub use checker::{InvariantViolation, count_nodes, node_is_valid, tree_is_valid};
