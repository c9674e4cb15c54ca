//! Tree nodes and the arena that owns them.
//!
//! A node is either a directory, holding its children sorted by
//! [`EntryKey`], or a file, holding an opaque byte buffer. Nodes refer to
//! each other through [`NodeId`] handles issued by a [`NodeStore`].

#[allow(clippy::module_inception)]
mod node;
mod store;

pub(crate) use node::NodeBody;
pub use node::{EntryKey, Node, NodeId, NodeKind};
pub use store::{NodeError, NodeStore};
