//! The file tree: path-based insertion, lookup and removal over a
//! [`NodeStore`](crate::node::NodeStore), with an optional invariant check
//! around every operation.

mod error;
mod file_tree;
mod options;
mod stat;

pub use error::{ErrorKind, FileTreeError};
pub use file_tree::FileTree;
pub use options::{CheckMode, TreeOptions};
pub use stat::Stat;
