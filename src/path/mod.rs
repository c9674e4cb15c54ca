//! Slash-separated tree paths and the prefix arithmetic the tree relies on.

mod tree_path;

pub use tree_path::{PathError, SEPARATOR, TreePath, is_direct_child};
