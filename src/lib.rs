//! An in-memory hierarchical namespace of directories and files.
//!
//! A [`FileTree`] holds a single rooted hierarchy addressed by
//! slash-separated paths. Directories keep their children sorted (files
//! first, then by path) so lookups and the [`FileTree::to_listing`] dump are
//! deterministic. Nothing here touches real storage: file contents are byte
//! buffers handed in by the caller.
//!
//! ```
//! use filetree::{FileTree, Stat};
//!
//! let mut tree = FileTree::new();
//! tree.init()?;
//! tree.insert_dir("/a/b")?;
//! tree.insert_file("/a/b/f.txt", b"hello".to_vec())?;
//!
//! assert!(tree.contains_file("/a/b/f.txt"));
//! assert_eq!(tree.stat("/a/b/f.txt")?, Stat::File { length: 5 });
//! assert_eq!(tree.to_listing().as_deref(), Some("/a\n/a/b\n/a/b/f.txt\n"));
//! # Ok::<(), filetree::FileTreeError>(())
//! ```
//!
//! The tree is single-threaded; callers sharing one across threads must
//! serialize access themselves.

#![allow(clippy::enum_variant_names)]

pub mod checker;
pub mod node;
pub mod path;
pub mod tree;

pub use node::{NodeId, NodeKind};
pub use tree::{CheckMode, ErrorKind, FileTree, FileTreeError, Stat, TreeOptions};
