use std::cmp::Ordering;

/// Handle of a node inside a [`NodeStore`](super::NodeStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display("#{_0}")]
pub struct NodeId(pub(crate) usize);

/// Represents the type of a tree node.
///
/// The variant order is significant: files sort before directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum NodeKind {
    #[display("file")]
    File,
    #[display("directory")]
    Directory,
}

/// Sort key of a node: kind first, then byte-wise path order.
///
/// Searching a directory only needs a key, never a real node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryKey<'a> {
    pub kind: NodeKind,
    pub path: &'a str,
}

impl<'a> EntryKey<'a> {
    pub fn new(path: &'a str, kind: NodeKind) -> Self {
        Self { kind, path }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeBody {
    Directory { children: Vec<NodeId> },
    File { contents: Vec<u8> },
}

/// One entry of the tree: a directory or a file.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{path}")]
pub struct Node {
    pub(crate) path: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) body: NodeBody,
}

impl Node {
    pub(crate) fn new(path: String, kind: NodeKind) -> Self {
        let body = match kind {
            NodeKind::Directory => NodeBody::Directory {
                children: Vec::new(),
            },
            NodeKind::File => NodeBody::File {
                contents: Vec::new(),
            },
        };
        Self {
            path,
            parent: None,
            body,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Directory { .. } => NodeKind::Directory,
            NodeBody::File { .. } => NodeKind::File,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind() == NodeKind::File
    }

    pub fn key(&self) -> EntryKey<'_> {
        EntryKey::new(&self.path, self.kind())
    }

    /// Children in sorted order; empty for files.
    pub fn children(&self) -> &[NodeId] {
        match &self.body {
            NodeBody::Directory { children } => children,
            NodeBody::File { .. } => &[],
        }
    }

    pub fn num_children(&self) -> usize {
        self.children().len()
    }

    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children().get(index).copied()
    }

    pub fn file_contents(&self) -> Option<&[u8]> {
        match &self.body {
            NodeBody::File { contents } => Some(contents),
            NodeBody::Directory { .. } => None,
        }
    }

    pub fn file_length(&self) -> Option<usize> {
        self.file_contents().map(<[u8]>::len)
    }

    /// Stores `contents` on a file node and hands back what was there.
    /// Directories are left untouched and get `None`.
    pub fn insert_file_contents(&mut self, contents: Vec<u8>) -> Option<Vec<u8>> {
        match &mut self.body {
            NodeBody::File { contents: current } => Some(std::mem::replace(current, contents)),
            NodeBody::Directory { .. } => None,
        }
    }

    pub fn compare(&self, other: &Node) -> Ordering {
        self.key().cmp(&other.key())
    }
}
