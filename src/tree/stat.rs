use crate::node::{Node, NodeKind};

/// What `stat` reports about a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Directory,
    File { length: usize },
}

impl Stat {
    pub fn kind(&self) -> NodeKind {
        match self {
            Stat::Directory => NodeKind::Directory,
            Stat::File { .. } => NodeKind::File,
        }
    }

    /// Content length for files, `None` for directories.
    pub fn length(&self) -> Option<usize> {
        match self {
            Stat::Directory => None,
            Stat::File { length } => Some(*length),
        }
    }
}

impl From<&Node> for Stat {
    fn from(node: &Node) -> Self {
        match node.file_length() {
            Some(length) => Stat::File { length },
            None => Stat::Directory,
        }
    }
}
