use snafu::Snafu;

use crate::node::NodeError;
use crate::path::PathError;

/// Coarse classification of a [`FileTreeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ErrorKind {
    #[display("initialization error")]
    Initialization,
    #[display("already in tree")]
    AlreadyInTree,
    #[display("conflicting path")]
    ConflictingPath,
    #[display("not found")]
    NotFound,
    #[display("parent/child mismatch")]
    ParentChildMismatch,
    #[display("allocation failure")]
    AllocationFailure,
    #[display("bad path")]
    BadPath,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FileTreeError {
    #[snafu(display("The file tree is not initialized"))]
    NotInitializedError,
    #[snafu(display("The file tree is already initialized"))]
    AlreadyInitializedError,
    #[snafu(display("'{}' is already in the tree", path))]
    AlreadyInTreeError { path: String },
    #[snafu(display("'{}' does not share the root '{}'", path, root))]
    ConflictingPathError { path: String, root: String },
    #[snafu(display("No node at '{}'", path))]
    NotFoundError { path: String },
    #[snafu(display("Failed to link nodes"))]
    ParentChildMismatchError { source: NodeError },
    #[snafu(display("Failed to allocate nodes"))]
    AllocationError { source: NodeError },
    #[snafu(display("Invalid path"))]
    BadPathError { source: PathError },
}

impl FileTreeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileTreeError::NotInitializedError | FileTreeError::AlreadyInitializedError => {
                ErrorKind::Initialization
            }
            FileTreeError::AlreadyInTreeError { .. } => ErrorKind::AlreadyInTree,
            FileTreeError::ConflictingPathError { .. } => ErrorKind::ConflictingPath,
            FileTreeError::NotFoundError { .. } => ErrorKind::NotFound,
            FileTreeError::ParentChildMismatchError { .. } => ErrorKind::ParentChildMismatch,
            FileTreeError::AllocationError { .. } => ErrorKind::AllocationFailure,
            FileTreeError::BadPathError { .. } => ErrorKind::BadPath,
        }
    }
}

impl From<NodeError> for FileTreeError {
    fn from(source: NodeError) -> Self {
        match source {
            NodeError::AlreadyInTreeError { path } => FileTreeError::AlreadyInTreeError { path },
            NodeError::OutOfMemoryError { .. } | NodeError::NodeLimitReachedError { .. } => {
                FileTreeError::AllocationError { source }
            }
            NodeError::ParentChildMismatchError { .. }
            | NodeError::NotADirectoryError { .. }
            | NodeError::UnknownNodeError { .. } => {
                FileTreeError::ParentChildMismatchError { source }
            }
        }
    }
}
