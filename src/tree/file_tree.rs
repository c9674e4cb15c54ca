use snafu::prelude::*;
use tracing::{debug, warn};

use super::error::{
    AlreadyInTreeSnafu, AlreadyInitializedSnafu, BadPathSnafu, ConflictingPathSnafu,
    FileTreeError, NotFoundSnafu, NotInitializedSnafu,
};
use super::options::TreeOptions;
use super::stat::Stat;
use crate::checker::{self, InvariantViolation};
use crate::node::{Node, NodeError, NodeId, NodeKind, NodeStore};
use crate::path::{SEPARATOR, TreePath};

/// A rooted hierarchy of directories and files addressed by path.
///
/// The tree starts uninitialized. [`init`](Self::init) makes it usable and
/// empty, [`destroy`](Self::destroy) frees every node and returns it to the
/// uninitialized state. Mutators fail with
/// [`FileTreeError::NotInitializedError`] outside that window and never leave a
/// partially inserted path behind.
///
/// Depending on [`TreeOptions::check_mode`], every public operation is
/// bracketed by the invariant checker, and a violation panics.
#[derive(Debug, Default)]
pub struct FileTree {
    options: TreeOptions,
    initialized: bool,
    root: Option<NodeId>,
    count: usize,
    nodes: NodeStore,
}

impl FileTree {
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    pub fn with_options(options: TreeOptions) -> Self {
        Self {
            nodes: NodeStore::with_limit(options.node_limit),
            options,
            initialized: false,
            root: None,
            count: 0,
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Read access to the nodes, for walking the hierarchy by id.
    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn init(&mut self) -> Result<(), FileTreeError> {
        self.checked("init", |tree| {
            ensure!(!tree.initialized, AlreadyInitializedSnafu);
            tree.initialized = true;
            tree.root = None;
            tree.count = 0;
            debug!("Initialized file tree");
            Ok(())
        })
    }

    pub fn destroy(&mut self) -> Result<(), FileTreeError> {
        self.checked("destroy", |tree| {
            ensure!(tree.initialized, NotInitializedSnafu);
            if let Some(root) = tree.root.take() {
                let freed = tree.nodes.destroy(root);
                tree.count = tree.count.saturating_sub(freed);
                debug!("Destroyed {freed} node(s)");
            }
            tree.initialized = false;
            Ok(())
        })
    }

    /// Inserts a directory at `path`, creating any missing ancestors.
    pub fn insert_dir(&mut self, path: &str) -> Result<(), FileTreeError> {
        self.checked("insert_dir", |tree| {
            tree.insert(path, NodeKind::Directory).map(|_| ())
        })
    }

    /// Inserts a file at `path` holding `contents`, creating any missing
    /// ancestor directories. The buffer is moved in, not copied.
    pub fn insert_file(
        &mut self,
        path: &str,
        contents: impl Into<Vec<u8>>,
    ) -> Result<(), FileTreeError> {
        self.checked("insert_file", |tree| {
            let leaf = tree.insert(path, NodeKind::File)?;
            if let Some(node) = tree.nodes.get_mut(leaf) {
                node.insert_file_contents(contents.into());
            }
            Ok(())
        })
    }

    pub fn contains_dir(&self, path: &str) -> bool {
        self.contains(path, NodeKind::Directory)
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.contains(path, NodeKind::File)
    }

    /// Removes the directory at `path` together with everything below it.
    pub fn rm_dir(&mut self, path: &str) -> Result<(), FileTreeError> {
        self.checked("rm_dir", |tree| tree.remove(path, NodeKind::Directory))
    }

    pub fn rm_file(&mut self, path: &str) -> Result<(), FileTreeError> {
        self.checked("rm_file", |tree| tree.remove(path, NodeKind::File))
    }

    /// Contents of the file at `path`; `None` if absent, a directory, or the
    /// tree is not initialized.
    pub fn file_contents(&self, path: &str) -> Option<&[u8]> {
        self.verify("file_contents");
        self.find(path)?.file_contents()
    }

    /// Swaps in `contents` for the file at `path` and hands back the previous
    /// buffer. Directories, missing paths and an uninitialized tree are left
    /// alone and yield `None`.
    pub fn replace_file_contents(
        &mut self,
        path: &str,
        contents: impl Into<Vec<u8>>,
    ) -> Option<Vec<u8>> {
        self.checked("replace_file_contents", |tree| {
            let id = tree.locate(path)?;
            let previous = tree.nodes.get_mut(id)?.insert_file_contents(contents.into());
            if previous.is_some() {
                debug!("Replaced contents of {path}");
            }
            previous
        })
    }

    pub fn stat(&self, path: &str) -> Result<Stat, FileTreeError> {
        self.verify("stat");
        ensure!(self.initialized, NotInitializedSnafu);
        TreePath::parse(path).context(BadPathSnafu)?;
        let node = self.find(path).context(NotFoundSnafu { path })?;
        Ok(Stat::from(node))
    }

    /// Every path in the tree, one per line in pre-order, each line ending in
    /// a newline. `None` if the tree is not initialized or the buffer cannot
    /// be allocated.
    pub fn to_listing(&self) -> Option<String> {
        self.verify("to_listing");
        if !self.initialized {
            return None;
        }

        let mut paths: Vec<&str> = Vec::new();
        if let Err(e) = paths.try_reserve_exact(self.count) {
            warn!("Failed to reserve listing index: {e}");
            return None;
        }
        self.collect_preorder(self.root, &mut paths);

        let total: usize = paths.iter().map(|path| path.len() + 1).sum();
        let mut listing = String::new();
        if let Err(e) = listing.try_reserve_exact(total) {
            warn!("Failed to reserve {total} bytes for listing: {e}");
            return None;
        }
        for path in paths {
            listing.push_str(path);
            listing.push('\n');
        }
        Some(listing)
    }

    /// Runs the invariant checker over the current state.
    pub fn check(&self) -> Result<(), InvariantViolation> {
        checker::tree_is_valid(self.initialized, self.root, self.count, &self.nodes)
    }

    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    fn checked<T>(&mut self, operation: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.verify(operation);
        let result = f(self);
        self.verify(operation);
        result
    }

    fn verify(&self, operation: &str) {
        if !self.options.check_mode.is_active() {
            return;
        }
        if let Err(violation) = self.check() {
            panic!("File tree invariant violated around {operation}: {violation}");
        }
    }

    /// The farthest node on the way from the root down to `path`: the node at
    /// `path` itself, or its deepest existing ancestor. `None` when even the
    /// root is not on the way.
    fn traverse_path(&self, path: TreePath<'_>) -> Option<NodeId> {
        let mut current = self.root?;
        loop {
            let node = self.nodes.get(current)?;
            if node.path() == path.as_str() {
                return Some(current);
            }
            let step = path.next_step_below(node.path())?;
            if !node.is_dir() {
                return Some(current);
            }
            match self.nodes.find_child(current, step) {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }

    fn locate(&self, path: &str) -> Option<NodeId> {
        if !self.initialized {
            return None;
        }
        let tree_path = TreePath::parse(path).ok()?;
        self.traverse_path(tree_path)
            .filter(|id| self.nodes.path(*id) == Some(path))
    }

    fn find(&self, path: &str) -> Option<&Node> {
        self.locate(path).and_then(|id| self.nodes.get(id))
    }

    fn contains(&self, path: &str, kind: NodeKind) -> bool {
        self.verify("contains");
        self.find(path).is_some_and(|node| node.kind() == kind)
    }

    fn insert(&mut self, path: &str, kind: NodeKind) -> Result<NodeId, FileTreeError> {
        ensure!(self.initialized, NotInitializedSnafu);
        let tree_path = TreePath::parse(path).context(BadPathSnafu)?;
        let parent = self.traverse_path(tree_path);

        let result = self.insert_rest_of_path(tree_path, parent, kind);
        match &result {
            Ok(_) => debug!("Inserted {kind} {path}, tree now holds {} node(s)", self.count),
            Err(
                e @ (FileTreeError::AllocationError { .. }
                | FileTreeError::ParentChildMismatchError { .. }),
            ) => warn!("Failed to insert {kind} {path}: {e}"),
            Err(e) => debug!("Rejected insert of {kind} {path}: {e}"),
        }
        result
    }

    /// Creates the nodes of `path` missing below `parent` and links them in.
    ///
    /// The whole chain is built first and linked to `parent` in one step, so
    /// any failure destroys every node created here and leaves the tree as it
    /// was. Without a `parent` the chain becomes the root, which requires the
    /// tree to be empty. Returns the node created for `path` itself.
    fn insert_rest_of_path(
        &mut self,
        path: TreePath<'_>,
        parent: Option<NodeId>,
        kind: NodeKind,
    ) -> Result<NodeId, FileTreeError> {
        let (lead, below) = match parent {
            None => {
                if let Some(root) = self.root {
                    return ConflictingPathSnafu {
                        path: path.as_str(),
                        root: self.nodes.path(root).unwrap_or_default(),
                    }
                    .fail();
                }
                let root_name = path.root_component();
                (Some(root_name), path.remainder_below(root_name))
            }
            Some(parent) => {
                let parent_node = self
                    .nodes
                    .get(parent)
                    .ok_or(NodeError::UnknownNodeError { id: parent })?;
                ensure!(
                    parent_node.path() != path.as_str(),
                    AlreadyInTreeSnafu {
                        path: path.as_str()
                    }
                );
                if !parent_node.is_dir() {
                    return Err(NodeError::NotADirectoryError {
                        path: parent_node.path().to_string(),
                    }
                    .into());
                }
                let rest = path.remainder_below(parent_node.path()).ok_or_else(|| {
                    NodeError::ParentChildMismatchError {
                        parent: parent_node.path().to_string(),
                        child: path.as_str().to_string(),
                    }
                })?;
                (None, Some(rest))
            }
        };

        let mut names = lead
            .into_iter()
            .chain(below.into_iter().flat_map(|rest| rest.split(SEPARATOR)))
            .peekable();
        let mut first_new = None;
        let mut current = parent;
        let mut created = 0;

        while let Some(name) = names.next() {
            let node_kind = if names.peek().is_some() {
                NodeKind::Directory
            } else {
                kind
            };
            let new = match self.nodes.create(name, current, node_kind) {
                Ok(id) => id,
                Err(e) => {
                    self.discard_chain(first_new);
                    return Err(e.into());
                }
            };
            created += 1;

            match (first_new, current) {
                (Some(_), Some(link_parent)) => {
                    if let Err(e) = self.nodes.link_child(link_parent, new) {
                        self.nodes.destroy(new);
                        self.discard_chain(first_new);
                        return Err(e.into());
                    }
                }
                _ => first_new = Some(new),
            }
            current = Some(new);
        }

        let (Some(first), Some(last)) = (first_new, current) else {
            return AlreadyInTreeSnafu {
                path: path.as_str(),
            }
            .fail();
        };

        match parent {
            None => {
                self.root = Some(first);
                self.count = created;
            }
            Some(parent) => {
                if let Err(e) = self.nodes.link_child(parent, first) {
                    self.discard_chain(Some(first));
                    return Err(e.into());
                }
                self.count += created;
            }
        }
        Ok(last)
    }

    fn discard_chain(&mut self, first: Option<NodeId>) {
        if let Some(first) = first {
            let freed = self.nodes.destroy(first);
            debug!("Discarded {freed} partially inserted node(s)");
        }
    }

    fn remove(&mut self, path: &str, kind: NodeKind) -> Result<(), FileTreeError> {
        ensure!(self.initialized, NotInitializedSnafu);
        TreePath::parse(path).context(BadPathSnafu)?;
        let id = self.locate(path).context(NotFoundSnafu { path })?;
        let node = self
            .nodes
            .get(id)
            .filter(|node| node.kind() == kind)
            .context(NotFoundSnafu { path })?;

        match node.parent() {
            Some(parent) => self.nodes.unlink_child(parent, id)?,
            None => self.root = None,
        }
        let freed = self.nodes.destroy(id);
        self.count = self.count.saturating_sub(freed);
        debug!(
            "Removed {kind} {path} and {} node(s) below it",
            freed.saturating_sub(1)
        );
        Ok(())
    }

    fn collect_preorder<'a>(&'a self, root: Option<NodeId>, paths: &mut Vec<&'a str>) {
        let mut pending: Vec<NodeId> = root.into_iter().collect();
        while let Some(id) = pending.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            paths.push(node.path());
            pending.extend(node.children().iter().rev());
        }
    }
}
