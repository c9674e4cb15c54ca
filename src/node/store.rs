use std::collections::TryReserveError;

use snafu::prelude::*;
use tracing::debug;

use super::{EntryKey, Node, NodeBody, NodeId, NodeKind};
use crate::path::{SEPARATOR, is_direct_child};

/// Arena that owns every node of a tree.
///
/// Ownership runs from a directory to the ids in its `children`; a node's
/// `parent` is a plain back-reference. Destroying a node frees its whole
/// subtree. A node that was created but never linked stays owned by the
/// store until someone destroys it.
#[derive(Debug, Default)]
pub struct NodeStore {
    slots: Vec<Option<Node>>,
    vacant: Vec<usize>,
    live: usize,
    limit: Option<usize>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses to hold more than `limit` live nodes.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Number of live nodes, linked or not.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn path(&self, id: NodeId) -> Option<&str> {
        self.get(id).map(Node::path)
    }

    /// Creates an unlinked node named `name` below `parent`.
    ///
    /// The path is `parent`'s path, a separator and `name`, or just `name`
    /// without a parent. `parent` is not changed; linking is a separate step
    /// so a chain of new nodes can be discarded as a whole.
    pub fn create(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        kind: NodeKind,
    ) -> Result<NodeId, NodeError> {
        if let Some(limit) = self.limit {
            ensure!(self.live < limit, NodeLimitReachedSnafu { limit });
        }

        let parent_path = match parent {
            Some(id) => Some(self.path(id).context(UnknownNodeSnafu { id })?),
            None => None,
        };
        let mut path = String::new();
        let length = parent_path.map_or(0, |p| p.len() + 1) + name.len();
        path.try_reserve_exact(length).context(OutOfMemorySnafu)?;
        if let Some(parent_path) = parent_path {
            path.push_str(parent_path);
            path.push(SEPARATOR);
        }
        path.push_str(name);

        self.allocate(Node::new(path, kind))
    }

    fn allocate(&mut self, node: Node) -> Result<NodeId, NodeError> {
        let index = match self.vacant.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                index
            }
            None => {
                self.slots.try_reserve(1).context(OutOfMemorySnafu)?;
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.live += 1;
        Ok(NodeId(index))
    }

    /// Destroys `id` and everything below it, returning how many nodes were
    /// freed. Unknown ids free nothing. Walks with an explicit stack, so deep
    /// chains never recurse.
    pub fn destroy(&mut self, id: NodeId) -> usize {
        let mut pending = vec![id];
        let mut freed = 0;
        while let Some(id) = pending.pop() {
            let Some(node) = self.slots.get_mut(id.0).and_then(Option::take) else {
                continue;
            };
            if let NodeBody::Directory { children } = node.body {
                pending.extend(children);
            }
            self.live -= 1;
            self.vacant.push(id.0);
            freed += 1;
        }
        freed
    }

    /// Binary search of `parent`'s children for a `(path, kind)` key.
    ///
    /// `Ok` carries the index of the match, `Err` the index where such a
    /// child would be inserted. Files and unknown ids have no children.
    pub fn search_child(
        &self,
        parent: NodeId,
        path: &str,
        kind: NodeKind,
    ) -> Result<usize, usize> {
        let Some(node) = self.get(parent) else {
            return Err(0);
        };
        let key = EntryKey::new(path, kind);
        node.children()
            .binary_search_by(|id| self.get(*id).map(Node::key).cmp(&Some(key)))
    }

    pub fn has_child(&self, parent: NodeId, path: &str, kind: NodeKind) -> bool {
        self.search_child(parent, path, kind).is_ok()
    }

    /// The child of `parent` at exactly `path`, whatever its kind.
    pub fn find_child(&self, parent: NodeId, path: &str) -> Option<NodeId> {
        let node = self.get(parent)?;
        [NodeKind::File, NodeKind::Directory]
            .into_iter()
            .find_map(|kind| self.search_child(parent, path, kind).ok())
            .and_then(|index| node.child(index))
    }

    /// Links `child` into `parent`'s sorted children.
    ///
    /// On failure nothing changes and `child` is left for the caller to
    /// destroy.
    pub fn link_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        let parent_node = self.get(parent).context(UnknownNodeSnafu { id: parent })?;
        let child_node = self.get(child).context(UnknownNodeSnafu { id: child })?;

        ensure!(
            parent_node.is_dir(),
            NotADirectorySnafu {
                path: parent_node.path()
            }
        );
        ensure!(
            is_direct_child(parent_node.path(), child_node.path()),
            ParentChildMismatchSnafu {
                parent: parent_node.path(),
                child: child_node.path(),
            }
        );
        ensure!(
            self.find_child(parent, child_node.path()).is_none(),
            AlreadyInTreeSnafu {
                path: child_node.path()
            }
        );
        let index = self
            .search_child(parent, child_node.path(), child_node.kind())
            .unwrap_or_else(|index| index);

        if let Some(NodeBody::Directory { children }) =
            self.get_mut(parent).map(|node| &mut node.body)
        {
            children.try_reserve(1).context(OutOfMemorySnafu)?;
            children.insert(index, child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Removes `child` from `parent`'s children without destroying it.
    pub fn unlink_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        let parent_path = self.path(parent).context(UnknownNodeSnafu { id: parent })?;
        let child_node = self.get(child).context(UnknownNodeSnafu { id: child })?;
        let mismatch = ParentChildMismatchSnafu {
            parent: parent_path,
            child: child_node.path(),
        };

        let index = match self.search_child(parent, child_node.path(), child_node.kind()) {
            Ok(index) if self.get(parent).and_then(|p| p.child(index)) == Some(child) => index,
            _ => return mismatch.fail(),
        };

        if let Some(NodeBody::Directory { children }) =
            self.get_mut(parent).map(|node| &mut node.body)
        {
            children.remove(index);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = None;
        }
        Ok(())
    }

    /// Creates a node named `name` and links it below `parent` in one step,
    /// destroying it again if linking fails.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
    ) -> Result<NodeId, NodeError> {
        let child = self.create(name, Some(parent), kind)?;
        if let Err(e) = self.link_child(parent, child) {
            let freed = self.destroy(child);
            debug!("Discarded {freed} unlinked node(s) after failed link: {e}");
            return Err(e);
        }
        Ok(child)
    }
}

#[derive(Debug, Snafu)]
pub enum NodeError {
    #[snafu(display("A node with path '{}' is already in the tree", path))]
    AlreadyInTreeError { path: String },
    #[snafu(display("'{}' is not a direct child path of '{}'", child, parent))]
    ParentChildMismatchError { parent: String, child: String },
    #[snafu(display("'{}' is a file and cannot hold children", path))]
    NotADirectoryError { path: String },
    #[snafu(display("No live node with id {}", id))]
    UnknownNodeError { id: NodeId },
    #[snafu(display("Failed to reserve memory for a node"))]
    OutOfMemoryError { source: TryReserveError },
    #[snafu(display("Node limit of {} reached", limit))]
    NodeLimitReachedError { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_root() -> (NodeStore, NodeId) {
        let mut store = NodeStore::new();
        let root = store
            .create("/a", None, NodeKind::Directory)
            .expect("root should be created");
        (store, root)
    }

    #[test]
    fn test_create_builds_path_without_linking() {
        let (mut store, root) = store_with_root();
        let child = store.create("b", Some(root), NodeKind::File).unwrap();

        assert_eq!(store.path(child), Some("/a/b"));
        assert_eq!(store.get(child).unwrap().parent(), None);
        assert_eq!(store.get(root).unwrap().num_children(), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_link_child_keeps_children_sorted() {
        let (mut store, root) = store_with_root();
        let names = [
            ("d", NodeKind::Directory),
            ("z", NodeKind::File),
            ("b", NodeKind::Directory),
            ("c", NodeKind::File),
        ];
        for (name, kind) in names {
            store.add_child(root, name, kind).unwrap();
        }

        let root_node = store.get(root).unwrap();
        let paths: Vec<_> = root_node
            .children()
            .iter()
            .map(|id| store.path(*id).unwrap())
            .collect();
        assert_eq!(paths, ["/a/c", "/a/z", "/a/b", "/a/d"]);
        for id in root_node.children() {
            assert_eq!(store.get(*id).unwrap().parent(), Some(root));
        }
    }

    #[test]
    fn test_link_child_rejects_duplicate_path_of_either_kind() {
        let (mut store, root) = store_with_root();
        store.add_child(root, "b", NodeKind::File).unwrap();

        let duplicate = store.create("b", Some(root), NodeKind::Directory).unwrap();
        let result = store.link_child(root, duplicate);
        assert!(matches!(result, Err(NodeError::AlreadyInTreeError { .. })));
        assert_eq!(store.get(root).unwrap().num_children(), 1);

        // Rejected nodes are the caller's to destroy.
        assert_eq!(store.destroy(duplicate), 1);
        assert_eq!(store.len(), 2);

        let same_kind = store.create("b", Some(root), NodeKind::File).unwrap();
        let result = store.link_child(root, same_kind);
        assert!(matches!(result, Err(NodeError::AlreadyInTreeError { .. })));
        assert_eq!(store.get(root).unwrap().num_children(), 1);
    }

    #[test]
    fn test_link_child_rejects_grandchild_paths() {
        let (mut store, root) = store_with_root();
        let b = store.create("b", Some(root), NodeKind::Directory).unwrap();
        let c = store.create("c", Some(b), NodeKind::File).unwrap();

        let result = store.link_child(root, c);
        assert!(matches!(
            result,
            Err(NodeError::ParentChildMismatchError { .. })
        ));
    }

    #[test]
    fn test_link_child_rejects_file_parent() {
        let (mut store, root) = store_with_root();
        let file = store.add_child(root, "f", NodeKind::File).unwrap();
        let below = store.create("x", Some(file), NodeKind::File).unwrap();

        let result = store.link_child(file, below);
        assert!(matches!(result, Err(NodeError::NotADirectoryError { .. })));
    }

    #[test]
    fn test_search_child_reports_insertion_point() {
        let (mut store, root) = store_with_root();
        store.add_child(root, "b", NodeKind::File).unwrap();
        store.add_child(root, "d", NodeKind::File).unwrap();

        assert_eq!(store.search_child(root, "/a/b", NodeKind::File), Ok(0));
        assert_eq!(store.search_child(root, "/a/c", NodeKind::File), Err(1));
        assert_eq!(store.search_child(root, "/a/a", NodeKind::Directory), Err(2));
        assert!(!store.has_child(root, "/a/b", NodeKind::Directory));
    }

    #[test]
    fn test_unlink_child_detaches_without_destroying() {
        let (mut store, root) = store_with_root();
        let b = store.add_child(root, "b", NodeKind::Directory).unwrap();

        store.unlink_child(root, b).unwrap();
        assert_eq!(store.get(root).unwrap().num_children(), 0);
        assert_eq!(store.get(b).unwrap().parent(), None);
        assert_eq!(store.len(), 2);

        let result = store.unlink_child(root, b);
        assert!(matches!(
            result,
            Err(NodeError::ParentChildMismatchError { .. })
        ));
    }

    #[test]
    fn test_destroy_frees_whole_subtree_and_reuses_slots() {
        let (mut store, root) = store_with_root();
        let b = store.add_child(root, "b", NodeKind::Directory).unwrap();
        store.add_child(b, "c", NodeKind::File).unwrap();
        store.add_child(b, "d", NodeKind::Directory).unwrap();

        assert_eq!(store.destroy(root), 4);
        assert!(store.is_empty());
        assert_eq!(store.destroy(root), 0);

        let again = store.create("x", None, NodeKind::Directory).unwrap();
        assert_eq!(store.path(again), Some("x"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_destroy_handles_chains_deeper_than_the_call_stack() {
        let (mut store, root) = store_with_root();
        let mut current = root;
        for _ in 0..20_000 {
            current = store.add_child(current, "d", NodeKind::Directory).unwrap();
        }
        assert_eq!(store.len(), 20_001);

        assert_eq!(store.destroy(root), 20_001);
        assert!(store.is_empty());
    }

    #[test]
    fn test_node_limit_is_enforced() {
        let mut store = NodeStore::with_limit(Some(1));
        let root = store.create("a", None, NodeKind::Directory).unwrap();
        let result = store.create("b", Some(root), NodeKind::File);
        assert!(matches!(
            result,
            Err(NodeError::NodeLimitReachedError { limit: 1 })
        ));
        assert_eq!(store.len(), 1);
    }
}
