use snafu::prelude::*;
use tracing::error;

use crate::node::{NodeId, NodeKind, NodeStore};

const SEPARATOR: char = '/';

/// Checks a single node against its parent and its own children.
///
/// With a parent, the node's path must be the parent's path, one separator
/// and exactly one more segment, and the parent must list the node among
/// its children. With two or more children, each adjacent pair must be
/// strictly increasing (files before directories, then by path) and every
/// child must point back at this node.
pub fn node_is_valid(nodes: &NodeStore, id: NodeId) -> Result<(), InvariantViolation> {
    let node = nodes.get(id).context(MissingNodeSnafu { id })?;
    let path = node.path();

    if let Some(parent_id) = node.parent() {
        let parent = nodes.get(parent_id).context(MissingNodeSnafu { id: parent_id })?;
        let parent_path = parent.path();

        let Some(rest) = path.strip_prefix(parent_path) else {
            return NotAPrefixSnafu {
                parent: parent_path,
                child: path,
            }
            .fail();
        };
        let Some(segment) = rest.strip_prefix(SEPARATOR) else {
            return NotAPrefixSnafu {
                parent: parent_path,
                child: path,
            }
            .fail();
        };
        ensure!(
            !segment.is_empty() && !segment.contains(SEPARATOR),
            GrandchildPathSnafu {
                parent: parent_path,
                child: path,
            }
        );
        ensure!(
            parent.children().contains(&id),
            ParentLinkBrokenSnafu {
                parent: parent_path,
                child: path,
            }
        );
    }

    let children = node.children();
    for child_id in children {
        let child = nodes.get(*child_id).context(MissingNodeSnafu { id: *child_id })?;
        ensure!(
            child.parent() == Some(id),
            ParentLinkBrokenSnafu {
                parent: path,
                child: child.path(),
            }
        );
    }
    if children.len() >= 2 {
        for pair in children.windows(2) {
            let left = nodes.get(pair[0]).context(MissingNodeSnafu { id: pair[0] })?;
            let right = nodes.get(pair[1]).context(MissingNodeSnafu { id: pair[1] })?;
            ensure!(
                sort_key(left.kind(), left.path()) < sort_key(right.kind(), right.path()),
                ChildrenOutOfOrderSnafu {
                    parent: path,
                    left: left.path(),
                    right: right.path(),
                }
            );
        }
    }

    Ok(())
}

fn sort_key(kind: NodeKind, path: &str) -> (u8, &[u8]) {
    let rank = match kind {
        NodeKind::File => 0,
        NodeKind::Directory => 1,
    };
    (rank, path.as_bytes())
}

/// Pre-order walk that stops at the first invalid node.
fn tree_check(nodes: &NodeStore, root: NodeId) -> Result<(), InvariantViolation> {
    let mut pending = vec![root];
    while let Some(id) = pending.pop() {
        node_is_valid(nodes, id)?;
        if let Some(node) = nodes.get(id) {
            pending.extend(node.children().iter().rev());
        }
    }
    Ok(())
}

/// Number of nodes in the hierarchy rooted at `root`, `root` included.
pub fn count_nodes(nodes: &NodeStore, root: Option<NodeId>) -> usize {
    let mut pending: Vec<NodeId> = root.into_iter().collect();
    let mut count = 0;
    while let Some(id) = pending.pop() {
        let Some(node) = nodes.get(id) else {
            continue;
        };
        count += 1;
        pending.extend(node.children());
    }
    count
}

/// Validates the whole tree state, reporting the first broken invariant.
pub fn tree_is_valid(
    initialized: bool,
    root: Option<NodeId>,
    count: usize,
    nodes: &NodeStore,
) -> Result<(), InvariantViolation> {
    let result = check_tree_state(initialized, root, count, nodes);
    if let Err(violation) = &result {
        error!("File tree invariant violated: {violation}");
    }
    result
}

fn check_tree_state(
    initialized: bool,
    root: Option<NodeId>,
    count: usize,
    nodes: &NodeStore,
) -> Result<(), InvariantViolation> {
    if !initialized {
        ensure!(count == 0, UninitializedWithCountSnafu { count });
        ensure!(root.is_none(), UninitializedWithRootSnafu);
    } else {
        ensure!(count != 0 || root.is_none(), EmptyWithRootSnafu);
        ensure!(root.is_some() || count == 0, CountWithoutRootSnafu { count });
    }

    if let Some(root) = root {
        let node = nodes.get(root).context(MissingNodeSnafu { id: root })?;
        ensure!(
            node.parent().is_none(),
            RootHasParentSnafu { path: node.path() }
        );
        let name = node.path().strip_prefix(SEPARATOR).unwrap_or(node.path());
        ensure!(
            !name.is_empty() && !name.contains(SEPARATOR),
            RootPathHasSeparatorSnafu { path: node.path() }
        );
        tree_check(nodes, root)?;
    }

    let reachable = count_nodes(nodes, root);
    ensure!(
        reachable == count,
        CountMismatchSnafu {
            recorded: count,
            reachable,
        }
    );
    ensure!(
        nodes.len() == count,
        LeakedNodesSnafu {
            live: nodes.len(),
            count,
        }
    );
    Ok(())
}

#[derive(Debug, Snafu)]
pub enum InvariantViolation {
    #[snafu(display("Not initialized, but count is {}", count))]
    UninitializedWithCountError { count: usize },
    #[snafu(display("Not initialized, but a root is present"))]
    UninitializedWithRootError,
    #[snafu(display("Initialized with count 0, but a root is present"))]
    EmptyWithRootError,
    #[snafu(display("Initialized without a root, but count is {}", count))]
    CountWithoutRootError { count: usize },
    #[snafu(display("Node {} is referenced but does not exist", id))]
    MissingNodeError { id: NodeId },
    #[snafu(display("Root '{}' has a parent", path))]
    RootHasParentError { path: String },
    #[snafu(display("Root path '{}' must be a single segment", path))]
    RootPathHasSeparatorError { path: String },
    #[snafu(display("Parent path '{}' is not a prefix of child path '{}'", parent, child))]
    NotAPrefixError { parent: String, child: String },
    #[snafu(display("Child path '{}' is a grandchild of parent path '{}'", child, parent))]
    GrandchildPathError { parent: String, child: String },
    #[snafu(display("'{}' and '{}' disagree about being parent and child", parent, child))]
    ParentLinkBrokenError { parent: String, child: String },
    #[snafu(display("Children of '{}' are out of order: '{}' before '{}'", parent, left, right))]
    ChildrenOutOfOrderError {
        parent: String,
        left: String,
        right: String,
    },
    #[snafu(display("Count is {}, but {} nodes are reachable from the root", recorded, reachable))]
    CountMismatchError { recorded: usize, reachable: usize },
    #[snafu(display("{} nodes are alive, but count is {}", live, count))]
    LeakedNodesError { live: usize, count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeBody;

    fn sample() -> (NodeStore, NodeId) {
        let mut nodes = NodeStore::new();
        let root = nodes.create("/a", None, NodeKind::Directory).unwrap();
        let b = nodes.add_child(root, "b", NodeKind::Directory).unwrap();
        nodes.add_child(b, "f.txt", NodeKind::File).unwrap();
        nodes.add_child(root, "c", NodeKind::File).unwrap();
        (nodes, root)
    }

    #[test]
    fn test_well_formed_tree_is_valid() {
        let (nodes, root) = sample();
        assert!(tree_is_valid(true, Some(root), 4, &nodes).is_ok());
        assert_eq!(count_nodes(&nodes, Some(root)), 4);
        assert_eq!(count_nodes(&nodes, None), 0);
    }

    #[test]
    fn test_deep_chain_is_checked_and_counted() {
        let mut nodes = NodeStore::new();
        let root = nodes.create("r", None, NodeKind::Directory).unwrap();
        let mut current = root;
        for _ in 0..20_000 {
            current = nodes.add_child(current, "d", NodeKind::Directory).unwrap();
        }
        assert_eq!(count_nodes(&nodes, Some(root)), 20_001);
        assert!(tree_is_valid(true, Some(root), 20_001, &nodes).is_ok());
    }

    #[test]
    fn test_empty_states_are_valid() {
        let nodes = NodeStore::new();
        assert!(tree_is_valid(false, None, 0, &nodes).is_ok());
        assert!(tree_is_valid(true, None, 0, &nodes).is_ok());
    }

    #[test]
    fn test_uninitialized_state_must_be_empty() {
        let (nodes, root) = sample();
        assert!(matches!(
            tree_is_valid(false, None, 4, &nodes),
            Err(InvariantViolation::UninitializedWithCountError { count: 4 })
        ));
        assert!(matches!(
            tree_is_valid(false, Some(root), 0, &nodes),
            Err(InvariantViolation::UninitializedWithRootError)
        ));
    }

    #[test]
    fn test_root_and_count_must_agree() {
        let (nodes, root) = sample();
        assert!(matches!(
            tree_is_valid(true, Some(root), 0, &nodes),
            Err(InvariantViolation::EmptyWithRootError)
        ));
        assert!(matches!(
            tree_is_valid(true, None, 3, &nodes),
            Err(InvariantViolation::CountWithoutRootError { count: 3 })
        ));
        assert!(matches!(
            tree_is_valid(true, Some(root), 3, &nodes),
            Err(InvariantViolation::CountMismatchError {
                recorded: 3,
                reachable: 4
            })
        ));
    }

    #[test]
    fn test_unlinked_nodes_count_as_leaks() {
        let (mut nodes, root) = sample();
        nodes.create("stray", Some(root), NodeKind::File).unwrap();
        assert!(matches!(
            tree_is_valid(true, Some(root), 4, &nodes),
            Err(InvariantViolation::LeakedNodesError { live: 5, count: 4 })
        ));
    }

    #[test]
    fn test_root_path_must_be_single_segment() {
        let mut nodes = NodeStore::new();
        let root = nodes.create("/a/b", None, NodeKind::Directory).unwrap();
        assert!(matches!(
            tree_is_valid(true, Some(root), 1, &nodes),
            Err(InvariantViolation::RootPathHasSeparatorError { .. })
        ));
    }

    #[test]
    fn test_corrupted_path_is_detected() {
        let (mut nodes, root) = sample();
        let c = nodes.get(root).unwrap().child(0).unwrap();
        nodes.get_mut(c).unwrap().path = "/a/x/c".to_string();
        assert!(matches!(
            node_is_valid(&nodes, c),
            Err(InvariantViolation::GrandchildPathError { .. })
        ));

        nodes.get_mut(c).unwrap().path = "/z/c".to_string();
        assert!(matches!(
            tree_is_valid(true, Some(root), 4, &nodes),
            Err(InvariantViolation::NotAPrefixError { .. })
        ));
    }

    #[test]
    fn test_out_of_order_children_are_detected() {
        let (mut nodes, root) = sample();
        let (first, second) = {
            let node = nodes.get(root).unwrap();
            (node.child(0).unwrap(), node.child(1).unwrap())
        };
        if let NodeBody::Directory { children } = &mut nodes.get_mut(root).unwrap().body {
            children.swap(0, 1);
        }
        assert_ne!(first, second);
        assert!(matches!(
            tree_is_valid(true, Some(root), 4, &nodes),
            Err(InvariantViolation::ChildrenOutOfOrderError { .. })
        ));
    }

    #[test]
    fn test_broken_back_reference_is_detected() {
        let (mut nodes, root) = sample();
        let b = nodes.get(root).unwrap().child(1).unwrap();
        let f = nodes.get(b).unwrap().child(0).unwrap();
        nodes.get_mut(f).unwrap().parent = Some(root);
        assert!(tree_is_valid(true, Some(root), 4, &nodes).is_err());
    }
}
