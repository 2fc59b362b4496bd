//! Read-only view of the tree shape for external renderers

use serde::Serialize;

use super::{BPlusTree, BPlusTreeResult, Node, NodeId, TreeStats};

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeSnapshot<'a, K> {
    Internal {
        id: NodeId,
        keys: &'a [K],
        children: Vec<NodeSnapshot<'a, K>>,
    },
    Leaf {
        id: NodeId,
        keys: &'a [K],
        prev: Option<NodeId>,
        next: Option<NodeId>,
    },
}

impl<K> NodeSnapshot<'_, K> {
    pub fn keys(&self) -> &[K] {
        match self {
            NodeSnapshot::Internal { keys, .. } | NodeSnapshot::Leaf { keys, .. } => keys,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TreeSnapshot<'a, K> {
    pub order: usize,
    pub minimum: usize,
    pub depth: usize,
    pub len: usize,
    pub stats: TreeStats,
    pub root: NodeSnapshot<'a, K>,
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Capture the current shape, borrowing keys from the tree
    pub fn snapshot(&self) -> BPlusTreeResult<TreeSnapshot<'_, K>> {
        Ok(TreeSnapshot {
            order: self.maximum,
            minimum: self.minimum,
            depth: self.depth,
            len: self.entry_count,
            stats: self.stats,
            root: self.snapshot_node(self.root)?,
        })
    }

    fn snapshot_node(&self, id: NodeId) -> BPlusTreeResult<NodeSnapshot<'_, K>> {
        Ok(match self.node(id)? {
            Node::Internal(node) => NodeSnapshot::Internal {
                id,
                keys: &node.keys,
                children: node
                    .children
                    .iter()
                    .map(|&child| self.snapshot_node(child))
                    .collect::<BPlusTreeResult<Vec<_>>>()?,
            },
            Node::Leaf(leaf) => NodeSnapshot::Leaf {
                id,
                keys: &leaf.keys,
                prev: leaf.prev,
                next: leaf.next,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_single_leaf() {
        let mut tree = BPlusTree::new(4);
        tree.insert(2, "b").unwrap();
        tree.insert(1, "a").unwrap();

        let value = serde_json::to_value(tree.snapshot().unwrap()).unwrap();

        assert_eq!(value["depth"], json!(0));
        assert_eq!(value["len"], json!(2));
        assert_eq!(value["root"]["kind"], json!("leaf"));
        assert_eq!(value["root"]["keys"], json!([1, 2]));
        assert_eq!(value["root"]["next"], json!(null));
    }

    #[test]
    fn test_snapshot_mirrors_structure() {
        let mut tree = BPlusTree::new(2);
        for i in 1..=3 {
            tree.insert(i, ()).unwrap();
        }

        let snapshot = tree.snapshot().unwrap();
        match &snapshot.root {
            NodeSnapshot::Internal { keys, children, .. } => {
                assert_eq!(*keys, &[2]);
                assert_eq!(children.len(), 2);
                assert_eq!(children[0].keys(), &[1]);
                assert_eq!(children[1].keys(), &[2, 3]);
            }
            NodeSnapshot::Leaf { .. } => panic!("expected an internal root"),
        }

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["root"]["kind"], json!("internal"));
        assert_eq!(value["stats"]["splits"], json!(1));
    }
}
