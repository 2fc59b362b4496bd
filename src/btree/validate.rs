//! Structural invariant checks
//!
//! Walks the whole tree and reports the first broken invariant as
//! [`BPlusTreeError::InvalidState`]. Linear in the number of entries, so it is
//! meant for tests and diagnostics rather than the hot path.

use super::{BPlusTree, BPlusTreeError, BPlusTreeResult, Node, NodeId};

fn invalid<T>(msg: String) -> BPlusTreeResult<T> {
    Err(BPlusTreeError::InvalidState(msg))
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Check every structural invariant of the tree
    pub fn validate(&self) -> BPlusTreeResult<()> {
        if self.node(self.root)?.parent().is_some() {
            return invalid(format!("root {} has a parent", self.root));
        }

        let mut leaves = Vec::new();
        self.validate_node(self.root, None, None, None, 0, &mut leaves)?;

        self.validate_leaf_list(&leaves)
    }

    fn validate_node(
        &self,
        id: NodeId,
        parent: Option<NodeId>,
        lower: Option<&K>,
        upper: Option<&K>,
        level: usize,
        leaves: &mut Vec<NodeId>,
    ) -> BPlusTreeResult<()> {
        let node = self.node(id)?;
        let is_root = id == self.root;

        if node.parent() != parent {
            return invalid(format!(
                "node {} points at parent {:?}, expected {:?}",
                id,
                node.parent(),
                parent
            ));
        }

        let count = node.key_count();
        if count > self.maximum {
            return invalid(format!("node {} holds {} keys, maximum is {}", id, count, self.maximum));
        }
        if !is_root && count < self.minimum {
            return invalid(format!("node {} holds {} keys, minimum is {}", id, count, self.minimum));
        }
        if node.keys().windows(2).any(|w| w[0] >= w[1]) {
            return invalid(format!("keys of node {} are not strictly ascending", id));
        }

        match node {
            Node::Leaf(leaf) => {
                if level != self.depth {
                    return invalid(format!("leaf {} at level {}, depth is {}", id, level, self.depth));
                }
                if leaf.values.len() != leaf.keys.len() {
                    return invalid(format!("leaf {} has mismatched keys and values", id));
                }
                let below = lower.is_some_and(|lo| leaf.min_key().is_some_and(|k| k < lo));
                let above = upper.is_some_and(|hi| leaf.max_key().is_some_and(|k| k >= hi));
                if below || above {
                    return invalid(format!("leaf {} holds keys outside its separators", id));
                }
                leaves.push(id);
            }
            Node::Internal(internal) => {
                if internal.children.len() != internal.keys.len() + 1 {
                    return invalid(format!(
                        "internal node {} has {} keys and {} children",
                        id,
                        internal.keys.len(),
                        internal.children.len()
                    ));
                }
                if is_root && internal.keys.is_empty() {
                    return invalid(format!("internal root {} has no keys", id));
                }

                for (i, &child) in internal.children.iter().enumerate() {
                    let lo = if i == 0 { lower } else { internal.keys.get(i - 1) };
                    let hi = internal.keys.get(i).or(upper);
                    self.validate_node(child, Some(id), lo, hi, level + 1, leaves)?;
                }
            }
        }

        Ok(())
    }

    /// Leaf links must follow the left-to-right order of the tree walk
    fn validate_leaf_list(&self, leaves: &[NodeId]) -> BPlusTreeResult<()> {
        if self.leftmost_leaf() != leaves.first().copied() {
            return invalid("leftmost leaf does not start the leaf list".to_string());
        }

        for (i, &id) in leaves.iter().enumerate() {
            let leaf = self.leaf(id)?;
            let prev = if i == 0 { None } else { Some(leaves[i - 1]) };
            let next = leaves.get(i + 1).copied();

            if leaf.prev != prev || leaf.next != next {
                return invalid(format!(
                    "leaf {} links {:?} <-> {:?}, expected {:?} <-> {:?}",
                    id, leaf.prev, leaf.next, prev, next
                ));
            }
        }

        let mut count = 0;
        let mut last: Option<&K> = None;
        for (key, _) in self.iter() {
            if last.is_some_and(|prev| prev >= key) {
                return invalid("leaf list is not strictly ascending".to_string());
            }
            last = Some(key);
            count += 1;
        }

        if count != self.entry_count {
            return invalid(format!(
                "leaf list holds {} entries, tree counts {}",
                count, self.entry_count
            ));
        }

        Ok(())
    }
}
