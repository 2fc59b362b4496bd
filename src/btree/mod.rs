//! In-memory B+ tree
//!
//! An ordered index supporting point lookup, insertion, update and deletion.
//! Nodes split when they exceed the tree order and borrow from or fuse with a
//! sibling when they fall under half of it, so every leaf stays at the same
//! depth. Leaves form a doubly linked list in key order for full scans.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]; only the
//! child lists own nodes, parent and sibling links are plain indices.

mod error;
mod node;
mod snapshot;
mod stats;
mod validate;


pub use error::{BPlusTreeError, BPlusTreeResult};
pub use node::{InternalNode, LeafNode, Node, NodeId};
pub use snapshot::{NodeSnapshot, TreeSnapshot};
pub use stats::TreeStats;

use log::{debug, trace, warn};

/// Default maximum number of keys per node
pub const DEFAULT_ORDER: usize = 4;

/// Smallest accepted order; lower values are clamped to it
pub const MIN_ORDER: usize = 2;

/// B+ Tree data structure
///
/// Order `M` means:
/// - every node holds at most `M` keys
/// - every node except the root holds at least `M / 2` keys
/// - the root is a single (possibly empty) leaf until the first split
#[derive(Debug)]
pub struct BPlusTree<K, V> {
    /// Root node ID
    root: NodeId,

    /// Maximum keys per node
    maximum: usize,

    /// Minimum keys per non-root node
    minimum: usize,

    /// Internal levels above the leaves
    depth: usize,

    /// Node storage
    nodes: Vec<Option<Node<K, V>>>,

    /// Free list for recycling deleted nodes
    free_list: Vec<NodeId>,

    /// Total number of entries in the tree
    entry_count: usize,

    stats: TreeStats,
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Create a new empty B+ tree holding at most `order` keys per node.
    ///
    /// Orders below [`MIN_ORDER`] are clamped.
    pub fn new(order: usize) -> Self {
        let maximum = if order < MIN_ORDER {
            warn!("B+ tree order {} is below {}, clamping", order, MIN_ORDER);
            MIN_ORDER
        } else {
            order
        };

        Self {
            root: 0,
            maximum,
            minimum: maximum / 2,
            depth: 0,
            nodes: vec![Some(Node::Leaf(LeafNode::new()))],
            free_list: Vec::new(),
            entry_count: 0,
            stats: TreeStats::default(),
        }
    }

    /// Get the tree order (maximum keys per node)
    pub fn order(&self) -> usize {
        self.maximum
    }

    /// Minimum keys per non-root node
    pub fn minimum(&self) -> usize {
        self.minimum
    }

    /// Number of internal levels above the leaves (0 for a single leaf)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Tree height in levels (1 for a single leaf)
    pub fn height(&self) -> usize {
        self.depth + 1
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Get number of entries in the tree
    pub fn len(&self) -> usize {
        self.entry_count
    }

    /// Split, fusion and borrow counters
    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TreeStats::default();
    }

    // ========== Node Management ==========

    /// Allocate a new node, returning its ID
    fn allocate_node(&mut self, node: Node<K, V>) -> NodeId {
        if let Some(id) = self.free_list.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            let id = self.nodes.len();
            self.nodes.push(Some(node));
            id
        }
    }

    /// Take a node out of storage, adding its slot to the free list
    fn release_node(&mut self, id: NodeId) -> BPlusTreeResult<Node<K, V>> {
        let node = self
            .nodes
            .get_mut(id)
            .and_then(|n| n.take())
            .ok_or(BPlusTreeError::NodeNotFound(id))?;
        self.free_list.push(id);
        Ok(node)
    }

    /// Get a reference to a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node<K, V>> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    /// Get a mutable reference to a node by ID
    fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node<K, V>> {
        self.nodes.get_mut(id).and_then(|n| n.as_mut())
    }

    fn node(&self, id: NodeId) -> BPlusTreeResult<&Node<K, V>> {
        self.get_node(id).ok_or(BPlusTreeError::NodeNotFound(id))
    }

    fn leaf(&self, id: NodeId) -> BPlusTreeResult<&LeafNode<K, V>> {
        self.get_node(id)
            .and_then(|n| n.as_leaf())
            .ok_or(BPlusTreeError::NodeNotFound(id))
    }

    fn leaf_mut(&mut self, id: NodeId) -> BPlusTreeResult<&mut LeafNode<K, V>> {
        self.get_node_mut(id)
            .and_then(|n| n.as_leaf_mut())
            .ok_or(BPlusTreeError::NodeNotFound(id))
    }

    fn internal(&self, id: NodeId) -> BPlusTreeResult<&InternalNode<K>> {
        self.get_node(id)
            .and_then(|n| n.as_internal())
            .ok_or(BPlusTreeError::NodeNotFound(id))
    }

    fn internal_mut(&mut self, id: NodeId) -> BPlusTreeResult<&mut InternalNode<K>> {
        self.get_node_mut(id)
            .and_then(|n| n.as_internal_mut())
            .ok_or(BPlusTreeError::NodeNotFound(id))
    }

    fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> BPlusTreeResult<()> {
        self.get_node_mut(id)
            .ok_or(BPlusTreeError::NodeNotFound(id))?
            .set_parent(parent);
        Ok(())
    }

    /// Get the root node ID
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Get the number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    // ========== Search Operations ==========

    /// Find the leaf node that should contain the given key
    pub fn find(&self, key: &K) -> Option<NodeId> {
        let mut current = self.root;

        loop {
            match self.get_node(current)? {
                Node::Leaf(_) => return Some(current),
                Node::Internal(node) => current = node.child_for(key),
            }
        }
    }

    fn find_leaf(&self, key: &K) -> BPlusTreeResult<NodeId> {
        self.find(key)
            .ok_or_else(|| BPlusTreeError::InvalidState("Could not find leaf".to_string()))
    }

    /// Returns the value for a given key, or `None` if it is absent
    pub fn query(&self, key: &K) -> Option<&V> {
        let leaf_id = self.find(key)?;
        self.get_node(leaf_id)?.as_leaf()?.lookup(key)
    }

    pub fn query_mut(&mut self, key: &K) -> Option<&mut V> {
        let leaf_id = self.find(key)?;
        self.get_node_mut(leaf_id)?.as_leaf_mut()?.lookup_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.query(key).is_some()
    }

    /// Leftmost leaf, reached by always following child 0
    pub fn leftmost_leaf(&self) -> Option<NodeId> {
        let mut current = self.root;

        loop {
            match self.get_node(current)? {
                Node::Leaf(_) => return Some(current),
                Node::Internal(node) => current = *node.children.first()?,
            }
        }
    }

    // ========== Insert Operations ==========

    /// Insert a new key-value pair.
    ///
    /// Returns `(false, leaf)` without touching the tree when the key is
    /// already present, otherwise `(true, leaf)` where `leaf` holds the key
    /// after any split.
    pub fn insert(&mut self, key: K, value: V) -> BPlusTreeResult<(bool, NodeId)> {
        let leaf_id = self.find_leaf(&key)?;

        if self.leaf(leaf_id)?.contains(&key) {
            trace!("insert rejected: duplicate key in leaf {}", leaf_id);
            return Ok((false, leaf_id));
        }

        let (_, holder) = self.put(leaf_id, key, value)?;
        Ok((true, holder))
    }

    /// Overwrite the value of an existing key.
    ///
    /// Returns `(false, leaf)` when the key is absent. Never rebalances.
    pub fn update(&mut self, key: K, value: V) -> BPlusTreeResult<(bool, NodeId)> {
        let leaf_id = self.find_leaf(&key)?;

        match self.leaf_mut(leaf_id)?.lookup_mut(&key) {
            Some(slot) => {
                *slot = value;
                Ok((true, leaf_id))
            }
            None => {
                trace!("update rejected: key absent from leaf {}", leaf_id);
                Ok((false, leaf_id))
            }
        }
    }

    /// Insert or overwrite, returning the previous value if there was one
    pub fn upsert(&mut self, key: K, value: V) -> BPlusTreeResult<Option<V>> {
        let leaf_id = self.find_leaf(&key)?;
        let (old, _) = self.put(leaf_id, key, value)?;
        Ok(old)
    }

    /// Upsert into a known leaf and split it if it overflows.
    ///
    /// Returns the previous value and the leaf now holding the key.
    fn put(&mut self, leaf_id: NodeId, key: K, value: V) -> BPlusTreeResult<(Option<V>, NodeId)> {
        let maximum = self.maximum;

        let (old, overflow) = {
            let leaf = self.leaf_mut(leaf_id)?;
            let old = leaf.upsert(key.clone(), value);
            (old, leaf.len() > maximum)
        };

        if old.is_none() {
            self.entry_count += 1;
        }

        if !overflow {
            return Ok((old, leaf_id));
        }

        let (separator, left_id) = self.split_leaf(leaf_id)?;
        let holder = if key < separator { left_id } else { leaf_id };

        self.insert_index(separator, left_id, leaf_id)?;

        Ok((old, holder))
    }

    /// Split an overflowing leaf, linking the new left half into the leaf list
    fn split_leaf(&mut self, leaf_id: NodeId) -> BPlusTreeResult<(K, NodeId)> {
        let (separator, mut left) = self.leaf_mut(leaf_id)?.split();
        let prev = left.prev;
        left.next = Some(leaf_id);

        let left_id = self.allocate_node(Node::Leaf(left));

        if let Some(prev_id) = prev {
            self.leaf_mut(prev_id)?.next = Some(left_id);
        }
        self.leaf_mut(leaf_id)?.prev = Some(left_id);

        self.stats.splits += 1;
        debug!("split leaf {} -> {} | {}", leaf_id, left_id, leaf_id);

        Ok((separator, left_id))
    }

    /// Split an overflowing internal node, re-parenting the moved children
    fn split_internal(&mut self, node_id: NodeId) -> BPlusTreeResult<(K, NodeId)> {
        let (separator, left) = self.internal_mut(node_id)?.split();
        let moved = left.children.clone();

        let left_id = self.allocate_node(Node::Internal(left));
        for child in moved {
            self.set_parent(child, Some(left_id))?;
        }

        self.stats.splits += 1;
        self.stats.internal_splits += 1;
        debug!("split internal {} -> {} | {}", node_id, left_id, node_id);

        Ok((separator, left_id))
    }

    /// Hand a split result to the parent, splitting upward until some parent
    /// has room or a new root is created.
    fn insert_index(
        &mut self,
        mut separator: K,
        mut left_id: NodeId,
        mut right_id: NodeId,
    ) -> BPlusTreeResult<()> {
        let maximum = self.maximum;

        loop {
            let Some(parent_id) = self.node(right_id)?.parent() else {
                let root = InternalNode::new(vec![separator], vec![left_id, right_id]);
                let root_id = self.allocate_node(Node::Internal(root));

                self.set_parent(left_id, Some(root_id))?;
                self.set_parent(right_id, Some(root_id))?;
                self.root = root_id;
                self.depth += 1;

                debug!("new root {}, depth {}", root_id, self.depth);
                return Ok(());
            };

            let overflow = {
                let parent = self.internal_mut(parent_id)?;
                parent
                    .insert_child(separator, left_id, right_id)
                    .ok_or_else(|| {
                        BPlusTreeError::InvalidState(format!(
                            "node {} is not a child of its parent {}",
                            right_id, parent_id
                        ))
                    })?;
                parent.len() > maximum
            };
            self.set_parent(left_id, Some(parent_id))?;

            if !overflow {
                return Ok(());
            }

            let (next_separator, next_left) = self.split_internal(parent_id)?;
            separator = next_separator;
            left_id = next_left;
            right_id = parent_id;
        }
    }

    // ========== Delete Operations ==========

    /// Delete a key, returning its value.
    ///
    /// Fails with [`BPlusTreeError::KeyNotFound`] and leaves the tree
    /// untouched when the key is absent.
    pub fn delete(&mut self, key: &K) -> BPlusTreeResult<V> {
        let leaf_id = self.find_leaf(key)?;

        let value = self
            .leaf_mut(leaf_id)?
            .remove_key(key)
            .ok_or(BPlusTreeError::KeyNotFound)?;

        self.entry_count -= 1;
        self.rebalance(leaf_id)?;

        Ok(value)
    }

    /// Restore minimum occupancy from `node_id` upward
    fn rebalance(&mut self, mut node_id: NodeId) -> BPlusTreeResult<()> {
        loop {
            if node_id == self.root {
                let node = self.node(node_id)?;
                if node.is_internal() && node.key_count() == 0 {
                    self.collapse_root()?;
                }
                return Ok(());
            }

            if self.node(node_id)?.key_count() >= self.minimum {
                return Ok(());
            }

            if self.borrow_key(node_id)? {
                return Ok(());
            }

            node_id = self.fusion(node_id)?;
        }
    }

    /// Replace an internal root left with a single child by that child
    fn collapse_root(&mut self) -> BPlusTreeResult<()> {
        let old_root = self.root;
        let child = {
            let root = self.internal(old_root)?;
            match root.children.as_slice() {
                [only] => *only,
                _ => {
                    return Err(BPlusTreeError::InvalidState(format!(
                        "root {} has no keys but {} children",
                        old_root,
                        root.children.len()
                    )));
                }
            }
        };

        self.release_node(old_root)?;
        self.set_parent(child, None)?;
        self.root = child;
        self.depth = self.depth.checked_sub(1).ok_or_else(|| {
            BPlusTreeError::InvalidState("depth underflow on root collapse".to_string())
        })?;

        debug!("root collapsed into {}, depth {}", child, self.depth);
        Ok(())
    }

    /// Parent of a non-root node and the node's position in it
    fn locate(&self, node_id: NodeId) -> BPlusTreeResult<(NodeId, usize)> {
        let parent_id = self.node(node_id)?.parent().ok_or_else(|| {
            BPlusTreeError::InvalidState(format!("non-root node {} has no parent", node_id))
        })?;
        let pos = self.internal(parent_id)?.position_of(node_id).ok_or_else(|| {
            BPlusTreeError::InvalidState(format!(
                "node {} is not a child of its parent {}",
                node_id, parent_id
            ))
        })?;
        Ok((parent_id, pos))
    }

    /// Move one key from a sibling holding more than the minimum.
    ///
    /// The right sibling is used when there is one; the left sibling only for
    /// the last child. Returns whether a key moved.
    fn borrow_key(&mut self, node_id: NodeId) -> BPlusTreeResult<bool> {
        let (parent_id, pos) = self.locate(node_id)?;
        let siblings = self.internal(parent_id)?.children.clone();

        if pos + 1 < siblings.len() {
            let right_id = siblings[pos + 1];
            if self.node(right_id)?.key_count() > self.minimum {
                self.borrow_from_right(node_id, right_id, parent_id, pos)?;
                return Ok(true);
            }
        } else if pos > 0 {
            let left_id = siblings[pos - 1];
            if self.node(left_id)?.key_count() > self.minimum {
                self.borrow_from_left(node_id, left_id, parent_id, pos)?;
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn borrow_from_right(
        &mut self,
        node_id: NodeId,
        right_id: NodeId,
        parent_id: NodeId,
        pos: usize,
    ) -> BPlusTreeResult<()> {
        if self.node(node_id)?.is_leaf() {
            let (key, value) = self
                .leaf_mut(right_id)?
                .pop_front()
                .ok_or(BPlusTreeError::NodeNotFound(right_id))?;
            let leaf = self.leaf_mut(node_id)?;
            leaf.keys.push(key);
            leaf.values.push(value);

            let separator = self
                .leaf(right_id)?
                .min_key()
                .cloned()
                .ok_or_else(|| BPlusTreeError::InvalidState(format!("leaf {} drained", right_id)))?;
            self.internal_mut(parent_id)?.keys[pos] = separator;
        } else {
            // Rotate left through the parent separator
            let (key, child) = {
                let right = self.internal_mut(right_id)?;
                (right.keys.remove(0), right.children.remove(0))
            };
            let down = std::mem::replace(&mut self.internal_mut(parent_id)?.keys[pos], key);

            let node = self.internal_mut(node_id)?;
            node.keys.push(down);
            node.children.push(child);
            self.set_parent(child, Some(node_id))?;

            self.stats.internal_borrows += 1;
        }

        self.stats.borrows += 1;
        debug!("node {} borrowed from right sibling {}", node_id, right_id);
        Ok(())
    }

    fn borrow_from_left(
        &mut self,
        node_id: NodeId,
        left_id: NodeId,
        parent_id: NodeId,
        pos: usize,
    ) -> BPlusTreeResult<()> {
        if self.node(node_id)?.is_leaf() {
            let (key, value) = self
                .leaf_mut(left_id)?
                .pop_back()
                .ok_or(BPlusTreeError::NodeNotFound(left_id))?;
            let separator = key.clone();

            let leaf = self.leaf_mut(node_id)?;
            leaf.keys.insert(0, key);
            leaf.values.insert(0, value);

            self.internal_mut(parent_id)?.keys[pos - 1] = separator;
        } else {
            // Rotate right through the parent separator
            let (key, child) = {
                let left = self.internal_mut(left_id)?;
                let key = left.keys.pop();
                let child = left.children.pop();
                key.zip(child)
                    .ok_or(BPlusTreeError::NodeNotFound(left_id))?
            };
            let down = std::mem::replace(&mut self.internal_mut(parent_id)?.keys[pos - 1], key);

            let node = self.internal_mut(node_id)?;
            node.keys.insert(0, down);
            node.children.insert(0, child);
            self.set_parent(child, Some(node_id))?;

            self.stats.internal_borrows += 1;
        }

        self.stats.borrows += 1;
        debug!("node {} borrowed from left sibling {}", node_id, left_id);
        Ok(())
    }

    /// Merge an underfull node into a sibling and discard it.
    ///
    /// Prefers the right sibling; the last child merges into its left
    /// sibling. The separator between the two is removed from the parent
    /// (and pulled down for internal nodes). Returns the parent, which may
    /// now be underfull itself.
    fn fusion(&mut self, node_id: NodeId) -> BPlusTreeResult<NodeId> {
        let (parent_id, pos) = self.locate(node_id)?;
        let siblings = self.internal(parent_id)?.children.clone();

        let (target_id, into_right) = if pos + 1 < siblings.len() {
            (siblings[pos + 1], true)
        } else if pos > 0 {
            (siblings[pos - 1], false)
        } else {
            return Err(BPlusTreeError::InvalidState(format!(
                "node {} has no sibling to merge with",
                node_id
            )));
        };

        let separator = self
            .internal_mut(parent_id)?
            .remove_child(pos)
            .ok_or(BPlusTreeError::NodeNotFound(node_id))?;

        match self.release_node(node_id)? {
            Node::Leaf(donor) => {
                {
                    let target = self.leaf_mut(target_id)?;
                    if into_right {
                        let mut keys = donor.keys;
                        let mut values = donor.values;
                        keys.append(&mut target.keys);
                        values.append(&mut target.values);
                        target.keys = keys;
                        target.values = values;
                    } else {
                        target.keys.extend(donor.keys);
                        target.values.extend(donor.values);
                    }
                }

                if let Some(prev_id) = donor.prev {
                    self.leaf_mut(prev_id)?.next = donor.next;
                }
                if let Some(next_id) = donor.next {
                    self.leaf_mut(next_id)?.prev = donor.prev;
                }
            }
            Node::Internal(donor) => {
                let moved = donor.children.clone();
                {
                    let target = self.internal_mut(target_id)?;
                    if into_right {
                        let mut keys = donor.keys;
                        let mut children = donor.children;
                        keys.push(separator);
                        keys.append(&mut target.keys);
                        children.append(&mut target.children);
                        target.keys = keys;
                        target.children = children;
                    } else {
                        target.keys.push(separator);
                        target.keys.extend(donor.keys);
                        target.children.extend(donor.children);
                    }
                }
                for child in moved {
                    self.set_parent(child, Some(target_id))?;
                }

                self.stats.internal_fusions += 1;
            }
        }

        self.stats.fusions += 1;
        debug!(
            "fused node {} into {} sibling {}",
            node_id,
            if into_right { "right" } else { "left" },
            target_id
        );

        Ok(parent_id)
    }

    /// Upsert every pair, returning how many keys were new
    pub fn insert_all<I>(&mut self, entries: I) -> BPlusTreeResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut inserted = 0;
        for (key, value) in entries {
            if self.upsert(key, value)?.is_none() {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    // ========== Iterator ==========

    /// Iterate over all entries in key order, starting from the leftmost leaf
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self, self.leftmost_leaf())
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    /// All entries with `lower <= key <= upper`, in key order
    pub fn range_search<'a>(&'a self, lower: &'a K, upper: &'a K) -> impl Iterator<Item = (&'a K, &'a V)> {
        let start = if lower <= upper { self.find(lower) } else { None };

        Iter::new(self, start)
            .skip_while(move |(k, _)| *k < lower)
            .take_while(move |(k, _)| *k <= upper)
    }
}

impl<K: Ord + Clone, V> Default for BPlusTree<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER)
    }
}

impl<'a, K: Ord + Clone, V> IntoIterator for &'a BPlusTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over B+ tree entries, walking the leaf list
pub struct Iter<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    current_leaf: Option<NodeId>,
    current_idx: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(tree: &'a BPlusTree<K, V>, start: Option<NodeId>) -> Self {
        Self {
            tree,
            current_leaf: start,
            current_idx: 0,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let leaf_id = self.current_leaf?;
            let leaf = self.tree.nodes.get(leaf_id)?.as_ref()?.as_leaf()?;

            if self.current_idx < leaf.keys.len() {
                let entry = (&leaf.keys[self.current_idx], &leaf.values[self.current_idx]);
                self.current_idx += 1;
                return Some(entry);
            }

            // Move to next leaf
            self.current_leaf = leaf.next;
            self.current_idx = 0;
        }
    }
}
