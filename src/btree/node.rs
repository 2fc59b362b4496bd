/// Node identifier (index into node storage)
pub type NodeId = usize;

/// Internal node: stores separator keys and child pointers
///
/// - keys.len() + 1 == children.len()
/// - every key under children[i] is < keys[i]
/// - every key under children[i + 1] is >= keys[i]
#[derive(Debug, Clone)]
pub struct InternalNode<K> {
    /// Separator keys (sorted)
    pub keys: Vec<K>,
    /// Child node IDs
    pub children: Vec<NodeId>,
    /// Back-reference used for upward rebalancing only
    pub parent: Option<NodeId>,
}

impl<K: Ord> InternalNode<K> {
    /// Create a new internal node with given keys and children
    pub fn new(keys: Vec<K>, children: Vec<NodeId>) -> Self {
        debug_assert_eq!(keys.len() + 1, children.len());
        Self {
            keys,
            children,
            parent: None,
        }
    }

    /// Number of separator keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if node holds no separator
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the first key strictly greater than `key`, or the last child
    /// index if there is none
    pub fn child_index(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    /// Child that should contain `key`
    pub fn child_for(&self, key: &K) -> NodeId {
        self.children[self.child_index(key)]
    }

    /// Position of a child in this node
    pub fn position_of(&self, child: NodeId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Replace `right` (an existing child that just split) by `left, right`,
    /// with `separator` between them.
    ///
    /// Returns the index of `left`, or `None` if `right` is not a child of this
    /// node.
    pub fn insert_child(&mut self, separator: K, left: NodeId, right: NodeId) -> Option<usize> {
        let pos = self.position_of(right)?;
        self.keys.insert(pos, separator);
        self.children.insert(pos, left);
        Some(pos)
    }

    /// Remove the child at `pos` together with its adjacent separator: the one
    /// on its right, or the one on its left for the last child.
    ///
    /// Returns the removed separator.
    pub fn remove_child(&mut self, pos: usize) -> Option<K> {
        if pos >= self.children.len() || self.keys.is_empty() {
            return None;
        }
        self.children.remove(pos);
        let key_pos = if pos < self.keys.len() { pos } else { pos - 1 };
        Some(self.keys.remove(key_pos))
    }

    /// Split an overfull node.
    ///
    /// The key at the middle leaves both halves and is returned as the
    /// separator. The returned left half holds keys[..mid] and
    /// children[..=mid]; self keeps the rest. Moved children still point at
    /// this node and must be re-parented by the caller.
    pub fn split(&mut self) -> (K, InternalNode<K>) {
        let mid = self.keys.len() / 2;

        let mut right_keys = self.keys.split_off(mid);
        let right_children = self.children.split_off(mid + 1);
        let separator = right_keys.remove(0);

        let left_keys = std::mem::replace(&mut self.keys, right_keys);
        let left_children = std::mem::replace(&mut self.children, right_children);

        let left = InternalNode {
            keys: left_keys,
            children: left_children,
            parent: self.parent,
        };

        (separator, left)
    }
}

/// Leaf node: stores key-value pairs, doubly linked to its neighbours
#[derive(Debug, Clone)]
pub struct LeafNode<K, V> {
    /// Keys (sorted, unique)
    pub keys: Vec<K>,
    /// Values corresponding to keys
    pub values: Vec<V>,
    /// Previous leaf in key order
    pub prev: Option<NodeId>,
    /// Next leaf in key order
    pub next: Option<NodeId>,
    /// Back-reference used for upward rebalancing only
    pub parent: Option<NodeId>,
}

impl<K: Ord, V> LeafNode<K, V> {
    /// Create a new empty leaf node
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            prev: None,
            next: None,
            parent: None,
        }
    }

    /// Create a leaf node with given entries
    pub fn with_entries(keys: Vec<K>, values: Vec<V>) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self {
            keys,
            values,
            ..Self::new()
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if leaf is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.binary_search(key).is_ok()
    }

    /// Search for a key
    pub fn lookup(&self, key: &K) -> Option<&V> {
        let i = self.keys.binary_search(key).ok()?;
        self.values.get(i)
    }

    pub fn lookup_mut(&mut self, key: &K) -> Option<&mut V> {
        let i = self.keys.binary_search(key).ok()?;
        self.values.get_mut(i)
    }

    /// Overwrite the value of an existing key, or insert the pair in sorted
    /// position. Returns the previous value when overwriting.
    ///
    /// May leave the leaf one entry over the tree order; the caller checks.
    pub fn upsert(&mut self, key: K, value: V) -> Option<V> {
        match self.keys.binary_search(&key) {
            Ok(i) => Some(std::mem::replace(&mut self.values[i], value)),
            Err(i) => {
                self.keys.insert(i, key);
                self.values.insert(i, value);
                None
            }
        }
    }

    /// Remove a key, returning its value
    pub fn remove_key(&mut self, key: &K) -> Option<V> {
        let i = self.keys.binary_search(key).ok()?;
        self.keys.remove(i);
        Some(self.values.remove(i))
    }

    /// Remove and return the smallest entry
    pub fn pop_front(&mut self) -> Option<(K, V)> {
        if self.keys.is_empty() {
            return None;
        }
        Some((self.keys.remove(0), self.values.remove(0)))
    }

    /// Remove and return the largest entry
    pub fn pop_back(&mut self) -> Option<(K, V)> {
        let key = self.keys.pop()?;
        let value = self.values.pop()?;
        Some((key, value))
    }

    /// Get the minimum key in this leaf
    pub fn min_key(&self) -> Option<&K> {
        self.keys.first()
    }

    /// Get the maximum key in this leaf
    pub fn max_key(&self) -> Option<&K> {
        self.keys.last()
    }
}

impl<K: Ord + Clone, V> LeafNode<K, V> {
    /// Split this leaf at len / 2.
    ///
    /// The returned left leaf takes keys[..mid] and inherits `prev` and
    /// `parent`; self keeps the upper half. The separator is the first key of
    /// the upper half and stays in it. Link fix-up between the two leaves and
    /// the old predecessor is left to the caller, which owns the arena.
    pub fn split(&mut self) -> (K, LeafNode<K, V>) {
        let mid = self.keys.len() / 2;

        let right_keys = self.keys.split_off(mid);
        let right_values = self.values.split_off(mid);

        let mut left = LeafNode::with_entries(
            std::mem::replace(&mut self.keys, right_keys),
            std::mem::replace(&mut self.values, right_values),
        );
        left.prev = self.prev;
        left.parent = self.parent;

        (self.keys[0].clone(), left)
    }
}

impl<K: Ord, V> Default for LeafNode<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// B+ tree node (either internal or leaf)
#[derive(Debug, Clone)]
pub enum Node<K, V> {
    Internal(InternalNode<K>),
    Leaf(LeafNode<K, V>),
}

impl<K, V> Node<K, V> {
    /// Check if this is a leaf node
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Check if this is an internal node
    pub fn is_internal(&self) -> bool {
        matches!(self, Node::Internal(_))
    }

    /// Keys held by this node (separators for internal nodes)
    pub fn keys(&self) -> &[K] {
        match self {
            Node::Internal(node) => &node.keys,
            Node::Leaf(node) => &node.keys,
        }
    }

    /// Child IDs; empty for a leaf
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Internal(node) => &node.children,
            Node::Leaf(_) => &[],
        }
    }

    pub fn key_count(&self) -> usize {
        self.keys().len()
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Internal(node) => node.parent,
            Node::Leaf(node) => node.parent,
        }
    }

    pub fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            Node::Internal(node) => node.parent = parent,
            Node::Leaf(node) => node.parent = parent,
        }
    }

    /// Get as internal node reference
    pub fn as_internal(&self) -> Option<&InternalNode<K>> {
        match self {
            Node::Internal(node) => Some(node),
            Node::Leaf(_) => None,
        }
    }

    /// Get as internal node mutable reference
    pub fn as_internal_mut(&mut self) -> Option<&mut InternalNode<K>> {
        match self {
            Node::Internal(node) => Some(node),
            Node::Leaf(_) => None,
        }
    }

    /// Get as leaf node reference
    pub fn as_leaf(&self) -> Option<&LeafNode<K, V>> {
        match self {
            Node::Internal(_) => None,
            Node::Leaf(node) => Some(node),
        }
    }

    /// Get as leaf node mutable reference
    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafNode<K, V>> {
        match self {
            Node::Internal(_) => None,
            Node::Leaf(node) => Some(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_with(keys: &[i64]) -> LeafNode<i64, String> {
        let mut leaf = LeafNode::new();
        for &k in keys {
            leaf.upsert(k, format!("v{}", k));
        }
        leaf
    }

    #[test]
    fn test_leaf_node_upsert() {
        let mut leaf = leaf_with(&[5, 3, 7]);

        assert_eq!(leaf.keys, vec![3, 5, 7]);
        assert_eq!(leaf.upsert(5, "five".to_string()), Some("v5".to_string()));
        assert_eq!(leaf.len(), 3);
        assert_eq!(leaf.lookup(&5), Some(&"five".to_string()));
    }

    #[test]
    fn test_leaf_node_lookup() {
        let leaf = leaf_with(&[3, 5, 7]);

        assert_eq!(leaf.lookup(&5), Some(&"v5".to_string()));
        assert_eq!(leaf.lookup(&4), None);
        assert_eq!(leaf.lookup(&10), None);
        assert!(leaf.contains(&3));
        assert!(!leaf.contains(&8));
    }

    #[test]
    fn test_leaf_node_remove_key() {
        let mut leaf = leaf_with(&[3, 5, 7]);

        assert_eq!(leaf.remove_key(&5), Some("v5".to_string()));
        assert_eq!(leaf.len(), 2);
        assert_eq!(leaf.lookup(&5), None);

        // Already removed
        assert_eq!(leaf.remove_key(&5), None);
        assert_eq!(leaf.keys, vec![3, 7]);
    }

    #[test]
    fn test_leaf_node_pop_ends() {
        let mut leaf = leaf_with(&[1, 2, 3]);

        assert_eq!(leaf.pop_front(), Some((1, "v1".to_string())));
        assert_eq!(leaf.pop_back(), Some((3, "v3".to_string())));
        assert_eq!(leaf.keys, vec![2]);

        leaf.pop_back();
        assert!(leaf.pop_front().is_none());
        assert!(leaf.pop_back().is_none());
    }

    #[test]
    fn test_leaf_node_split() {
        let mut leaf = leaf_with(&[0, 1, 2, 3, 4]);
        leaf.prev = Some(7);
        leaf.parent = Some(9);

        let (separator, left) = leaf.split();

        assert_eq!(separator, 2);
        assert_eq!(left.keys, vec![0, 1]);
        assert_eq!(leaf.keys, vec![2, 3, 4]); // separator stays in the right half
        assert_eq!(left.values, vec!["v0", "v1"]);
        assert_eq!(left.prev, Some(7));
        assert_eq!(left.parent, Some(9));
        assert_eq!(leaf.min_key(), Some(&2));
        assert_eq!(left.max_key(), Some(&1));
    }

    #[test]
    fn test_internal_node_child_index() {
        let node = InternalNode::new(vec![3, 7, 12], vec![0, 1, 2, 3]);

        assert_eq!(node.child_index(&1), 0); // < 3
        assert_eq!(node.child_index(&3), 1); // == 3 goes right
        assert_eq!(node.child_index(&5), 1);
        assert_eq!(node.child_index(&7), 2);
        assert_eq!(node.child_index(&12), 3);
        assert_eq!(node.child_index(&15), 3); // > all, last child
        assert_eq!(node.child_for(&8), 2);
    }

    #[test]
    fn test_internal_node_insert_child() {
        let mut node = InternalNode::new(vec![3, 12], vec![10, 11, 12]);

        // child 11 split into 20 | 11 around 7
        assert_eq!(node.insert_child(7, 20, 11), Some(1));

        assert_eq!(node.keys, vec![3, 7, 12]);
        assert_eq!(node.children, vec![10, 20, 11, 12]);
        assert_eq!(node.insert_child(1, 30, 99), None);
    }

    #[test]
    fn test_internal_node_remove_child() {
        let mut node = InternalNode::new(vec![3, 7, 12], vec![0, 1, 2, 3]);

        assert_eq!(node.remove_child(1), Some(7));
        assert_eq!(node.keys, vec![3, 12]);
        assert_eq!(node.children, vec![0, 2, 3]);

        // last child drops the separator on its left
        assert_eq!(node.remove_child(2), Some(12));
        assert_eq!(node.keys, vec![3]);
        assert_eq!(node.children, vec![0, 2]);

        assert_eq!(node.remove_child(5), None);
    }

    #[test]
    fn test_internal_node_split() {
        let mut node = InternalNode::new(vec![10, 20, 30, 40, 50], vec![0, 1, 2, 3, 4, 5]);
        node.parent = Some(42);

        let (separator, left) = node.split();

        assert_eq!(separator, 30);
        assert_eq!(left.keys, vec![10, 20]);
        assert_eq!(left.children, vec![0, 1, 2]);
        assert_eq!(left.parent, Some(42));
        assert_eq!(node.keys, vec![40, 50]);
        assert_eq!(node.children, vec![3, 4, 5]);
    }

    #[test]
    fn test_node_accessors() {
        let leaf: Node<i64, ()> = Node::Leaf(LeafNode::with_entries(vec![1, 2], vec![(), ()]));
        let mut internal: Node<i64, ()> = Node::Internal(InternalNode::new(vec![5], vec![0, 1]));

        assert!(leaf.is_leaf());
        assert!(internal.is_internal());
        assert_eq!(leaf.keys(), &[1, 2]);
        assert!(leaf.children().is_empty());
        assert_eq!(internal.children(), &[0, 1]);
        assert_eq!(internal.key_count(), 1);

        internal.set_parent(Some(3));
        assert_eq!(internal.parent(), Some(3));
        assert!(internal.as_leaf().is_none());
        assert!(leaf.as_internal().is_none());
    }
}
