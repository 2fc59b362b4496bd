pub mod btree;
pub mod shell;

pub use btree::{
    BPlusTree, BPlusTreeError, BPlusTreeResult, DEFAULT_ORDER, InternalNode, LeafNode, Node,
    NodeId, TreeStats,
};
pub use shell::{Command, Shell, ShellError, ShellResult};
