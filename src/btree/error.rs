use thiserror::Error;

use super::node::NodeId;

/// Errors that can occur during B+ tree operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BPlusTreeError {
    #[error("Key not found")]
    KeyNotFound,

    #[error("Key already exists")]
    DuplicateKey,

    #[error("Invalid tree state: {0}")]
    InvalidState(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
}

pub type BPlusTreeResult<T> = Result<T, BPlusTreeError>;
