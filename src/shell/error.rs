use rustyline::error::ReadlineError;
use thiserror::Error;

use crate::btree::BPlusTreeError;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    Tree(#[from] BPlusTreeError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Readline error: {0}")]
    Readline(#[from] ReadlineError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ShellResult<T> = Result<T, ShellError>;
