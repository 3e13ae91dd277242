//! Bag reader error types

use contracts::ContractError;
use thiserror::Error;

/// Storage-level failures
#[derive(Debug, Error)]
pub enum BagError {
    /// The log cannot be opened
    #[error("cannot open bag '{path}': {message}")]
    Open { path: String, message: String },

    /// A stored record is corrupt
    #[error("bag record {index}: {message}")]
    Corrupt { index: u64, message: String },

    /// Unknown storage id
    #[error("unknown storage id '{0}' (expected bincode or jsonl)")]
    UnknownStorage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BagError {
    pub fn open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn corrupt(index: u64, message: impl Into<String>) -> Self {
        Self::Corrupt {
            index,
            message: message.into(),
        }
    }
}

impl From<BagError> for ContractError {
    fn from(e: BagError) -> Self {
        match e {
            BagError::Open { path, message } => ContractError::source_open(path, message),
            BagError::Corrupt { index, message } => ContractError::source_read(index, message),
            BagError::UnknownStorage(id) => {
                ContractError::source_open(id.clone(), format!("unknown storage id '{id}'"))
            }
            BagError::Io(e) => ContractError::Io(e),
        }
    }
}
