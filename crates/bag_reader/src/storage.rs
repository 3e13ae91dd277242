//! Storage selection

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use contracts::{ChannelInfo, ContractError, RawMessage, SourceLog};

use crate::bincode_bag::BincodeBag;
use crate::error::BagError;
use crate::jsonl_bag::JsonlBag;

/// On-disk bag layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageId {
    Bincode,
    Jsonl,
}

impl StorageId {
    /// Directories are jsonl bags, files are bincode bags
    pub fn detect(path: &Path) -> Self {
        if path.is_dir() {
            Self::Jsonl
        } else {
            Self::Bincode
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bincode => "bincode",
            Self::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageId {
    type Err = BagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bincode" => Ok(Self::Bincode),
            "jsonl" => Ok(Self::Jsonl),
            other => Err(BagError::UnknownStorage(other.to_string())),
        }
    }
}

/// Any opened bag
pub enum AnyBag {
    Bincode(BincodeBag),
    Jsonl(JsonlBag),
}

/// Open `path` with the given storage, or detect it from the path.
///
/// # Errors
/// The bag cannot be opened.
pub fn open_bag(path: impl AsRef<Path>, storage: Option<StorageId>) -> Result<AnyBag, BagError> {
    let path = path.as_ref();
    match storage.unwrap_or_else(|| StorageId::detect(path)) {
        StorageId::Bincode => BincodeBag::open(path).map(AnyBag::Bincode),
        StorageId::Jsonl => JsonlBag::open(path).map(AnyBag::Jsonl),
    }
}

impl AnyBag {
    pub fn storage_id(&self) -> StorageId {
        match self {
            Self::Bincode(_) => StorageId::Bincode,
            Self::Jsonl(_) => StorageId::Jsonl,
        }
    }
}

impl Iterator for AnyBag {
    type Item = Result<RawMessage, ContractError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Bincode(bag) => bag.next(),
            Self::Jsonl(bag) => bag.next(),
        }
    }
}

impl SourceLog for AnyBag {
    fn channels(&self) -> &[ChannelInfo] {
        match self {
            Self::Bincode(bag) => bag.channels(),
            Self::Jsonl(bag) => bag.channels(),
        }
    }

    fn message_count(&self) -> u64 {
        match self {
            Self::Bincode(bag) => bag.message_count(),
            Self::Jsonl(bag) => bag.message_count(),
        }
    }
}
