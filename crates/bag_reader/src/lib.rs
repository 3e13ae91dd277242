//! # Bag Reader
//!
//! Source logs for the transcription driver.
//!
//! Storages:
//! - `bincode`: one file, a [`BagHeader`] followed by bincode `RawMessage`s
//! - `jsonl`: a directory with `metadata.json` and `messages.jsonl`, payloads
//!   inline or in sibling binary files
//! - [`MemoryBag`]: in-memory, for tests and embedding
//!
//! All of them yield messages in stored order and implement
//! [`SourceLog`](contracts::SourceLog).

mod bincode_bag;
mod error;
mod jsonl_bag;
mod memory;
mod storage;
mod writer;

pub use bincode_bag::{BagHeader, BincodeBag, BAG_MAGIC, BAG_VERSION};
pub use error::BagError;
pub use jsonl_bag::{JsonlBag, JsonlMetadata, MESSAGES_FILE, METADATA_FILE};
pub use memory::MemoryBag;
pub use storage::{open_bag, AnyBag, StorageId};
pub use writer::BagWriter;
