//! Sink implementations
//!
//! Contains LogSink, MemorySink, and RawlogSink.

mod log;
mod memory;
mod rawlog;

pub use self::log::LogSink;
pub use self::memory::MemorySink;
pub use self::rawlog::{RAWLOG_MAGIC, RawlogFormat, RawlogSink, read_rawlog};
