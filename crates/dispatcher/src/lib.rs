//! # Dispatcher
//!
//! Routes raw messages to their conversion handlers and drives a
//! transcription pass.
//!
//! - [`ChannelRegistry`]: channel id to ordered handler list
//! - [`TranscriptionDriver`]: source log -> registry -> sink, in stored order
//! - sinks: log, in-memory, rawlog file

pub mod driver;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod sinks;

pub use contracts::{LocalRecordSink, RecordSink};
pub use driver::{PROGRESS_INTERVAL, Progress, TranscriptionDriver, TranscriptionReport};
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use registry::{ChannelRegistry, ChannelRegistryBuilder, Handler, RunContext};
pub use sinks::{LogSink, MemorySink, RAWLOG_MAGIC, RawlogFormat, RawlogSink, read_rawlog};
