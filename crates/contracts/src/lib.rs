//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the transcriber.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All timestamps are `u64` nanoseconds since the epoch of the source log
//! - `RawMessage::timestamp` is the log's record time; normalized records carry
//!   the stamp found in the decoded message header

mod blueprint;
mod channel_id;
mod codec;
mod error;
mod message;
pub mod msgs;
mod pose;
mod record;
mod sink;
mod source;
mod transform;

pub use blueprint::*;
pub use channel_id::ChannelId;
pub use codec::SerializationFormat;
pub use error::*;
pub use message::{ChannelInfo, RawMessage};
pub use pose::{Pose, Quaternion, Vector3};
pub use record::*;
pub use sink::*;
pub use source::SourceLog;
pub use transform::TransformSample;
