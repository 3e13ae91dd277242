//! RawMessage - source log output
//!
//! One timestamped opaque message as stored in the bag.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ChannelId;

/// A message exactly as the source log stores it.
///
/// The payload stays opaque until a normalizer decodes it. `Bytes` makes the
/// copy into a synchronizer slot a reference-count bump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Channel (topic) the message was recorded on
    pub channel_id: ChannelId,

    /// Log record time (nanoseconds)
    pub timestamp: u64,

    /// Declared message type of the channel, e.g. `sensor_msgs/msg/LaserScan`
    pub type_tag: String,

    /// Serialized message body
    pub payload: Bytes,
}

impl RawMessage {
    pub fn new(
        channel_id: impl Into<ChannelId>,
        timestamp: u64,
        type_tag: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            timestamp,
            type_tag: type_tag.into(),
            payload: payload.into(),
        }
    }
}

/// Channel metadata published by the source log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel id
    pub id: ChannelId,

    /// Declared message type
    pub type_tag: String,
}

impl ChannelInfo {
    pub fn new(id: impl Into<ChannelId>, type_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
        }
    }
}
