//! Bag writer, for fixtures and conversions

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use contracts::{ChannelId, ChannelInfo, RawMessage};
use tracing::debug;

use crate::bincode_bag::BagHeader;
use crate::error::BagError;
use crate::jsonl_bag::{InlineData, JsonlMetadata, MessageLine, MESSAGES_FILE, METADATA_FILE};

/// Collects messages, then writes them in either storage layout
#[derive(Debug, Clone, Default)]
pub struct BagWriter {
    channels: Vec<ChannelInfo>,
    seen: HashSet<ChannelId>,
    messages: Vec<RawMessage>,
}

impl BagWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: RawMessage) -> &mut Self {
        if self.seen.insert(msg.channel_id.clone()) {
            self.channels
                .push(ChannelInfo::new(msg.channel_id.clone(), msg.type_tag.clone()));
        }
        self.messages.push(msg);
        self
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Write a single-file bincode bag
    pub fn write_bincode(&self, path: impl AsRef<Path>) -> Result<(), BagError> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        let header = BagHeader::new(self.channels.clone(), self.messages.len() as u64);

        let encode = |e: bincode::Error| BagError::open(path.display().to_string(), e.to_string());
        bincode::serialize_into(&mut out, &header).map_err(encode)?;
        for msg in &self.messages {
            bincode::serialize_into(&mut out, msg).map_err(encode)?;
        }
        out.flush()?;

        debug!(path = %path.display(), messages = self.messages.len(), "Wrote bincode bag");
        Ok(())
    }

    /// Write a jsonl bag directory, payloads inline as byte arrays
    pub fn write_jsonl(&self, dir: impl AsRef<Path>) -> Result<(), BagError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let json_err = |e: serde_json::Error| BagError::open(dir.display().to_string(), e.to_string());

        let metadata = JsonlMetadata {
            channels: self.channels.clone(),
            message_count: self.messages.len() as u64,
        };
        let metadata_file = File::create(dir.join(METADATA_FILE))?;
        serde_json::to_writer_pretty(metadata_file, &metadata).map_err(json_err)?;

        let mut out = BufWriter::new(File::create(dir.join(MESSAGES_FILE))?);
        for msg in &self.messages {
            let line = MessageLine {
                channel: msg.channel_id.to_string(),
                timestamp: msg.timestamp,
                type_tag: Some(msg.type_tag.clone()),
                data: Some(InlineData::Bytes(msg.payload.to_vec())),
                data_file: None,
            };
            serde_json::to_writer(&mut out, &line).map_err(json_err)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;

        debug!(path = %dir.display(), messages = self.messages.len(), "Wrote jsonl bag");
        Ok(())
    }
}

impl Extend<RawMessage> for BagWriter {
    fn extend<I: IntoIterator<Item = RawMessage>>(&mut self, iter: I) {
        for msg in iter {
            self.push(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonlBag;

    #[test]
    fn test_jsonl_round_trip_keeps_order_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let messages = vec![
            RawMessage::new("/tf", 3, "tf2_msgs/msg/TFMessage", vec![0u8, 255]),
            RawMessage::new("/odom", 1, "nav_msgs/msg/Odometry", vec![42u8]),
        ];
        let mut writer = BagWriter::new();
        writer.extend(messages.clone());
        writer.write_jsonl(dir.path().join("bag")).unwrap();

        let read: Vec<_> = JsonlBag::open(dir.path().join("bag"))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(read, messages);
    }
}
