//! Directory bag: `metadata.json` + `messages.jsonl`
//!
//! Each line of `messages.jsonl` is one message:
//!
//! ```json
//! {"channel": "/odom", "timestamp": 100, "data": {"header": {...}, ...}}
//! {"channel": "/camera/image", "timestamp": 120, "data_file": "data/000001.bin"}
//! ```
//!
//! `data` is either a byte array or any other JSON value, stored as its JSON
//! text. `data_file` is a path relative to the bag directory whose bytes are
//! the payload. `type_tag` defaults to the channel's declared type.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use contracts::{ChannelId, ChannelInfo, ContractError, RawMessage, SourceLog};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BagError;

pub const METADATA_FILE: &str = "metadata.json";
pub const MESSAGES_FILE: &str = "messages.jsonl";

/// Content of `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonlMetadata {
    pub channels: Vec<ChannelInfo>,
    pub message_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum InlineData {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

/// One line of `messages.jsonl`
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MessageLine {
    pub channel: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<String>,
}

pub struct JsonlBag {
    root: PathBuf,
    metadata: JsonlMetadata,
    types: HashMap<ChannelId, String>,
    lines: Lines<BufReader<File>>,
    line_no: u64,
    index: u64,
    done: bool,
}

impl JsonlBag {
    /// Open a bag directory.
    ///
    /// # Errors
    /// Missing directory or files, or unreadable metadata.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, BagError> {
        let root = root.as_ref().to_path_buf();
        let display = root.display().to_string();

        let metadata_file = File::open(root.join(METADATA_FILE))
            .map_err(|e| BagError::open(&display, format!("{METADATA_FILE}: {e}")))?;
        let metadata: JsonlMetadata = serde_json::from_reader(BufReader::new(metadata_file))
            .map_err(|e| BagError::open(&display, format!("{METADATA_FILE}: {e}")))?;
        let messages = File::open(root.join(MESSAGES_FILE))
            .map_err(|e| BagError::open(&display, format!("{MESSAGES_FILE}: {e}")))?;

        let types = metadata
            .channels
            .iter()
            .map(|c| (c.id.clone(), c.type_tag.clone()))
            .collect();

        info!(
            path = %root.display(),
            channels = metadata.channels.len(),
            messages = metadata.message_count,
            "Opened jsonl bag"
        );
        Ok(Self {
            root,
            metadata,
            types,
            lines: BufReader::new(messages).lines(),
            line_no: 0,
            index: 0,
            done: false,
        })
    }

    pub fn metadata(&self) -> &JsonlMetadata {
        &self.metadata
    }

    fn parse(&self, line: &str) -> Result<RawMessage, BagError> {
        let record: MessageLine = serde_json::from_str(line)
            .map_err(|e| BagError::corrupt(self.index, format!("line {}: {e}", self.line_no)))?;

        let payload = match (record.data, record.data_file) {
            (Some(InlineData::Bytes(bytes)), None) => Bytes::from(bytes),
            (Some(InlineData::Json(value)), None) => Bytes::from(value.to_string()),
            (None, Some(file)) => {
                let path = self.root.join(&file);
                let bytes = std::fs::read(&path).map_err(|e| {
                    BagError::corrupt(self.index, format!("data file '{}': {e}", path.display()))
                })?;
                Bytes::from(bytes)
            }
            (None, None) => Bytes::new(),
            (Some(_), Some(_)) => {
                return Err(BagError::corrupt(
                    self.index,
                    format!("line {}: both data and data_file given", self.line_no),
                ))
            }
        };

        let channel = ChannelId::from(record.channel);
        let type_tag = record
            .type_tag
            .or_else(|| self.types.get(&channel).cloned())
            .unwrap_or_default();
        Ok(RawMessage {
            channel_id: channel,
            timestamp: record.timestamp,
            type_tag,
            payload,
        })
    }
}

impl Iterator for JsonlBag {
    type Item = Result<RawMessage, ContractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(BagError::Io(e).into()));
                }
                Some(Ok(line)) => line,
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let result = self.parse(&line);
            self.index += 1;
            if result.is_err() {
                self.done = true;
            }
            return Some(result.map_err(Into::into));
        }
    }
}

impl SourceLog for JsonlBag {
    fn channels(&self) -> &[ChannelInfo] {
        &self.metadata.channels
    }

    fn message_count(&self) -> u64 {
        self.metadata.message_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_bag(dir: &Path, lines: &[&str]) {
        let metadata = JsonlMetadata {
            channels: vec![
                ChannelInfo::new("/odom", "nav_msgs/msg/Odometry"),
                ChannelInfo::new("/image", "sensor_msgs/msg/Image"),
            ],
            message_count: lines.len() as u64,
        };
        std::fs::write(dir.join(METADATA_FILE), serde_json::to_vec(&metadata).unwrap()).unwrap();
        std::fs::write(dir.join(MESSAGES_FILE), lines.join("\n")).unwrap();
    }

    #[test]
    fn test_inline_and_file_payloads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/img.bin"), [9u8, 8, 7]).unwrap();
        write_bag(
            dir.path(),
            &[
                r#"{"channel": "/odom", "timestamp": 5, "data": [1, 2]}"#,
                "",
                r#"{"channel": "/odom", "timestamp": 6, "data": {"x": 1}}"#,
                r#"{"channel": "/image", "timestamp": 7, "data_file": "data/img.bin"}"#,
                r#"{"channel": "/other", "timestamp": 8, "type_tag": "custom/Msg"}"#,
            ],
        );

        let bag = JsonlBag::open(dir.path()).unwrap();
        let msgs: Vec<_> = bag.map(Result::unwrap).collect();
        assert_eq!(msgs.len(), 4);
        assert_eq!(&msgs[0].payload[..], &[1, 2]);
        assert_eq!(msgs[0].type_tag, "nav_msgs/msg/Odometry");
        assert_eq!(&msgs[1].payload[..], br#"{"x":1}"#);
        assert_eq!(&msgs[2].payload[..], &[9, 8, 7]);
        assert_eq!(msgs[3].type_tag, "custom/Msg");
        assert!(msgs[3].payload.is_empty());
    }

    #[test]
    fn test_malformed_line_stops_iteration() {
        let dir = tempfile::tempdir().unwrap();
        write_bag(
            dir.path(),
            &[
                r#"{"channel": "/odom", "timestamp": 5}"#,
                r#"{"channel": "/odom", "timestamp": "#,
                r#"{"channel": "/odom", "timestamp": 7}"#,
            ],
        );
        let results: Vec<_> = JsonlBag::open(dir.path()).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(ContractError::SourceRead { index: 1, .. })));
    }

    #[test]
    fn test_missing_metadata() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(JsonlBag::open(dir.path()), Err(BagError::Open { .. })));
    }
}
