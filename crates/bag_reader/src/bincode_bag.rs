//! Single-file bincode bag

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use contracts::{ChannelInfo, ContractError, RawMessage, SourceLog};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BagError;

/// Leading bytes of a bincode bag
pub const BAG_MAGIC: [u8; 8] = *b"BAGSCRB1";

/// Current on-disk layout version
pub const BAG_VERSION: u32 = 1;

/// First record of a bincode bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagHeader {
    pub magic: [u8; 8],
    pub version: u32,
    pub channels: Vec<ChannelInfo>,
    pub message_count: u64,
}

impl BagHeader {
    pub fn new(channels: Vec<ChannelInfo>, message_count: u64) -> Self {
        Self {
            magic: BAG_MAGIC,
            version: BAG_VERSION,
            channels,
            message_count,
        }
    }
}

/// Streaming reader over a bincode bag
pub struct BincodeBag {
    path: PathBuf,
    reader: BufReader<File>,
    header: BagHeader,
    index: u64,
    done: bool,
}

impl BincodeBag {
    /// Open the bag and read its header.
    ///
    /// # Errors
    /// Missing file, bad magic, or unsupported version.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BagError> {
        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();
        let file = File::open(&path).map_err(|e| BagError::open(&display, e.to_string()))?;
        let mut reader = BufReader::new(file);

        let header: BagHeader = bincode::deserialize_from(&mut reader)
            .map_err(|e| BagError::open(&display, format!("unreadable header: {e}")))?;
        if header.magic != BAG_MAGIC {
            return Err(BagError::open(&display, "not a bincode bag (bad magic)"));
        }
        if header.version != BAG_VERSION {
            return Err(BagError::open(
                &display,
                format!("unsupported bag version {}", header.version),
            ));
        }

        info!(
            path = %path.display(),
            channels = header.channels.len(),
            messages = header.message_count,
            "Opened bincode bag"
        );
        Ok(Self {
            path,
            reader,
            header,
            index: 0,
            done: false,
        })
    }

    pub fn header(&self) -> &BagHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_next(&mut self) -> Result<Option<RawMessage>, BagError> {
        let at_eof = self.reader.fill_buf()?.is_empty();
        if at_eof {
            if self.index < self.header.message_count {
                return Err(BagError::corrupt(
                    self.index,
                    format!(
                        "bag truncated: header announces {} messages",
                        self.header.message_count
                    ),
                ));
            }
            debug!(messages = self.index, "End of bincode bag");
            return Ok(None);
        }

        let msg = bincode::deserialize_from(&mut self.reader)
            .map_err(|e| BagError::corrupt(self.index, e.to_string()))?;
        self.index += 1;
        Ok(Some(msg))
    }
}

impl Iterator for BincodeBag {
    type Item = Result<RawMessage, ContractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(msg)) => Some(Ok(msg)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

impl SourceLog for BincodeBag {
    fn channels(&self) -> &[ChannelInfo] {
        &self.header.channels
    }

    fn message_count(&self) -> u64 {
        self.header.message_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BagWriter;

    fn messages() -> Vec<RawMessage> {
        vec![
            RawMessage::new("/odom", 20, "nav_msgs/msg/Odometry", vec![1, 2, 3u8]),
            RawMessage::new("/scan", 10, "sensor_msgs/msg/LaserScan", vec![4u8]),
            RawMessage::new("/odom", 30, "nav_msgs/msg/Odometry", Vec::<u8>::new()),
        ]
    }

    #[test]
    fn test_reads_in_stored_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.bag");
        let mut writer = BagWriter::new();
        writer.extend(messages());
        writer.write_bincode(&path).unwrap();

        let bag = BincodeBag::open(&path).unwrap();
        assert_eq!(bag.message_count(), 3);
        assert_eq!(bag.channels().len(), 2);
        assert_eq!(bag.type_of("/scan"), Some("sensor_msgs/msg/LaserScan"));

        let read: Vec<_> = bag.map(Result::unwrap).collect();
        assert_eq!(read, messages());
    }

    #[test]
    fn test_missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            BincodeBag::open(dir.path().join("nope.bag")),
            Err(BagError::Open { .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.bag");
        let mut header = BagHeader::new(Vec::new(), 0);
        header.magic = *b"NOTABAG!";
        std::fs::write(&path, bincode::serialize(&header).unwrap()).unwrap();
        assert!(matches!(BincodeBag::open(&path), Err(BagError::Open { .. })));
    }

    #[test]
    fn test_truncated_bag_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.bag");
        let mut writer = BagWriter::new();
        writer.extend(messages());
        writer.write_bincode(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();

        let results: Vec<_> = BincodeBag::open(&path).unwrap().collect();
        assert_eq!(results.len(), 3);
        assert!(results[..2].iter().all(Result::is_ok));
        assert!(matches!(results[2], Err(ContractError::SourceRead { index: 2, .. })));
    }
}
