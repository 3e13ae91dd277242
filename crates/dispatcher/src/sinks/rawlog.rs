//! RawlogSink - append-only record log on disk
//!
//! Two encodings, picked from the output path:
//! - `*.jsonl`: one JSON record per line
//! - anything else: an 8-byte magic, then `u32` little-endian length-prefixed
//!   bincode records

use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use contracts::{ContractError, NormalizedRecord, RecordSink};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, instrument};

use crate::error::DispatcherError;
use crate::metrics::SinkMetrics;

/// Leading bytes of a bincode rawlog
pub const RAWLOG_MAGIC: &[u8; 8] = b"BSCRIBE1";

/// On-disk record encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawlogFormat {
    Bincode,
    JsonLines,
}

impl RawlogFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") => Self::JsonLines,
            _ => Self::Bincode,
        }
    }
}

/// Sink that appends records to a file
pub struct RawlogSink {
    name: String,
    path: PathBuf,
    format: RawlogFormat,
    writer: Option<BufWriter<tokio::fs::File>>,
    metrics: SinkMetrics,
}

impl RawlogSink {
    /// Create the output file.
    ///
    /// # Errors
    /// The file exists and `overwrite` is false, or it cannot be created.
    #[instrument(name = "rawlog_sink_create", skip(name), fields(path = %path.as_ref().display()))]
    pub async fn create(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        overwrite: bool,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let path = path.as_ref().to_path_buf();
        let format = RawlogFormat::from_path(&path);

        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let file = options.open(&path).await.map_err(|e| {
            let message = if e.kind() == ErrorKind::AlreadyExists {
                format!(
                    "output '{}' already exists (use overwrite to replace it)",
                    path.display()
                )
            } else {
                format!("cannot create '{}': {e}", path.display())
            };
            DispatcherError::sink_creation(&name, message)
        })?;

        let mut writer = BufWriter::new(file);
        let metrics = SinkMetrics::new();
        if format == RawlogFormat::Bincode {
            writer.write_all(RAWLOG_MAGIC).await?;
            metrics.add_bytes(RAWLOG_MAGIC.len() as u64);
        }

        debug!(sink = %name, ?format, "Rawlog created");
        Ok(Self {
            name,
            path,
            format,
            writer: Some(writer),
            metrics,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> RawlogFormat {
        self.format
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    fn encode(&self, record: &NormalizedRecord) -> Result<Vec<u8>, ContractError> {
        match self.format {
            RawlogFormat::Bincode => {
                let body = bincode::serialize(record)
                    .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
                let len = u32::try_from(body.len()).map_err(|_| {
                    ContractError::sink_write(&self.name, "record larger than 4 GiB")
                })?;
                let mut frame = Vec::with_capacity(body.len() + 4);
                frame.extend_from_slice(&len.to_le_bytes());
                frame.extend_from_slice(&body);
                Ok(frame)
            }
            RawlogFormat::JsonLines => {
                let mut line = serde_json::to_vec(record)
                    .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
                line.push(b'\n');
                Ok(line)
            }
        }
    }

    async fn persist(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(ContractError::sink_write(&self.name, "sink is closed"));
        };
        writer.write_all(bytes).await.map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl RecordSink for RawlogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        level = "trace",
        name = "rawlog_sink_write",
        skip(self, record),
        fields(sink = %self.name, kind = %record.kind())
    )]
    async fn write(&mut self, record: &NormalizedRecord) -> Result<(), ContractError> {
        let bytes = self.encode(record)?;
        match self.persist(&bytes).await {
            Ok(()) => {
                self.metrics.inc_write_count();
                self.metrics.add_bytes(bytes.len() as u64);
                Ok(())
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                Err(e)
            }
        }
    }

    #[instrument(level = "trace", name = "rawlog_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .await
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "rawlog_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .shutdown()
                .await
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
            info!(
                sink = %self.name,
                path = %self.path.display(),
                records = self.metrics.write_count(),
                bytes = self.metrics.bytes_written(),
                "Rawlog closed"
            );
        }
        Ok(())
    }
}

/// Read every record of a rawlog written by [`RawlogSink`].
///
/// # Errors
/// IO failure, a bad magic, or a truncated/undecodable record.
pub fn read_rawlog(path: impl AsRef<Path>) -> Result<Vec<NormalizedRecord>, ContractError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);

    match RawlogFormat::from_path(path) {
        RawlogFormat::JsonLines => {
            let mut text = String::new();
            reader.read_to_string(&mut text)?;
            text.lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(i, line)| {
                    serde_json::from_str(line)
                        .map_err(|e| ContractError::source_read(i as u64, e.to_string()))
                })
                .collect()
        }
        RawlogFormat::Bincode => {
            let mut magic = [0u8; 8];
            reader.read_exact(&mut magic)?;
            if &magic != RAWLOG_MAGIC {
                return Err(ContractError::source_read(0, "not a rawlog (bad magic)"));
            }

            let mut records = Vec::new();
            loop {
                let mut len = [0u8; 4];
                match reader.read_exact(&mut len) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                    Err(e) => return Err(e.into()),
                }
                let mut body = vec![0u8; u32::from_le_bytes(len) as usize];
                let index = records.len() as u64;
                reader
                    .read_exact(&mut body)
                    .map_err(|e| ContractError::source_read(index, e.to_string()))?;
                let record = bincode::deserialize(&body)
                    .map_err(|e| ContractError::source_read(index, e.to_string()))?;
                records.push(record);
            }
            Ok(records)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{LidarScan, MotionIncrement, Pose};

    fn records() -> Vec<NormalizedRecord> {
        vec![
            MotionIncrement {
                sensor_label: "front".into(),
                timestamp: 10,
                increment: Pose::from_translation(0.5, 0.0, 0.0),
            }
            .into(),
            LidarScan {
                sensor_label: "front".into(),
                timestamp: 10,
                sensor_pose: Pose::IDENTITY,
                aperture: std::f32::consts::PI,
                right_to_left: true,
                max_range: 30.0,
                ranges: vec![1.0, 2.0, 0.0],
                valid: vec![true, true, false],
            }
            .into(),
        ]
    }

    #[tokio::test]
    async fn test_bincode_rawlog_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.rawlog");

        let mut sink = RawlogSink::create("rawlog", &path, false).await.unwrap();
        for record in records() {
            sink.write(&record).await.unwrap();
        }
        sink.flush().await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(sink.metrics().write_count(), 2);
        assert_eq!(read_rawlog(&path).unwrap(), records());
    }

    #[tokio::test]
    async fn test_jsonl_rawlog_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");

        let mut sink = RawlogSink::create("rawlog", &path, false).await.unwrap();
        assert_eq!(sink.format(), RawlogFormat::JsonLines);
        for record in records() {
            sink.write(&record).await.unwrap();
        }
        sink.close().await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(read_rawlog(&path).unwrap(), records());
    }

    #[tokio::test]
    async fn test_existing_output_needs_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.rawlog");
        std::fs::write(&path, b"previous").unwrap();

        let refused = RawlogSink::create("rawlog", &path, false).await;
        assert!(matches!(refused, Err(DispatcherError::SinkCreation { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), b"previous");

        let mut sink = RawlogSink::create("rawlog", &path, true).await.unwrap();
        sink.close().await.unwrap();
        assert!(read_rawlog(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RawlogSink::create("rawlog", dir.path().join("x.rawlog"), false)
            .await
            .unwrap();
        sink.close().await.unwrap();

        let err = sink.write(&records()[0]).await.unwrap_err();
        assert!(matches!(err, ContractError::SinkWrite { .. }));
        assert_eq!(sink.metrics().failure_count(), 1);
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.rawlog");
        std::fs::write(&path, b"NOTARAWLOG").unwrap();
        assert!(matches!(
            read_rawlog(&path),
            Err(ContractError::SourceRead { .. })
        ));
    }
}
