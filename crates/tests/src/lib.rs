//! # Integration Tests
//!
//! Cross-crate flows: recording on disk -> pipeline -> driver -> output log.

#[cfg(test)]
mod fixtures {
    //! Message builders for the end-to-end flows

    use contracts::msgs::{self, Header};
    use contracts::{Pose, RawMessage, SerializationFormat};
    use ingestion::normalizers::tf_payload;

    pub const FORMAT: SerializationFormat = SerializationFormat::Bincode;

    pub const CONFIG: &str = r#"
root_frame = "map"

[transforms]
unresolved_anchor = "count"

[sensors.front]
type = "lidar_scan"
topic = "/scan"

[sensors.wheels]
type = "odometry"
topic = "/odom"
pose_gated = true
"#;

    pub fn header(stamp_ns: u64, frame_id: &str) -> Header {
        Header {
            stamp_ns,
            frame_id: frame_id.into(),
        }
    }

    pub fn tf(format: SerializationFormat, stamp: u64, x: f64) -> RawMessage {
        let payload =
            tf_payload(format, "map", "base_link", stamp, &Pose::from_translation(x, 0.0, 0.0)).unwrap();
        RawMessage::new("/tf", stamp, "tf2_msgs/msg/TFMessage", payload)
    }

    pub fn odometry(format: SerializationFormat, stamp: u64) -> RawMessage {
        let odom = msgs::Odometry {
            header: header(stamp, "base_link"),
            ..Default::default()
        };
        RawMessage::new("/odom", stamp, "nav_msgs/msg/Odometry", format.encode(&odom).unwrap())
    }

    pub fn laser_scan(format: SerializationFormat, stamp: u64) -> RawMessage {
        let scan = msgs::LaserScan {
            header: header(stamp, "laser"),
            angle_min: -0.5,
            angle_max: 0.5,
            angle_increment: 0.5,
            range_min: 0.1,
            range_max: 10.0,
            ranges: vec![1.0, 20.0, 2.0],
            ..Default::default()
        };
        RawMessage::new("/scan", stamp, "sensor_msgs/msg/LaserScan", format.encode(&scan).unwrap())
    }

    /// tf at 100/200/300, odometry between them, one scan, one unknown channel
    pub fn recording(format: SerializationFormat) -> Vec<RawMessage> {
        vec![
            tf(format, 100, 0.0),
            odometry(format, 150),
            laser_scan(format, 160),
            RawMessage::new("/diagnostics", 170, "diagnostic_msgs/msg/DiagnosticArray", vec![0u8]),
            tf(format, 200, 1.0),
            odometry(format, 250),
            RawMessage::new("/diagnostics", 270, "diagnostic_msgs/msg/DiagnosticArray", vec![0u8]),
            tf(format, 300, 3.0),
        ]
    }
}

#[cfg(test)]
mod e2e_tests {
    use bag_reader::{open_bag, BagWriter, JsonlMetadata, MemoryBag, MESSAGES_FILE, METADATA_FILE};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ChannelInfo, MotionIncrement, NormalizedRecord, RecordKind, SerializationFormat};
    use dispatcher::{read_rawlog, DispatcherError, MemorySink, RawlogSink};
    use ingestion::TranscriptionPipeline;

    use crate::fixtures::{self, FORMAT};

    fn pipeline(format: SerializationFormat) -> TranscriptionPipeline {
        let blueprint = ConfigLoader::load_from_str(fixtures::CONFIG, ConfigFormat::Toml).unwrap();
        TranscriptionPipeline::from_blueprint(&blueprint, format).unwrap()
    }

    fn kinds(records: &[NormalizedRecord]) -> Vec<RecordKind> {
        records.iter().map(NormalizedRecord::kind).collect()
    }

    /// End-to-end: bincode bag -> pipeline -> driver -> rawlog -> read back
    #[tokio::test]
    async fn test_e2e_bincode_bag_to_rawlog() {
        let dir = tempfile::tempdir().unwrap();
        let bag_path = dir.path().join("run.bag");
        let out_path = dir.path().join("run.rawlog");

        let mut writer = BagWriter::new();
        writer.extend(fixtures::recording(FORMAT));
        writer.write_bincode(&bag_path).unwrap();

        let source = open_bag(&bag_path, None).unwrap();
        let mut sink = RawlogSink::create("rawlog", &out_path, false).await.unwrap();
        let (mut driver, probe) = pipeline(FORMAT).into_driver();

        let report = driver.run(source, &mut sink).await.unwrap();
        let records = read_rawlog(&out_path).unwrap();

        // odometry@150 is held until tf@200 brackets it; the second fire uses tf@300
        assert_eq!(
            kinds(&records),
            [
                RecordKind::LidarScan,
                RecordKind::MotionIncrement,
                RecordKind::Odometry,
                RecordKind::MotionIncrement,
                RecordKind::Odometry,
            ]
        );
        assert_eq!(records.iter().map(|r| r.timestamp()).collect::<Vec<_>>(), [160, 150, 150, 250, 250]);

        match &records[3] {
            NormalizedRecord::MotionIncrement(MotionIncrement { increment, .. }) => {
                assert!((increment.translation.x - 1.5).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(report.messages_read, 8);
        assert_eq!(report.records_written, 5);
        assert_eq!(report.records_per_kind[&RecordKind::MotionIncrement], 2);
        assert_eq!(report.unhandled_channels.len(), 1);
        assert_eq!(report.unhandled_channels[0].as_str(), "/diagnostics");
        assert_eq!(report.unhandled_messages, 2);
        assert_eq!(report.sink.write_count, 5);

        let stats = probe.stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].1.fired, 2);
    }

    /// Inline JSON payloads in a jsonl directory bag
    #[tokio::test]
    async fn test_e2e_jsonl_bag_with_json_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let bag_dir = dir.path().join("run");
        std::fs::create_dir(&bag_dir).unwrap();

        let messages = fixtures::recording(SerializationFormat::Json);
        let metadata = JsonlMetadata {
            channels: vec![
                ChannelInfo::new("/tf", "tf2_msgs/msg/TFMessage"),
                ChannelInfo::new("/odom", "nav_msgs/msg/Odometry"),
                ChannelInfo::new("/scan", "sensor_msgs/msg/LaserScan"),
            ],
            message_count: messages.len() as u64,
        };
        std::fs::write(bag_dir.join(METADATA_FILE), serde_json::to_vec(&metadata).unwrap()).unwrap();

        let lines: Vec<String> = messages
            .iter()
            .map(|m| {
                let data: serde_json::Value = serde_json::from_slice(&m.payload)
                    .unwrap_or_else(|_| serde_json::Value::from(m.payload.to_vec()));
                serde_json::json!({
                    "channel": m.channel_id.as_str(),
                    "timestamp": m.timestamp,
                    "data": data,
                })
                .to_string()
            })
            .collect();
        std::fs::write(bag_dir.join(MESSAGES_FILE), lines.join("\n")).unwrap();

        let source = open_bag(&bag_dir, None).unwrap();
        let mut sink = MemorySink::new("memory");
        let (mut driver, _) = pipeline(SerializationFormat::Json).into_driver();
        let report = driver.run(source, &mut sink).await.unwrap();

        assert_eq!(report.records_written, 5);
        assert_eq!(report.dropped_messages, 0);
        assert!(sink.is_closed());
    }

    /// A payload that does not decode is dropped, the pass continues
    #[tokio::test]
    async fn test_malformed_payload_is_dropped() {
        let mut messages = fixtures::recording(FORMAT);
        messages.insert(
            2,
            contracts::RawMessage::new("/scan", 155, "sensor_msgs/msg/LaserScan", vec![0xffu8; 3]),
        );

        let mut sink = MemorySink::new("memory");
        let (mut driver, _) = pipeline(FORMAT).into_driver();
        let report = driver.run(MemoryBag::new(messages), &mut sink).await.unwrap();

        assert_eq!(report.dropped_messages, 1);
        assert_eq!(report.records_written, 5);
    }

    /// A corrupt recording aborts; earlier records stay in the sink
    #[tokio::test]
    async fn test_truncated_bag_aborts_pass() {
        let dir = tempfile::tempdir().unwrap();
        let bag_path = dir.path().join("cut.bag");

        let mut writer = BagWriter::new();
        writer.extend(fixtures::recording(FORMAT));
        writer.write_bincode(&bag_path).unwrap();
        let bytes = std::fs::read(&bag_path).unwrap();
        std::fs::write(&bag_path, &bytes[..bytes.len() - 4]).unwrap();

        let mut sink = MemorySink::new("memory");
        let (mut driver, _) = pipeline(FORMAT).into_driver();
        let err = driver
            .run(open_bag(&bag_path, None).unwrap(), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatcherError::Contract(contracts::ContractError::SourceRead { .. })
        ));
        assert_eq!(kinds(sink.records())[0], RecordKind::LidarScan);
        assert!(!sink.is_closed());
    }

    /// Same recording, same output, regardless of storage
    #[tokio::test]
    async fn test_storages_agree() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BagWriter::new();
        writer.extend(fixtures::recording(FORMAT));
        writer.write_bincode(dir.path().join("a.bag")).unwrap();
        writer.write_jsonl(dir.path().join("b")).unwrap();

        let mut outputs = Vec::new();
        for path in [dir.path().join("a.bag"), dir.path().join("b")] {
            let mut sink = MemorySink::new("memory");
            let (mut driver, _) = pipeline(FORMAT).into_driver();
            driver.run(open_bag(&path, None).unwrap(), &mut sink).await.unwrap();
            outputs.push(sink.into_records());
        }
        assert_eq!(outputs[0], outputs[1]);
    }
}
