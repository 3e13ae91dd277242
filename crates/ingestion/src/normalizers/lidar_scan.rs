//! Planar laser scan normalizer

use contracts::{msgs, ContractError, LidarScan, NormalizedRecord, RecordKind};

use crate::normalizers::common::NormalizerContext;

/// A ray is valid when finite and inside `[range_min, range_max]`
fn lidar_scan_to_records(
    ctx: &mut NormalizerContext,
    scan: msgs::LaserScan,
) -> Result<Vec<NormalizedRecord>, ContractError> {
    let (ranges, valid): (Vec<f32>, Vec<bool>) = scan
        .ranges
        .iter()
        .map(|&r| {
            let ok = r.is_finite() && r >= scan.range_min && r <= scan.range_max;
            (if r.is_finite() { r } else { 0.0 }, ok)
        })
        .unzip();

    let record = LidarScan {
        sensor_label: ctx.label.clone(),
        timestamp: scan.header.stamp_ns,
        sensor_pose: ctx.sensor_pose,
        aperture: (scan.angle_max - scan.angle_min).abs(),
        right_to_left: scan.angle_increment >= 0.0,
        max_range: scan.range_max,
        ranges,
        valid,
    };
    Ok(vec![record.into()])
}

define_normalizer!(
    LidarScanNormalizer,
    RecordKind::LidarScan,
    msgs::LaserScan,
    lidar_scan_to_records
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use contracts::msgs::Header;
    use contracts::{Pose, RawMessage, SerializationFormat};

    fn scan_msg(format: SerializationFormat, scan: &msgs::LaserScan) -> RawMessage {
        RawMessage::new(
            "/scan",
            1,
            "sensor_msgs/msg/LaserScan",
            format.encode(scan).unwrap(),
        )
    }

    fn scan() -> msgs::LaserScan {
        msgs::LaserScan {
            header: Header {
                stamp_ns: 42,
                frame_id: "laser".into(),
            },
            angle_min: -1.0,
            angle_max: 1.0,
            angle_increment: 1.0,
            range_min: 0.1,
            range_max: 10.0,
            ranges: vec![0.05, 5.0, f32::INFINITY, 12.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_validity_and_stamp() {
        let pose = Pose::from_translation(0.2, 0.0, 0.3);
        let mut n = LidarScanNormalizer::new("front", SerializationFormat::Bincode, pose);
        let out = n
            .normalize(&scan_msg(SerializationFormat::Bincode, &scan()))
            .unwrap();

        let NormalizedRecord::LidarScan(r) = &out[0] else {
            panic!("expected lidar scan, got {:?}", out[0].kind());
        };
        assert_eq!(r.sensor_label, "front");
        // header stamp, not the bag receive time
        assert_eq!(r.timestamp, 42);
        assert_eq!(r.valid, vec![false, true, false, false]);
        assert_eq!(r.ranges[2], 0.0);
        assert_eq!(r.aperture, 2.0);
        assert!(r.right_to_left);
        assert_eq!(r.sensor_pose, pose);
    }

    #[test]
    fn test_json_payload() {
        let mut n = LidarScanNormalizer::new("front", SerializationFormat::Json, Pose::IDENTITY);
        let out = n.normalize(&scan_msg(SerializationFormat::Json, &scan())).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(n.kind(), RecordKind::LidarScan);
    }

    #[test]
    fn test_undecodable_payload_is_recoverable() {
        let mut n = LidarScanNormalizer::new("front", SerializationFormat::Json, Pose::IDENTITY);
        let msg = RawMessage::new("/scan", 1, "sensor_msgs/msg/LaserScan", b"{".to_vec());
        assert!(n.normalize(&msg).unwrap_err().is_recoverable());
    }
}
