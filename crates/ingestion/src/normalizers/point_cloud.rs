//! Generic point cloud normalizer
//!
//! XYZI when the cloud carries a readable `intensity` field, geometry only
//! otherwise. Clouds without x/y/z are skipped.

use contracts::{msgs, ContractError, NormalizedRecord, PointCloud, RecordKind};

use crate::normalizers::common::{xyz_readers, CloudLayout, FieldReader, NormalizerContext};

fn point_cloud_to_records(
    ctx: &mut NormalizerContext,
    cloud: msgs::PointCloud2,
) -> Result<Vec<NormalizedRecord>, ContractError> {
    let Some([x, y, z]) = xyz_readers(ctx, &cloud)? else {
        ctx.warn_once("missing_xyz", "point cloud has no x/y/z fields, skipping it");
        return Ok(Vec::new());
    };
    let layout = CloudLayout::of(ctx, &cloud)?;
    let intensity = intensity_reader(ctx, &cloud);

    let mut points = Vec::with_capacity(layout.len());
    let mut intensities = Vec::new();
    for point in layout.points(&cloud.data) {
        let p = [x.read(point) as f32, y.read(point) as f32, z.read(point) as f32];
        if !p.iter().all(|v| v.is_finite()) {
            continue;
        }
        points.push(p);
        if let Some(i) = &intensity {
            intensities.push(i.read(point) as f32);
        }
    }

    let record = PointCloud {
        sensor_label: ctx.label.clone(),
        timestamp: cloud.header.stamp_ns,
        sensor_pose: ctx.sensor_pose,
        points,
        intensities,
    };
    Ok(vec![record.into()])
}

/// `None` (with a one-time notice) falls back to geometry only
fn intensity_reader(ctx: &mut NormalizerContext, cloud: &msgs::PointCloud2) -> Option<FieldReader> {
    let Some(field) = cloud.field("intensity") else {
        ctx.warn_once(
            "no_intensity",
            "point cloud has no intensity field, writing geometry only",
        );
        return None;
    };
    let reader = FieldReader::new(field, cloud.point_step as usize, cloud.is_bigendian);
    if reader.is_none() {
        ctx.warn_once(
            "bad_intensity",
            "point cloud intensity field is unreadable, writing geometry only",
        );
    }
    reader
}

define_normalizer!(
    PointCloudNormalizer,
    RecordKind::PointCloud,
    msgs::PointCloud2,
    point_cloud_to_records
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use crate::normalizers::common::testing::f32_cloud;
    use contracts::{Pose, RawMessage, SerializationFormat};

    fn normalize(cloud: &msgs::PointCloud2) -> Result<Vec<NormalizedRecord>, ContractError> {
        let mut n = PointCloudNormalizer::new("velo", SerializationFormat::Bincode, Pose::IDENTITY);
        normalize_with(&mut n, cloud)
    }

    fn normalize_with(
        n: &mut PointCloudNormalizer,
        cloud: &msgs::PointCloud2,
    ) -> Result<Vec<NormalizedRecord>, ContractError> {
        let payload = SerializationFormat::Bincode.encode(cloud).unwrap();
        n.normalize(&RawMessage::new("/points", 7, "sensor_msgs/msg/PointCloud2", payload))
    }

    fn only_cloud(out: &[NormalizedRecord]) -> &PointCloud {
        assert_eq!(out.len(), 1);
        match &out[0] {
            NormalizedRecord::PointCloud(c) => c,
            other => panic!("expected point cloud, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_xyzi_cloud() {
        let cloud = f32_cloud(
            &["x", "y", "z", "intensity"],
            &[vec![1.0, 2.0, 3.0, 0.5], vec![4.0, 5.0, 6.0, 0.25]],
        );
        let out = normalize(&cloud).unwrap();
        let c = only_cloud(&out);
        assert_eq!(c.points, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(c.intensities, vec![0.5, 0.25]);
        assert_eq!(c.timestamp, 1_000);
    }

    #[test]
    fn test_missing_intensity_keeps_geometry() {
        let cloud = f32_cloud(&["x", "y", "z"], &[vec![1.0, 2.0, 3.0]]);
        let out = normalize(&cloud).unwrap();
        let c = only_cloud(&out);
        assert_eq!(c.points.len(), 1);
        assert!(!c.has_intensity());
    }

    #[test]
    fn test_unreadable_intensity_falls_back() {
        let mut cloud = f32_cloud(
            &["x", "y", "z", "intensity"],
            &[vec![1.0, 2.0, 3.0, 9.0]],
        );
        cloud.fields[3].datatype = 99;
        let out = normalize(&cloud).unwrap();
        assert!(!only_cloud(&out).has_intensity());
    }

    #[test]
    fn test_missing_xyz_soft_skips() {
        let cloud = f32_cloud(&["x", "y", "intensity"], &[vec![1.0, 2.0, 3.0]]);
        assert!(normalize(&cloud).unwrap().is_empty());
    }

    #[test]
    fn test_warns_once_per_sensor() {
        let mut n = PointCloudNormalizer::new("velo", SerializationFormat::Bincode, Pose::IDENTITY);
        let cloud = f32_cloud(&["x", "y"], &[vec![1.0, 2.0]]);
        normalize_with(&mut n, &cloud).unwrap();
        normalize_with(&mut n, &cloud).unwrap();
        assert!(!n.ctx.warned.first("missing_xyz"));
    }

    #[test]
    fn test_non_finite_points_dropped() {
        let cloud = f32_cloud(
            &["x", "y", "z"],
            &[vec![f32::NAN, 0.0, 0.0], vec![1.0, 1.0, 1.0]],
        );
        let out = normalize(&cloud).unwrap();
        assert_eq!(only_cloud(&out).points, vec![[1.0, 1.0, 1.0]]);
    }

    #[test]
    fn test_truncated_buffer_is_fatal() {
        let mut cloud = f32_cloud(&["x", "y", "z"], &[vec![1.0, 2.0, 3.0]]);
        cloud.data.truncate(8);
        let err = normalize(&cloud).unwrap_err();
        assert!(matches!(err, ContractError::Normalize { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_xyz_outside_stride_is_fatal() {
        let mut cloud = f32_cloud(&["x", "y", "z"], &[vec![1.0, 2.0, 3.0]]);
        cloud.fields[2].offset = 10;
        assert!(matches!(
            normalize(&cloud),
            Err(ContractError::Normalize { .. })
        ));
    }
}
