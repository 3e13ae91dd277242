//! IMU normalizer

use contracts::{msgs, ContractError, Imu, NormalizedRecord, Quaternion, RecordKind, Vector3};

use crate::normalizers::common::NormalizerContext;

fn vector(v: &msgs::Vector3Msg) -> Vector3 {
    Vector3::new(v.x, v.y, v.z)
}

/// Orientation is unknown when its covariance starts with -1
fn imu_to_records(
    ctx: &mut NormalizerContext,
    imu: msgs::Imu,
) -> Result<Vec<NormalizedRecord>, ContractError> {
    let orientation = (imu.orientation_covariance[0] != -1.0).then(|| {
        let q = imu.orientation;
        Quaternion::new(q.w, q.x, q.y, q.z)
    });

    let record = Imu {
        sensor_label: ctx.label.clone(),
        timestamp: imu.header.stamp_ns,
        sensor_pose: ctx.sensor_pose,
        orientation,
        angular_velocity: vector(&imu.angular_velocity),
        linear_acceleration: vector(&imu.linear_acceleration),
    };
    Ok(vec![record.into()])
}

define_normalizer!(ImuNormalizer, RecordKind::Imu, msgs::Imu, imu_to_records);
