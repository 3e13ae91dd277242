//! Wheel odometry normalizer

use contracts::{msgs, ContractError, NormalizedRecord, Odometry, Quaternion, RecordKind};

use crate::normalizers::common::NormalizerContext;

/// Planar pose plus local velocities
fn odometry_to_records(
    ctx: &mut NormalizerContext,
    odom: msgs::Odometry,
) -> Result<Vec<NormalizedRecord>, ContractError> {
    let q = odom.pose.orientation;
    let record = Odometry {
        sensor_label: ctx.label.clone(),
        timestamp: odom.header.stamp_ns,
        x: odom.pose.position.x,
        y: odom.pose.position.y,
        yaw: Quaternion::new(q.w, q.x, q.y, q.z).yaw(),
        vx: odom.twist.linear.x,
        vy: odom.twist.linear.y,
        omega: odom.twist.angular.z,
    };
    Ok(vec![record.into()])
}

define_normalizer!(
    OdometryNormalizer,
    RecordKind::Odometry,
    msgs::Odometry,
    odometry_to_records
);
