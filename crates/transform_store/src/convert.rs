//! `Pose` <-> nalgebra conversions.

use contracts::{Pose, Quaternion, Vector3};
use nalgebra::{Isometry3, Quaternion as NaQuaternion, Translation3, UnitQuaternion};

/// Convert a pose into an isometry; the rotation is renormalized.
pub fn to_isometry(pose: &Pose) -> Isometry3<f64> {
    let t = pose.translation;
    let q = pose.rotation;
    Isometry3::from_parts(
        Translation3::new(t.x, t.y, t.z),
        UnitQuaternion::from_quaternion(NaQuaternion::new(q.w, q.x, q.y, q.z)),
    )
}

pub fn from_isometry(iso: &Isometry3<f64>) -> Pose {
    let t = iso.translation.vector;
    let q = iso.rotation.quaternion();
    Pose::new(
        Vector3::new(t.x, t.y, t.z),
        Quaternion::new(q.w, q.i, q.j, q.k),
    )
}
