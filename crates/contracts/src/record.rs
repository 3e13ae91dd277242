//! NormalizedRecord - normalizer output
//!
//! Strongly-typed observation records handed to the sink. Every variant carries
//! the configured sensor label and the acquisition stamp of its source message.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Pose, Quaternion, Vector3};

/// Record kind tag, used for metrics labels and report counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    LidarScan,
    RotatingScan,
    PointCloud,
    Imu,
    Odometry,
    Image,
    RangeImage,
    MotionIncrement,
}

impl RecordKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LidarScan => "lidar_scan",
            Self::RotatingScan => "rotating_scan",
            Self::PointCloud => "point_cloud",
            Self::Imu => "imu",
            Self::Odometry => "odometry",
            Self::Image => "image",
            Self::RangeImage => "range_image",
            Self::MotionIncrement => "motion_increment",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Planar range scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidarScan {
    pub sensor_label: String,
    pub timestamp: u64,
    /// Pose of the sensor on the vehicle
    pub sensor_pose: Pose,
    /// Angular span covered by the rays (radians)
    pub aperture: f32,
    /// `true` when rays sweep counter-clockwise (positive increment)
    pub right_to_left: bool,
    pub max_range: f32,
    pub ranges: Vec<f32>,
    /// Per-ray validity, same length as `ranges`
    pub valid: Vec<bool>,
}

/// Organised scan of a multi-ring spinning lidar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatingScan {
    pub sensor_label: String,
    pub timestamp: u64,
    pub sensor_pose: Pose,
    pub rows: usize,
    pub columns: usize,
    /// Row-major `rows x columns` ranges in metres, 0 means no return
    pub ranges: Vec<f32>,
    /// Same layout as `ranges`; empty when the cloud has no intensity
    pub intensities: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub sensor_label: String,
    pub timestamp: u64,
    pub sensor_pose: Pose,
    pub points: Vec<[f32; 3]>,
    /// Empty for geometry-only clouds, else one value per point
    pub intensities: Vec<f32>,
}

impl PointCloud {
    pub fn has_intensity(&self) -> bool {
        !self.intensities.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imu {
    pub sensor_label: String,
    pub timestamp: u64,
    pub sensor_pose: Pose,
    /// Absent when the source marks orientation as unknown
    pub orientation: Option<Quaternion>,
    pub angular_velocity: Vector3,
    pub linear_acceleration: Vector3,
}

/// Planar odometry reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    pub sensor_label: String,
    pub timestamp: u64,
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub sensor_label: String,
    pub timestamp: u64,
    pub sensor_pose: Pose,
    pub width: u32,
    pub height: u32,
    pub encoding: String,
    pub step: u32,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// Pinhole intrinsics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// k1, k2, p1, p2, k3
    pub distortion: [f64; 5],
}

/// Depth camera frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeImage {
    pub sensor_label: String,
    pub timestamp: u64,
    pub sensor_pose: Pose,
    pub rows: u32,
    pub columns: u32,
    /// Row-major ranges in `range_units`
    pub ranges: Vec<u16>,
    pub range_units: f32,
    /// `true` when values are z-depth rather than ray length
    pub range_is_depth: bool,
    pub intrinsics: CameraIntrinsics,
}

/// Rigid motion of the anchor frame since the previous fire of a synchronizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionIncrement {
    pub sensor_label: String,
    pub timestamp: u64,
    pub increment: Pose,
}

/// Output record of the transcriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NormalizedRecord {
    LidarScan(LidarScan),
    RotatingScan(RotatingScan),
    PointCloud(PointCloud),
    Imu(Imu),
    Odometry(Odometry),
    Image(Image),
    RangeImage(RangeImage),
    MotionIncrement(MotionIncrement),
}

impl NormalizedRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::LidarScan(_) => RecordKind::LidarScan,
            Self::RotatingScan(_) => RecordKind::RotatingScan,
            Self::PointCloud(_) => RecordKind::PointCloud,
            Self::Imu(_) => RecordKind::Imu,
            Self::Odometry(_) => RecordKind::Odometry,
            Self::Image(_) => RecordKind::Image,
            Self::RangeImage(_) => RecordKind::RangeImage,
            Self::MotionIncrement(_) => RecordKind::MotionIncrement,
        }
    }

    pub fn sensor_label(&self) -> &str {
        match self {
            Self::LidarScan(r) => &r.sensor_label,
            Self::RotatingScan(r) => &r.sensor_label,
            Self::PointCloud(r) => &r.sensor_label,
            Self::Imu(r) => &r.sensor_label,
            Self::Odometry(r) => &r.sensor_label,
            Self::Image(r) => &r.sensor_label,
            Self::RangeImage(r) => &r.sensor_label,
            Self::MotionIncrement(r) => &r.sensor_label,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Self::LidarScan(r) => r.timestamp,
            Self::RotatingScan(r) => r.timestamp,
            Self::PointCloud(r) => r.timestamp,
            Self::Imu(r) => r.timestamp,
            Self::Odometry(r) => r.timestamp,
            Self::Image(r) => r.timestamp,
            Self::RangeImage(r) => r.timestamp,
            Self::MotionIncrement(r) => r.timestamp,
        }
    }
}

macro_rules! impl_from_record {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for NormalizedRecord {
                fn from(r: $variant) -> Self {
                    Self::$variant(r)
                }
            }
        )*
    };
}

impl_from_record!(
    LidarScan,
    RotatingScan,
    PointCloud,
    Imu,
    Odometry,
    Image,
    RangeImage,
    MotionIncrement,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_follow_variant() {
        let rec: NormalizedRecord = Odometry {
            sensor_label: "wheels".into(),
            timestamp: 42,
            x: 1.0,
            y: 2.0,
            yaw: 0.1,
            vx: 0.5,
            vy: 0.0,
            omega: 0.0,
        }
        .into();

        assert_eq!(rec.kind(), RecordKind::Odometry);
        assert_eq!(rec.sensor_label(), "wheels");
        assert_eq!(rec.timestamp(), 42);
    }

    #[test]
    fn bincode_keeps_variant() {
        let rec: NormalizedRecord = MotionIncrement {
            sensor_label: "depth".into(),
            timestamp: 7,
            increment: Pose::IDENTITY,
        }
        .into();
        let bytes = bincode::serialize(&rec).unwrap();
        let back: NormalizedRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, rec);
    }
}
