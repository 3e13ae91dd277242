//! Wire message structs
//!
//! ROS-shaped message bodies as they appear inside `RawMessage::payload`.
//! Payloads are decoded with the run's [`SerializationFormat`](crate::SerializationFormat).

use serde::{Deserialize, Serialize};

/// Standard message header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Acquisition stamp (nanoseconds)
    pub stamp_ns: u64,
    /// Coordinate frame the data is expressed in
    pub frame_id: String,
}

/// Probe used to read only the header of any stamped message.
///
/// Every stamped message below starts with `header`, so this decodes with
/// bincode (trailing bytes ignored) and with JSON (unknown fields ignored).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Stamped {
    pub header: Header,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3Msg {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuaternionMsg {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for QuaternionMsg {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformMsg {
    pub translation: Vector3Msg,
    pub rotation: QuaternionMsg,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformStamped {
    /// `header.frame_id` is the parent frame
    pub header: Header,
    pub child_frame_id: String,
    pub transform: TransformMsg,
}

/// Body of both the dynamic and the static transform topics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfMessage {
    pub transforms: Vec<TransformStamped>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    pub header: Header,
    pub angle_min: f32,
    pub angle_max: f32,
    pub angle_increment: f32,
    pub time_increment: f32,
    pub scan_time: f32,
    pub range_min: f32,
    pub range_max: f32,
    pub ranges: Vec<f32>,
    #[serde(default)]
    pub intensities: Vec<f32>,
}

/// `PointField::datatype` codes
pub mod point_field {
    pub const INT8: u8 = 1;
    pub const UINT8: u8 = 2;
    pub const INT16: u8 = 3;
    pub const UINT16: u8 = 4;
    pub const INT32: u8 = 5;
    pub const UINT32: u8 = 6;
    pub const FLOAT32: u8 = 7;
    pub const FLOAT64: u8 = 8;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointField {
    pub name: String,
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud2 {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    pub point_step: u32,
    pub row_step: u32,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    pub is_dense: bool,
}

impl PointCloud2 {
    pub fn field(&self, name: &str) -> Option<&PointField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Imu {
    pub header: Header,
    pub orientation: QuaternionMsg,
    pub orientation_covariance: [f64; 9],
    pub angular_velocity: Vector3Msg,
    pub angular_velocity_covariance: [f64; 9],
    pub linear_acceleration: Vector3Msg,
    pub linear_acceleration_covariance: [f64; 9],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseMsg {
    pub position: Vector3Msg,
    pub orientation: QuaternionMsg,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TwistMsg {
    pub linear: Vector3Msg,
    pub angular: Vector3Msg,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    pub header: Header,
    pub child_frame_id: String,
    pub pose: PoseMsg,
    pub twist: TwistMsg,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    /// Pixel encoding, e.g. `rgb8`, `mono16`, `32FC1`
    pub encoding: String,
    pub is_bigendian: bool,
    /// Row length in bytes
    pub step: u32,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub distortion_model: String,
    /// Distortion coefficients (length depends on the model)
    pub d: Vec<f64>,
    /// Row-major 3x3 intrinsic matrix
    pub k: [f64; 9],
}
