//! Sensor normalizers
//!
//! Each normalizer converts the raw messages of one configured sensor into
//! `NormalizedRecord`s stamped with the sensor label and header stamp.

#[macro_use]
mod macros;

pub mod common;
mod image;
mod imu;
mod lidar_scan;
mod odometry;
mod point_cloud;
mod range_image;
mod rotating_scan;
mod tf;

pub use image::ImageNormalizer;
pub use imu::ImuNormalizer;
pub use lidar_scan::LidarScanNormalizer;
pub use odometry::OdometryNormalizer;
pub use point_cloud::PointCloudNormalizer;
pub use range_image::{RangeImageNormalizer, DEPTH_ENCODING, OPTICAL_TO_BODY, RANGE_UNITS};
pub use rotating_scan::{RotatingScanNormalizer, MAX_RINGS};
pub use tf::{tf_payload, TransformIngestor};
