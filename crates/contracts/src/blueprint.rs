//! TranscriptionBlueprint - Config Loader 输出
//!
//! 描述一次转录：根坐标系、变换来源以及按标签索引的传感器。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::{Pose, Quaternion, Vector3};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的转录配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TranscriptionBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 锚点位姿解析所参照的世界坐标系
    #[serde(default = "default_root_frame")]
    #[validate(length(min = 1, message = "root_frame must not be empty"))]
    pub root_frame: String,

    /// 变换来源设置
    #[serde(default)]
    #[validate(nested)]
    pub transforms: TransformsConfig,

    /// 按标签索引的传感器，迭代顺序即注册顺序
    #[serde(default)]
    pub sensors: BTreeMap<String, SensorConfig>,
}

fn default_root_frame() -> String {
    "map".to_string()
}

/// 变换样本来源及动态历史保留时长
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransformsConfig {
    #[serde(default = "default_dynamic_topic")]
    #[validate(length(min = 1, message = "dynamic_topic must not be empty"))]
    pub dynamic_topic: String,

    #[serde(default = "default_static_topic")]
    #[validate(length(min = 1, message = "static_topic must not be empty"))]
    pub static_topic: String,

    /// 动态历史窗口（秒）
    #[serde(default = "default_cache_duration_sec")]
    #[validate(range(exclusive_min = 0.0, message = "cache_duration_sec must be > 0"))]
    pub cache_duration_sec: f64,

    /// Reporting of fire attempts whose anchor transform does not resolve
    #[serde(default)]
    pub unresolved_anchor: UnresolvedAnchorPolicy,
}

fn default_dynamic_topic() -> String {
    "/tf".to_string()
}

fn default_static_topic() -> String {
    "/tf_static".to_string()
}

fn default_cache_duration_sec() -> f64 {
    10.0
}

impl Default for TransformsConfig {
    fn default() -> Self {
        Self {
            dynamic_topic: default_dynamic_topic(),
            static_topic: default_static_topic(),
            cache_duration_sec: default_cache_duration_sec(),
            unresolved_anchor: UnresolvedAnchorPolicy::default(),
        }
    }
}

impl TransformsConfig {
    pub fn cache_duration_ns(&self) -> u64 {
        (self.cache_duration_sec * 1e9) as u64
    }
}

/// What a synchronizer does when its anchor transform cannot be resolved.
///
/// Firing is skipped in every case; the policy only selects the reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedAnchorPolicy {
    /// Not counted, not logged
    Silent,
    /// Counted in synchronizer stats and metrics, debug log
    #[default]
    Count,
    /// Counted and logged at warn level
    Warn,
}

/// 传感器配置，按 `type` 区分
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorConfig {
    LidarScan(TopicSensorConfig),
    RotatingScan(TopicSensorConfig),
    PointCloud(TopicSensorConfig),
    Imu(TopicSensorConfig),
    Odometry(TopicSensorConfig),
    Image(TopicSensorConfig),
    RangeImage(RangeImageSensorConfig),
}

impl SensorConfig {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::LidarScan(_) => "lidar_scan",
            Self::RotatingScan(_) => "rotating_scan",
            Self::PointCloud(_) => "point_cloud",
            Self::Imu(_) => "imu",
            Self::Odometry(_) => "odometry",
            Self::Image(_) => "image",
            Self::RangeImage(_) => "range_image",
        }
    }

    /// 该传感器消费的通道
    pub fn topics(&self) -> Vec<&str> {
        match self {
            Self::RangeImage(c) => vec![c.depth.as_str(), c.camera_info.as_str()],
            Self::LidarScan(c)
            | Self::RotatingScan(c)
            | Self::PointCloud(c)
            | Self::Imu(c)
            | Self::Odometry(c)
            | Self::Image(c) => vec![c.topic.as_str()],
        }
    }

    /// Whether the sensor's records are gated on an anchor pose
    pub fn is_synchronized(&self) -> bool {
        match self {
            Self::RangeImage(_) => true,
            Self::LidarScan(c)
            | Self::RotatingScan(c)
            | Self::PointCloud(c)
            | Self::Imu(c)
            | Self::Odometry(c)
            | Self::Image(c) => c.pose_gated,
        }
    }
}

/// Sensor read from a single channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSensorConfig {
    pub topic: String,

    /// Wrap in a 1-channel synchronizer so each record gets a motion increment
    #[serde(default)]
    pub pose_gated: bool,

    /// Mounting pose on the vehicle
    #[serde(default)]
    pub sensor_pose: SensorPoseConfig,
}

/// Depth camera read from an image and its calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeImageSensorConfig {
    /// `sensor_msgs/Image` channel (32FC1)
    pub depth: String,

    /// `sensor_msgs/CameraInfo` channel
    pub camera_info: String,

    #[serde(default = "default_true")]
    pub range_is_depth: bool,
}

fn default_true() -> bool {
    true
}

/// 安装位姿：米和弧度
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorPoseConfig {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub roll: f64,
}

impl SensorPoseConfig {
    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.z, self.yaw, self.pitch, self.roll]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn to_pose(&self) -> Pose {
        Pose::new(
            Vector3::new(self.x, self.y, self.z),
            Quaternion::from_ypr(self.yaw, self.pitch, self.roll),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let bp: TranscriptionBlueprint = serde_json::from_str("{}").unwrap();
        assert_eq!(bp.root_frame, "map");
        assert_eq!(bp.transforms.dynamic_topic, "/tf");
        assert_eq!(bp.transforms.static_topic, "/tf_static");
        assert_eq!(bp.transforms.unresolved_anchor, UnresolvedAnchorPolicy::Count);
        assert!(bp.sensors.is_empty());
        assert!(bp.validate().is_ok());
    }

    #[test]
    fn sensor_tag_selects_variant() {
        let json = r#"{
            "sensors": {
                "front": { "type": "lidar_scan", "topic": "/scan" },
                "depth": { "type": "range_image", "depth": "/d", "camera_info": "/ci" }
            }
        }"#;
        let bp: TranscriptionBlueprint = serde_json::from_str(json).unwrap();
        let labels: Vec<_> = bp.sensors.keys().cloned().collect();
        assert_eq!(labels, vec!["depth", "front"]);

        let depth = &bp.sensors["depth"];
        assert!(depth.is_synchronized());
        assert_eq!(depth.topics(), vec!["/d", "/ci"]);
        match depth {
            SensorConfig::RangeImage(c) => assert!(c.range_is_depth),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!bp.sensors["front"].is_synchronized());
    }

    #[test]
    fn zero_cache_duration_fails_validation() {
        let json = r#"{ "transforms": { "cache_duration_sec": 0.0 } }"#;
        let bp: TranscriptionBlueprint = serde_json::from_str(json).unwrap();
        assert!(bp.validate().is_err());
    }
}
