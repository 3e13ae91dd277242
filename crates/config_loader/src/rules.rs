//! Configuration validation
//!
//! Rules:
//! - derive-level checks on the blueprint (`validator`)
//! - tf topics non-empty and distinct
//! - sensor labels and topics non-empty
//! - range image depth and camera_info topics distinct
//! - sensor poses finite

use contracts::{ContractError, SensorConfig, TranscriptionBlueprint};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a blueprint, returning the first error found
pub fn validate(blueprint: &TranscriptionBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|e| first_violation("", &e))?;
    validate_tf_topics(blueprint)?;
    validate_sensors(blueprint)?;
    Ok(())
}

/// Flatten derive errors into a dotted field path and message
fn first_violation(prefix: &str, errors: &ValidationErrors) -> ContractError {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    return ContractError::config_validation(path, message);
                }
            }
            ValidationErrorsKind::Struct(nested) => return first_violation(&path, nested),
            ValidationErrorsKind::List(items) => {
                if let Some((idx, nested)) = items.iter().next() {
                    return first_violation(&format!("{path}[{idx}]"), nested);
                }
            }
        }
    }
    ContractError::config_validation(prefix, errors.to_string())
}

fn validate_tf_topics(blueprint: &TranscriptionBlueprint) -> Result<(), ContractError> {
    let tf = &blueprint.transforms;
    if tf.dynamic_topic == tf.static_topic {
        return Err(ContractError::config_validation(
            "transforms.static_topic",
            format!(
                "dynamic and static tf topics must differ, both are '{}'",
                tf.dynamic_topic
            ),
        ));
    }
    Ok(())
}

fn validate_sensors(blueprint: &TranscriptionBlueprint) -> Result<(), ContractError> {
    for (label, sensor) in &blueprint.sensors {
        if label.trim().is_empty() {
            return Err(ContractError::config_validation(
                "sensors",
                "sensor label cannot be empty",
            ));
        }
        if sensor.topics().iter().any(|t| t.trim().is_empty()) {
            return Err(ContractError::config_validation(
                format!("sensors.{label}"),
                "sensor topic cannot be empty",
            ));
        }

        match sensor {
            SensorConfig::RangeImage(c) => {
                if c.depth == c.camera_info {
                    return Err(ContractError::config_validation(
                        format!("sensors.{label}.camera_info"),
                        format!("depth and camera_info must differ, both are '{}'", c.depth),
                    ));
                }
            }
            SensorConfig::LidarScan(c)
            | SensorConfig::RotatingScan(c)
            | SensorConfig::PointCloud(c)
            | SensorConfig::Imu(c)
            | SensorConfig::Odometry(c)
            | SensorConfig::Image(c) => {
                if !c.sensor_pose.is_finite() {
                    return Err(ContractError::config_validation(
                        format!("sensors.{label}.sensor_pose"),
                        "sensor pose must be finite",
                    ));
                }
            }
        }
    }
    Ok(())
}
