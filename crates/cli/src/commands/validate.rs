//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{SensorConfig, SerializationFormat, TranscriptionBlueprint};
use ingestion::TranscriptionPipeline;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    root_frame: String,
    dynamic_topic: String,
    static_topic: String,
    cache_duration_sec: f64,
    unresolved_anchor: String,
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct SensorInfo {
    label: String,
    kind: &'static str,
    topics: Vec<String>,
    synchronized: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();
    let invalid = |error: String| ValidationResult {
        valid: false,
        config_path: config_path.clone(),
        error: Some(error),
        warnings: Vec::new(),
        summary: None,
    };

    if !args.config.exists() {
        return invalid(format!("File not found: {}", args.config.display()));
    }

    let blueprint = match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => blueprint,
        Err(e) => return invalid(e.to_string()),
    };

    // Registry assembly catches cross-section conflicts such as tf topics reused by sensors
    let pipeline = match TranscriptionPipeline::from_blueprint(&blueprint, SerializationFormat::default()) {
        Ok(pipeline) => pipeline,
        Err(e) => return invalid(e.to_string()),
    };

    let sensors = pipeline
        .sensors()
        .iter()
        .map(|s| SensorInfo {
            label: s.label.clone(),
            kind: s.kind,
            topics: s.topics.clone(),
            synchronized: s.synchronized,
        })
        .collect();

    ValidationResult {
        valid: true,
        config_path: config_path.clone(),
        error: None,
        warnings: collect_warnings(&blueprint),
        summary: Some(ConfigSummary {
            root_frame: blueprint.root_frame.clone(),
            dynamic_topic: blueprint.transforms.dynamic_topic.clone(),
            static_topic: blueprint.transforms.static_topic.clone(),
            cache_duration_sec: blueprint.transforms.cache_duration_sec,
            unresolved_anchor: format!("{:?}", blueprint.transforms.unresolved_anchor)
                .to_lowercase(),
            sensors,
        }),
    }
}

/// Non-fatal issues
fn collect_warnings(blueprint: &TranscriptionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sensors.is_empty() {
        warnings.push("No sensors configured - only transforms will be read".to_string());
    }

    let mut seen = std::collections::HashMap::new();
    for (label, sensor) in &blueprint.sensors {
        for topic in sensor.topics() {
            if let Some(other) = seen.insert(topic, label.as_str()) {
                warnings.push(format!(
                    "Topic '{topic}' is read by both '{other}' and '{label}'; handlers run in label order"
                ));
            }
        }
        if let SensorConfig::RangeImage(c) = sensor {
            if !c.range_is_depth {
                warnings.push(format!(
                    "Sensor '{label}' stores euclidean ranges (range_is_depth = false)"
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Root frame: {}", summary.root_frame);
            println!(
                "  Transforms: {} / {} (history {}s, unresolved anchors: {})",
                summary.dynamic_topic,
                summary.static_topic,
                summary.cache_duration_sec,
                summary.unresolved_anchor
            );
            println!("  Sensors ({}):", summary.sensors.len());
            for sensor in &summary.sensors {
                let gate = if sensor.synchronized { ", pose-gated" } else { "" };
                println!(
                    "    - {} ({}{}) <- {}",
                    sensor.label,
                    sensor.kind,
                    gate,
                    sensor.topics.join(", ")
                );
            }
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
