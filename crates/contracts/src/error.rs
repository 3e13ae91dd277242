//! Layered error definitions
//!
//! Categorized by source: config / source log / payload / normalizer / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Source Log Errors =====
    /// Source log could not be opened
    #[error("cannot open source '{path}': {message}")]
    SourceOpen { path: String, message: String },

    /// Storage-level corruption while iterating
    #[error("source read error at record {index}: {message}")]
    SourceRead { index: u64, message: String },

    // ===== Normalizer Errors =====
    /// Payload could not be decoded into its wire message
    #[error("payload decode error on channel '{channel}': {message}")]
    PayloadDecode { channel: String, message: String },

    /// Required structural invariant violated, aborts the pass
    #[error("normalizer for sensor '{sensor}' failed: {message}")]
    Normalize { sensor: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn source_open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceOpen {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn source_read(index: u64, message: impl Into<String>) -> Self {
        Self::SourceRead {
            index,
            message: message.into(),
        }
    }

    pub fn payload_decode(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PayloadDecode {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create hard-failure error for a normalizer
    pub fn normalize(sensor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Normalize {
            sensor: sensor.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the pass may continue after this error (message dropped).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PayloadDecode { .. })
    }
}
