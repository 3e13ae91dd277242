//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Input recording not found
    #[error("Input recording not found: {path}")]
    InputNotFound { path: String },

    /// Output exists and overwrite was not requested
    #[error("Output already exists: {path} (pass -w to overwrite)")]
    OutputExists { path: String },

    /// Stopped by a shutdown signal before the end of the recording
    #[error("Interrupted after writing {records} records")]
    Interrupted { records: u64 },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn input_not_found(path: &Path) -> Self {
        Self::InputNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn output_exists(path: &Path) -> Self {
        Self::OutputExists {
            path: path.display().to_string(),
        }
    }
}
