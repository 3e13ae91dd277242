//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// bagscribe - transcribe multi-channel robot recordings into normalized records
#[derive(Parser, Debug)]
#[command(
    name = "bagscribe",
    author,
    version,
    about = "Transcribe robot recordings into normalized sensor records",
    long_about = "Replays a recorded multi-channel log in stored order, normalizes each \n\
                  configured sensor, gates pose-dependent sensors on the transform tree, \n\
                  and appends the resulting records to an output log."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BAGSCRIBE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BAGSCRIBE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default level when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe a recording into an output log
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Display the channels of a recording
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Input recording (bincode file or jsonl directory)
    pub input: PathBuf,

    /// Output log; JSON lines when it ends in `.jsonl`
    #[arg(short, long, env = "BAGSCRIBE_OUTPUT")]
    pub output: PathBuf,

    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "bagscribe.toml",
        env = "BAGSCRIBE_CONFIG"
    )]
    pub config: PathBuf,

    /// Replace the output if it already exists
    #[arg(short = 'w', long)]
    pub overwrite: bool,

    /// Input storage layout (detected from the path when omitted)
    #[arg(long, value_enum)]
    pub storage_id: Option<StorageArg>,

    /// Encoding of message payloads inside the recording
    #[arg(long, value_enum, default_value = "bincode")]
    pub serialization_format: FormatArg,

    /// Override the root frame from configuration
    #[arg(short = 'f', long = "frame")]
    pub root_frame: Option<String>,

    /// Prometheus exporter port (disabled when omitted)
    #[arg(long, env = "BAGSCRIBE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bagscribe.toml", env = "BAGSCRIBE_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Input recording (bincode file or jsonl directory)
    pub input: PathBuf,

    /// Input storage layout (detected from the path when omitted)
    #[arg(long, value_enum)]
    pub storage_id: Option<StorageArg>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Recording storage layout
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageArg {
    Bincode,
    Jsonl,
}

impl From<StorageArg> for bag_reader::StorageId {
    fn from(arg: StorageArg) -> Self {
        match arg {
            StorageArg::Bincode => Self::Bincode,
            StorageArg::Jsonl => Self::Jsonl,
        }
    }
}

/// Payload serialization format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Bincode,
    Json,
}

impl From<FormatArg> for contracts::SerializationFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Bincode => Self::Bincode,
            FormatArg::Json => Self::Json,
        }
    }
}
