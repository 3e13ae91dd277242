//! `info` command implementation.

use anyhow::{Context, Result};
use bag_reader::open_bag;
use contracts::SourceLog;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Recording info for JSON output
#[derive(Serialize)]
struct RecordingInfo {
    path: String,
    storage: String,
    message_count: u64,
    channels: Vec<ChannelEntry>,
}

#[derive(Serialize)]
struct ChannelEntry {
    id: String,
    type_tag: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(input = %args.input.display(), "Loading recording info");

    if !args.input.exists() {
        return Err(CliError::input_not_found(&args.input).into());
    }

    let bag = open_bag(&args.input, args.storage_id.map(Into::into))
        .with_context(|| format!("Failed to open recording {}", args.input.display()))?;

    let info = RecordingInfo {
        path: args.input.display().to_string(),
        storage: bag.storage_id().to_string(),
        message_count: bag.message_count(),
        channels: bag
            .channels()
            .iter()
            .map(|c| ChannelEntry {
                id: c.id.to_string(),
                type_tag: c.type_tag.clone(),
            })
            .collect(),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize recording info")?;
        println!("{}", json);
    } else {
        print_recording_info(&info);
    }

    Ok(())
}

fn print_recording_info(info: &RecordingInfo) {
    println!("Recording: {}", info.path);
    println!("   ├─ Storage: {}", info.storage);
    println!("   ├─ Messages: {}", info.message_count);
    println!("   └─ Channels ({})", info.channels.len());

    let width = info.channels.iter().map(|c| c.id.len()).max().unwrap_or(0);
    for (i, channel) in info.channels.iter().enumerate() {
        let prefix = if i == info.channels.len() - 1 { "└─" } else { "├─" };
        println!(
            "        {} {:<width$}  {}",
            prefix,
            channel.id,
            channel.type_tag,
            width = width
        );
    }
}
