//! `run` command implementation.

use anyhow::{Context, Result};
use bag_reader::open_bag;
use contracts::{RecordSink, SerializationFormat, SourceLog};
use dispatcher::{RawlogSink, TranscriptionReport};
use ingestion::{SyncProbe, TranscriptionPipeline};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::progress;

/// Execute the `run` command
pub async fn run_transcription(args: &RunArgs, show_progress: bool) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }
    if !args.input.exists() {
        return Err(CliError::input_not_found(&args.input).into());
    }
    if args.output.exists() && !args.overwrite {
        return Err(CliError::output_exists(&args.output).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(ref frame) = args.root_frame {
        info!(root_frame = %frame, "Overriding root frame from CLI");
        blueprint.root_frame = frame.clone();
        config_loader::validate(&blueprint).context("Invalid root frame override")?;
    }

    let format = SerializationFormat::from(args.serialization_format);
    let pipeline = TranscriptionPipeline::from_blueprint(&blueprint, format)
        .context("Failed to build the sensor pipeline")?;

    info!(
        root_frame = %blueprint.root_frame,
        sensors = pipeline.sensors().len(),
        format = %format,
        "Configuration loaded"
    );

    let source = open_bag(&args.input, args.storage_id.map(Into::into))
        .with_context(|| format!("Failed to open recording {}", args.input.display()))?;
    info!(
        input = %args.input.display(),
        storage = %source.storage_id(),
        messages = source.message_count(),
        "Recording opened"
    );

    let mut sink = RawlogSink::create("rawlog", &args.output, args.overwrite)
        .await
        .with_context(|| format!("Failed to create output {}", args.output.display()))?;

    let (driver, probe) = pipeline.into_driver();
    let mut driver = if show_progress {
        driver.with_progress(progress::stderr_bar())
    } else {
        driver
    };

    info!("Starting transcription...");

    // Both branches run on this task; the driver future is not Send
    let outcome = tokio::select! {
        result = driver.run(source, &mut sink) => Some(result),
        _ = shutdown_signal() => None,
    };

    match outcome {
        Some(Ok(report)) => {
            print_report(&report, &probe);
            info!(output = %args.output.display(), "Transcription completed successfully");
            Ok(())
        }
        Some(Err(e)) => {
            close_quietly(&mut sink).await;
            Err(e).context("Transcription failed")
        }
        None => {
            warn!("Received shutdown signal, stopping transcription...");
            let written = sink.metrics().write_count();
            sink.close().await.context("Failed to close output")?;
            Err(CliError::Interrupted { records: written }.into())
        }
    }
}

/// Keep the records written before a failure
async fn close_quietly(sink: &mut RawlogSink) {
    if let Err(e) = sink.close().await {
        warn!(error = %e, "Failed to close output after error");
    }
}

/// Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_report(report: &TranscriptionReport, probe: &SyncProbe) {
    println!("\n=== Transcription Report ===\n");
    println!("Messages read:      {}", report.messages_read);
    println!("Records written:    {}", report.records_written);
    println!("Elapsed:            {:.2}s", report.elapsed.as_secs_f64());
    println!("Throughput:         {:.1} msg/s", report.messages_per_sec());
    println!("Bytes written:      {}", report.sink.bytes_written);

    if !report.records_per_kind.is_empty() {
        println!("\nRecords per kind:");
        for (kind, count) in &report.records_per_kind {
            println!("  - {kind}: {count}");
        }
    }

    let stats = probe.stats();
    if !stats.is_empty() {
        println!("\nSynchronizers:");
        for (label, s) in &stats {
            println!(
                "  - {label}: fired={} unresolved={} unreadable={} dropped_occupied={}",
                s.fired, s.skipped_unresolved, s.discarded_unreadable, s.dropped_occupied
            );
        }
    }

    if !report.unhandled_channels.is_empty() {
        println!(
            "\nUnhandled channels ({} messages skipped):",
            report.unhandled_messages
        );
        for channel in &report.unhandled_channels {
            println!("  - {channel}");
        }
    }
    if report.dropped_messages > 0 {
        println!("\nMalformed messages dropped: {}", report.dropped_messages);
    }
    if report.transforms_rejected > 0 {
        println!("Transforms rejected: {}", report.transforms_rejected);
    }

    println!("\n{}", report.summary);
}
