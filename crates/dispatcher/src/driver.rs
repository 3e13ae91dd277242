//! Transcription driver - main loop from source log to sink.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use contracts::{ChannelId, RecordKind, RecordSink, SourceLog};
use observability::{RecordStatsAggregator, TranscriptionSummary};
use tracing::{debug, error, info, instrument};

use crate::error::DispatcherError;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::registry::{ChannelRegistry, RunContext};

/// Progress is reported every this many messages
pub const PROGRESS_INTERVAL: u64 = 100;

/// Position in the source log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.current as f64 / self.total as f64 * 100.0
        }
    }
}

/// Outcome of a completed pass
#[derive(Debug, Clone, Default)]
pub struct TranscriptionReport {
    pub messages_read: u64,
    pub records_written: u64,
    pub records_per_kind: BTreeMap<RecordKind, u64>,
    /// Channels without handlers, each warned about once
    pub unhandled_channels: Vec<ChannelId>,
    pub unhandled_messages: u64,
    /// Messages dropped as malformed by a handler
    pub dropped_messages: u64,
    pub transforms_rejected: u64,
    pub sink: MetricsSnapshot,
    pub summary: TranscriptionSummary,
    pub elapsed: Duration,
}

impl TranscriptionReport {
    pub fn messages_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.messages_read as f64 / secs
        } else {
            0.0
        }
    }
}

type ProgressObserver = Box<dyn FnMut(Progress)>;

/// Drives one forward pass: source log -> registry -> sink.
pub struct TranscriptionDriver {
    registry: ChannelRegistry,
    context: RunContext,
    observer: Option<ProgressObserver>,
    progress_interval: u64,
}

impl TranscriptionDriver {
    pub fn new(registry: ChannelRegistry, context: RunContext) -> Self {
        Self {
            registry,
            context,
            observer: None,
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    /// Called with the position every progress interval and once at the end
    pub fn with_progress<F>(mut self, observer: F) -> Self
    where
        F: FnMut(Progress) + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Transcribe `source` into `sink` in stored order, then flush and close it.
    ///
    /// Records from one message reach the sink in the order the handlers
    /// produced them, before anything from the next message.
    ///
    /// # Errors
    /// A storage read error, a fatal handler error, or a sink failure. Records
    /// written before the error stay in the sink; it is not closed.
    #[instrument(name = "transcription_driver_run", skip_all, fields(sink = %sink.name()))]
    pub async fn run<S, K>(
        &mut self,
        source: S,
        sink: &mut K,
    ) -> Result<TranscriptionReport, DispatcherError>
    where
        S: SourceLog,
        K: RecordSink,
    {
        let started = Instant::now();
        let total = source.message_count();
        let sink_metrics = SinkMetrics::new();
        let mut aggregator = RecordStatsAggregator::new();
        let rejected_before = self.context.transforms.stats().rejected;
        let mut report = TranscriptionReport::default();

        info!(
            messages = total,
            channels = source.channels().len(),
            handled_channels = self.registry.channels().len(),
            "Transcription started"
        );

        for item in source {
            let msg = item?;
            report.messages_read += 1;
            observability::record_message_read();

            let records = self.registry.dispatch(&msg, &mut self.context)?;

            for record in &records {
                let write_started = Instant::now();
                let result = sink.write(record).await;
                let latency_ms = write_started.elapsed().as_secs_f64() * 1000.0;
                observability::record_sink_write(sink.name(), result.is_ok(), latency_ms);

                if let Err(e) = result {
                    sink_metrics.inc_failure_count();
                    error!(sink = %sink.name(), error = %e, "Sink write failed");
                    return Err(e.into());
                }
                sink_metrics.inc_write_count();
                observability::record_emitted(record.kind());
                *report.records_per_kind.entry(record.kind()).or_insert(0) += 1;
                aggregator.update(record);
            }
            report.records_written += records.len() as u64;

            if report.messages_read.is_multiple_of(self.progress_interval) {
                self.report_progress(report.messages_read, total);
            }
        }

        if report.messages_read == 0 || !report.messages_read.is_multiple_of(self.progress_interval) {
            self.report_progress(report.messages_read, total);
        }

        sink.flush().await?;
        sink.close().await?;

        report.unhandled_channels = self.context.unhandled_channels();
        report.unhandled_messages = self.context.unhandled_messages();
        report.dropped_messages = self.context.dropped_messages();
        report.transforms_rejected = self.context.transforms.stats().rejected - rejected_before;
        report.sink = sink_metrics.snapshot();
        report.summary = aggregator.summary();
        report.elapsed = started.elapsed();

        info!(
            messages = report.messages_read,
            records = report.records_written,
            unhandled_channels = report.unhandled_channels.len(),
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Transcription finished"
        );

        Ok(report)
    }

    fn report_progress(&mut self, current: u64, total: u64) {
        let progress = Progress { current, total };
        debug!(
            current,
            total,
            percent = format!("{:.1}", progress.percent()),
            "Transcription progress"
        );
        if let Some(observer) = self.observer.as_mut() {
            observer(progress);
        }
    }
}
