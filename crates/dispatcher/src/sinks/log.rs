//! LogSink - logs record summaries via tracing

use contracts::{ContractError, NormalizedRecord, RecordSink};
use tracing::{info, instrument};

/// Sink that logs record summaries for debugging
pub struct LogSink {
    name: String,
    count: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
        }
    }

    fn log_record_summary(&self, record: &NormalizedRecord) {
        let detail = match record {
            NormalizedRecord::LidarScan(r) => format!("rays={}", r.ranges.len()),
            NormalizedRecord::RotatingScan(r) => format!("{}x{}", r.rows, r.columns),
            NormalizedRecord::PointCloud(r) => {
                format!("points={} intensity={}", r.points.len(), r.has_intensity())
            }
            NormalizedRecord::Imu(r) => format!("orientation={}", r.orientation.is_some()),
            NormalizedRecord::Odometry(r) => format!("x={:.3} y={:.3} yaw={:.3}", r.x, r.y, r.yaw),
            NormalizedRecord::Image(r) => format!("{}x{} {}", r.width, r.height, r.encoding),
            NormalizedRecord::RangeImage(r) => format!("{}x{}", r.columns, r.rows),
            NormalizedRecord::MotionIncrement(r) => {
                let t = r.increment.translation;
                format!("dx={:.3} dy={:.3} dz={:.3}", t.x, t.y, t.z)
            }
        };

        info!(
            sink = %self.name,
            seq = self.count,
            kind = %record.kind(),
            sensor = record.sensor_label(),
            timestamp = record.timestamp(),
            detail = %detail,
            "Record"
        );
    }
}

impl RecordSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        level = "trace",
        name = "log_sink_write",
        skip(self, record),
        fields(sink = %self.name, kind = %record.kind())
    )]
    async fn write(&mut self, record: &NormalizedRecord) -> Result<(), ContractError> {
        self.log_record_summary(record);
        self.count += 1;
        Ok(())
    }

    #[instrument(level = "trace", name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(level = "trace", name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, records = self.count, "LogSink closed");
        Ok(())
    }
}
