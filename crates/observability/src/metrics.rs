//! 转录指标
//!
//! 通过 `metrics` facade 上报计数器，并在内存中聚合统计，用于运行结束时的摘要。

use std::collections::BTreeMap;

use contracts::{NormalizedRecord, RecordKind};
use metrics::{counter, histogram};

/// 从源日志读取一条消息
pub fn record_message_read() {
    counter!("bagscribe_messages_total").increment(1);
}

/// 处理器产出一条记录
pub fn record_emitted(kind: RecordKind) {
    counter!("bagscribe_records_total", "kind" => kind.as_str()).increment(1);
}

/// 无处理器通道上的第一条消息
pub fn record_unhandled_channel(channel: &str) {
    counter!(
        "bagscribe_unhandled_channels_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// 同步器组触发
pub fn record_sync_fire(sensor: &str) {
    counter!("bagscribe_sync_fires_total", "sensor" => sensor.to_string()).increment(1);
}

/// 完整的同步器组无法解析锚点变换
pub fn record_sync_unresolved(sensor: &str) {
    counter!("bagscribe_sync_unresolved_total", "sensor" => sensor.to_string()).increment(1);
}

/// 插入时丢弃的变换样本
pub fn record_transform_rejected() {
    counter!("bagscribe_transforms_rejected_total").increment(1);
}

/// 交给 sink 的记录
pub fn record_sink_write(sink_name: &str, success: bool, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "bagscribe_sink_writes_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("bagscribe_sink_write_latency_ms", "sink" => sink_name.to_string())
        .record(latency_ms);
}

/// 记录统计聚合器
///
/// 统计每种类型和每个传感器的记录数、传感器时间戳间隔以及运动增量的平移长度。
#[derive(Debug, Clone, Default)]
pub struct RecordStatsAggregator {
    pub total_records: u64,
    pub per_kind: BTreeMap<RecordKind, u64>,
    pub per_sensor: BTreeMap<String, u64>,
    /// 时间戳早于同一传感器上一条记录的记录数
    pub stamp_regressions: u64,
    /// 每个传感器的时间戳间隔 (ms)
    pub interval_stats: BTreeMap<String, RunningStats>,
    /// 运动增量平移长度 (m)
    pub motion_stats: RunningStats,
    last_stamp: BTreeMap<String, u64>,
}

impl RecordStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, record: &NormalizedRecord) {
        self.total_records += 1;
        *self.per_kind.entry(record.kind()).or_insert(0) += 1;

        let label = record.sensor_label();
        *self.per_sensor.entry(label.to_string()).or_insert(0) += 1;

        if let NormalizedRecord::MotionIncrement(inc) = record {
            let t = inc.increment.translation;
            self.motion_stats
                .push((t.x * t.x + t.y * t.y + t.z * t.z).sqrt());
            // Increments share the label of the fused records that follow.
            return;
        }

        let stamp = record.timestamp();
        if let Some(prev) = self.last_stamp.insert(label.to_string(), stamp) {
            if stamp < prev {
                self.stamp_regressions += 1;
            } else {
                self.interval_stats
                    .entry(label.to_string())
                    .or_default()
                    .push((stamp - prev) as f64 / 1e6);
            }
        }
    }

    pub fn summary(&self) -> TranscriptionSummary {
        TranscriptionSummary {
            total_records: self.total_records,
            per_kind: self.per_kind.clone(),
            per_sensor: self.per_sensor.clone(),
            stamp_regressions: self.stamp_regressions,
            intervals_ms: self
                .interval_stats
                .iter()
                .map(|(k, v)| (k.clone(), StatsSummary::from(v)))
                .collect(),
            motion_m: StatsSummary::from(&self.motion_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 单次转录的摘要
#[derive(Debug, Clone, Default)]
pub struct TranscriptionSummary {
    pub total_records: u64,
    pub per_kind: BTreeMap<RecordKind, u64>,
    pub per_sensor: BTreeMap<String, u64>,
    pub stamp_regressions: u64,
    pub intervals_ms: BTreeMap<String, StatsSummary>,
    pub motion_m: StatsSummary,
}

impl std::fmt::Display for TranscriptionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Record Summary ===")?;
        writeln!(f, "Total records: {}", self.total_records)?;
        for (kind, count) in &self.per_kind {
            writeln!(f, "  {kind}: {count}")?;
        }
        if !self.per_sensor.is_empty() {
            writeln!(f, "Per sensor:")?;
            for (sensor, count) in &self.per_sensor {
                match self.intervals_ms.get(sensor) {
                    Some(interval) => {
                        writeln!(f, "  {sensor}: {count} (interval ms: {interval})")?
                    }
                    None => writeln!(f, "  {sensor}: {count}")?,
                }
            }
        }
        if self.stamp_regressions > 0 {
            writeln!(f, "Stamp regressions: {}", self.stamp_regressions)?;
        }
        writeln!(f, "Motion increment (m): {}", self.motion_m)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计（Welford 算法）
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MotionIncrement, Odometry, Pose};

    fn odom(label: &str, timestamp: u64) -> NormalizedRecord {
        Odometry {
            sensor_label: label.into(),
            timestamp,
            x: 0.0,
            y: 0.0,
            yaw: 0.0,
            vx: 0.0,
            vy: 0.0,
            omega: 0.0,
        }
        .into()
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_intervals_and_regressions() {
        let mut agg = RecordStatsAggregator::new();
        agg.update(&odom("wheels", 0));
        agg.update(&odom("wheels", 10_000_000));
        agg.update(&odom("wheels", 30_000_000));
        agg.update(&odom("wheels", 5_000_000));

        assert_eq!(agg.total_records, 4);
        assert_eq!(agg.per_kind.get(&RecordKind::Odometry), Some(&4));
        assert_eq!(agg.stamp_regressions, 1);

        let interval = &agg.interval_stats["wheels"];
        assert_eq!(interval.count(), 2);
        assert!((interval.mean() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_motion_increments_do_not_count_as_intervals() {
        let mut agg = RecordStatsAggregator::new();
        agg.update(
            &MotionIncrement {
                sensor_label: "depth".into(),
                timestamp: 1,
                increment: Pose::from_translation(3.0, 4.0, 0.0),
            }
            .into(),
        );

        assert!(agg.interval_stats.is_empty());
        assert!((agg.motion_stats.mean() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary_display() {
        let mut agg = RecordStatsAggregator::new();
        agg.update(&odom("wheels", 0));
        agg.update(&odom("wheels", 20_000_000));

        let output = format!("{}", agg.summary());
        assert!(output.contains("Total records: 2"));
        assert!(output.contains("odometry: 2"));
        assert!(output.contains("mean=20.000"));
    }
}
