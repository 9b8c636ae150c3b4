//! 采集指标收集模块
//!
//! 记录每个采集周期的指标，并在内存中聚合出运行摘要。

use contracts::EngineStats;
use metrics::{counter, gauge, histogram};

/// 记录一个采集周期
///
/// 每次调用 `AcquisitionEngine::push` 之后调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_cycle;
///
/// engine.push(&chunk, &mut accepted)?;
/// record_cycle(chunk.len(), accepted.len(), engine.stats());
/// ```
pub fn record_cycle(bytes_in: usize, packets_out: usize, stats: &EngineStats) {
    counter!("sample_sync_cycles_total").increment(1);
    counter!("sample_sync_bytes_in_total").increment(bytes_in as u64);
    histogram!("sample_sync_packets_per_cycle").record(packets_out as f64);

    record_engine_stats(stats);
}

/// 以 gauge 形式发布引擎累计计数
pub fn record_engine_stats(stats: &EngineStats) {
    gauge!("sample_sync_packets_accepted").set(stats.packets_accepted as f64);
    gauge!("sample_sync_packets_gated").set(stats.packets_gated as f64);
    gauge!("sample_sync_packets_rejected").set(stats.packets_rejected as f64);
    gauge!("sample_sync_sync_failures").set(stats.sync_failures as f64);
    gauge!("sample_sync_bytes_discarded").set(stats.bytes_discarded as f64);
    gauge!("sample_sync_validity_rate").set(stats.validity_rate());
}

/// 记录单个采集周期的处理耗时 (微秒)
pub fn record_cycle_latency_us(latency_us: f64) {
    histogram!("sample_sync_cycle_latency_us").record(latency_us);
}

/// 采集指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct AcquisitionMetricsAggregator {
    /// 采集周期数
    pub cycles: u64,

    /// 输入字节总数
    pub bytes_in: u64,

    /// 每周期输出的数据包数
    pub packets_per_cycle: RunningStats,

    /// 每周期处理耗时 (微秒)
    pub cycle_latency_us: RunningStats,

    /// 最近一次的引擎计数
    pub engine: EngineStats,
}

impl AcquisitionMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(
        &mut self,
        bytes_in: usize,
        packets_out: usize,
        latency_us: f64,
        stats: &EngineStats,
    ) {
        self.cycles += 1;
        self.bytes_in += bytes_in as u64;
        self.packets_per_cycle.push(packets_out as f64);
        self.cycle_latency_us.push(latency_us);
        self.engine = *stats;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            cycles: self.cycles,
            bytes_in: self.bytes_in,
            engine: self.engine,
            validity_rate: self.engine.validity_rate(),
            discard_rate: if self.bytes_in > 0 {
                self.engine.bytes_discarded as f64 / self.bytes_in as f64 * 100.0
            } else {
                0.0
            },
            packets_per_cycle: StatsSummary::from(&self.packets_per_cycle),
            cycle_latency_us: StatsSummary::from(&self.cycle_latency_us),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub cycles: u64,
    pub bytes_in: u64,
    pub engine: EngineStats,
    /// 有效数据包占比 (%)
    pub validity_rate: f64,
    /// 被丢弃字节占比 (%)
    pub discard_rate: f64,
    pub packets_per_cycle: StatsSummary,
    pub cycle_latency_us: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Acquisition Metrics Summary ===")?;
        writeln!(f, "Cycles: {} ({} bytes in)", self.cycles, self.bytes_in)?;
        writeln!(
            f,
            "Packets: {} accepted, {} gated, {} rejected ({:.2}% valid)",
            self.engine.packets_accepted,
            self.engine.packets_gated,
            self.engine.packets_rejected,
            self.validity_rate
        )?;
        writeln!(
            f,
            "Sync: {} attempts, {} found, {} failed",
            self.engine.sync_attempts, self.engine.sync_successes, self.engine.sync_failures
        )?;
        writeln!(
            f,
            "Discarded bytes: {} ({:.2}%)",
            self.engine.bytes_discarded, self.discard_rate
        )?;
        writeln!(f, "Packets per cycle: {}", self.packets_per_cycle)?;
        writeln!(f, "Cycle latency (us): {}", self.cycle_latency_us)?;
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

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
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

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = AcquisitionMetricsAggregator::new();
        let stats = EngineStats {
            packets_accepted: 30,
            packets_rejected: 2,
            sync_attempts: 3,
            sync_successes: 2,
            sync_failures: 1,
            bytes_discarded: 64,
            ..Default::default()
        };

        aggregator.update(1024, 10, 12.0, &stats);
        aggregator.update(1024, 20, 18.0, &stats);

        let summary = aggregator.summary();
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.bytes_in, 2048);
        assert!((summary.discard_rate - 3.125).abs() < 1e-10);
        assert!((summary.packets_per_cycle.mean - 15.0).abs() < 1e-10);
        assert_eq!(summary.engine.packets_accepted, 30);
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            cycles: 4,
            bytes_in: 4096,
            engine: EngineStats {
                packets_accepted: 60,
                packets_gated: 2,
                packets_rejected: 2,
                ..Default::default()
            },
            validity_rate: 96.5,
            discard_rate: 0.0,
            packets_per_cycle: StatsSummary::default(),
            cycle_latency_us: StatsSummary::default(),
        };

        let output = format!("{}", summary);
        assert!(output.contains("Cycles: 4"));
        assert!(output.contains("96.50% valid"));
        assert!(output.contains("Packets per cycle: N/A"));
    }
}
