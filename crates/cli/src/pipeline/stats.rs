//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::EngineStats;
use dispatcher::DispatchSummary;
use observability::AcquisitionMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Packets handed to the dispatcher
    pub packets_forwarded: u64,

    /// Capture bytes fed to the engine
    pub bytes_read: u64,

    /// Bytes left over after the last full packet
    pub trailing_bytes: usize,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Stopped by a shutdown signal or timeout
    pub interrupted: bool,

    /// Final engine counters
    pub engine: EngineStats,

    /// Per-cycle aggregates
    pub metrics: AcquisitionMetricsAggregator,

    /// Per-sink results
    pub dispatch: DispatchSummary,
}

impl PipelineStats {
    pub fn new(active_sinks: usize) -> Self {
        Self {
            active_sinks,
            ..Self::default()
        }
    }

    /// Packets forwarded per second
    pub fn packets_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.packets_forwarded as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Capture throughput in MiB/s
    pub fn throughput_mib(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes_read as f64 / (1024.0 * 1024.0) / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Bytes read: {}", self.bytes_read);
        println!("   ├─ Packets forwarded: {}", self.packets_forwarded);
        println!("   ├─ Packets/s: {:.2}", self.packets_per_sec());
        println!("   ├─ Throughput: {:.2} MiB/s", self.throughput_mib());
        println!("   ├─ Trailing bytes: {}", self.trailing_bytes);
        println!("   └─ Active sinks: {}", self.active_sinks);

        let summary = self.metrics.summary();

        println!("\nAcquisition Engine");
        println!(
            "   ├─ Packets: {} accepted, {} gated, {} rejected ({:.2}% valid)",
            self.engine.packets_accepted,
            self.engine.packets_gated,
            self.engine.packets_rejected,
            self.engine.validity_rate()
        );
        println!(
            "   ├─ Sync: {} attempts, {} found, {} failed",
            self.engine.sync_attempts, self.engine.sync_successes, self.engine.sync_failures
        );
        println!(
            "   ├─ Discarded bytes: {} ({:.2}%)",
            self.engine.bytes_discarded, summary.discard_rate
        );
        println!("   ├─ Cycles: {}", summary.cycles);
        println!("   └─ Cycle latency (us): {}", summary.cycle_latency_us);

        if !self.dispatch.sinks.is_empty() {
            println!("\nSinks");
            let last = self.dispatch.sinks.len() - 1;
            for (i, (name, snapshot)) in self.dispatch.sinks.iter().enumerate() {
                let branch = if i == last { "└─" } else { "├─" };
                println!("   {branch} {name}: {snapshot}");
            }
        }

        if self.interrupted {
            println!("\nReplay stopped before the end of the capture");
        }

        println!();
    }
}
