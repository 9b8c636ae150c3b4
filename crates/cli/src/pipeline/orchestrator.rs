//! Pipeline orchestrator - replays a capture through engine and dispatcher.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{AcceptedPacket, StreamBlueprint};
use observability::{record_cycle, record_cycle_latency_us};
use sync_engine::AcquisitionEngine;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use super::stats::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Resolved stream blueprint
    pub blueprint: StreamBlueprint,
    /// Raw capture to replay
    pub input: PathBuf,
    /// Bytes per acquisition cycle
    pub read_chunk: usize,
    /// Stop after this many forwarded packets
    pub max_packets: Option<u64>,
    /// Replay timeout
    pub timeout: Option<Duration>,
    /// Channel buffer size between engine and dispatcher
    pub buffer_size: usize,
    /// Prometheus exporter port
    pub metrics_port: Option<u16>,
}

/// Pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the capture is exhausted, the limit is hit, or `shutdown` resolves.
    ///
    /// The dispatcher is always drained before returning, so every packet
    /// handed to it reaches the sinks.
    #[instrument(name = "pipeline_run", skip_all, fields(input = %self.config.input.display()))]
    pub async fn run_until<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        let config = self.config;

        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
            info!(port, "Metrics server started");
        }

        let mut engine = AcquisitionEngine::from_blueprint(&config.blueprint)
            .context("Failed to build acquisition engine")?;
        info!(
            strategy = engine.checker().strategy(),
            packet_size = engine.packet_size(),
            state = ?engine.state(),
            "Acquisition engine ready"
        );

        let file = tokio::fs::File::open(&config.input)
            .await
            .with_context(|| format!("Failed to open capture: {}", config.input.display()))?;

        if config.blueprint.sinks.is_empty() {
            warn!("No sinks configured, accepted packets will be discarded");
        }

        let (tx, rx) = mpsc::channel::<AcceptedPacket>(config.buffer_size.max(1));
        let dispatcher = dispatcher::create_dispatcher(config.blueprint.sinks.clone(), rx)
            .context("Failed to create dispatcher")?;
        let active_sinks = dispatcher.sink_count();
        let dispatcher_handle = dispatcher.spawn();

        let mut stats = PipelineStats::new(active_sinks);
        let replay = replay(
            file,
            &mut engine,
            tx,
            config.read_chunk,
            config.max_packets,
            &mut stats,
        );

        let outcome = tokio::select! {
            result = with_timeout(replay, config.timeout) => result,
            _ = shutdown => {
                info!("Shutdown requested, stopping replay");
                Ok(ReplayEnd::Interrupted)
            }
        };

        // Sender is gone once the replay future is dropped, so the dispatcher drains and exits
        stats.trailing_bytes = engine.finish();
        stats.engine = *engine.stats();

        match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await {
            Ok(Ok(summary)) => stats.dispatch = summary,
            Ok(Err(e)) => error!(error = %e, "Dispatcher task panicked"),
            Err(_) => warn!("Dispatcher did not drain within timeout"),
        }

        stats.duration = start.elapsed();
        match outcome? {
            ReplayEnd::Exhausted => info!("Capture exhausted"),
            ReplayEnd::LimitReached => info!("Packet limit reached"),
            ReplayEnd::Interrupted => stats.interrupted = true,
            ReplayEnd::TimedOut => {
                info!("Replay timeout reached");
                stats.interrupted = true;
            }
        }

        Ok(stats)
    }
}

/// Why the replay loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplayEnd {
    Exhausted,
    LimitReached,
    Interrupted,
    TimedOut,
}

async fn with_timeout<F>(replay: F, timeout: Option<Duration>) -> Result<ReplayEnd>
where
    F: Future<Output = Result<ReplayEnd>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, replay)
            .await
            .unwrap_or(Ok(ReplayEnd::TimedOut)),
        None => replay.await,
    }
}

/// Feed the capture through the engine one acquisition cycle at a time.
async fn replay<R>(
    mut reader: R,
    engine: &mut AcquisitionEngine,
    tx: mpsc::Sender<AcceptedPacket>,
    read_chunk: usize,
    max_packets: Option<u64>,
    stats: &mut PipelineStats,
) -> Result<ReplayEnd>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; read_chunk.max(1)];
    let mut accepted = Vec::new();

    loop {
        let n = fill_chunk(&mut reader, &mut buf)
            .await
            .context("Failed to read capture")?;
        if n == 0 {
            return Ok(ReplayEnd::Exhausted);
        }

        let cycle_start = Instant::now();
        let pushed = engine.push(&buf[..n], &mut accepted);
        let latency_us = cycle_start.elapsed().as_secs_f64() * 1_000_000.0;

        record_cycle(n, accepted.len(), engine.stats());
        record_cycle_latency_us(latency_us);
        stats
            .metrics
            .update(n, accepted.len(), latency_us, engine.stats());
        stats.bytes_read += n as u64;

        for packet in accepted.drain(..) {
            if tx.send(packet).await.is_err() {
                warn!("Dispatcher channel closed");
                return Ok(ReplayEnd::Interrupted);
            }
            stats.packets_forwarded += 1;

            if max_packets.is_some_and(|max| stats.packets_forwarded >= max) {
                return Ok(ReplayEnd::LimitReached);
            }
        }

        // Packets accepted before a failure are still forwarded
        pushed.context("Acquisition engine failed")?;

        debug!(
            bytes = n,
            forwarded = stats.packets_forwarded,
            locked = engine.is_locked(),
            "Cycle complete"
        );
    }
}

/// Read until `buf` is full or the reader is exhausted.
async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
