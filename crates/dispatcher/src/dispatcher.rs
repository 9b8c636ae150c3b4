//! Dispatcher - main loop for fan-out to sinks

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{AcceptedPacket, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<AcceptedPacket>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<AcceptedPacket>) -> Self {
        Self { config, input_rx }
    }

    /// Create every configured sink and start its worker
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut handles = Vec::with_capacity(self.config.sinks.len());
        for sink_config in &self.config.sinks {
            handles.push(create_sink_handle(sink_config)?);
        }

        Ok(Dispatcher::with_handles(handles, self.input_rx))
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Final counters of a dispatcher run
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    /// Packets received from the input channel
    pub packets: u64,
    /// Per-sink counters after shutdown
    pub sinks: Vec<(String, MetricsSnapshot)>,
}

impl DispatchSummary {
    /// Packets lost to full queues across all sinks
    pub fn total_dropped(&self) -> u64 {
        self.sinks.iter().map(|(_, s)| s.dropped_count).sum()
    }

    /// Failed writes across all sinks
    pub fn total_failures(&self) -> u64 {
        self.sinks.iter().map(|(_, s)| s.failure_count).sum()
    }
}

/// Fans accepted packets out to every sink
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<AcceptedPacket>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<AcceptedPacket>,
    ) -> Self {
        Self { handles, input_rx }
    }

    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Returns when the input channel is closed and every sink has drained.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> DispatchSummary {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut packets: u64 = 0;

        while let Some(packet) = self.input_rx.recv().await {
            packets += 1;
            self.dispatch_packet(packet);

            if packets.is_multiple_of(1000) {
                debug!(packets, "Dispatcher progress");
            }
        }

        info!(packets, "Dispatcher input closed, shutting down");

        let sinks = Self::shutdown_handles(self.handles).await;

        info!("Dispatcher shutdown complete");
        DispatchSummary { packets, sinks }
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<DispatchSummary> {
        tokio::spawn(self.run())
    }

    fn dispatch_packet(&self, packet: AcceptedPacket) {
        // Payload is reference counted, clones are cheap
        for handle in &self.handles {
            handle.try_send(packet.clone());
        }
    }

    async fn shutdown_handles(handles: Vec<SinkHandle>) -> Vec<(String, MetricsSnapshot)> {
        let mut snapshots = Vec::with_capacity(handles.len());
        for handle in handles {
            let name = handle.name().to_string();
            snapshots.push((name, handle.shutdown().await));
        }
        snapshots
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<AcceptedPacket>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build()
}
