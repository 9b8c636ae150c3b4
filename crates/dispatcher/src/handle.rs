//! SinkHandle - manages a sink with isolated queue and worker task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{AcceptedPacket, DataSink};

use crate::metrics::{MetricsSnapshot, SinkMetrics};

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<AcceptedPacket>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a packet for the sink without waiting.
    ///
    /// Returns false when the packet was dropped (queue full or worker gone).
    pub fn try_send(&self, packet: AcceptedPacket) -> bool {
        match self.tx.try_send(packet) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(p)) => {
                self.metrics.inc_dropped_count();
                metrics::counter!("sink_packets_dropped_total", "sink" => self.name.clone())
                    .increment(1);
                warn!(
                    sink = %self.name,
                    packet_id = p.packet_id,
                    "Queue full, packet dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Close the queue, let the worker drain it, and return the final counters
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) -> MetricsSnapshot {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
        self.metrics.snapshot()
    }
}

/// Worker task that consumes packets and writes them to the sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<AcceptedPacket>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(packet) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.write(&packet).await {
            Ok(()) => {
                metrics.record_write(packet.len());
                metrics::counter!("sink_packets_written_total", "sink" => name.clone())
                    .increment(1);
            }
            Err(e) => {
                metrics.inc_failure_count();
                metrics::counter!("sink_write_failures_total", "sink" => name.clone())
                    .increment(1);
                error!(
                    sink = %name,
                    packet_id = packet.packet_id,
                    error = %e,
                    "Write failed"
                );
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}
