//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use std::time::Duration;
use tracing::{info, warn};

use super::info::print_config_summary;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut blueprint = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(read_chunk) = args.read_chunk {
        if read_chunk == 0 {
            anyhow::bail!("--read-chunk must be greater than 0");
        }
        info!(read_chunk, "Overriding read chunk from CLI");
        blueprint.acquisition.read_chunk = read_chunk;
    }

    let blueprint = ConfigLoader::resolve(&blueprint);

    info!(
        strategy = blueprint.checker.strategy(),
        packet_size = blueprint.packet_size(),
        read_chunk = blueprint.acquisition.read_chunk,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if !args.input.exists() {
        anyhow::bail!("Capture file not found: {}", args.input.display());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        read_chunk: blueprint.acquisition.read_chunk,
        blueprint,
        input: args.input.clone(),
        max_packets: if args.max_packets == 0 {
            None
        } else {
            Some(args.max_packets)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        buffer_size: args.buffer_size,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let pipeline = Pipeline::new(pipeline_config);

    info!("Starting pipeline...");

    let stats = pipeline
        .run_until(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        packets_forwarded = stats.packets_forwarded,
        bytes_read = stats.bytes_read,
        duration_secs = stats.duration.as_secs_f64(),
        packets_per_sec = format!("{:.2}", stats.packets_per_sec()),
        "Pipeline completed"
    );

    if stats.dispatch.total_dropped() > 0 {
        warn!(
            dropped = stats.dispatch.total_dropped(),
            "Some packets were dropped by full sink queues"
        );
    }

    stats.print_summary();

    info!("Sample Sync finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
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

    warn!("Received shutdown signal, stopping pipeline...");
}
