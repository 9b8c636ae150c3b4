//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{CheckerSettings, StreamBlueprint};
use tracing::info;

use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let resolved = ConfigLoader::resolve(&blueprint);

    if args.json {
        let json = ConfigLoader::to_json(&resolved).context("Failed to serialize config info")?;
        println!("{}", json);
    } else if args.toml {
        let toml = ConfigLoader::to_toml(&resolved).context("Failed to serialize config info")?;
        print!("{}", toml);
    } else {
        print_config_summary(&resolved);
    }

    Ok(())
}

/// Print a resolved blueprint as a tree
pub(crate) fn print_config_summary(blueprint: &StreamBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                Sample Sync Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let config = blueprint.checker.config();

    println!("Checker");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Strategy: {}", blueprint.checker.strategy());
    println!("   ├─ Sample size: {} bytes", config.sample_size);
    println!("   ├─ Frames for sync: {}", config.frames_for_sync);
    match &blueprint.checker {
        CheckerSettings::SequenceCounter(s) => {
            println!("   ├─ First counter: {}", s.first_counter);
            println!("   ├─ Counter step: {}", s.counter_step);
            println!("   ├─ Check every: {}", s.resolved_check_every());
            match s.resolved_acquire_from() {
                0 => println!("   └─ Acquire from: (no gate)"),
                value => println!("   └─ Acquire from: {value}"),
            }
        }
        CheckerSettings::MarkerBit(s) => {
            println!("   ├─ Marker mask: {:#x}", s.marker_mask);
            println!("   └─ Reset mask: {:#x}", s.resolved_reset_mask());
        }
    }

    let acquisition = &blueprint.acquisition;
    println!("\nAcquisition");
    println!("   ├─ Packet size: {} bytes", blueprint.packet_size());
    println!("   ├─ Read chunk: {} bytes", acquisition.read_chunk);
    println!("   ├─ Start locked: {}", acquisition.start_locked);
    match acquisition.max_sync_failures {
        0 => println!("   └─ Max sync failures: unlimited"),
        n => println!("   └─ Max sync failures: {n}"),
    }

    // Sinks
    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );

            let child_prefix = if is_last { "   " } else { "│  " };
            let mut params: Vec<_> = sink.params.iter().collect();
            params.sort();
            for (key, value) in params {
                println!("   {}  {} = {}", child_prefix, key, value);
            }
        }
    }

    println!();
}
