//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CheckerSettings, StreamBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    strategy: String,
    sample_size: u8,
    packet_size: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    strategy: blueprint.checker.strategy().to_string(),
                    sample_size: blueprint.checker.config().sample_size,
                    packet_size: blueprint.packet_size(),
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &StreamBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    // Check for empty sinks
    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - accepted packets will be dropped".to_string());
    }

    if blueprint.acquisition.read_chunk < blueprint.packet_size() {
        warnings.push(format!(
            "acquisition.read_chunk ({}) is smaller than one packet ({} bytes)",
            blueprint.acquisition.read_chunk,
            blueprint.packet_size()
        ));
    }

    if !blueprint.acquisition.start_locked && blueprint.acquisition.max_sync_failures == 0 {
        warnings.push(
            "acquisition.max_sync_failures is 0 - the engine never gives up on a corrupted stream"
                .to_string(),
        );
    }

    match &blueprint.checker {
        CheckerSettings::SequenceCounter(s) => {
            let check_every = s.resolved_check_every();
            if check_every > s.counter_step {
                warnings.push(format!(
                    "checker.check_every ({check_every}) skips samples - only one in {} is validated",
                    check_every / s.counter_step
                ));
            }
        }
        CheckerSettings::MarkerBit(s) => {
            if s.resolved_reset_mask() & s.marker_mask == 0 {
                warnings.push(
                    "checker.reset_mask leaves the marker bits set - a sample checked twice passes twice"
                        .to_string(),
                );
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Strategy: {}", summary.strategy);
            println!("  Sample size: {} bytes", summary.sample_size);
            println!("  Packet size: {} bytes", summary.packet_size);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
