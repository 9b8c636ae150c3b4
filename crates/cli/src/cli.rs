//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sample Sync - frame synchronisation and validation for raw sample streams
#[derive(Parser, Debug)]
#[command(
    name = "sample-sync",
    author,
    version,
    about = "Frame synchronisation and validation for raw sample streams",
    long_about = "Locates frame boundaries in a continuous stream of fixed-size samples,\n\
                  validates every packet header with a sequence counter or marker bit\n\
                  checker, and dispatches accepted packets to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SAMPLE_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SAMPLE_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a raw capture through the acquisition engine
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the resolved configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "SAMPLE_SYNC_CONFIG"
    )]
    pub config: PathBuf,

    /// Raw capture file to replay
    #[arg(short, long, env = "SAMPLE_SYNC_INPUT")]
    pub input: PathBuf,

    /// Override bytes read per acquisition cycle
    #[arg(long, env = "SAMPLE_SYNC_READ_CHUNK")]
    pub read_chunk: Option<usize>,

    /// Stop after forwarding this many packets (0 = unlimited)
    #[arg(long, default_value = "0", env = "SAMPLE_SYNC_MAX_PACKETS")]
    pub max_packets: u64,

    /// Replay timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "SAMPLE_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without replaying
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between engine and dispatcher
    #[arg(long, default_value = "1024", env = "SAMPLE_SYNC_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SAMPLE_SYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long, conflicts_with = "toml")]
    pub json: bool,

    /// Output as TOML
    #[arg(long)]
    pub toml: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "sample-sync",
            "-v",
            "run",
            "-c",
            "stream.toml",
            "-i",
            "capture.bin",
            "--read-chunk",
            "512",
            "--max-packets",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("stream.toml"));
                assert_eq!(args.input, PathBuf::from("capture.bin"));
                assert_eq!(args.read_chunk, Some(512));
                assert_eq!(args.max_packets, 10);
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_info_formats_conflict() {
        let result = Cli::try_parse_from(["sample-sync", "info", "--json", "--toml"]);
        assert!(result.is_err());
    }
}
