//! # Sample Sync CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 采集回放与分发
//! - 优雅关闭处理

mod cli;
mod commands;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(logging_config(&cli))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Sample Sync CLI starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Map CLI logging flags onto the observability settings
fn logging_config(cli: &Cli) -> ObservabilityConfig {
    let (level, env_override) = if cli.quiet {
        ("warn", false)
    } else {
        match cli.verbose {
            0 => ("info", true),
            1 => ("debug", true),
            _ => ("trace", true),
        }
    };

    ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: level.to_string(),
        env_override,
    }
}
