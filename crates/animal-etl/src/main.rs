//! Animal ETL - moves animals from the source API to the home endpoint

use animal_etl::{ConfigOverrides, EtlConfig, Pipeline, ReqwestTransport};
use animal_etl_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "animal-etl")]
#[command(author, version, about = "Extract, transform and load animal records")]
struct Cli {
    /// YAML config file (defaults to ./config.yaml when present)
    #[arg(short, long, env = "ANIMAL_ETL_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Source listing URL
    #[arg(long)]
    animals_url: Option<String>,

    /// Destination URL for posted batches
    #[arg(long)]
    home_url: Option<String>,

    /// Records per posted batch
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence
    let log_config = LogConfig::builder()
        .level(log_level)
        .output(LogOutput::Both)
        .log_file_prefix("etl")
        .build()
        .with_env_overrides()?;

    let _guard = init_logging(&log_config)?;

    match run(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!(error = %e, "ETL failed");
            eprintln!("Error: {e:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = ConfigOverrides {
        animals_url: cli.animals_url,
        home_url: cli.home_url,
        batch_size: cli.batch_size,
    };
    let config = EtlConfig::load(cli.config.as_deref(), &overrides)?;
    info!(
        animals_url = %config.animals_url,
        home_url = %config.home_url,
        batch_size = config.batch_size,
        "Loaded configuration"
    );

    let transport = ReqwestTransport::new()?;
    let summary = Pipeline::from_config(transport, &config).run().await?;
    info!(
        extracted = summary.extracted,
        batches = summary.batches_posted,
        records = summary.records_posted,
        "Run summary"
    );

    Ok(())
}
