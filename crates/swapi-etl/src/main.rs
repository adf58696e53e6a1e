//! SWAPI ETL - planets pipeline runner

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use swapi_common::logging::{init_logging, LogConfig, LogLevel};
use swapi_etl::config::{EtlConfig, RunSwitches};
use swapi_etl::pipeline;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "swapi-etl")]
#[command(author, version, about = "Extract SWAPI planets into bronze/silver/gold layers and load them")]
struct Cli {
    /// Write bronze, silver and gold Parquet files to object storage
    #[arg(long, env = "WRITE_STORAGE", action = ArgAction::Set, default_value_t = true)]
    write_storage: bool,

    /// Load the gold tables into Postgres
    #[arg(long, env = "LOAD_POSTGRES", action = ArgAction::Set, default_value_t = true)]
    load_postgres: bool,

    /// Load the gold tables into BigQuery from object storage
    #[arg(long, env = "LOAD_WAREHOUSE", action = ArgAction::Set, default_value_t = true)]
    load_warehouse: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn switches(&self) -> RunSwitches {
        RunSwitches {
            write_storage: self.write_storage,
            load_postgres: self.load_postgres,
            load_warehouse: self.load_warehouse,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .file_prefix("swapi-etl")
        .build()
        .with_env_overrides()?;

    init_logging(&log_config)?;

    let switches = cli.switches();
    info!(?switches, "Starting SWAPI ETL");

    let config = EtlConfig::load(switches).context("Invalid configuration")?;

    match pipeline::run(&config).await {
        Ok(report) => {
            info!(
                fact_rows = report.fact_rows,
                files = report.files_written.len(),
                "Run complete"
            );
            Ok(())
        },
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            Err(e.into())
        },
    }
}
