//! Realtor Feed command line interface
//!
//! # Usage
//!
//! ```bash
//! # Fetch January 2024 trades for two districts as JSON
//! REALTOR_API_KEY=... realtor_cli fetch --region 강남구 --region 마포구 --year 2024 --month 1
//!
//! # Fail instead of printing the sample dataset
//! realtor_cli fetch --region 강남구 --no-fallback
//!
//! # List the region table
//! realtor_cli regions
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use realtor_feed::{PipelineConfig, RealtorPipeline};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "realtor_cli")]
#[command(version)]
#[command(about = "Fetch and normalize real-estate transaction records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Region table YAML (overrides REALTOR_REGIONS_FILE)
    #[arg(long, global = true)]
    regions_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch records for one or more regions and print them as JSON
    Fetch {
        /// Region name, repeatable
        #[arg(long = "region", short, required = true)]
        regions: Vec<String>,

        /// Contract year (default: current)
        #[arg(long)]
        year: Option<i32>,

        /// Contract month (default: current; 13 rolls into next year)
        #[arg(long)]
        month: Option<u32>,

        /// Exit non-zero on failure instead of printing sample records
        #[arg(long)]
        no_fallback: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List region names, district codes and centroids
    Regions,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "realtor_feed=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(path) = cli.regions_file {
        config = config.with_regions_file(path);
    }

    match cli.command {
        Commands::Fetch {
            regions,
            year,
            month,
            no_fallback,
            pretty,
        } => {
            let pipeline = RealtorPipeline::from_config(config)?;
            let records = if no_fallback {
                let mut records = Vec::new();
                for region in &regions {
                    let batch = pipeline
                        .try_fetch_region_data(region, year, month)
                        .await
                        .with_context(|| format!("Fetching {}", region))?;
                    records.extend(batch);
                }
                records
            } else {
                pipeline.fetch_multiple_regions(&regions, year, month).await
            };

            let output = if pretty {
                serde_json::to_string_pretty(&records)?
            } else {
                serde_json::to_string(&records)?
            };
            println!("{}", output);
        }
        Commands::Regions => {
            let table = config.load_regions().context("Loading region table")?;
            for region in table.iter() {
                println!(
                    "{}\t{}\t{:.4}\t{:.4}",
                    region.name, region.code, region.centroid.lat, region.centroid.lng
                );
            }
        }
    }
    Ok(())
}
