//! Webdrops fetcher.
//!
//! Downloads the sensor observations, sensor maps and radar layers needed
//! to initialise WRFDA, Continuum and Risico runs from the webdrops API.
//! Payloads are saved as-is under the output directory; conversion to model
//! formats happens downstream.

mod jobs;
mod plan;
mod staging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use webdrops::time::{format_hour, parse_hour};
use webdrops::{BatchFetcher, ReqwestTransport, RetryPolicy, TimelineResolver, WebdropsConfig};

use jobs::JobContext;
use plan::DownloadType;
use staging::Staging;

#[derive(Parser, Debug)]
#[command(name = "webdrops-fetcher")]
#[command(about = "Fetch webdrops observations and radar data for a simulation start date")]
struct Args {
    /// Simulation start date, YYYYMMDDHH (UTC)
    #[arg(value_parser = parse_start_date)]
    start_date: DateTime<Utc>,

    /// Types of data to download
    #[arg(value_enum, ignore_case = true, required = true)]
    types: Vec<DownloadType>,

    /// Directory for fetched files
    #[arg(long, env = "WEBDROPS_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Attempts per request
    #[arg(long, default_value = "5")]
    max_retries: u32,

    /// Backoff step between attempts, in seconds
    #[arg(long, default_value = "1")]
    backoff_secs: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_start_date(s: &str) -> Result<DateTime<Utc>, String> {
    parse_hour(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!(
        start_date = %format_hour(&args.start_date),
        types = ?args.types,
        "Starting webdrops fetcher"
    );

    let config = Arc::new(WebdropsConfig::from_env().context("Failed to load webdrops configuration")?);
    let transport = Arc::new(
        ReqwestTransport::new(config.request_timeout).context("Failed to create HTTP client")?,
    );
    let policy = RetryPolicy::new(args.max_retries, Duration::from_secs(args.backoff_secs));

    let staging = Staging::create(&args.output_dir).await?;

    let ctx = JobContext {
        fetcher: BatchFetcher::new(config, transport, policy),
        staging,
        resolver: TimelineResolver::default(),
    };

    for kind in &args.types {
        for job in plan::plan(*kind, args.start_date) {
            job.run(&ctx)
                .await
                .with_context(|| format!("Fetching {:?} inputs", kind))?;
        }
        info!(download_type = ?kind, "Download type complete");
    }

    info!(output_dir = %ctx.staging.root().display(), "All downloads complete");

    Ok(())
}
