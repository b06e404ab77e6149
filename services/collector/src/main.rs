//! Collector CLI - Snapshots remote resources to local CSV files
//!
//! Snapshots land in `--out-dir` as `<resource_id>.csv` and can be listed as
//! local agriculture/climate paths afterwards, so the service no longer needs
//! the API at startup.
//!
//! Usage:
//!   # Single resource:
//!   cargo run --bin collector -- --resource-id f20d7d45-e3d8-4603-bc79-15a3d0db1f9a
//!
//!   # Every resource in the sources config:
//!   cargo run --bin collector -- --config config/sources.json

use anyhow::{Context, Result};
use clap::Parser;
use collector::{OgdClient, OgdConfig, RawTable, SourcesConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "collector", about = "Snapshots remote open-data resources as CSV")]
struct Args {
    /// Single resource identifier to fetch
    #[arg(long)]
    resource_id: Option<String>,

    /// Path to sources config file (batch mode)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for CSV snapshots
    #[arg(long, default_value = "data/raw")]
    out_dir: PathBuf,

    /// Row limit per resource (defaults to OGD_FETCH_LIMIT)
    #[arg(long)]
    limit: Option<usize>,

    /// Wait between requests, in milliseconds
    #[arg(long, default_value = "1000")]
    rate_limit_ms: u64,

    /// Dry run - fetch but don't write snapshots
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

/// Write a snapshot as `<out_dir>/<resource_id>.csv`
async fn save_snapshot(out_dir: &Path, resource_id: &str, table: &RawTable) -> Result<PathBuf> {
    fs::create_dir_all(out_dir).await?;

    let mut buf = Vec::new();
    table
        .write_csv(&mut buf)
        .context("Failed to serialize snapshot")?;

    let path = out_dir.join(format!("{}.csv", resource_id));
    fs::write(&path, buf).await?;
    Ok(path)
}

/// Fetch one resource and store it; `Ok(None)` when the API gave nothing
async fn collect_one(client: &OgdClient, args: &Args, resource_id: &str, limit: usize) -> Result<Option<usize>> {
    let table = match client.try_fetch(resource_id, limit).await {
        Ok(table) => table,
        Err(e) => {
            warn!(resource_id, error = %e, "no data collected");
            return Ok(None);
        }
    };

    println!("  Downloaded: {} rows, columns: {:?}", table.len(), table.headers());

    if args.dry_run {
        println!("  Dry run - would write {}.csv", resource_id);
    } else {
        let path = save_snapshot(&args.out_dir, resource_id, &table).await?;
        println!("  Saved to: {}", path.display());
        println!("  Captured at: {}", chrono::Utc::now().to_rfc3339());
    }

    Ok(Some(table.len()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let ogd = OgdConfig::from_env()?;
    let limit = args.limit.unwrap_or(ogd.fetch_limit);
    let client = OgdClient::new(ogd)?;

    println!("=== Agrodata Collector ===");
    println!("Output: {}", args.out_dir.display());

    let resource_ids: Vec<String> = if let Some(config_path) = &args.config {
        let sources = SourcesConfig::load(config_path)?;
        info!(version = %sources.version, "loaded sources config");
        sources.all_resource_ids().map(str::to_string).collect()
    } else if let Some(resource_id) = &args.resource_id {
        vec![resource_id.clone()]
    } else {
        anyhow::bail!(
            "Must specify either:\n  \
             --config <path> for batch mode, or\n  \
             --resource-id <id> for a single resource"
        );
    };

    let mut collected = 0;
    let mut empty = 0;

    for (idx, resource_id) in resource_ids.iter().enumerate() {
        if idx > 0 {
            sleep(Duration::from_millis(args.rate_limit_ms)).await;
        }

        println!("\n[{}]", resource_id);
        match collect_one(&client, &args, resource_id, limit).await? {
            Some(rows) => {
                println!("  ✓ Collected: {} rows", rows);
                collected += 1;
            }
            None => {
                println!("  ✗ Nothing collected");
                empty += 1;
            }
        }
    }

    println!("\n=== Collection Summary ===");
    println!("Collected: {}", collected);
    println!("Empty: {}", empty);

    Ok(())
}
