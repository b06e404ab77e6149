//! Parser CLI - Runs the harmonization pipeline and reports what it produced
//!
//! Nothing is written anywhere; this is the dry run operators use to check a
//! sources config before starting the API.
//!
//! Usage:
//!   cargo run --bin parser -- --config config/sources.json
//!   cargo run --bin parser -- --config config/sources.json --offline
//!   cargo run --bin parser -- --offline --json

use anyhow::Result;
use clap::Parser;
use collector::{OgdClient, OgdConfig, RawTable, RemoteSource, SourcesConfig};
use parser::{Datasets, HarmonizeReport, Harmonizer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "parser", about = "Builds the canonical datasets and prints a report")]
struct Args {
    /// Path to sources config file
    #[arg(long, env = "SOURCES_CONFIG", default_value = "config/sources.json")]
    config: PathBuf,

    /// Skip the remote fallback entirely
    #[arg(long, default_value = "false")]
    offline: bool,

    /// Number of sample rows to print per dataset
    #[arg(long, default_value = "3")]
    samples: usize,

    /// Print the pipeline report as JSON instead of text
    #[arg(long, default_value = "false")]
    json: bool,
}

/// Remote source that never has anything
struct Offline;

#[async_trait::async_trait]
impl RemoteSource for Offline {
    async fn fetch(&self, _resource_id: &str, _limit: usize) -> RawTable {
        RawTable::empty()
    }
}

fn print_report(report: &HarmonizeReport) {
    println!("\nSources:");
    for source in &report.sources {
        let shape = source
            .file
            .shape
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unreadable".to_string());
        println!(
            "  {} [{}] -> {} rows",
            source.file.path.display(),
            shape,
            source.staged_rows
        );
    }

    println!("\nLocal rows: {}", report.local_rows);
    if report.remote_fallback {
        println!("Remote fallback: {} rows", report.remote_rows);
    }
    println!(
        "Agriculture: {} staged, {} kept",
        report.agriculture_staged, report.agriculture_rows
    );
    println!(
        "Climate: {} staged, {} kept{}",
        report.climate_staged,
        report.climate_rows,
        if report.climate_from_remote { " (remote)" } else { "" }
    );
}

fn print_datasets(datasets: &Datasets, samples: usize) {
    let agri = &datasets.agriculture;
    println!("\n=== Agriculture ===");
    println!("Rows: {}", agri.len());
    println!("States: {}", agri.states().len());
    println!("Crops: {}", agri.crops().len());
    if let Some((lo, hi)) = agri.year_range() {
        println!("Years: {} - {}", lo, hi);
    }
    println!("Latest year: {}", datasets.latest_year());

    for (i, r) in agri.records().iter().take(samples).enumerate() {
        println!(
            "  [{}] {} | {} | {} | {:.2}",
            i + 1,
            r.state_name,
            r.crop_name,
            r.year,
            r.production
        );
    }
    if agri.len() > samples {
        println!("  ... and {} more", agri.len() - samples);
    }

    let climate = &datasets.climate;
    println!("\n=== Climate ===");
    println!("Rows: {}", climate.len());
    println!("States: {}", climate.states().len());
    if let Some((lo, hi)) = climate.year_range() {
        println!("Years: {} - {}", lo, hi);
    }

    for (i, r) in climate.records().iter().take(samples).enumerate() {
        println!("  [{}] {} | {} | {:.1}mm", i + 1, r.state_name, r.year, r.rainfall);
    }
    if climate.len() > samples {
        println!("  ... and {} more", climate.len() - samples);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    println!("=== Agrodata Parser ===");
    println!("Config: {}", args.config.display());
    println!("Mode: {}", if args.offline { "offline" } else { "online" });

    let sources = SourcesConfig::load_or_default(&args.config)?;
    let ogd = OgdConfig::from_env()?;
    let fetch_limit = ogd.fetch_limit;

    let client;
    let remote: &dyn RemoteSource = if args.offline {
        &Offline
    } else {
        client = OgdClient::new(ogd)?;
        &client
    };

    let (datasets, report) = Harmonizer::new(&sources, remote)
        .with_fetch_limit(fetch_limit)
        .run()
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        print_datasets(&datasets, args.samples);
    }

    if datasets.is_empty() {
        anyhow::bail!("No data loaded from any source");
    }

    Ok(())
}
