// src/main.rs
mod edgar;
mod pipeline;
mod render;
mod storage;
mod utils;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use pipeline::{CompanyIdentity, RunConfig, Stage};
use utils::AppError;

// IMPORTANT: Replace with your actual details or make configurable.
// SEC fair-access policy wants a descriptive client plus a contact address.
const DEFAULT_USER_AGENT: &str = "SecArchiver/0.1 (filings archive; ops@example.com)";
const DOWNLOAD_PACING_MS: u64 = 300;

/// Command Line Interface for the SEC 10-K archiver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ticker symbols to archive (defaults to the built-in company list)
    #[arg(short, long)]
    ticker: Vec<String>,

    /// Output directory for downloaded filings, rendered PDFs and the run report
    #[arg(short, long, default_value = ".")]
    output_dir: String,

    /// User-Agent sent to SEC EDGAR (identify yourself and a contact address)
    #[arg(long)]
    user_agent: Option<String>,

    /// Attempts per JSON fetch before giving up
    #[arg(long, default_value = "5")]
    max_attempts: u32,
}

/// The fixed batch archived when no tickers are given on the command line.
fn default_companies() -> Vec<CompanyIdentity> {
    [
        ("Apple", "AAPL"),
        ("Meta", "META"),
        ("Alphabet", "GOOGL"),
        ("Amazon", "AMZN"),
        ("Netflix", "NFLX"),
        ("Goldman Sachs", "GS"),
    ]
    .into_iter()
    .map(|(display_name, ticker)| CompanyIdentity {
        display_name: display_name.to_string(),
        ticker: ticker.to_string(),
    })
    .collect()
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting archive run for args: {:?}", args);

    let companies = if args.ticker.is_empty() {
        default_companies()
    } else {
        args.ticker
            .iter()
            .map(|ticker| CompanyIdentity {
                display_name: ticker.to_uppercase(),
                ticker: ticker.to_uppercase(),
            })
            .collect()
    };

    let config = RunConfig {
        companies,
        output_dir: PathBuf::from(&args.output_dir),
        user_agent: args
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        max_attempts: args.max_attempts,
        download_pacing: Duration::from_millis(DOWNLOAD_PACING_MS),
    };

    // 3. Run the pipeline; per-company failures are reported, not fatal.
    // Only the whole-batch ticker directory fetch can fail the process.
    let report = pipeline::run(&config).await?;

    let rendered = report
        .companies
        .iter()
        .filter(|company| company.stage == Stage::Rendered)
        .count();
    tracing::info!(
        "Archive run finished. {}/{} companies fully rendered",
        rendered,
        report.companies.len()
    );

    Ok(())
}
