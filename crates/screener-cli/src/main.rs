//! csp-screener: two-phase cash-secured-put screener.
//!
//! Usage:
//!   csp-screener phase1 --tickers tickers.txt
//!   csp-screener phase2
//!
//! Phase 1 scores every ticker in the input file and writes a banded table
//! under the results directory. Phase 2 re-reads the most recent Phase-1
//! table and screens put chains for the qualifiers.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fundamentals_client::{FmpClient, FundamentalsProvider};
use screener_core::{ScreenerConfig, ScreenerError};
use screener_pipeline::{report, Phase1Pipeline, Phase2Pipeline};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tradier_client::TradierClient;

#[derive(Parser, Debug)]
#[command(name = "csp-screener", about = "Two-phase cash-secured-put screener")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score equities on fundamental quality and persist the ranked table
    Phase1 {
        /// Newline-delimited ticker list, one symbol per line
        #[arg(short, long, default_value = "tickers.txt")]
        tickers: PathBuf,
    },
    /// Screen put chains for the latest Phase-1 qualifiers
    Phase2,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "screener_cli=info,screener_pipeline=info,tradier_client=warn,fundamentals_client=warn"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = ScreenerConfig::from_env();

    match cli.command {
        Command::Phase1 { tickers } => run_phase1(&tickers, &config).await,
        Command::Phase2 => run_phase2(&config).await,
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| ScreenerError::MissingConfig(format!("{key} must be set")))
        .map_err(Into::into)
}

fn read_ticker_file(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        bail!("missing ticker file: {}", path.display());
    }
    let tickers: Vec<String> = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    if tickers.is_empty() {
        bail!("ticker file {} has no symbols", path.display());
    }
    Ok(tickers)
}

async fn run_phase1(tickers_file: &Path, config: &ScreenerConfig) -> Result<()> {
    // Input validation happens before any client is built, so a missing
    // ticker file halts without touching the network.
    let tickers = read_ticker_file(tickers_file)?;

    let tradier = TradierClient::new(require_env("TRADIER_API_KEY")?);
    let fmp = FmpClient::new(require_env("FMP_API_KEY")?);
    let fundamentals = FundamentalsProvider::with_default_sources(fmp.clone());

    let pipeline = Phase1Pipeline::new(
        fundamentals,
        Arc::new(fmp),
        Arc::new(tradier),
        config.clone(),
    );

    tracing::info!("📊 Running stock screener Phase 1 on {} tickers...", tickers.len());
    let rows = pipeline.run(&tickers).await;

    let path = report::write_phase1(&rows, config)?;
    print!("{}", report::render_phase1_table(&rows, config));
    tracing::info!("✅ Phase 1 complete. Results saved to {}", path.display());
    Ok(())
}

async fn run_phase2(config: &ScreenerConfig) -> Result<()> {
    let Some(phase1_file) = report::latest_phase1_file(&config.results_dir)? else {
        bail!(
            "no Phase 1 results found in {}; run phase1 first",
            config.results_dir.display()
        );
    };

    tracing::info!("Loading {}", phase1_file.display());
    let records = report::read_phase1(&phase1_file)?;
    let (qualified, mut near_miss) = report::partition_tickers(&records, config);
    if !config.include_near_miss {
        near_miss.clear();
    }
    tracing::info!(
        "Scanning options for {} qualifiers and {} near misses...",
        qualified.len(),
        near_miss.len()
    );

    let tradier = TradierClient::new(require_env("TRADIER_API_KEY")?)
        .with_delta_band(config.delta_min, config.delta_max);
    let pipeline = Phase2Pipeline::new(Arc::new(tradier), config.clone());
    let output = pipeline.run(&qualified, &near_miss).await;

    if output.qualifying.is_empty() {
        tracing::info!("No qualifying options found.");
    } else {
        let path = report::write_phase2_options(&output.qualifying, config)?;
        tracing::info!(
            "✅ {} qualifying contracts saved to {}",
            output.qualifying.len(),
            path.display()
        );
    }

    let debug_path = report::write_phase2_debug(&output.debug_log, config)?;
    tracing::info!("Debug log saved to {}", debug_path.display());
    Ok(())
}
