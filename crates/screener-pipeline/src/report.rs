//! Flat-file output snapshots and Phase-1 table re-reading.
//!
//! Every run writes timestamped CSVs into the results directory; Phase 2
//! picks its input by taking the most recent Phase-1 snapshot rather than
//! re-reading the ticker file.

use anyhow::{Context, Result};
use chrono::Utc;
use console::style;
use screener_core::{EquityRow, EvaluatedContract, ScreenerConfig};
use std::fs;
use std::path::{Path, PathBuf};

pub const PHASE1_PREFIX: &str = "CSP_Phase1";
pub const PHASE2_OPTIONS_PREFIX: &str = "CSP_Phase2_Options";
pub const PHASE2_DEBUG_PREFIX: &str = "CSP_Phase2_Debug";

/// Ticker and score re-read from a persisted Phase-1 table.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase1Record {
    pub ticker: String,
    pub score: f64,
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Score band used for row coloring: green at 8+, yellow at the qualifying
/// threshold, red below.
pub fn score_band(score: f64, config: &ScreenerConfig) -> &'static str {
    if score >= 8.0 {
        "high"
    } else if score >= config.score_threshold {
        "medium"
    } else {
        "low"
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn opt_fmt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}

/// Write the Phase-1 table, one row per [`EquityRow`], banded for scanning.
pub fn write_phase1(rows: &[EquityRow], config: &ScreenerConfig) -> Result<PathBuf> {
    fs::create_dir_all(&config.results_dir)
        .with_context(|| format!("creating {}", config.results_dir.display()))?;

    let path = config
        .results_dir
        .join(format!("{}_{}.csv", PHASE1_PREFIX, timestamp()));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "Ticker",
        "Score",
        "Price",
        "PE Ratio",
        "Net Margin",
        "ROE",
        "ETF",
        "Scoring Explanation",
        "CSP Qualified",
        "Near Miss",
        "Band",
    ])?;

    for row in rows {
        writer.write_record(&[
            row.ticker.clone(),
            format!("{:.2}", row.score),
            format!("{:.2}", row.price),
            opt_fmt(row.pe, 2),
            opt_fmt(row.net_margin, 4),
            opt_fmt(row.roe, 4),
            yes_no(row.is_etf).to_string(),
            row.rationale.clone(),
            yes_no(row.qualified).to_string(),
            yes_no(row.near_miss).to_string(),
            score_band(row.score, config).to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(path)
}

/// Most recent Phase-1 snapshot in the results directory, if any. The
/// timestamped names sort lexicographically, so the max name is the latest.
pub fn latest_phase1_file(results_dir: &Path) -> Result<Option<PathBuf>> {
    if !results_dir.exists() {
        return Ok(None);
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(results_dir)
        .with_context(|| format!("reading {}", results_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&format!("{PHASE1_PREFIX}_")) && n.ends_with(".csv"))
                .unwrap_or(false)
        })
        .collect();

    candidates.sort();
    Ok(candidates.pop())
}

/// Re-read ticker and score from a persisted Phase-1 table. Rows whose score
/// column does not parse are skipped with a warning.
pub fn read_phase1(path: &Path) -> Result<Vec<Phase1Record>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let ticker_idx = headers
        .iter()
        .position(|h| h == "Ticker")
        .context("Phase-1 table has no Ticker column")?;
    let score_idx = headers
        .iter()
        .position(|h| h == "Score")
        .context("Phase-1 table has no Score column")?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let ticker = match record.get(ticker_idx) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => continue,
        };
        match record.get(score_idx).and_then(|s| s.parse::<f64>().ok()) {
            Some(score) => records.push(Phase1Record { ticker, score }),
            None => tracing::warn!("[{}] unparseable score in {}", ticker, path.display()),
        }
    }

    Ok(records)
}

/// Re-derive the qualified / near-miss partition from persisted scores.
pub fn partition_tickers(
    records: &[Phase1Record],
    config: &ScreenerConfig,
) -> (Vec<String>, Vec<String>) {
    let mut qualified = Vec::new();
    let mut near_miss = Vec::new();

    for record in records {
        let (is_qualified, is_near_miss) = config.classify(record.score);
        if is_qualified {
            qualified.push(record.ticker.clone());
        } else if is_near_miss {
            near_miss.push(record.ticker.clone());
        }
    }

    (qualified, near_miss)
}

fn write_contract_table(
    evaluated: &[EvaluatedContract],
    config: &ScreenerConfig,
    prefix: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(&config.results_dir)
        .with_context(|| format!("creating {}", config.results_dir.display()))?;

    let path = config
        .results_dir
        .join(format!("{}_{}.csv", prefix, timestamp()));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "Ticker",
        "Symbol",
        "Strike",
        "Bid",
        "Ask",
        "Last",
        "Delta",
        "OI",
        "Expiry",
        "DTE",
        "ROC",
        "Premium",
        "Near Miss",
        "Failed Reason",
    ])?;

    for entry in evaluated {
        let contract = &entry.contract;
        writer.write_record(&[
            entry.ticker.clone(),
            contract.symbol.clone(),
            format!("{:.2}", contract.strike),
            format!("{:.2}", contract.bid),
            format!("{:.2}", contract.ask),
            format!("{:.2}", contract.last),
            opt_fmt(contract.delta, 4),
            contract.open_interest.to_string(),
            contract.expiry.format("%Y-%m-%d").to_string(),
            contract.days_to_expiration.to_string(),
            format!("{:.4}", contract.roc),
            format!("{:.2}", contract.premium),
            yes_no(entry.qualification.near_miss).to_string(),
            entry.qualification.failed_reasons.join(", "),
        ])?;
    }

    writer.flush()?;
    Ok(path)
}

/// Persist the qualifying contracts.
pub fn write_phase2_options(
    evaluated: &[EvaluatedContract],
    config: &ScreenerConfig,
) -> Result<PathBuf> {
    write_contract_table(evaluated, config, PHASE2_OPTIONS_PREFIX)
}

/// Persist the full debug log: every evaluated contract with its outcome.
pub fn write_phase2_debug(
    evaluated: &[EvaluatedContract],
    config: &ScreenerConfig,
) -> Result<PathBuf> {
    write_contract_table(evaluated, config, PHASE2_DEBUG_PREFIX)
}

/// Terminal rendering of the Phase-1 table, colored by score band.
pub fn render_phase1_table(rows: &[EquityRow], config: &ScreenerConfig) -> String {
    let mut out = format!(
        "{:<8} {:>6} {:>10} {:>5} {:>10} {}\n",
        "Ticker", "Score", "Price", "ETF", "Qualified", "Explanation"
    );

    for row in rows {
        let line = format!(
            "{:<8} {:>6.2} {:>10.2} {:>5} {:>10} {}",
            row.ticker,
            row.score,
            row.price,
            yes_no(row.is_etf),
            yes_no(row.qualified),
            row.rationale
        );
        let styled = match score_band(row.score, config) {
            "high" => style(line).green(),
            "medium" => style(line).yellow(),
            _ => style(line).red(),
        };
        out.push_str(&styled.to_string());
        out.push('\n');
    }

    out
}
