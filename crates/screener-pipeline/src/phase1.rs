use fundamentals_client::FundamentalsProvider;
use quality_scoring::ScoringEngine;
use screener_core::{EquityRow, ProfileSource, QuoteSource, ScreenerConfig};
use std::collections::HashSet;
use std::sync::Arc;

/// Phase 1: score every input ticker on fundamental quality and classify it
/// against the CSP threshold.
///
/// Tickers are processed strictly sequentially; a provider failure degrades
/// that ticker's fields and never aborts the batch.
pub struct Phase1Pipeline {
    fundamentals: FundamentalsProvider,
    profiles: Arc<dyn ProfileSource>,
    quotes: Arc<dyn QuoteSource>,
    scoring: ScoringEngine,
    config: ScreenerConfig,
}

impl Phase1Pipeline {
    pub fn new(
        fundamentals: FundamentalsProvider,
        profiles: Arc<dyn ProfileSource>,
        quotes: Arc<dyn QuoteSource>,
        config: ScreenerConfig,
    ) -> Self {
        Self {
            fundamentals,
            profiles,
            quotes,
            scoring: ScoringEngine::new(),
            config,
        }
    }

    /// One row per distinct input ticker, in first-seen order, regardless of
    /// how it classifies.
    pub async fn run(&self, tickers: &[String]) -> Vec<EquityRow> {
        let tickers = normalize_tickers(tickers);
        let mut rows = Vec::with_capacity(tickers.len());

        for ticker in &tickers {
            tracing::info!("→ Analyzing {}...", ticker);

            let is_etf = match self.profiles.is_etf(ticker).await {
                Ok(flag) => flag,
                Err(e) => {
                    tracing::warn!("[{}] ETF check failed: {}", ticker, e);
                    false
                }
            };

            let snapshot = self.fundamentals.fetch(ticker).await;
            let result = self.scoring.score(&snapshot);

            let price = match self.quotes.last_price(ticker).await {
                Ok(Some(price)) => price,
                Ok(None) => {
                    tracing::warn!("[{}] no quote data returned", ticker);
                    0.0
                }
                Err(e) => {
                    tracing::warn!("[{}] quote error: {}", ticker, e);
                    0.0
                }
            };

            let (qualified, near_miss) = self.config.classify(result.score);

            rows.push(EquityRow {
                ticker: ticker.clone(),
                score: result.score,
                price,
                pe: snapshot.pe,
                net_margin: snapshot.net_margin,
                roe: snapshot.roe,
                is_etf,
                rationale: result.explanation(),
                qualified,
                near_miss,
            });
        }

        rows
    }
}

/// Uppercase, drop blanks, dedup preserving first-seen order.
pub fn normalize_tickers(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
