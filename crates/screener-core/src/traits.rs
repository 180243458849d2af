use crate::{FundamentalSnapshot, OptionContract, ScreenerError};
use async_trait::async_trait;

/// One fundamentals backend in the ordered fallback chain.
#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    /// Short provider name for log lines.
    fn name(&self) -> &'static str;

    async fn fundamentals(&self, ticker: &str) -> Result<FundamentalSnapshot, ScreenerError>;
}

/// Company profile lookup, currently only the ETF flag.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn is_etf(&self, ticker: &str) -> Result<bool, ScreenerError>;
}

/// Last-trade price lookup.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// `Ok(None)` means the quote endpoint answered but had no data for the
    /// symbol, which is distinct from the call failing.
    async fn last_price(&self, ticker: &str) -> Result<Option<f64>, ScreenerError>;
}

/// Put-option chain lookup.
#[async_trait]
pub trait OptionsSource: Send + Sync {
    /// Puts expiring within `[min_days, max_days]` inclusive, with derived
    /// `roc`/`premium` populated.
    ///
    /// `Err` is an outright lookup failure the caller should log and skip;
    /// `Ok(vec![])` is a successful lookup with nothing in the window.
    async fn put_options(
        &self,
        ticker: &str,
        min_days: i64,
        max_days: i64,
    ) -> Result<Vec<OptionContract>, ScreenerError>;
}
