pub mod fmp;
pub mod yahoo;

pub use fmp::FmpClient;
pub use yahoo::YahooClient;

use screener_core::{FundamentalSnapshot, FundamentalsSource};

/// Ordered chain of fundamentals sources; the first usable snapshot wins.
///
/// A source error degrades to "nothing from this source" rather than failing
/// the ticker: absent fundamentals are a normal, scoreable condition.
pub struct FundamentalsProvider {
    sources: Vec<Box<dyn FundamentalsSource>>,
}

impl FundamentalsProvider {
    pub fn new(sources: Vec<Box<dyn FundamentalsSource>>) -> Self {
        Self { sources }
    }

    /// FMP first, Yahoo as fallback.
    pub fn with_default_sources(fmp: FmpClient) -> Self {
        Self::new(vec![Box::new(fmp), Box::new(YahooClient::new())])
    }

    pub async fn fetch(&self, ticker: &str) -> FundamentalSnapshot {
        for source in &self.sources {
            match source.fundamentals(ticker).await {
                Ok(snapshot) if snapshot.has_data() => return snapshot,
                Ok(_) => {
                    tracing::debug!("[{}] {}: no usable fundamentals", ticker, source.name());
                }
                Err(e) => {
                    tracing::warn!("[{}] {} fundamentals error: {}", ticker, source.name(), e);
                }
            }
        }
        FundamentalSnapshot::default()
    }
}
