use async_trait::async_trait;
use screener_core::{FundamentalSnapshot, FundamentalsSource, ScreenerError};

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance";

/// Yahoo Finance fallback source for the fundamentals triple.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
}

impl YahooClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    async fn quote_value(&self, ticker: &str) -> Result<serde_json::Value, ScreenerError> {
        let url = format!("{}/quote?symbols={}", BASE_URL, ticker);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScreenerError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScreenerError::ApiError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ScreenerError::ParseError(e.to_string()))
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull the fundamentals triple out of a Yahoo quote response. A response
/// with no result entry is a valid "no coverage" answer, not an error.
fn snapshot_from_quote(json: &serde_json::Value, ticker: &str) -> FundamentalSnapshot {
    let result = json
        .get("quoteResponse")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first());

    let Some(data) = result else {
        tracing::debug!("[{}] no Yahoo quote entry", ticker);
        return FundamentalSnapshot::default();
    };

    FundamentalSnapshot {
        pe: data.get("trailingPE").and_then(|v| v.as_f64()),
        net_margin: data.get("profitMargins").and_then(|v| v.as_f64()),
        roe: data.get("returnOnEquity").and_then(|v| v.as_f64()),
    }
}

#[async_trait]
impl FundamentalsSource for YahooClient {
    fn name(&self) -> &'static str {
        "Yahoo"
    }

    async fn fundamentals(&self, ticker: &str) -> Result<FundamentalSnapshot, ScreenerError> {
        let json = self.quote_value(ticker).await?;
        Ok(snapshot_from_quote(&json, ticker))
    }
}
