use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use screener_core::{OptionContract, OptionsSource, QuoteSource, ScreenerError};
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.tradier.com/v1";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let wait_until = match ts.front().and_then(|f| f.checked_add(self.window)) {
                Some(t) => t,
                None => return,
            };
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for Tradier API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Tradier market-data client: quotes, expirations, put-option chains.
#[derive(Clone)]
pub struct TradierClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
    /// Acceptable |delta| band for chain filtering; `None` keeps everything.
    delta_band: Option<(f64, f64)>,
}

impl TradierClient {
    pub fn new(api_key: String) -> Self {
        // Tradier production allows 120 req/min on market-data endpoints.
        let rate_limit: usize = std::env::var("TRADIER_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        let base_url = std::env::var("TRADIER_BASE_URL")
            .ok()
            .unwrap_or_else(|| BASE_URL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
            delta_band: None,
        }
    }

    /// Keep only chain contracts whose |delta| falls inside the band.
    /// Contracts without greeks are always kept.
    pub fn with_delta_band(mut self, min: f64, max: f64) -> Self {
        self.delta_band = Some((min, max));
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ScreenerError> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| ScreenerError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScreenerError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ScreenerError::ParseError(e.to_string()))
    }

    /// Fetch the last-trade quote for a symbol. `Ok(None)` means the endpoint
    /// answered but had no quote for the symbol.
    pub async fn quote(&self, ticker: &str) -> Result<Option<TradierQuote>, ScreenerError> {
        let response: QuotesResponse = self
            .get_json("markets/quotes", &[("symbols", ticker)])
            .await?;

        Ok(response
            .quotes
            .and_then(|body| body.quote)
            .map(|q| q.into_first())
            .flatten())
    }

    /// List option expiration dates for a symbol.
    pub async fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>, ScreenerError> {
        let response: ExpirationsResponse = self
            .get_json("markets/options/expirations", &[("symbol", ticker)])
            .await?;

        let dates = response
            .expirations
            .and_then(|body| body.date)
            .map(|d| d.into_vec())
            .unwrap_or_default();

        dates
            .iter()
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|e| ScreenerError::ParseError(format!("expiration {d}: {e}")))
            })
            .collect()
    }

    /// Fetch the full chain (all expirations) and reduce it to puts in the
    /// expiration window with derived CSP fields.
    pub async fn put_chain(
        &self,
        ticker: &str,
        min_days: i64,
        max_days: i64,
    ) -> Result<Vec<OptionContract>, ScreenerError> {
        let response: ChainResponse = self
            .get_json(
                "markets/options/chains",
                &[("symbol", ticker), ("greeks", "true")],
            )
            .await?;

        let raw = response
            .options
            .and_then(|body| body.option)
            .map(|o| o.into_vec())
            .unwrap_or_default();

        let today = Utc::now().date_naive();
        Ok(build_put_contracts(
            raw,
            today,
            min_days,
            max_days,
            self.delta_band,
        ))
    }
}

/// Chain reduction, split out so the window/delta/derived-field logic is
/// testable without a live endpoint.
fn build_put_contracts(
    raw: Vec<RawChainOption>,
    today: NaiveDate,
    min_days: i64,
    max_days: i64,
    delta_band: Option<(f64, f64)>,
) -> Vec<OptionContract> {
    let mut puts = Vec::new();

    for opt in raw {
        if !opt.option_type.eq_ignore_ascii_case("put") {
            continue;
        }
        let expiry = match NaiveDate::parse_from_str(&opt.expiration_date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => continue,
        };
        let days = (expiry - today).num_days();
        if days < min_days || days > max_days {
            continue;
        }
        let strike = opt.strike.unwrap_or(0.0);
        if strike <= 0.0 {
            continue;
        }
        let delta = opt.greeks.as_ref().and_then(|g| g.delta);
        if let (Some((lo, hi)), Some(d)) = (delta_band, delta) {
            if d.abs() < lo || d.abs() > hi {
                continue;
            }
        }

        let bid = opt.bid.unwrap_or(0.0);
        let premium = bid * 100.0;
        let roc = premium / (strike * 100.0);

        puts.push(OptionContract {
            symbol: opt.symbol,
            strike,
            bid,
            ask: opt.ask.unwrap_or(0.0),
            last: opt.last.unwrap_or(0.0),
            delta,
            open_interest: opt.open_interest.unwrap_or(0),
            expiry,
            days_to_expiration: days,
            roc,
            premium,
        });
    }

    puts
}

#[async_trait]
impl QuoteSource for TradierClient {
    async fn last_price(&self, ticker: &str) -> Result<Option<f64>, ScreenerError> {
        Ok(self.quote(ticker).await?.and_then(|q| q.last))
    }
}

#[async_trait]
impl OptionsSource for TradierClient {
    async fn put_options(
        &self,
        ticker: &str,
        min_days: i64,
        max_days: i64,
    ) -> Result<Vec<OptionContract>, ScreenerError> {
        self.put_chain(ticker, min_days, max_days).await
    }
}

/// Tradier wraps single results bare and multiple results in an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }

    fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::One(v) => Some(v),
            OneOrMany::Many(v) => v.into_iter().next(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradierQuote {
    pub symbol: String,
    pub last: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub volume: Option<i64>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    quotes: Option<QuotesBody>,
}

#[derive(Debug, Deserialize)]
struct QuotesBody {
    quote: Option<OneOrMany<TradierQuote>>,
}

#[derive(Debug, Deserialize)]
struct ExpirationsResponse {
    expirations: Option<ExpirationsBody>,
}

#[derive(Debug, Deserialize)]
struct ExpirationsBody {
    date: Option<OneOrMany<String>>,
}

#[derive(Debug, Deserialize)]
struct ChainResponse {
    options: Option<ChainBody>,
}

#[derive(Debug, Deserialize)]
struct ChainBody {
    option: Option<OneOrMany<RawChainOption>>,
}

#[derive(Debug, Deserialize)]
struct RawChainOption {
    symbol: String,
    option_type: String,
    expiration_date: String,
    strike: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    last: Option<f64>,
    open_interest: Option<i64>,
    greeks: Option<RawGreeks>,
}

#[derive(Debug, Deserialize)]
struct RawGreeks {
    delta: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(
        option_type: &str,
        expiration_date: &str,
        strike: f64,
        bid: f64,
        delta: Option<f64>,
        open_interest: i64,
    ) -> RawChainOption {
        RawChainOption {
            symbol: format!("TST{}P{:08}", expiration_date.replace('-', ""), (strike * 1000.0) as i64),
            option_type: option_type.to_string(),
            expiration_date: expiration_date.to_string(),
            strike: Some(strike),
            bid: Some(bid),
            ask: Some(bid + 0.05),
            last: Some(bid),
            open_interest: Some(open_interest),
            greeks: delta.map(|d| RawGreeks { delta: Some(d) }),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let raw_options = vec![
            raw("put", "2025-08-25", 100.0, 1.0, None, 500), // 24 days, below
            raw("put", "2025-08-26", 100.0, 1.0, None, 500), // 25 days, lower edge
            raw("put", "2025-09-30", 100.0, 1.0, None, 500), // 60 days, upper edge
            raw("put", "2025-10-01", 100.0, 1.0, None, 500), // 61 days, above
        ];
        let puts = build_put_contracts(raw_options, today(), 25, 60, None);
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].days_to_expiration, 25);
        assert_eq!(puts[1].days_to_expiration, 60);
    }

    #[test]
    fn calls_are_dropped() {
        let raw_options = vec![
            raw("call", "2025-09-05", 100.0, 1.0, Some(0.25), 500),
            raw("put", "2025-09-05", 100.0, 1.0, Some(-0.25), 500),
        ];
        let puts = build_put_contracts(raw_options, today(), 25, 60, None);
        assert_eq!(puts.len(), 1);
    }

    #[test]
    fn derived_fields_use_bid_and_strike() {
        let raw_options = vec![raw("put", "2025-09-05", 180.0, 2.50, Some(-0.22), 340)];
        let puts = build_put_contracts(raw_options, today(), 25, 60, None);
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].premium, 250.0);
        assert!((puts[0].roc - 250.0 / 18_000.0).abs() < 1e-12);
    }

    #[test]
    fn delta_band_filters_but_keeps_missing_greeks() {
        let raw_options = vec![
            raw("put", "2025-09-05", 100.0, 1.0, Some(-0.05), 500), // too far OTM
            raw("put", "2025-09-05", 100.0, 1.0, Some(-0.30), 500), // in band
            raw("put", "2025-09-05", 100.0, 1.0, Some(-0.60), 500), // too deep
            raw("put", "2025-09-05", 100.0, 1.0, None, 500),        // no greeks, kept
        ];
        let puts = build_put_contracts(raw_options, today(), 25, 60, Some((0.10, 0.45)));
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].delta, Some(-0.30));
        assert_eq!(puts[1].delta, None);
    }

    #[test]
    fn zero_strike_contracts_are_dropped() {
        let mut bad = raw("put", "2025-09-05", 0.0, 1.0, None, 500);
        bad.strike = Some(0.0);
        let puts = build_put_contracts(vec![bad], today(), 25, 60, None);
        assert!(puts.is_empty());
    }

    #[test]
    fn chain_response_parses_null_options() {
        let response: ChainResponse = serde_json::from_str(r#"{"options":null}"#).unwrap();
        assert!(response.options.is_none());
    }

    #[test]
    fn quote_response_parses_single_and_array() {
        let single: QuotesResponse = serde_json::from_str(
            r#"{"quotes":{"quote":{"symbol":"AAPL","last":180.5,"bid":180.4,"ask":180.6,"volume":1000,"week_52_high":200.0,"week_52_low":150.0}}}"#,
        )
        .unwrap();
        let quote = single.quotes.unwrap().quote.unwrap().into_first().unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.last, Some(180.5));

        let many: QuotesResponse = serde_json::from_str(
            r#"{"quotes":{"quote":[{"symbol":"AAPL","last":180.5},{"symbol":"MSFT","last":410.0}]}}"#,
        )
        .unwrap();
        let quote = many.quotes.unwrap().quote.unwrap().into_first().unwrap();
        assert_eq!(quote.symbol, "AAPL");
    }

    #[test]
    fn expirations_parse_single_and_array() {
        let single: ExpirationsResponse =
            serde_json::from_str(r#"{"expirations":{"date":"2025-09-19"}}"#).unwrap();
        assert_eq!(
            single.expirations.unwrap().date.unwrap().into_vec(),
            vec!["2025-09-19".to_string()]
        );

        let many: ExpirationsResponse =
            serde_json::from_str(r#"{"expirations":{"date":["2025-09-19","2025-10-17"]}}"#).unwrap();
        assert_eq!(many.expirations.unwrap().date.unwrap().into_vec().len(), 2);
    }

    #[test]
    fn chain_parses_tradier_shape() {
        let json = r#"{
            "options": {
                "option": [{
                    "symbol": "AAPL250905P00180000",
                    "option_type": "put",
                    "expiration_date": "2025-09-05",
                    "strike": 180.0,
                    "bid": 2.5,
                    "ask": 2.6,
                    "last": 2.55,
                    "open_interest": 340,
                    "greeks": {"delta": -0.22}
                }]
            }
        }"#;
        let response: ChainResponse = serde_json::from_str(json).unwrap();
        let raw = response.options.unwrap().option.unwrap().into_vec();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].greeks.as_ref().unwrap().delta, Some(-0.22));
    }
}
