use async_trait::async_trait;
use screener_core::{FundamentalSnapshot, FundamentalsSource, ProfileSource, ScreenerError};
use serde::Deserialize;

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

/// Financial Modeling Prep client: TTM key metrics and company profile.
#[derive(Clone)]
pub struct FmpClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct KeyMetricsTtm {
    #[serde(rename = "peRatioTTM")]
    pe_ratio_ttm: Option<f64>,
    #[serde(rename = "netProfitMarginTTM")]
    net_profit_margin_ttm: Option<f64>,
    #[serde(rename = "roeTTM")]
    roe_ttm: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CompanyProfile {
    #[serde(rename = "isEtf", default)]
    is_etf: bool,
}

impl FmpClient {
    pub fn new(api_key: String) -> Self {
        let base_url = std::env::var("FMP_BASE_URL")
            .ok()
            .unwrap_or_else(|| BASE_URL.to_string());

        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ScreenerError> {
        let url = format!("{}/{}?apikey={}", self.base_url, path, self.api_key);
        let response = self
            .client
            .get(&url)
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

    /// TTM valuation/profitability metrics. FMP answers with a one-element
    /// array; an empty array means no coverage and maps to an empty snapshot.
    pub async fn key_metrics_ttm(&self, ticker: &str) -> Result<FundamentalSnapshot, ScreenerError> {
        let metrics: Vec<KeyMetricsTtm> = self
            .get_json(&format!("key-metrics-ttm/{ticker}"))
            .await?;

        Ok(metrics
            .into_iter()
            .next()
            .map(|m| FundamentalSnapshot {
                pe: m.pe_ratio_ttm,
                net_margin: m.net_profit_margin_ttm,
                roe: m.roe_ttm,
            })
            .unwrap_or_default())
    }

    pub async fn profile_is_etf(&self, ticker: &str) -> Result<bool, ScreenerError> {
        let profiles: Vec<CompanyProfile> = self.get_json(&format!("profile/{ticker}")).await?;
        Ok(profiles.into_iter().next().map(|p| p.is_etf).unwrap_or(false))
    }
}

#[async_trait]
impl FundamentalsSource for FmpClient {
    fn name(&self) -> &'static str {
        "FMP"
    }

    async fn fundamentals(&self, ticker: &str) -> Result<FundamentalSnapshot, ScreenerError> {
        self.key_metrics_ttm(ticker).await
    }
}

#[async_trait]
impl ProfileSource for FmpClient {
    async fn is_etf(&self, ticker: &str) -> Result<bool, ScreenerError> {
        self.profile_is_etf(ticker).await
    }
}
