use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Valuation/profitability metrics for one ticker.
///
/// Each field is independently optional: providers routinely return partial
/// data, and a fully empty snapshot is still scoreable (score 0).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub pe: Option<f64>,
    pub net_margin: Option<f64>,
    pub roe: Option<f64>,
}

impl FundamentalSnapshot {
    /// True when at least one metric is present and non-zero.
    ///
    /// A reported zero is indistinguishable from "provider had nothing", so it
    /// does not count as data and still triggers the fallback source.
    pub fn has_data(&self) -> bool {
        [self.pe, self.net_margin, self.roe]
            .iter()
            .any(|m| m.map_or(false, |v| v != 0.0))
    }
}

/// Quality score derived from a [`FundamentalSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Normalized to 0-9 regardless of how many metrics were available.
    pub score: f64,
    /// One line per scored metric, in metric order.
    pub rationale: Vec<String>,
}

impl ScoreResult {
    /// The rationale as a single display string.
    pub fn explanation(&self) -> String {
        self.rationale.join("; ")
    }
}

/// One Phase-1 output row per input ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityRow {
    pub ticker: String,
    pub score: f64,
    pub price: f64,
    pub pe: Option<f64>,
    pub net_margin: Option<f64>,
    pub roe: Option<f64>,
    pub is_etf: bool,
    pub rationale: String,
    pub qualified: bool,
    pub near_miss: bool,
}

/// A put contract inside the expiration window, with derived CSP fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// OCC option symbol, e.g. `AAPL250919P00180000`.
    pub symbol: String,
    pub strike: f64,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    /// Greeks are not always populated on the chain.
    pub delta: Option<f64>,
    pub open_interest: i64,
    pub expiry: NaiveDate,
    pub days_to_expiration: i64,
    /// Premium collected over cash securing the put: `premium / (strike * 100)`.
    pub roc: f64,
    /// Per-contract dollars at the bid: `bid * 100`.
    pub premium: f64,
}

/// Outcome of running a contract through the threshold checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionQualification {
    /// Every violated criterion by name; empty means the contract qualifies.
    pub failed_reasons: Vec<String>,
    /// Whether the source ticker came from the near-miss group.
    pub near_miss: bool,
}

impl OptionQualification {
    pub fn qualifies(&self) -> bool {
        self.failed_reasons.is_empty()
    }
}

/// A contract plus its qualification outcome, as recorded in the debug log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatedContract {
    /// Underlying equity ticker, not the OCC symbol.
    pub ticker: String,
    pub contract: OptionContract,
    pub qualification: OptionQualification,
}
