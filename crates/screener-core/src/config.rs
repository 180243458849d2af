use std::path::PathBuf;

/// Immutable run configuration, resolved once at startup.
///
/// Every threshold the pipelines apply lives here so tests can inject
/// alternates instead of fighting module constants.
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// A ticker qualifies for Phase 2 at or above this score.
    pub score_threshold: f64,
    /// Width of the near-miss band below the threshold.
    pub near_miss_band: f64,
    /// Option expiration window, in calendar days, inclusive.
    pub min_expiration_days: i64,
    pub max_expiration_days: i64,
    /// Acceptable |delta| band for puts; contracts without greeks are kept.
    pub delta_min: f64,
    pub delta_max: f64,
    /// Minimum return on the cash securing the put.
    pub min_roc: f64,
    /// Minimum per-contract premium in dollars.
    pub min_premium: f64,
    pub min_open_interest: i64,
    /// Carry near-miss tickers into Phase 2.
    pub include_near_miss: bool,
    pub results_dir: PathBuf,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            score_threshold: 6.0,
            near_miss_band: 0.5,
            min_expiration_days: 25,
            max_expiration_days: 60,
            delta_min: 0.10,
            delta_max: 0.45,
            min_roc: 0.02,
            min_premium: 25.0,
            min_open_interest: 100,
            include_near_miss: true,
            results_dir: PathBuf::from("results"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ScreenerConfig {
    /// Build from environment variables, falling back to defaults per key.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            score_threshold: env_parse("CSP_SCORE_THRESHOLD", defaults.score_threshold),
            near_miss_band: env_parse("CSP_NEAR_MISS_BAND", defaults.near_miss_band),
            min_expiration_days: env_parse("CSP_MIN_EXPIRATION_DAYS", defaults.min_expiration_days),
            max_expiration_days: env_parse("CSP_MAX_EXPIRATION_DAYS", defaults.max_expiration_days),
            delta_min: env_parse("CSP_DELTA_MIN", defaults.delta_min),
            delta_max: env_parse("CSP_DELTA_MAX", defaults.delta_max),
            min_roc: env_parse("CSP_MIN_ROC", defaults.min_roc),
            min_premium: env_parse("CSP_MIN_PREMIUM", defaults.min_premium),
            min_open_interest: env_parse("CSP_MIN_OI", defaults.min_open_interest),
            include_near_miss: env_parse("CSP_INCLUDE_NEAR_MISS", defaults.include_near_miss),
            results_dir: std::env::var("CSP_RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.results_dir),
        }
    }

    /// Lowest score still counted as a near miss.
    pub fn near_miss_lower_bound(&self) -> f64 {
        self.score_threshold - self.near_miss_band
    }

    /// Classify a Phase-1 score. Qualified and near-miss are mutually
    /// exclusive by construction.
    pub fn classify(&self, score: f64) -> (bool, bool) {
        let qualified = score >= self.score_threshold;
        let near_miss = !qualified && score >= self.near_miss_lower_bound();
        (qualified, near_miss)
    }
}
