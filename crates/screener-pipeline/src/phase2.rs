use option_qualifier::{OptionQualifier, OptionThresholds};
use screener_core::{EvaluatedContract, OptionsSource, ScreenerConfig};
use std::sync::Arc;

/// Everything Phase 2 produced: the rows worth persisting and the audit
/// trail of every contract it looked at.
#[derive(Debug, Default)]
pub struct Phase2Output {
    /// Contracts that cleared every threshold.
    pub qualifying: Vec<EvaluatedContract>,
    /// Every evaluated contract, qualifying or not, in evaluation order.
    pub debug_log: Vec<EvaluatedContract>,
}

/// Phase 2: pull put chains for Phase 1's qualifiers and filter them down to
/// CSP candidates.
pub struct Phase2Pipeline {
    options: Arc<dyn OptionsSource>,
    qualifier: OptionQualifier,
    config: ScreenerConfig,
}

impl Phase2Pipeline {
    pub fn new(options: Arc<dyn OptionsSource>, config: ScreenerConfig) -> Self {
        let qualifier = OptionQualifier::new(OptionThresholds::from(&config));
        Self {
            options,
            qualifier,
            config,
        }
    }

    /// Qualified tickers first, then near-miss tickers, each group in its
    /// original order. A failed or empty chain lookup skips that ticker and
    /// never aborts the batch.
    pub async fn run(&self, qualified: &[String], near_miss: &[String]) -> Phase2Output {
        let mut output = Phase2Output::default();

        let groups = qualified
            .iter()
            .map(|t| (t, false))
            .chain(near_miss.iter().map(|t| (t, true)));

        for (ticker, is_near_miss) in groups {
            let contracts = match self
                .options
                .put_options(
                    ticker,
                    self.config.min_expiration_days,
                    self.config.max_expiration_days,
                )
                .await
            {
                Ok(contracts) => contracts,
                Err(e) => {
                    tracing::error!("[{}] option lookup failed: {}", ticker, e);
                    continue;
                }
            };

            if contracts.is_empty() {
                tracing::warn!("[{}] no candidate puts in the expiration window", ticker);
                continue;
            }

            for contract in contracts {
                let mut qualification = self.qualifier.qualify(&contract);
                qualification.near_miss = is_near_miss;

                let evaluated = EvaluatedContract {
                    ticker: ticker.clone(),
                    contract,
                    qualification,
                };

                if evaluated.qualification.qualifies() {
                    output.qualifying.push(evaluated.clone());
                }
                output.debug_log.push(evaluated);
            }
        }

        output
    }
}
