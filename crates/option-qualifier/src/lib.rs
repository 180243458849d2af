use screener_core::{OptionContract, OptionQualification, ScreenerConfig};

/// Minimum bars a contract must clear to qualify.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionThresholds {
    pub min_roc: f64,
    pub min_premium: f64,
    pub min_open_interest: i64,
}

impl From<&ScreenerConfig> for OptionThresholds {
    fn from(config: &ScreenerConfig) -> Self {
        Self {
            min_roc: config.min_roc,
            min_premium: config.min_premium,
            min_open_interest: config.min_open_interest,
        }
    }
}

/// Applies return/premium/liquidity thresholds to a single contract.
///
/// Records every failing criterion, not just the first, so the debug log can
/// show the full picture for rejected contracts.
pub struct OptionQualifier {
    thresholds: OptionThresholds,
}

impl OptionQualifier {
    pub fn new(thresholds: OptionThresholds) -> Self {
        Self { thresholds }
    }

    /// Pure threshold check; `near_miss` is left false for the caller to tag.
    pub fn qualify(&self, contract: &OptionContract) -> OptionQualification {
        let mut failed_reasons = Vec::new();

        if contract.roc < self.thresholds.min_roc {
            failed_reasons.push("Low ROC".to_string());
        }
        if contract.premium < self.thresholds.min_premium {
            failed_reasons.push("Low Premium".to_string());
        }
        if contract.open_interest < self.thresholds.min_open_interest {
            failed_reasons.push("Low OI".to_string());
        }

        OptionQualification {
            failed_reasons,
            near_miss: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn thresholds() -> OptionThresholds {
        OptionThresholds {
            min_roc: 0.02,
            min_premium: 25.0,
            min_open_interest: 100,
        }
    }

    fn contract(roc: f64, premium: f64, open_interest: i64) -> OptionContract {
        OptionContract {
            symbol: "AAPL250919P00180000".to_string(),
            strike: 180.0,
            bid: premium / 100.0,
            ask: premium / 100.0 + 0.05,
            last: premium / 100.0,
            delta: Some(-0.25),
            open_interest,
            expiry: NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            days_to_expiration: 43,
            roc,
            premium,
        }
    }

    #[test]
    fn passing_contract_has_no_failed_reasons() {
        let qualifier = OptionQualifier::new(thresholds());
        let qualification = qualifier.qualify(&contract(0.03, 50.0, 200));
        assert!(qualification.qualifies());
        assert!(qualification.failed_reasons.is_empty());
    }

    #[test]
    fn single_violation_yields_exactly_one_reason() {
        let qualifier = OptionQualifier::new(thresholds());
        let qualification = qualifier.qualify(&contract(0.01, 50.0, 200));
        assert!(!qualification.qualifies());
        assert_eq!(qualification.failed_reasons, vec!["Low ROC".to_string()]);
    }

    #[test]
    fn every_violation_is_recorded() {
        let qualifier = OptionQualifier::new(thresholds());
        let qualification = qualifier.qualify(&contract(0.001, 5.0, 3));
        assert_eq!(
            qualification.failed_reasons,
            vec![
                "Low ROC".to_string(),
                "Low Premium".to_string(),
                "Low OI".to_string(),
            ]
        );
    }

    #[test]
    fn thresholds_are_inclusive_at_the_bar() {
        let qualifier = OptionQualifier::new(thresholds());
        // Exactly at every minimum still qualifies.
        let qualification = qualifier.qualify(&contract(0.02, 25.0, 100));
        assert!(qualification.qualifies());
    }

    #[test]
    fn injected_thresholds_are_honored() {
        let qualifier = OptionQualifier::new(OptionThresholds {
            min_roc: 0.10,
            min_premium: 500.0,
            min_open_interest: 1,
        });
        let qualification = qualifier.qualify(&contract(0.03, 50.0, 200));
        assert_eq!(
            qualification.failed_reasons,
            vec!["Low ROC".to_string(), "Low Premium".to_string()]
        );
    }
}
