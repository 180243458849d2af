use screener_core::{FundamentalSnapshot, ScoreResult};

/// Converts a fundamentals triple into a normalized 0-9 quality score.
///
/// Each present metric contributes 1-3 raw points via fixed breakpoints; the
/// raw sum is rescaled by the number of metrics actually available so a
/// ticker with partial data is comparable to one with a full triple.
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Pure and deterministic; no I/O.
    pub fn score(&self, snapshot: &FundamentalSnapshot) -> ScoreResult {
        let mut raw = 0u32;
        let mut metric_count = 0u32;
        let mut rationale = Vec::new();

        if let Some(pe) = snapshot.pe {
            metric_count += 1;
            let (points, label) = if pe < 20.0 {
                (3, "Strong")
            } else if pe < 30.0 {
                (2, "Decent")
            } else {
                (1, "High")
            };
            raw += points;
            rationale.push(format!("PE = {:.2} → {}", pe, label));
        }

        if let Some(net_margin) = snapshot.net_margin {
            metric_count += 1;
            let (points, label) = if net_margin > 0.15 {
                (3, "Excellent")
            } else if net_margin > 0.10 {
                (2, "Good")
            } else {
                (1, "Weak")
            };
            raw += points;
            rationale.push(format!("Net Margin = {:.2}% → {}", net_margin * 100.0, label));
        }

        if let Some(roe) = snapshot.roe {
            metric_count += 1;
            let (points, label) = if roe > 0.20 {
                (3, "Excellent")
            } else if roe > 0.10 {
                (2, "Good")
            } else {
                (1, "Weak")
            };
            raw += points;
            rationale.push(format!("ROE = {:.2}% → {}", roe * 100.0, label));
        }

        let score = if metric_count > 0 {
            // Per-metric average (raw out of 3 per metric) scaled to 0-9.
            round2(raw as f64 / (metric_count as f64 * 3.0) * 9.0)
        } else {
            rationale.push("No fundamentals available".to_string());
            0.0
        };

        ScoreResult { score, rationale }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn snapshot(pe: Option<f64>, net_margin: Option<f64>, roe: Option<f64>) -> FundamentalSnapshot {
        FundamentalSnapshot { pe, net_margin, roe }
    }

    #[test]
    fn full_triple_all_strong_scores_nine() {
        let engine = ScoringEngine::new();
        let result = engine.score(&snapshot(Some(15.0), Some(0.20), Some(0.25)));
        assert_relative_eq!(result.score, 9.0, epsilon = 1e-9);
        assert_eq!(result.rationale.len(), 3);
        assert_eq!(result.rationale[0], "PE = 15.00 → Strong");
        assert_eq!(result.rationale[1], "Net Margin = 20.00% → Excellent");
        assert_eq!(result.rationale[2], "ROE = 25.00% → Excellent");
    }

    #[test]
    fn no_fundamentals_scores_zero() {
        let engine = ScoringEngine::new();
        let result = engine.score(&snapshot(None, None, None));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.rationale, vec!["No fundamentals available".to_string()]);
    }

    #[test]
    fn full_triple_stays_in_range() {
        let engine = ScoringEngine::new();
        for pe in [5.0, 25.0, 80.0] {
            for margin in [0.01, 0.12, 0.30] {
                for roe in [0.05, 0.15, 0.40] {
                    let result = engine.score(&snapshot(Some(pe), Some(margin), Some(roe)));
                    assert!(
                        (1.0..=9.0).contains(&result.score),
                        "score {} out of range",
                        result.score
                    );
                }
            }
        }
    }

    #[test]
    fn partial_data_is_rescaled() {
        let engine = ScoringEngine::new();
        // A single strong metric normalizes to the top of the scale.
        let result = engine.score(&snapshot(Some(12.0), None, None));
        assert_relative_eq!(result.score, 9.0, epsilon = 1e-9);
        assert_eq!(result.rationale.len(), 1);

        // Two middling metrics: raw 4 of 6 -> 6.0.
        let result = engine.score(&snapshot(Some(25.0), Some(0.12), None));
        assert_relative_eq!(result.score, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn score_grid_points() {
        let engine = ScoringEngine::new();
        // raw 7 of 9 -> 7.0
        let result = engine.score(&snapshot(Some(15.0), Some(0.12), Some(0.12)));
        assert_relative_eq!(result.score, 7.0, epsilon = 1e-9);
        // raw 6 of 9 -> 6.0
        let result = engine.score(&snapshot(Some(25.0), Some(0.05), Some(0.25)));
        assert_relative_eq!(result.score, 6.0, epsilon = 1e-9);
        // raw 3 of 6 -> 4.5, exercising the sub-integer grid
        let result = engine.score(&snapshot(Some(25.0), Some(0.05), None));
        assert_relative_eq!(result.score, 4.5, epsilon = 1e-9);
    }

    #[test]
    fn lower_pe_never_lowers_score() {
        let engine = ScoringEngine::new();
        let margin = Some(0.12);
        let roe = Some(0.15);
        // Sweep PE downward through every breakpoint; score must not drop.
        let mut last = f64::NEG_INFINITY;
        for pe in [100.0, 35.0, 29.0, 21.0, 19.0, 5.0] {
            let score = engine.score(&snapshot(Some(pe), margin, roe)).score;
            assert!(score >= last, "score dropped at pe {}", pe);
            last = score;
        }
    }

    #[test]
    fn higher_margin_and_roe_never_lower_score() {
        let engine = ScoringEngine::new();
        let pe = Some(25.0);
        let weak = engine.score(&snapshot(pe, Some(0.05), Some(0.05))).score;
        let good = engine.score(&snapshot(pe, Some(0.12), Some(0.12))).score;
        let excellent = engine.score(&snapshot(pe, Some(0.20), Some(0.25))).score;
        assert!(good >= weak);
        assert!(excellent >= good);
    }

    #[test]
    fn rescoring_is_idempotent() {
        let engine = ScoringEngine::new();
        let snap = snapshot(Some(27.3), Some(0.11), None);
        let first = engine.score(&snap);
        let second = engine.score(&snap);
        assert_eq!(first, second);
    }
}
