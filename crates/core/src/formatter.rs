#![allow(clippy::format_push_string)]

use std::fmt::Display;

use crate::kelly::KellyResult;
use crate::slip::CandidateSlip;
use crate::validation::Violation;

const RULE_HEAVY: &str = "═══════════════════════════════════════════════════════════════\n";
const RULE_LIGHT: &str = "───────────────────────────────────────────────────────────────\n";
const LABEL_WIDTH: usize = 23;

/// Fixed-width text report made of titled sections and `Label: value` rows.
#[derive(Debug, Default)]
pub struct Report {
    output: String,
}

impl Report {
    #[must_use]
    pub fn new(title: &str) -> Self {
        let mut output = String::new();
        output.push('\n');
        output.push_str(RULE_HEAVY);
        output.push_str(&format!("{title:^63}\n"));
        output.push_str(RULE_HEAVY);
        Self { output }
    }

    pub fn section(&mut self, name: &str) -> &mut Self {
        self.output.push('\n');
        self.output.push_str(name);
        self.output.push('\n');
        self.output.push_str(RULE_LIGHT);
        self
    }

    pub fn row(&mut self, label: &str, value: impl Display) -> &mut Self {
        let label = format!("{label}:");
        self.output
            .push_str(&format!("{label:<LABEL_WIDTH$}{value}\n"));
        self
    }

    pub fn line(&mut self, text: impl Display) -> &mut Self {
        self.output.push_str(&format!("{text}\n"));
        self
    }

    #[must_use]
    pub fn finish(mut self) -> String {
        self.output.push('\n');
        self.output.push_str(RULE_HEAVY);
        self.output
    }
}

pub struct SlipFormatter;

impl SlipFormatter {
    /// Formats a ranked list of slips, each with an optional stake.
    #[must_use]
    pub fn format_slips(title: &str, slips: &[(CandidateSlip, Option<KellyResult>)]) -> String {
        let mut report = Report::new(title);

        if slips.is_empty() {
            report.line("");
            report.line("No slip satisfies the constraints.");
            return report.finish();
        }

        for (rank, (slip, stake)) in slips.iter().enumerate() {
            Self::write_slip(&mut report, rank + 1, slip, stake.as_ref());
        }
        report.finish()
    }

    /// Appends one slip section to `report`.
    pub fn write_slip(report: &mut Report, rank: usize, slip: &CandidateSlip, stake: Option<&KellyResult>) {
        Self::write_slip_titled(report, &format!("Slip #{rank} ({} legs)", slip.len()), slip, stake);
    }

    /// Like [`Self::write_slip`] with a caller-chosen section title.
    pub fn write_slip_titled(report: &mut Report, title: &str, slip: &CandidateSlip, stake: Option<&KellyResult>) {
        let m = slip.metrics();
        report.section(title);
        for leg in slip.legs() {
            report.line(format!(
                "  {:<14} {:<10} {:<22} {:>5} {:<5} @ {:.2}  p={:.3} c={:.2}",
                leg.id().as_str(),
                leg.leg.subject_id(),
                leg.leg.category(),
                leg.leg.line(),
                leg.leg.direction().to_string(),
                leg.leg.payout_multiplier(),
                leg.prediction.probability(),
                leg.prediction.confidence(),
            ));
        }
        report
            .row("Payout Multiplier", format!("{:.2}x", m.payout_multiplier))
            .row("Naive Probability", format!("{:.2}%", m.naive_probability * 100.0))
            .row("Win Probability", format!("{:.2}%", m.simulated_probability * 100.0))
            .row("Expected Value", format!("{:+.4}", m.expected_value))
            .row("Variance", format!("{:.4}", m.variance))
            .row("VaR (95%)", format!("{:.4}", m.value_at_risk_95))
            .row("Max Correlation", format!("{:.3}", m.max_correlation))
            .row("Diversity", format!("{:.3}", m.diversity_score))
            .row("Score", format!("{:.4}", m.score));
        if m.approximate {
            report.line("⚠️  Correlation matrix was regularized; figures are approximate.");
        }
        if let Some(kelly) = stake {
            Self::write_kelly(report, kelly);
        }
    }

    fn write_kelly(report: &mut Report, kelly: &KellyResult) {
        report
            .row("Kelly Fraction", format!("{:.4}", kelly.raw_fraction))
            .row("Used Fraction", format!("{:.4}", kelly.used_fraction))
            .row(
                "Stake",
                format!(
                    "${:.2}{}",
                    kelly.stake,
                    if kelly.clamped { " (clamped)" } else { "" }
                ),
            );
    }

    /// Formats a single stake recommendation.
    #[must_use]
    pub fn format_kelly(kelly: &KellyResult) -> String {
        let mut report = Report::new("STAKE SIZING");
        report.section("Kelly Criterion");
        report
            .row("Method", format!("{:?}", kelly.method))
            .row("Expected Value", format!("{:+.4}", kelly.expected_value))
            .row("Reason", format!("{:?}", kelly.reason));
        Self::write_kelly(&mut report, kelly);
        report.finish()
    }

    /// Formats the rules a slip fails.
    #[must_use]
    pub fn format_violations(slip: &CandidateSlip, violations: &[Violation]) -> String {
        let mut report = Report::new("VALIDATION");
        Self::write_slip(&mut report, 1, slip, None);
        report.section("Result");
        if violations.is_empty() {
            report.line("✅ Slip satisfies every constraint.");
        } else {
            for v in violations {
                report.line(format!("❌ {:<24} {}", v.reason.to_string(), v.detail));
            }
        }
        report.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kelly::KellyCriterionCalculator;
    use crate::leg::{Direction, Leg, LegSpec, Odds};
    use crate::prediction::Prediction;
    use crate::slip::{SlipLeg, SlipMetrics};
    use crate::validation::RejectReason;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn slip(approximate: bool) -> CandidateSlip {
        let legs = ["a", "b"]
            .iter()
            .map(|id| {
                let leg = Leg::try_from(LegSpec {
                    id: id.to_string(),
                    subject_id: format!("player-{id}"),
                    category: "points".to_string(),
                    line: 24.5,
                    direction: Direction::Over,
                    odds: Odds::American(-110),
                    game_id: "g1".to_string(),
                    team_id: "t1".to_string(),
                })
                .unwrap();
                SlipLeg::new(Arc::new(leg), Prediction::new(0.6, 0.7).unwrap())
            })
            .collect();
        let metrics = SlipMetrics {
            payout_multiplier: 3.64,
            naive_probability: 0.36,
            simulated_probability: 0.37,
            expected_value: 0.3468,
            variance: 3.1,
            value_at_risk_95: 1.0,
            diversity_score: 0.65,
            max_correlation: 0.1,
            total_abs_correlation: 0.1,
            score: 0.36,
            approximate,
        };
        CandidateSlip::new(legs, metrics).unwrap()
    }

    #[test]
    fn report_aligns_labels() {
        let mut report = Report::new("TITLE");
        report.section("Section").row("Key", 42);
        let text = report.finish();
        assert!(text.contains("TITLE"));
        assert!(text.contains(&format!("{:<23}42", "Key:")));
    }

    #[test]
    fn slips_report_includes_metrics_and_stake() {
        let kelly = KellyCriterionCalculator::default().size(0.37, 3.64, dec!(1000));
        let text = SlipFormatter::format_slips("OPTIMIZED SLIPS", &[(slip(false), Some(kelly))]);
        assert!(text.contains("Slip #1 (2 legs)"));
        assert!(text.contains("Win Probability:       37.00%"));
        assert!(text.contains("Stake:"));
        assert!(!text.contains("approximate"));
    }

    #[test]
    fn empty_slips_report_says_so() {
        let text = SlipFormatter::format_slips("OPTIMIZED SLIPS", &[]);
        assert!(text.contains("No slip satisfies the constraints."));
    }

    #[test]
    fn approximate_slip_is_flagged() {
        let text = SlipFormatter::format_slips("X", &[(slip(true), None)]);
        assert!(text.contains("approximate"));
    }

    #[test]
    fn violations_are_listed() {
        let violations = vec![Violation {
            reason: RejectReason::GameExposure,
            detail: "2 legs on game g1 exceeds cap of 1".to_string(),
        }];
        let text = SlipFormatter::format_violations(&slip(false), &violations);
        assert!(text.contains("game_exposure"));
        assert!(text.contains("exceeds cap"));

        let clean = SlipFormatter::format_violations(&slip(false), &[]);
        assert!(clean.contains("satisfies every constraint"));
    }
}
