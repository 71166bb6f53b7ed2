//! Constraint validation for candidate slips.
//!
//! Rules run in a fixed order and [`ConstraintValidator::validate`] stops at the
//! first failure:
//!
//! 1. leg count within `[min_legs, max_legs]`
//! 2. no blocked category pair for the same subject
//! 3. subject / team / game exposure caps
//! 4. maximum pairwise correlation
//! 5. mean prediction confidence
//! 6. simulated expected value
//!
//! Search code uses [`ConstraintValidator::check_partial`] on slips that are
//! still growing, which applies only the rules adding a leg can never repair.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constraints::Constraints;
use crate::slip::{CandidateSlip, SlipLeg};

/// Which rule rejected a slip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TooFewLegs,
    TooManyLegs,
    BlockedCategoryPair,
    SubjectExposure,
    TeamExposure,
    GameExposure,
    CorrelationTooHigh,
    LowConfidence,
    InsufficientEdge,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TooFewLegs => "too_few_legs",
            Self::TooManyLegs => "too_many_legs",
            Self::BlockedCategoryPair => "blocked_category_pair",
            Self::SubjectExposure => "subject_exposure",
            Self::TeamExposure => "team_exposure",
            Self::GameExposure => "game_exposure",
            Self::CorrelationTooHigh => "correlation_too_high",
            Self::LowConfidence => "low_confidence",
            Self::InsufficientEdge => "insufficient_edge",
        };
        f.write_str(s)
    }
}

/// A failed rule with a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub reason: RejectReason,
    pub detail: String,
}

/// Outcome of validating a slip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationOutcome {
    Valid,
    Invalid(Violation),
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The rejection reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Valid => None,
            Self::Invalid(v) => Some(v.reason),
        }
    }
}

impl From<Option<Violation>> for ValidationOutcome {
    fn from(v: Option<Violation>) -> Self {
        v.map_or(Self::Valid, Self::Invalid)
    }
}

fn subject_key(leg: &SlipLeg) -> &str {
    leg.leg.subject_id()
}

fn team_key(leg: &SlipLeg) -> &str {
    leg.leg.team_id()
}

fn game_key(leg: &SlipLeg) -> &str {
    leg.leg.game_id()
}

fn violation(reason: RejectReason, detail: String) -> Violation {
    Violation { reason, detail }
}

/// Stateless validator. All methods are pure functions of their inputs.
pub struct ConstraintValidator;

impl ConstraintValidator {
    /// Validates a fully evaluated slip, short-circuiting on the first failure.
    #[must_use]
    pub fn validate(slip: &CandidateSlip, constraints: &Constraints) -> ValidationOutcome {
        Self::rules(slip, constraints).next().into()
    }

    /// Returns every rule the slip fails, in rule order.
    #[must_use]
    pub fn validate_all(slip: &CandidateSlip, constraints: &Constraints) -> Vec<Violation> {
        Self::rules(slip, constraints).collect()
    }

    fn rules<'a>(
        slip: &'a CandidateSlip,
        constraints: &'a Constraints,
    ) -> impl Iterator<Item = Violation> + 'a {
        let legs = slip.legs();
        let metrics = slip.metrics();
        let checks: [Box<dyn Fn() -> Option<Violation> + 'a>; 6] = [
            Box::new(move || Self::check_leg_count(legs.len(), constraints, true)),
            Box::new(move || Self::check_blocked_pairs(legs, constraints)),
            Box::new(move || Self::check_exposure(legs, constraints)),
            Box::new(move || Self::check_correlation(metrics.max_correlation, constraints)),
            Box::new(move || Self::check_confidence(legs, constraints)),
            Box::new(move || Self::check_edge(metrics.expected_value, constraints)),
        ];
        checks.into_iter().filter_map(|check| check())
    }

    /// Rules that can only get worse as legs are added: the leg-count upper
    /// bound, blocked pairs, exposure caps and maximum correlation.
    #[must_use]
    pub fn check_partial(
        legs: &[SlipLeg],
        max_correlation: f64,
        constraints: &Constraints,
    ) -> ValidationOutcome {
        Self::check_leg_count(legs.len(), constraints, false)
            .or_else(|| Self::check_blocked_pairs(legs, constraints))
            .or_else(|| Self::check_exposure(legs, constraints))
            .or_else(|| Self::check_correlation(max_correlation, constraints))
            .into()
    }

    fn check_leg_count(n: usize, c: &Constraints, enforce_min: bool) -> Option<Violation> {
        if n > c.max_legs {
            return Some(violation(
                RejectReason::TooManyLegs,
                format!("{n} legs exceeds maximum of {}", c.max_legs),
            ));
        }
        if enforce_min && n < c.min_legs {
            return Some(violation(
                RejectReason::TooFewLegs,
                format!("{n} legs is below minimum of {}", c.min_legs),
            ));
        }
        None
    }

    fn check_blocked_pairs(legs: &[SlipLeg], c: &Constraints) -> Option<Violation> {
        for (i, a) in legs.iter().enumerate() {
            for b in &legs[i + 1..] {
                let subject = a.leg.subject_id();
                if subject != b.leg.subject_id() {
                    continue;
                }
                if c.is_blocked(subject, a.leg.category(), b.leg.category()) {
                    return Some(violation(
                        RejectReason::BlockedCategoryPair,
                        format!(
                            "{} and {} combine dependent categories {}/{} for subject {}",
                            a.id(),
                            b.id(),
                            a.leg.category(),
                            b.leg.category(),
                            subject
                        ),
                    ));
                }
            }
        }
        None
    }

    fn check_exposure(legs: &[SlipLeg], c: &Constraints) -> Option<Violation> {
        let groups: [(RejectReason, &str, usize, fn(&SlipLeg) -> &str); 3] = [
            (RejectReason::SubjectExposure, "subject", c.max_subject_exposure, subject_key),
            (RejectReason::TeamExposure, "team", c.max_team_exposure, team_key),
            (RejectReason::GameExposure, "game", c.max_game_exposure, game_key),
        ];

        for (reason, label, cap, key) in groups {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for leg in legs {
                let count = counts.entry(key(leg)).or_insert(0);
                *count += 1;
                if *count > cap {
                    return Some(violation(
                        reason,
                        format!("{} legs on {label} {} exceeds cap of {cap}", *count, key(leg)),
                    ));
                }
            }
        }
        None
    }

    fn check_correlation(max_correlation: f64, c: &Constraints) -> Option<Violation> {
        (max_correlation > c.max_correlation).then(|| {
            violation(
                RejectReason::CorrelationTooHigh,
                format!(
                    "pairwise correlation {max_correlation:.3} exceeds {:.3}",
                    c.max_correlation
                ),
            )
        })
    }

    fn check_confidence(legs: &[SlipLeg], c: &Constraints) -> Option<Violation> {
        if legs.is_empty() {
            return None;
        }
        let mean =
            legs.iter().map(|l| l.prediction.confidence()).sum::<f64>() / legs.len() as f64;
        (mean < c.min_confidence).then(|| {
            violation(
                RejectReason::LowConfidence,
                format!("mean confidence {mean:.3} below {:.3}", c.min_confidence),
            )
        })
    }

    fn check_edge(expected_value: f64, c: &Constraints) -> Option<Violation> {
        (expected_value < c.min_edge).then(|| {
            violation(
                RejectReason::InsufficientEdge,
                format!("expected value {expected_value:.4} below {:.4}", c.min_edge),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leg::{Direction, Leg, LegSpec, Odds};
    use crate::prediction::Prediction;
    use crate::slip::SlipMetrics;
    use std::sync::Arc;

    // ============================================
    // Test Helpers
    // ============================================

    fn slip_leg(id: &str, subject: &str, category: &str, team: &str, game: &str, conf: f64) -> SlipLeg {
        let leg = Leg::try_from(LegSpec {
            id: id.to_string(),
            subject_id: subject.to_string(),
            category: category.to_string(),
            line: 10.5,
            direction: Direction::Over,
            odds: Odds::Decimal(1.9),
            game_id: game.to_string(),
            team_id: team.to_string(),
        })
        .unwrap();
        SlipLeg::new(Arc::new(leg), Prediction::new(0.6, conf).unwrap())
    }

    fn distinct(id: &str) -> SlipLeg {
        slip_leg(id, &format!("s-{id}"), "points", &format!("t-{id}"), &format!("g-{id}"), 0.8)
    }

    fn metrics(ev: f64, max_corr: f64) -> SlipMetrics {
        SlipMetrics {
            payout_multiplier: 3.6,
            naive_probability: 0.36,
            simulated_probability: 0.36,
            expected_value: ev,
            variance: 1.0,
            value_at_risk_95: 1.0,
            diversity_score: 1.0,
            max_correlation: max_corr,
            total_abs_correlation: max_corr,
            score: ev,
            approximate: false,
        }
    }

    fn slip(legs: Vec<SlipLeg>, ev: f64, max_corr: f64) -> CandidateSlip {
        CandidateSlip::new(legs, metrics(ev, max_corr)).unwrap()
    }

    // ============================================
    // Individual Rule Tests
    // ============================================

    #[test]
    fn valid_slip_passes() {
        let s = slip(vec![distinct("a"), distinct("b"), distinct("c")], 0.2, 0.1);
        assert_eq!(ConstraintValidator::validate(&s, &Constraints::moderate()), ValidationOutcome::Valid);
    }

    #[test]
    fn too_few_legs() {
        let s = slip(vec![distinct("a")], 0.5, 0.0);
        let out = ConstraintValidator::validate(&s, &Constraints::moderate());
        assert_eq!(out.reason(), Some(RejectReason::TooFewLegs));
    }

    #[test]
    fn too_many_legs() {
        let legs = (0..5).map(|i| distinct(&i.to_string())).collect();
        let s = slip(legs, 0.5, 0.0);
        let out = ConstraintValidator::validate(&s, &Constraints::conservative());
        assert_eq!(out.reason(), Some(RejectReason::TooManyLegs));
    }

    #[test]
    fn blocked_pair_same_subject() {
        let legs = vec![
            slip_leg("a", "p1", "points", "t1", "g1", 0.8),
            slip_leg("b", "p1", "points_rebounds_assists", "t1", "g1", 0.8),
        ];
        let s = slip(legs, 0.5, 0.0);
        let out = ConstraintValidator::validate(&s, &Constraints::aggressive());
        assert_eq!(out.reason(), Some(RejectReason::BlockedCategoryPair));

        let exempt = Constraints::aggressive().exempt_subject("p1");
        assert!(ConstraintValidator::validate(&s, &exempt).is_valid());
    }

    #[test]
    fn blocked_pair_different_subjects_allowed() {
        let legs = vec![
            slip_leg("a", "p1", "points", "t1", "g1", 0.8),
            slip_leg("b", "p2", "points_rebounds_assists", "t1", "g1", 0.8),
        ];
        let s = slip(legs, 0.5, 0.0);
        assert!(ConstraintValidator::validate(&s, &Constraints::moderate()).is_valid());
    }

    #[test]
    fn subject_exposure_cap() {
        let legs = vec![
            slip_leg("a", "p1", "points", "t1", "g1", 0.8),
            slip_leg("b", "p1", "steals", "t1", "g1", 0.8),
        ];
        let s = slip(legs, 0.5, 0.0);
        let out = ConstraintValidator::validate(&s, &Constraints::conservative());
        assert_eq!(out.reason(), Some(RejectReason::SubjectExposure));
    }

    #[test]
    fn team_and_game_exposure_caps() {
        let legs = vec![
            slip_leg("a", "p1", "points", "t1", "g1", 0.8),
            slip_leg("b", "p2", "points", "t1", "g1", 0.8),
            slip_leg("c", "p3", "points", "t1", "g1", 0.8),
        ];
        let s = slip(legs, 0.5, 0.0);
        let out = ConstraintValidator::validate(&s, &Constraints::conservative());
        assert_eq!(out.reason(), Some(RejectReason::TeamExposure));

        let legs = vec![
            slip_leg("a", "p1", "points", "t1", "g1", 0.8),
            slip_leg("b", "p2", "points", "t2", "g1", 0.8),
            slip_leg("c", "p3", "points", "t3", "g1", 0.8),
        ];
        let s = slip(legs, 0.5, 0.0);
        let out = ConstraintValidator::validate(&s, &Constraints::conservative());
        assert_eq!(out.reason(), Some(RejectReason::GameExposure));
    }

    #[test]
    fn correlation_cap() {
        let s = slip(vec![distinct("a"), distinct("b")], 0.5, 0.31);
        let out = ConstraintValidator::validate(&s, &Constraints::moderate());
        assert_eq!(out.reason(), Some(RejectReason::CorrelationTooHigh));
    }

    #[test]
    fn confidence_floor() {
        let legs = vec![
            slip_leg("a", "p1", "points", "t1", "g1", 0.3),
            slip_leg("b", "p2", "points", "t2", "g2", 0.5),
        ];
        let s = slip(legs, 0.5, 0.0);
        let out = ConstraintValidator::validate(&s, &Constraints::moderate());
        assert_eq!(out.reason(), Some(RejectReason::LowConfidence));
    }

    #[test]
    fn edge_floor() {
        let s = slip(vec![distinct("a"), distinct("b")], 0.09, 0.0);
        let out = ConstraintValidator::validate(&s, &Constraints::moderate());
        assert_eq!(out.reason(), Some(RejectReason::InsufficientEdge));
    }

    // ============================================
    // Ordering and Reporting Tests
    // ============================================

    #[test]
    fn short_circuits_on_first_rule() {
        // Fails leg count, correlation and edge; only leg count is reported.
        let s = slip(vec![distinct("a")], -1.0, 0.9);
        match ConstraintValidator::validate(&s, &Constraints::moderate()) {
            ValidationOutcome::Invalid(v) => {
                assert_eq!(v.reason, RejectReason::TooFewLegs);
                assert!(v.detail.contains("below minimum"));
            }
            ValidationOutcome::Valid => panic!("expected invalid"),
        }
    }

    #[test]
    fn validate_all_reports_every_rule() {
        let s = slip(vec![distinct("a")], -1.0, 0.9);
        let reasons: Vec<RejectReason> = ConstraintValidator::validate_all(&s, &Constraints::moderate())
            .into_iter()
            .map(|v| v.reason)
            .collect();
        assert_eq!(
            reasons,
            vec![
                RejectReason::TooFewLegs,
                RejectReason::CorrelationTooHigh,
                RejectReason::InsufficientEdge
            ]
        );
    }

    #[test]
    fn partial_check_ignores_min_legs_confidence_and_edge() {
        let legs = vec![slip_leg("a", "p1", "points", "t1", "g1", 0.1)];
        assert!(ConstraintValidator::check_partial(&legs, 0.0, &Constraints::moderate()).is_valid());
        assert_eq!(
            ConstraintValidator::check_partial(&legs, 0.9, &Constraints::moderate()).reason(),
            Some(RejectReason::CorrelationTooHigh)
        );
    }
}
