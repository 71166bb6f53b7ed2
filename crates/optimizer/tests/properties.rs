use std::collections::HashMap;

use parlay_core::kelly::{size_stake, SizingReason, StakeBounds};
use parlay_core::leg::{Direction, LegSpec};
use parlay_core::{
    Algorithm, ConstraintValidator, Constraints, CorrelationMatrix, EngineConfig, Leg, LegId, LegPool, Odds,
    Prediction, SimulationSettings,
};
use parlay_optimizer::{generate_safer_alternatives, SlipOptimizer};
use parlay_simulation::CorrelatedMonteCarloSimulator;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn leg(id: &str, subject: &str, category: &str, game: &str, odds: f64) -> Leg {
    Leg::try_from(LegSpec {
        id: id.to_string(),
        subject_id: subject.to_string(),
        category: category.to_string(),
        line: 0.5,
        direction: Direction::Over,
        odds: Odds::Decimal(odds),
        game_id: game.to_string(),
        team_id: format!("{game}-{subject}"),
    })
    .expect("valid leg")
}

/// Ten legs across five games, two same-game pairs strongly correlated.
fn slate() -> (Vec<Leg>, HashMap<LegId, Prediction>, CorrelationMatrix) {
    let rows = [
        ("l1", "p1", "points", "g1", 2.0, 0.60, 0.78),
        ("l2", "p2", "rebounds", "g1", 1.95, 0.59, 0.72),
        ("l3", "p3", "assists", "g2", 2.05, 0.56, 0.70),
        ("l4", "p4", "points", "g2", 1.90, 0.61, 0.74),
        ("l5", "p5", "threes", "g3", 2.10, 0.54, 0.66),
        ("l6", "p6", "points", "g3", 2.00, 0.57, 0.69),
        ("l7", "p7", "rebounds", "g4", 1.95, 0.60, 0.71),
        ("l8", "p8", "points", "g4", 2.00, 0.58, 0.76),
        ("l9", "p9", "steals", "g5", 1.85, 0.52, 0.50),
        ("l10", "p10", "points", "g5", 2.00, 0.59, 0.73),
    ];
    let legs = rows
        .iter()
        .map(|&(id, subject, category, game, odds, _, _)| leg(id, subject, category, game, odds))
        .collect();
    let predictions = rows
        .iter()
        .map(|&(id, .., p, c)| (LegId::from(id), Prediction::new(p, c).expect("valid prediction")))
        .collect();
    let correlation = CorrelationMatrix::new()
        .with("l1", "l2", 0.55)
        .and_then(|m| m.with("l7", "l8", 0.45))
        .and_then(|m| m.with("l3", "l4", 0.10))
        .and_then(|m| m.with("l5", "l6", -0.05))
        .expect("valid correlations");
    (legs, predictions, correlation)
}

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.simulation = SimulationSettings::default()
        .with_seed(2024)
        .with_draws(5_000)
        .with_screening_draws(1_000);
    config.search.greedy_restarts = 8;
    config.search.beam_width = 16;
    config.search.population = 20;
    config.search.generations = 10;
    config.search.elite = 2;
    config
}

fn three_legs() -> (Vec<Leg>, Vec<Prediction>) {
    let legs = vec![
        leg("x1", "q1", "points", "g1", 2.0),
        leg("x2", "q2", "points", "g1", 2.0),
        leg("x3", "q3", "points", "g2", 2.0),
    ];
    let predictions = [0.60, 0.55, 0.65]
        .iter()
        .map(|&p| Prediction::new(p, 0.7).expect("valid prediction"))
        .collect();
    (legs, predictions)
}

// ============================================================================
// Optimizer
// ============================================================================

#[test]
fn test_every_algorithm_returns_only_valid_slips() {
    let optimizer = SlipOptimizer::new(config()).expect("valid config");
    for algorithm in [Algorithm::Greedy, Algorithm::Beam, Algorithm::Genetic] {
        let (legs, predictions, correlation) = slate();
        let constraints = Constraints::moderate();
        let report = optimizer
            .optimize(legs, &predictions, correlation, &constraints, algorithm, 4)
            .expect("optimize");

        assert!(!report.slips.is_empty(), "{algorithm} found nothing");
        assert!(report.slips.len() <= 4);
        for slip in &report.slips {
            assert!(
                ConstraintValidator::validate(slip, &constraints).is_valid(),
                "{algorithm} returned an invalid slip"
            );
        }
        for pair in report.slips.windows(2) {
            assert!(pair[0].rank_cmp(&pair[1]).is_lt());
        }
    }
}

#[test]
fn test_conservative_greedy_never_pairs_correlated_legs() {
    let optimizer = SlipOptimizer::new(config()).expect("valid config");
    let (legs, predictions, correlation) = slate();
    let report = optimizer
        .optimize(legs, &predictions, correlation, &Constraints::conservative(), Algorithm::Greedy, 5)
        .expect("optimize");

    for slip in &report.slips {
        assert!(slip.metrics().max_correlation <= 0.15);
        assert!(!(slip.contains(&"l1".into()) && slip.contains(&"l2".into())));
    }
}

#[test]
fn test_infeasible_request_is_empty_result() {
    let optimizer = SlipOptimizer::new(config()).expect("valid config");
    let (legs, predictions, correlation) = slate();
    let constraints = Constraints::moderate().with_min_edge(100.0);
    let report = optimizer
        .optimize(legs, &predictions, correlation, &constraints, Algorithm::Greedy, 3)
        .expect("infeasible is not an error");
    assert!(report.slips.is_empty());
    assert!(!report.status.is_complete());
}

#[test]
fn test_missing_prediction_is_input_error() {
    let optimizer = SlipOptimizer::new(config()).expect("valid config");
    let (legs, mut predictions, correlation) = slate();
    predictions.remove(&LegId::from("l3"));
    let result = optimizer.optimize(legs, &predictions, correlation, &Constraints::moderate(), Algorithm::Greedy, 3);
    assert!(result.is_err());
}

// ============================================================================
// Safer alternatives
// ============================================================================

#[test]
fn test_alternatives_of_five_leg_slip_are_smaller_and_valid() {
    let optimizer = SlipOptimizer::new(config()).expect("valid config");
    let (legs, predictions, correlation) = slate();
    let pool = LegPool::new(legs.clone(), &predictions, correlation.clone()).expect("pool");
    let constraints = Constraints::aggressive().with_min_edge(0.0);
    let report = optimizer
        .optimize_pool(&pool, &constraints.clone().with_leg_range(5, 5), Algorithm::Beam, 1)
        .expect("optimize");
    let original = report.slips.first().expect("a five-leg slip exists");
    assert_eq!(original.len(), 5);

    let alternatives = generate_safer_alternatives(
        original,
        legs,
        &predictions,
        correlation,
        &constraints,
        optimizer.simulator(),
        10,
    )
    .expect("alternatives");

    assert!(!alternatives.is_empty());
    for alt in &alternatives {
        assert!(alt.slip.len() < original.len());
        assert!(ConstraintValidator::validate(&alt.slip, &constraints).is_valid());
    }
}

// ============================================================================
// Simulation scenarios
// ============================================================================

#[test]
fn test_independent_three_leg_scenario() {
    let simulator = CorrelatedMonteCarloSimulator::new(SimulationSettings::default().with_seed(11));
    let (legs, predictions) = three_legs();
    let result = simulator
        .simulate(&legs, &predictions, &CorrelationMatrix::new(), 6.0, 50_000)
        .expect("simulate");

    assert!((result.naive_probability - 0.2145).abs() < 1e-12);
    assert!((result.win_probability - 0.2145).abs() < 0.01);
    let p = result.win_probability;
    assert!((result.expected_value - (p * 5.0 - (1.0 - p))).abs() < 1e-12);
    assert!(!result.approximate);
}

#[test]
fn test_positive_correlation_raises_joint_probability() {
    let simulator = CorrelatedMonteCarloSimulator::new(SimulationSettings::default().with_seed(11));
    let (legs, predictions) = three_legs();
    let correlation = CorrelationMatrix::new().with("x1", "x2", 0.8).expect("valid rho");
    let result = simulator
        .simulate(&legs, &predictions, &correlation, 6.0, 50_000)
        .expect("simulate");

    assert!(result.win_probability > 0.2145);
    assert!(result.win_probability <= 0.55);
}

// ============================================================================
// Stake sizing
// ============================================================================

#[test]
fn test_size_stake_bounds() {
    let bounds = StakeBounds::default();
    for p in [0.05, 0.2, 0.35, 0.5, 0.55, 0.7, 0.9, 0.99] {
        for m in [1.2, 1.9, 2.0, 3.5, 10.0] {
            let result = size_stake(p, m, dec!(1000), dec!(0.25), bounds);
            assert!(result.stake >= Decimal::ZERO);
            assert!(result.stake <= bounds.max_stake);
            if p * m <= 1.0 {
                assert_eq!(result.stake, Decimal::ZERO);
                assert!(!result.should_bet());
            }
        }
    }
}

#[test]
fn test_kelly_reference_scenario() {
    let result = size_stake(0.55, 2.0, dec!(1000), dec!(0.25), StakeBounds::default());
    assert_eq!(result.stake, dec!(25));
    assert_eq!(result.reason, SizingReason::PositiveEdge);
}
