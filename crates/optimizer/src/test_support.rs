//! Shared fixture: twelve legs over six games.
//!
//! | id  | game | ρ partner  | notes                                 |
//! |-----|------|------------|---------------------------------------|
//! | a1  | g1   | a2 (0.60)  | strongest confidence                  |
//! | a2  | g1   | a1 (0.60)  |                                       |
//! | a3  | g1   |            | same subject as a1, blocked category  |
//! | b1  | g2   | b2 (0.25)  |                                       |
//! | c1  | g3   | c2 (−0.10) |                                       |
//! | d1  | g4   | e1 (0.05)  |                                       |
//! | low | g5   |            | negative edge, low confidence         |

use std::collections::HashMap;

use parlay_core::leg::{Direction, Leg, LegId, LegSpec, Odds};
use parlay_core::{CorrelationMatrix, EngineConfig, LegPool, Prediction, SimulationSettings};
use parlay_simulation::CorrelatedMonteCarloSimulator;

// id, subject, category, game, team, decimal odds, probability, confidence
const LEGS: [(&str, &str, &str, &str, &str, f64, f64, f64); 12] = [
    ("a1", "s-a", "points", "g1", "t1", 2.00, 0.60, 0.80),
    ("a2", "s-b", "rebounds", "g1", "t1", 1.95, 0.58, 0.70),
    ("a3", "s-a", "points_rebounds_assists", "g1", "t1", 1.90, 0.60, 0.70),
    ("b1", "s-c", "points", "g2", "t3", 2.00, 0.58, 0.75),
    ("b2", "s-d", "assists", "g2", "t4", 1.90, 0.60, 0.70),
    ("c1", "s-e", "points", "g3", "t5", 2.05, 0.55, 0.72),
    ("c2", "s-f", "rebounds", "g3", "t6", 1.90, 0.62, 0.68),
    ("d1", "s-g", "points", "g4", "t7", 2.10, 0.55, 0.65),
    ("e1", "s-h", "threes", "g5", "t9", 2.00, 0.57, 0.74),
    ("f1", "s-i", "points", "g6", "t11", 1.95, 0.59, 0.66),
    ("f2", "s-j", "rebounds", "g6", "t12", 2.00, 0.56, 0.62),
    ("low", "s-k", "steals", "g5", "t10", 1.80, 0.50, 0.40),
];

pub(crate) fn pool() -> LegPool {
    let mut legs = Vec::new();
    let mut predictions = HashMap::new();
    for (id, subject, category, game, team, odds, p, confidence) in LEGS {
        legs.push(
            Leg::try_from(LegSpec {
                id: id.to_string(),
                subject_id: subject.to_string(),
                category: category.to_string(),
                line: 0.5,
                direction: Direction::Over,
                odds: Odds::Decimal(odds),
                game_id: game.to_string(),
                team_id: team.to_string(),
            })
            .unwrap(),
        );
        predictions.insert(LegId::from(id), Prediction::new(p, confidence).unwrap());
    }

    let correlation = CorrelationMatrix::new()
        .with("a1", "a2", 0.60)
        .and_then(|m| m.with("b1", "b2", 0.25))
        .and_then(|m| m.with("c1", "c2", -0.10))
        .and_then(|m| m.with("d1", "e1", 0.05))
        .unwrap();

    LegPool::new(legs, &predictions, correlation).unwrap()
}

pub(crate) fn simulation_settings() -> SimulationSettings {
    SimulationSettings::default()
        .with_seed(42)
        .with_draws(4_000)
        .with_screening_draws(1_000)
}

pub(crate) fn simulator() -> CorrelatedMonteCarloSimulator {
    CorrelatedMonteCarloSimulator::new(simulation_settings())
}

/// Engine configuration sized for fast tests.
pub(crate) fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.simulation = simulation_settings();
    config.search.greedy_restarts = 6;
    config.search.beam_width = 12;
    config.search.expansion_width = 5;
    config.search.population = 16;
    config.search.generations = 8;
    config.search.elite = 2;
    config
}
