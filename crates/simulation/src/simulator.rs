//! Gaussian-copula Monte Carlo simulation of a slip's joint outcome.
//!
//! # Example
//!
//! ```
//! use parlay_core::{CorrelationMatrix, SimulationSettings};
//! use parlay_core::leg::LegId;
//! use parlay_simulation::CorrelatedMonteCarloSimulator;
//!
//! let simulator = CorrelatedMonteCarloSimulator::new(SimulationSettings::default().with_seed(7));
//! let ids = [LegId::from("a"), LegId::from("b")];
//! let refs: Vec<&LegId> = ids.iter().collect();
//! let matrix = CorrelationMatrix::new().with("a", "b", 0.4).unwrap();
//!
//! let result = simulator
//!     .simulate_dense(&refs, &[0.6, 0.55], &matrix.submatrix(&refs), 3.5, 10_000)
//!     .unwrap();
//! assert!(result.win_probability <= 0.55);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use parlay_core::correlation::CorrelationMatrix;
use parlay_core::error::{ParlayError, Result};
use parlay_core::leg::{Leg, LegId};
use parlay_core::prediction::Prediction;
use parlay_core::SimulationSettings;

use crate::distribution::{PercentileLadder, ReturnDistribution};
use crate::matrix::{Factorization, Regularization};
use crate::normal::{fill_standard_normal, standard_normal_cdf};

/// Outcome statistics of a simulated slip, per unit stake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub legs: usize,
    pub n_draws: usize,
    pub payout_multiplier: f64,
    /// Product of the marginal probabilities.
    pub naive_probability: f64,
    /// Fraction of draws in which every leg hit, capped at the smallest
    /// marginal probability.
    pub win_probability: f64,
    pub expected_value: f64,
    pub expected_value_pct: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub percentiles: PercentileLadder,
    /// 95% value-at-risk (positive = loss).
    pub value_at_risk_95: f64,
    /// Mean loss beyond the 95% VaR.
    pub conditional_var_95: f64,
    /// Set when the correlation matrix needed more than a rounding-level repair.
    pub approximate: bool,
    pub regularization: Option<Regularization>,
    pub seed: u64,
}

impl SimulationResult {
    fn from_probability(
        legs: usize,
        n_draws: usize,
        naive_probability: f64,
        win_probability: f64,
        payout_multiplier: f64,
        seed: u64,
    ) -> Self {
        let dist = ReturnDistribution::new(win_probability, payout_multiplier);
        let expected_value = dist.expected_value();
        Self {
            legs,
            n_draws,
            payout_multiplier,
            naive_probability,
            win_probability,
            expected_value,
            expected_value_pct: expected_value * 100.0,
            variance: dist.variance(),
            std_dev: dist.std_dev(),
            percentiles: dist.ladder(),
            value_at_risk_95: dist.value_at_risk(),
            conditional_var_95: dist.conditional_value_at_risk(),
            approximate: false,
            regularization: None,
            seed,
        }
    }
}

/// Derives a per-slip seed from a run seed and the slip's leg ids.
///
/// Ids are sorted first so the seed depends only on the set of legs, never on
/// the order they were added or on which thread evaluates them.
#[must_use]
pub fn derive_seed<'a>(base: u64, ids: impl IntoIterator<Item = &'a str>) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut ids: Vec<&str> = ids.into_iter().collect();
    ids.sort_unstable();

    let mut hash = FNV_OFFSET;
    for id in ids {
        for byte in id.bytes().chain(std::iter::once(0xff)) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    base ^ hash
}

/// Monte Carlo simulator for correlated all-or-nothing slips.
#[derive(Debug, Clone)]
pub struct CorrelatedMonteCarloSimulator {
    settings: SimulationSettings,
    base_seed: u64,
}

impl CorrelatedMonteCarloSimulator {
    /// Creates a simulator. Without a configured seed a run seed is drawn once
    /// from entropy; every simulation then derives its own stream from it.
    #[must_use]
    pub fn new(settings: SimulationSettings) -> Self {
        let base_seed = settings
            .seed
            .unwrap_or_else(|| ChaCha8Rng::from_entropy().gen());
        Self {
            settings,
            base_seed,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Seed used for the slip made of `ids`.
    #[must_use]
    pub fn seed_for<'a>(&self, ids: impl IntoIterator<Item = &'a LegId>) -> u64 {
        derive_seed(self.base_seed, ids.into_iter().map(LegId::as_str))
    }

    /// Simulates a slip from its legs, their predictions and a (possibly
    /// sparse) correlation matrix.
    ///
    /// # Errors
    /// Returns an error for an empty slip, mismatched leg and prediction
    /// counts, repeated legs, zero draws or a payout multiplier not above 1.
    pub fn simulate(
        &self,
        legs: &[Leg],
        predictions: &[Prediction],
        correlation: &CorrelationMatrix,
        payout_multiplier: f64,
        n_draws: usize,
    ) -> Result<SimulationResult> {
        if legs.is_empty() {
            return Err(ParlayError::EmptySlip);
        }
        if predictions.len() != legs.len() {
            return Err(ParlayError::parameter(
                "predictions",
                format!("{} predictions for {} legs", predictions.len(), legs.len()),
            ));
        }
        let ids: Vec<&LegId> = legs.iter().map(Leg::id).collect();
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(ParlayError::DuplicateLeg(id.to_string()));
            }
        }
        let probabilities: Vec<f64> = predictions.iter().map(Prediction::probability).collect();
        let matrix = correlation.submatrix(&ids);
        self.simulate_dense(&ids, &probabilities, &matrix, payout_multiplier, n_draws)
    }

    /// Simulates from a dense row-major correlation submatrix whose rows
    /// follow `ids`.
    ///
    /// # Errors
    /// Returns an error for an empty slip, inconsistent lengths, probabilities
    /// outside [0, 1], zero draws or a payout multiplier not above 1.
    pub fn simulate_dense(
        &self,
        ids: &[&LegId],
        probabilities: &[f64],
        correlation: &[f64],
        payout_multiplier: f64,
        n_draws: usize,
    ) -> Result<SimulationResult> {
        let n = probabilities.len();
        if n == 0 {
            return Err(ParlayError::EmptySlip);
        }
        if ids.len() != n || correlation.len() != n * n {
            return Err(ParlayError::parameter(
                "correlation",
                format!("expected {n} ids and a {n}x{n} matrix"),
            ));
        }
        if n_draws == 0 {
            return Err(ParlayError::parameter("n_draws", "must be at least 1"));
        }
        if !payout_multiplier.is_finite() || payout_multiplier <= 1.0 {
            return Err(ParlayError::parameter(
                "payout_multiplier",
                format!("{payout_multiplier} must be greater than 1"),
            ));
        }
        if let Some((i, &p)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !(0.0..=1.0).contains(*p))
        {
            return Err(ParlayError::InvalidProbability {
                leg_id: ids[i].to_string(),
                value: p,
            });
        }

        let seed = self.seed_for(ids.iter().copied());
        let naive_probability: f64 = probabilities.iter().product();

        if n == 1 {
            return Ok(SimulationResult::from_probability(
                1,
                n_draws,
                naive_probability,
                probabilities[0],
                payout_multiplier,
                seed,
            ));
        }

        let factor = Factorization::new(correlation, n, self.settings.eigen_floor);
        let wins = count_joint_hits(&factor, probabilities, n_draws, seed);

        let min_marginal = probabilities.iter().copied().fold(1.0, f64::min);
        let win_probability = (wins as f64 / n_draws as f64).min(min_marginal);

        let mut result = SimulationResult::from_probability(
            n,
            n_draws,
            naive_probability,
            win_probability,
            payout_multiplier,
            seed,
        );

        if let Some(reg) = factor.regularization {
            result.approximate = reg.max_adjustment > self.settings.approximate_threshold;
            if result.approximate {
                warn!(
                    legs = n,
                    min_eigenvalue = reg.min_eigenvalue,
                    max_adjustment = reg.max_adjustment,
                    "Correlation matrix needed heavy regularization; result is approximate"
                );
            } else {
                debug!(legs = n, max_adjustment = reg.max_adjustment, "Regularized correlation matrix");
            }
            result.regularization = Some(reg);
        }

        Ok(result)
    }
}

fn count_joint_hits(factor: &Factorization, probabilities: &[f64], n_draws: usize, seed: u64) -> usize {
    let n = probabilities.len();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut z = vec![0.0; n];
    let mut wins = 0usize;

    for _ in 0..n_draws {
        fill_standard_normal(&mut rng, &mut z);
        let all_hit = (0..n).all(|i| standard_normal_cdf(factor.correlate(i, &z)) < probabilities[i]);
        if all_hit {
            wins += 1;
        }
    }
    wins
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlay_core::leg::{Direction, LegSpec, Odds};

    // ============================================================
    // Test Helpers
    // ============================================================

    fn leg(id: &str, game: &str) -> Leg {
        Leg::try_from(LegSpec {
            id: id.to_string(),
            subject_id: format!("player-{id}"),
            category: "points".to_string(),
            line: 20.5,
            direction: Direction::Over,
            odds: Odds::Decimal(1.8),
            game_id: game.to_string(),
            team_id: "team".to_string(),
        })
        .unwrap()
    }

    fn three_legs() -> (Vec<Leg>, Vec<Prediction>) {
        let legs = vec![leg("l1", "g1"), leg("l2", "g1"), leg("l3", "g2")];
        let preds = [0.60, 0.55, 0.65]
            .iter()
            .map(|&p| Prediction::new(p, 0.7).unwrap())
            .collect();
        (legs, preds)
    }

    fn simulator(seed: u64) -> CorrelatedMonteCarloSimulator {
        CorrelatedMonteCarloSimulator::new(SimulationSettings::default().with_seed(seed))
    }

    // ============================================================
    // Reference Scenarios
    // ============================================================

    #[test]
    fn independent_legs_match_naive_product() {
        let (legs, preds) = three_legs();
        let result = simulator(42)
            .simulate(&legs, &preds, &CorrelationMatrix::new(), 6.0, 50_000)
            .unwrap();

        assert!((result.naive_probability - 0.2145).abs() < 1e-12);
        assert!(
            (result.win_probability - 0.2145).abs() < 0.01,
            "win probability {}",
            result.win_probability
        );
        assert!((result.expected_value - 0.2870).abs() < 0.07);
        assert!(!result.approximate);
        assert!(result.regularization.is_none());
    }

    #[test]
    fn expected_value_follows_win_probability_exactly() {
        let (legs, preds) = three_legs();
        let result = simulator(1)
            .simulate(&legs, &preds, &CorrelationMatrix::new(), 6.0, 5_000)
            .unwrap();
        let p = result.win_probability;
        assert_eq!(result.expected_value, p * 5.0 - (1.0 - p));
        assert!((result.expected_value_pct - result.expected_value * 100.0).abs() < 1e-9);
        assert!((result.std_dev * result.std_dev - result.variance).abs() < 1e-9);
    }

    #[test]
    fn positive_correlation_raises_win_probability() {
        let (legs, preds) = three_legs();
        let corr = CorrelationMatrix::new().with("l1", "l2", 0.8).unwrap();
        let result = simulator(42).simulate(&legs, &preds, &corr, 6.0, 50_000).unwrap();

        assert!(result.win_probability > 0.2145, "got {}", result.win_probability);
        assert!(result.win_probability <= 0.55);
    }

    #[test]
    fn win_probability_never_exceeds_smallest_marginal() {
        let sim = simulator(9);
        let ids = [LegId::from("a"), LegId::from("b")];
        let refs: Vec<&LegId> = ids.iter().collect();
        for rho in [0.0, 0.5, 0.9, 0.99, 1.0] {
            let matrix = [1.0, rho, rho, 1.0];
            let result = sim.simulate_dense(&refs, &[0.3, 0.9], &matrix, 4.0, 5_000).unwrap();
            assert!((0.0..=0.3).contains(&result.win_probability), "rho {rho}");
        }
    }

    // ============================================================
    // Edge Cases
    // ============================================================

    #[test]
    fn single_leg_uses_its_probability() {
        let legs = vec![leg("solo", "g")];
        let preds = vec![Prediction::new(0.62, 0.5).unwrap()];
        let result = simulator(3)
            .simulate(&legs, &preds, &CorrelationMatrix::new(), 1.8, 10)
            .unwrap();
        assert_eq!(result.win_probability, 0.62);
        assert_eq!(result.legs, 1);
    }

    #[test]
    fn empty_slip_is_an_error() {
        let err = simulator(3)
            .simulate(&[], &[], &CorrelationMatrix::new(), 2.0, 100)
            .unwrap_err();
        assert_eq!(err, ParlayError::EmptySlip);
    }

    #[test]
    fn bad_parameters_are_errors() {
        let (legs, preds) = three_legs();
        let sim = simulator(3);
        let corr = CorrelationMatrix::new();
        assert!(sim.simulate(&legs, &preds, &corr, 6.0, 0).is_err());
        assert!(sim.simulate(&legs, &preds, &corr, 1.0, 100).is_err());
        assert!(sim.simulate(&legs, &preds[..2], &corr, 6.0, 100).is_err());

        let dup = vec![leg("x", "g"), leg("x", "g")];
        assert!(matches!(
            sim.simulate(&dup, &preds[..2], &corr, 6.0, 100),
            Err(ParlayError::DuplicateLeg(_))
        ));
    }

    // ============================================================
    // Regularization
    // ============================================================

    #[test]
    fn invalid_matrix_is_flagged_approximate() {
        let (legs, preds) = three_legs();
        let corr = CorrelationMatrix::new()
            .with("l1", "l2", 0.9)
            .unwrap()
            .with("l1", "l3", 0.9)
            .unwrap()
            .with("l2", "l3", -0.9)
            .unwrap();
        let result = simulator(5).simulate(&legs, &preds, &corr, 6.0, 5_000).unwrap();

        assert!(result.approximate);
        let reg = result.regularization.unwrap();
        assert!(reg.min_eigenvalue < 0.0);
        assert!((0.0..=1.0).contains(&result.win_probability));
    }

    #[test]
    fn perfectly_correlated_pair_is_repaired_quietly() {
        let sim = simulator(5);
        let ids = [LegId::from("a"), LegId::from("b")];
        let refs: Vec<&LegId> = ids.iter().collect();
        let result = sim
            .simulate_dense(&refs, &[0.5, 0.5], &[1.0, 1.0, 1.0, 1.0], 3.0, 20_000)
            .unwrap();
        assert!(!result.approximate);
        assert!(result.regularization.is_some());
        // Comonotone legs: joint hit ≈ 0.5
        assert!((result.win_probability - 0.5).abs() < 0.02);
    }

    // ============================================================
    // Determinism
    // ============================================================

    #[test]
    fn same_seed_same_result() {
        let (legs, preds) = three_legs();
        let corr = CorrelationMatrix::new().with("l2", "l3", 0.3).unwrap();
        let a = simulator(11).simulate(&legs, &preds, &corr, 6.0, 2_000).unwrap();
        let b = simulator(11).simulate(&legs, &preds, &corr, 6.0, 2_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn derived_seed_ignores_leg_order() {
        assert_eq!(derive_seed(1, ["a", "b", "c"]), derive_seed(1, ["c", "a", "b"]));
        assert_ne!(derive_seed(1, ["a", "b"]), derive_seed(1, ["a", "c"]));
        assert_ne!(derive_seed(1, ["ab"]), derive_seed(1, ["a", "b"]));
        assert_ne!(derive_seed(1, ["a"]), derive_seed(2, ["a"]));
    }
}
