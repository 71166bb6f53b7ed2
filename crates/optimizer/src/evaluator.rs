//! Slip evaluation and the search objective.
//!
//! `score = EV − λ·Σ|ρ| + μ·diversity`, with EV taken from correlated
//! simulation. Search code addresses legs by [`LegPool`] index; index lists
//! are always sorted.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::debug;

use parlay_core::error::Result;
use parlay_core::leg::LegId;
use parlay_core::pool::LegPool;
use parlay_core::slip::{diversity_score, rank_and_dedup, CandidateSlip, SlipMetrics};
use parlay_core::validation::ConstraintValidator;
use parlay_core::Constraints;
use parlay_simulation::CorrelatedMonteCarloSimulator;

/// Shared, read-only evaluation context for one optimization request.
pub struct Evaluator<'a> {
    pool: &'a LegPool,
    constraints: &'a Constraints,
    simulator: &'a CorrelatedMonteCarloSimulator,
    evaluations: AtomicUsize,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(
        pool: &'a LegPool,
        constraints: &'a Constraints,
        simulator: &'a CorrelatedMonteCarloSimulator,
    ) -> Self {
        Self {
            pool,
            constraints,
            simulator,
            evaluations: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &'a LegPool {
        self.pool
    }

    #[must_use]
    pub fn constraints(&self) -> &'a Constraints {
        self.constraints
    }

    /// Draws used while ranking candidates.
    #[must_use]
    pub fn screening_draws(&self) -> usize {
        let settings = self.simulator.settings();
        settings.screening_draws.min(settings.n_draws)
    }

    /// Draws used for returned slips.
    #[must_use]
    pub fn full_draws(&self) -> usize {
        self.simulator.settings().n_draws
    }

    /// Number of simulations run so far.
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Largest pairwise correlation and `Σ|ρ|` over all pairs.
    #[must_use]
    pub fn pair_stats(&self, indices: &[usize]) -> (f64, f64) {
        let mut max = f64::NEG_INFINITY;
        let mut total = 0.0;
        for (k, &i) in indices.iter().enumerate() {
            for &j in &indices[k + 1..] {
                let rho = self.pool.correlation(i, j);
                max = max.max(rho);
                total += rho.abs();
            }
        }
        if max == f64::NEG_INFINITY {
            max = 0.0;
        }
        (max, total)
    }

    #[must_use]
    pub fn payout_multiplier(&self, indices: &[usize]) -> f64 {
        indices
            .iter()
            .map(|&i| self.pool.leg(i).payout_multiplier())
            .product()
    }

    #[must_use]
    pub fn diversity(&self, indices: &[usize]) -> f64 {
        diversity_score(indices.iter().map(|&i| self.pool.leg(i).as_ref()))
    }

    /// Objective under independence; used to pre-rank extensions before
    /// spending simulations on them.
    #[must_use]
    pub fn proxy_score(&self, indices: &[usize]) -> f64 {
        let naive: f64 = indices
            .iter()
            .map(|&i| self.pool.prediction(i).probability())
            .product();
        let (_, total_abs) = self.pair_stats(indices);
        naive * self.payout_multiplier(indices) - 1.0
            - self.constraints.correlation_penalty * total_abs
            + self.constraints.diversity_bonus * self.diversity(indices)
    }

    /// True if `indices` breaks no rule that adding legs could never repair.
    #[must_use]
    pub fn partial_ok(&self, indices: &[usize]) -> bool {
        let (max_corr, _) = self.pair_stats(indices);
        ConstraintValidator::check_partial(&self.pool.slip_legs(indices), max_corr, self.constraints)
            .is_valid()
    }

    /// Simulates the slip and builds its metrics.
    ///
    /// # Errors
    /// Propagates simulation input errors, which a validated pool never
    /// produces for non-empty index lists.
    pub fn evaluate(&self, indices: &[usize], n_draws: usize) -> Result<CandidateSlip> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let ids: Vec<&LegId> = indices.iter().map(|&i| self.pool.leg(i).id()).collect();
        let probabilities: Vec<f64> = indices
            .iter()
            .map(|&i| self.pool.prediction(i).probability())
            .collect();
        let payout_multiplier = self.payout_multiplier(indices);
        let sim = self.simulator.simulate_dense(
            &ids,
            &probabilities,
            &self.pool.submatrix(indices),
            payout_multiplier,
            n_draws,
        )?;

        let (max_correlation, total_abs_correlation) = self.pair_stats(indices);
        let diversity = self.diversity(indices);
        let score = sim.expected_value - self.constraints.correlation_penalty * total_abs_correlation
            + self.constraints.diversity_bonus * diversity;

        let metrics = SlipMetrics {
            payout_multiplier,
            naive_probability: sim.naive_probability,
            simulated_probability: sim.win_probability,
            expected_value: sim.expected_value,
            variance: sim.variance,
            value_at_risk_95: sim.value_at_risk_95,
            diversity_score: diversity,
            max_correlation,
            total_abs_correlation,
            score,
            approximate: sim.approximate,
        };
        CandidateSlip::new(self.pool.slip_legs(indices), metrics)
    }

    /// Evaluates many index sets in parallel, dropping any that fail.
    #[must_use]
    pub fn evaluate_many(&self, candidates: &[Vec<usize>], n_draws: usize) -> Vec<CandidateSlip> {
        candidates
            .par_iter()
            .filter_map(|indices| match self.evaluate(indices, n_draws) {
                Ok(slip) => Some(slip),
                Err(e) => {
                    debug!(error = %e, "Skipping candidate that failed evaluation");
                    None
                }
            })
            .collect()
    }

    #[must_use]
    pub fn is_valid(&self, slip: &CandidateSlip) -> bool {
        ConstraintValidator::validate(slip, self.constraints).is_valid()
    }

    /// Re-simulates screened slips at full precision and returns the best
    /// `top_n` that still validate, ranked and without repeated leg sets.
    ///
    /// At most `3·top_n` of the best screened candidates are re-simulated.
    #[must_use]
    pub fn finalize(&self, mut screened: Vec<CandidateSlip>, top_n: usize) -> Vec<CandidateSlip> {
        rank_and_dedup(&mut screened);
        screened.truncate(top_n.saturating_mul(3).max(top_n + 5));

        let indices: Vec<Vec<usize>> = screened
            .iter()
            .filter_map(|slip| self.pool.indices_of(slip).ok())
            .collect();

        let mut finals: Vec<CandidateSlip> = self
            .evaluate_many(&indices, self.full_draws())
            .into_iter()
            .filter(|slip| self.is_valid(slip))
            .collect();
        rank_and_dedup(&mut finals);
        finals.truncate(top_n);
        finals
    }
}
