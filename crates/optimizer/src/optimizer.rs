//! Entry point tying pool, constraints, search and stake sizing together.

use std::collections::HashMap;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use parlay_core::correlation::CorrelationMatrix;
use parlay_core::error::Result;
use parlay_core::kelly::{BetRequest, KellyResult};
use parlay_core::leg::{Leg, LegId};
use parlay_core::pool::LegPool;
use parlay_core::prediction::Prediction;
use parlay_core::slip::CandidateSlip;
use parlay_core::{Algorithm, Constraints, EngineConfig};
use parlay_simulation::CorrelatedMonteCarloSimulator;

use crate::alternatives::{SaferAlternative, SaferAlternativeGenerator};
use crate::budget::Budget;
use crate::evaluator::Evaluator;
use crate::strategy::{strategy_for, SearchContext, SearchStatus};

/// Ranked slips from one optimization call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub algorithm: Algorithm,
    pub pool_size: usize,
    /// Best first; every slip passed validation at full simulation precision.
    pub slips: Vec<CandidateSlip>,
    pub status: SearchStatus,
    pub evaluations: usize,
    pub elapsed_ms: u64,
}

/// A slip together with its recommended stake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizedSlip {
    pub slip: CandidateSlip,
    pub stake: KellyResult,
}

/// Optimization report with stakes attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizedReport {
    pub report: OptimizationReport,
    pub bankroll: Decimal,
    pub sized: Vec<SizedSlip>,
}

/// Label used for a slip in allocations and reports.
#[must_use]
pub fn slip_label(slip: &CandidateSlip) -> String {
    slip.leg_ids().map(LegId::as_str).collect::<Vec<_>>().join("+")
}

pub struct SlipOptimizer {
    config: EngineConfig,
    simulator: CorrelatedMonteCarloSimulator,
}

impl SlipOptimizer {
    /// # Errors
    /// Returns an error if any configuration section is out of range.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.check()?;
        let simulator = CorrelatedMonteCarloSimulator::new(config.simulation.clone());
        Ok(Self { config, simulator })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn simulator(&self) -> &CorrelatedMonteCarloSimulator {
        &self.simulator
    }

    /// Builds a pool from raw inputs and optimizes over it.
    ///
    /// # Errors
    /// Returns an error for malformed inputs: duplicate legs, legs without a
    /// prediction, correlations on unknown legs or inconsistent constraints.
    /// An infeasible request is not an error; it yields an empty report.
    pub fn optimize(
        &self,
        legs: Vec<Leg>,
        predictions: &HashMap<LegId, Prediction>,
        correlation: CorrelationMatrix,
        constraints: &Constraints,
        algorithm: Algorithm,
        top_n: usize,
    ) -> Result<OptimizationReport> {
        let pool = LegPool::new(legs, predictions, correlation)?;
        self.optimize_pool(&pool, constraints, algorithm, top_n)
    }

    /// Searches `pool` for the best `top_n` slips.
    ///
    /// # Errors
    /// Returns an error if `constraints` are inconsistent or `top_n` is 0.
    pub fn optimize_pool(
        &self,
        pool: &LegPool,
        constraints: &Constraints,
        algorithm: Algorithm,
        top_n: usize,
    ) -> Result<OptimizationReport> {
        constraints.check()?;
        if top_n == 0 {
            return Err(parlay_core::ParlayError::parameter("top_n", "must be at least 1"));
        }

        let started = Instant::now();
        let evaluator = Evaluator::new(pool, constraints, &self.simulator);
        let settings = self.config.search.clone().with_algorithm(algorithm);
        let ctx = SearchContext {
            evaluator: &evaluator,
            settings: &settings,
            top_n,
            budget: Budget::from_millis(settings.time_budget_ms),
            seed: self.simulator.seed_for(std::iter::empty()),
        };

        let outcome = strategy_for(algorithm).search(&ctx);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &outcome.status {
            SearchStatus::Complete => {}
            SearchStatus::Partial { reason } => warn!(%reason, "Search stopped early"),
            SearchStatus::Infeasible { reason } => info!(%reason, "No feasible slip"),
        }
        info!(
            algorithm = %algorithm,
            pool = pool.len(),
            slips = outcome.slips.len(),
            evaluations = evaluator.evaluations(),
            elapsed_ms,
            "Optimization complete"
        );

        Ok(OptimizationReport {
            algorithm,
            pool_size: pool.len(),
            slips: outcome.slips,
            status: outcome.status,
            evaluations: evaluator.evaluations(),
            elapsed_ms,
        })
    }

    /// Optimizes, then sizes every returned slip from one bankroll using the
    /// configured allocation strategy and the simulated variance.
    ///
    /// # Errors
    /// Same as [`Self::optimize_pool`], plus a non-positive bankroll.
    pub fn optimize_and_size(
        &self,
        pool: &LegPool,
        constraints: &Constraints,
        algorithm: Algorithm,
        top_n: usize,
        bankroll: Decimal,
    ) -> Result<SizedReport> {
        if bankroll <= Decimal::ZERO {
            return Err(parlay_core::ParlayError::parameter(
                "bankroll",
                format!("{bankroll} must be positive"),
            ));
        }
        let report = self.optimize_pool(pool, constraints, algorithm, top_n)?;
        let sized = self.size(&report.slips, bankroll);
        Ok(SizedReport {
            report,
            bankroll,
            sized,
        })
    }

    /// Evaluates a hand-picked slip at full simulation precision.
    ///
    /// # Errors
    /// Returns an error for unknown, repeated or missing leg ids.
    pub fn evaluate_slip(&self, pool: &LegPool, constraints: &Constraints, ids: &[LegId]) -> Result<CandidateSlip> {
        let indices = pool.resolve(ids)?;
        let evaluator = Evaluator::new(pool, constraints, &self.simulator);
        evaluator.evaluate(&indices, evaluator.full_draws())
    }

    /// Lower-risk variants of `slip`, re-simulated against `pool` and
    /// validated under `constraints`.
    ///
    /// # Errors
    /// Returns an error if `slip` has a leg outside `pool` or `constraints`
    /// are inconsistent.
    pub fn safer_alternatives(
        &self,
        slip: &CandidateSlip,
        pool: &LegPool,
        constraints: &Constraints,
        max_alternatives: usize,
    ) -> Result<Vec<SaferAlternative>> {
        constraints.check()?;
        let evaluator = Evaluator::new(pool, constraints, &self.simulator);
        SaferAlternativeGenerator::new(&evaluator).generate(slip, max_alternatives)
    }

    /// Attaches stakes to already evaluated slips.
    #[must_use]
    pub fn size(&self, slips: &[CandidateSlip], bankroll: Decimal) -> Vec<SizedSlip> {
        let bets: Vec<BetRequest> = slips
            .iter()
            .map(|slip| {
                let m = slip.metrics();
                BetRequest::new(slip_label(slip), m.simulated_probability, m.payout_multiplier)
                    .with_variance(m.variance)
            })
            .collect();

        let allocations = self
            .config
            .kelly
            .calculator()
            .allocate(&bets, bankroll, self.config.kelly.strategy());

        let by_label: HashMap<&str, &CandidateSlip> =
            slips.iter().zip(&bets).map(|(s, b)| (b.id.as_str(), s)).collect();

        allocations
            .into_iter()
            .filter_map(|allocation| {
                by_label.get(allocation.id.as_str()).map(|slip| SizedSlip {
                    slip: (*slip).clone(),
                    stake: allocation.result,
                })
            })
            .collect()
    }
}
