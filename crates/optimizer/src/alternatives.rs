//! Lower-risk variants of a chosen slip.
//!
//! Each reduction strategy proposes at most one smaller leg set (the ladder
//! proposes one per size). Proposals are re-simulated at full precision,
//! dropped unless they validate, deduplicated, and ranked by
//! `EV retained / variance retained`.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parlay_core::error::Result;
use parlay_core::slip::CandidateSlip;
use parlay_core::{Constraints, CorrelationMatrix, Leg, LegId, LegPool, Prediction};
use parlay_simulation::CorrelatedMonteCarloSimulator;

use crate::evaluator::Evaluator;

/// How an alternative was derived from the original slip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ReductionStrategy {
    /// Dropped one leg of the most correlated pair.
    DropMostCorrelated,
    /// Dropped the least confident leg.
    DropLowestConfidence,
    /// Kept one leg per game.
    DistinctGames,
    /// Dropped the leg whose removal cuts simulated variance the most.
    DropHighestVariance,
    /// Kept the `legs` most likely legs.
    Ladder { legs: usize },
}

impl fmt::Display for ReductionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DropMostCorrelated => write!(f, "drop most correlated"),
            Self::DropLowestConfidence => write!(f, "drop lowest confidence"),
            Self::DistinctGames => write!(f, "distinct games"),
            Self::DropHighestVariance => write!(f, "drop highest variance"),
            Self::Ladder { legs } => write!(f, "ladder ({legs} legs)"),
        }
    }
}

/// A smaller slip with its risk and reward relative to the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaferAlternative {
    pub slip: CandidateSlip,
    pub strategy: ReductionStrategy,
    pub note: String,
    /// Original variance minus this slip's variance.
    pub variance_reduction: f64,
    /// Original 95% VaR minus this slip's.
    pub var_reduction: f64,
    pub ev_retained: f64,
    pub variance_retained: f64,
    /// `ev_retained / variance_retained`; higher is better.
    pub tradeoff: f64,
}

pub struct SaferAlternativeGenerator<'a> {
    evaluator: &'a Evaluator<'a>,
}

impl<'a> SaferAlternativeGenerator<'a> {
    #[must_use]
    pub fn new(evaluator: &'a Evaluator<'a>) -> Self {
        Self { evaluator }
    }

    /// Returns up to `max_alternatives` validated variants of `original`, none
    /// with more legs than it, best tradeoff first.
    ///
    /// # Errors
    /// Returns an error if `original` contains a leg outside the pool.
    pub fn generate(&self, original: &CandidateSlip, max_alternatives: usize) -> Result<Vec<SaferAlternative>> {
        let eval = self.evaluator;
        let indices = eval.pool().indices_of(original)?;
        let baseline = eval.evaluate(&indices, eval.full_draws())?;

        let mut proposals = self.proposals(&indices);
        let min_legs = eval.constraints().min_legs;
        proposals.retain(|(_, p)| p.len() >= min_legs && p.len() < indices.len());

        let mut alternatives: Vec<SaferAlternative> = proposals
            .par_iter()
            .filter_map(|(strategy, legs)| {
                let slip = eval.evaluate(legs, eval.full_draws()).ok()?;
                eval.is_valid(&slip)
                    .then(|| Self::compare(&baseline, &indices, slip, *strategy))
            })
            .collect();

        alternatives.sort_by(|a, b| {
            b.tradeoff
                .total_cmp(&a.tradeoff)
                .then_with(|| a.slip.rank_cmp(&b.slip))
        });
        let mut seen: HashSet<Vec<LegId>> = HashSet::new();
        alternatives.retain(|alt| seen.insert(alt.slip.leg_ids().cloned().collect()));
        alternatives.truncate(max_alternatives);

        debug!(
            original_legs = indices.len(),
            alternatives = alternatives.len(),
            "Generated safer alternatives"
        );
        Ok(alternatives)
    }

    fn proposals(&self, indices: &[usize]) -> Vec<(ReductionStrategy, Vec<usize>)> {
        let mut out = Vec::new();
        if let Some(p) = self.drop_most_correlated(indices) {
            out.push((ReductionStrategy::DropMostCorrelated, p));
        }
        if let Some(p) = self.drop_lowest_confidence(indices) {
            out.push((ReductionStrategy::DropLowestConfidence, p));
        }
        if let Some(p) = self.distinct_games(indices) {
            out.push((ReductionStrategy::DistinctGames, p));
        }
        if let Some(p) = self.drop_highest_variance(indices) {
            out.push((ReductionStrategy::DropHighestVariance, p));
        }
        out.extend(
            self.ladder(indices)
                .into_iter()
                .map(|p| (ReductionStrategy::Ladder { legs: p.len() }, p)),
        );
        out
    }

    /// Leg strength: confidence, then probability, then pool order.
    fn weaker(&self, a: usize, b: usize) -> Ordering {
        let pool = self.evaluator.pool();
        let (pa, pb) = (pool.prediction(a), pool.prediction(b));
        pa.confidence()
            .total_cmp(&pb.confidence())
            .then(pa.probability().total_cmp(&pb.probability()))
            .then(b.cmp(&a))
    }

    fn drop_most_correlated(&self, indices: &[usize]) -> Option<Vec<usize>> {
        let pool = self.evaluator.pool();
        let mut best: Option<(f64, usize, usize)> = None;
        for (k, &i) in indices.iter().enumerate() {
            for &j in &indices[k + 1..] {
                let rho = pool.correlation(i, j);
                if best.map_or(true, |(r, _, _)| rho > r) {
                    best = Some((rho, i, j));
                }
            }
        }
        let (rho, i, j) = best?;
        if rho <= 0.0 {
            return None;
        }
        let drop = if self.weaker(i, j) == Ordering::Greater { j } else { i };
        Some(without(indices, drop))
    }

    fn drop_lowest_confidence(&self, indices: &[usize]) -> Option<Vec<usize>> {
        let drop = indices.iter().copied().min_by(|&a, &b| self.weaker(a, b))?;
        Some(without(indices, drop))
    }

    fn distinct_games(&self, indices: &[usize]) -> Option<Vec<usize>> {
        let pool = self.evaluator.pool();
        let mut strongest_first = indices.to_vec();
        strongest_first.sort_by(|&a, &b| self.weaker(b, a));

        let mut games = HashSet::new();
        let mut kept: Vec<usize> = strongest_first
            .into_iter()
            .filter(|&i| games.insert(pool.leg(i).game_id().to_string()))
            .collect();
        if kept.len() == indices.len() {
            return None;
        }
        kept.sort_unstable();
        Some(kept)
    }

    fn drop_highest_variance(&self, indices: &[usize]) -> Option<Vec<usize>> {
        let eval = self.evaluator;
        let candidates: Vec<Vec<usize>> = indices.iter().map(|&i| without(indices, i)).collect();
        eval.evaluate_many(&candidates, eval.screening_draws())
            .into_iter()
            .min_by(|a, b| {
                a.metrics()
                    .variance
                    .total_cmp(&b.metrics().variance)
                    .then_with(|| a.rank_cmp(b))
            })
            .and_then(|slip| eval.pool().indices_of(&slip).ok())
    }

    /// The original truncated to `n − 1`, `n − 2`, … legs, most likely legs kept.
    fn ladder(&self, indices: &[usize]) -> Vec<Vec<usize>> {
        let pool = self.evaluator.pool();
        let mut likeliest = indices.to_vec();
        likeliest.sort_by(|&a, &b| {
            pool.prediction(b)
                .probability()
                .total_cmp(&pool.prediction(a).probability())
                .then(a.cmp(&b))
        });

        let min_legs = self.evaluator.constraints().min_legs.max(1);
        (min_legs..indices.len())
            .rev()
            .map(|k| {
                let mut rung = likeliest[..k].to_vec();
                rung.sort_unstable();
                rung
            })
            .collect()
    }

    fn compare(
        baseline: &CandidateSlip,
        original: &[usize],
        slip: CandidateSlip,
        strategy: ReductionStrategy,
    ) -> SaferAlternative {
        let base = baseline.metrics();
        let m = *slip.metrics();

        let ev_retained = if base.expected_value > 0.0 {
            m.expected_value / base.expected_value
        } else {
            1.0 + (m.expected_value - base.expected_value)
        };
        let variance_retained = if base.variance > 0.0 {
            m.variance / base.variance
        } else {
            1.0
        };
        let tradeoff = ev_retained / variance_retained.max(1e-9);

        let note = format!(
            "{strategy}: {} → {} legs, win {:.1}% → {:.1}%, variance {:.3} → {:.3}",
            original.len(),
            slip.len(),
            base.simulated_probability * 100.0,
            m.simulated_probability * 100.0,
            base.variance,
            m.variance
        );

        SaferAlternative {
            variance_reduction: base.variance - m.variance,
            var_reduction: base.value_at_risk_95 - m.value_at_risk_95,
            ev_retained,
            variance_retained,
            tradeoff,
            note,
            strategy,
            slip,
        }
    }
}

/// Builds a pool from raw inputs and returns safer variants of `slip`.
///
/// # Errors
/// Returns an error for malformed inputs or a slip leg missing from `legs`.
pub fn generate_safer_alternatives(
    slip: &CandidateSlip,
    legs: Vec<Leg>,
    predictions: &HashMap<LegId, Prediction>,
    correlation: CorrelationMatrix,
    constraints: &Constraints,
    simulator: &CorrelatedMonteCarloSimulator,
    max_alternatives: usize,
) -> Result<Vec<SaferAlternative>> {
    constraints.check()?;
    let pool = LegPool::new(legs, predictions, correlation)?;
    let evaluator = Evaluator::new(&pool, constraints, simulator);
    SaferAlternativeGenerator::new(&evaluator).generate(slip, max_alternatives)
}

fn without(indices: &[usize], drop: usize) -> Vec<usize> {
    indices.iter().copied().filter(|&i| i != drop).collect()
}
