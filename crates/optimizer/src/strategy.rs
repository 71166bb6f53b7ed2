//! The search capability shared by every algorithm.

use serde::{Deserialize, Serialize};

use parlay_core::slip::CandidateSlip;
use parlay_core::{Algorithm, SearchSettings};

use crate::beam::BeamSearch;
use crate::budget::Budget;
use crate::evaluator::Evaluator;
use crate::genetic::GeneticSearch;
use crate::greedy::GreedySearch;

/// How a search ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchStatus {
    /// Ran to natural completion.
    Complete,
    /// Stopped at a checkpoint because the time budget ran out; slips are
    /// the best found so far.
    Partial { reason: String },
    /// No constraint-valid slip exists (or none was found).
    Infeasible { reason: String },
}

impl SearchStatus {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Everything a strategy needs for one run.
pub struct SearchContext<'a> {
    pub evaluator: &'a Evaluator<'a>,
    pub settings: &'a SearchSettings,
    pub top_n: usize,
    pub budget: Budget,
    /// Seed for the strategy's own random choices.
    pub seed: u64,
}

/// Result of a search before it is wrapped into a report.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub slips: Vec<CandidateSlip>,
    pub status: SearchStatus,
}

impl SearchOutcome {
    /// Final slips with status derived from whether the budget interrupted
    /// the search and whether anything was found.
    #[must_use]
    pub fn from_slips(slips: Vec<CandidateSlip>, interrupted: bool, ctx: &SearchContext<'_>) -> Self {
        let status = if interrupted {
            SearchStatus::Partial {
                reason: format!(
                    "time budget exhausted after {} ms",
                    ctx.budget.elapsed().as_millis()
                ),
            }
        } else if slips.is_empty() {
            let c = ctx.evaluator.constraints();
            SearchStatus::Infeasible {
                reason: format!(
                    "no slip of {}..={} legs satisfies the {} constraints",
                    c.min_legs, c.max_legs, c.mode
                ),
            }
        } else {
            SearchStatus::Complete
        };
        Self { slips, status }
    }

    /// Empty result when the pool cannot reach the minimum leg count.
    #[must_use]
    pub fn infeasible(reason: impl Into<String>) -> Self {
        Self {
            slips: Vec::new(),
            status: SearchStatus::Infeasible {
                reason: reason.into(),
            },
        }
    }
}

/// A slip search algorithm.
pub trait SearchStrategy: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    /// Returns up to `ctx.top_n` validated slips, best first.
    fn search(&self, ctx: &SearchContext<'_>) -> SearchOutcome;
}

/// The strategy implementing `algorithm`.
#[must_use]
pub fn strategy_for(algorithm: Algorithm) -> Box<dyn SearchStrategy> {
    match algorithm {
        Algorithm::Greedy => Box::new(GreedySearch),
        Algorithm::Beam => Box::new(BeamSearch),
        Algorithm::Genetic => Box::new(GeneticSearch),
    }
}

/// Shared feasibility check run before any search.
#[must_use]
pub(crate) fn precheck(ctx: &SearchContext<'_>) -> Option<SearchOutcome> {
    let pool = ctx.evaluator.pool();
    let c = ctx.evaluator.constraints();
    if pool.len() < c.min_legs {
        return Some(SearchOutcome::infeasible(format!(
            "pool has {} legs, fewer than the minimum of {}",
            pool.len(),
            c.min_legs
        )));
    }
    None
}
