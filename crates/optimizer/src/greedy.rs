//! Greedy construction with restarts from the highest-edge legs.

use std::cmp::Ordering;

use tracing::debug;

use parlay_core::slip::{CandidateSlip, SCORE_EPSILON};
use parlay_core::Algorithm;

use crate::evaluator::Evaluator;
use crate::strategy::{precheck, SearchContext, SearchOutcome, SearchStrategy};

pub struct GreedySearch;

impl SearchStrategy for GreedySearch {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Greedy
    }

    fn search(&self, ctx: &SearchContext<'_>) -> SearchOutcome {
        if let Some(outcome) = precheck(ctx) {
            return outcome;
        }
        let eval = ctx.evaluator;
        let seeds = seed_legs(eval, ctx.settings.greedy_restarts.max(ctx.top_n));

        let mut found = Vec::new();
        let mut interrupted = false;
        for (restart, &seed) in seeds.iter().enumerate() {
            if let Some(slip) = climb(eval, seed, ctx.settings.expansion_width) {
                found.push(slip);
            }
            // Checkpoint after each restart.
            if ctx.budget.exhausted() && restart + 1 < seeds.len() {
                interrupted = true;
                break;
            }
        }
        debug!(restarts = seeds.len(), found = found.len(), "Greedy restarts finished");

        SearchOutcome::from_slips(eval.finalize(found, ctx.top_n), interrupted, ctx)
    }
}

/// Pool indices ordered by single-leg edge, best first.
fn seed_legs(eval: &Evaluator<'_>, count: usize) -> Vec<usize> {
    let pool = eval.pool();
    let mut order: Vec<(usize, f64)> = (0..pool.len())
        .filter(|&i| eval.partial_ok(&[i]))
        .map(|i| (i, pool.prediction(i).edge(pool.leg(i).odds())))
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    order.into_iter().take(count).map(|(i, _)| i).collect()
}

/// Grows a slip from `seed` one leg at a time and returns the best
/// constraint-valid slip seen along the way.
fn climb(eval: &Evaluator<'_>, seed: usize, expansion_width: usize) -> Option<CandidateSlip> {
    let c = eval.constraints();
    let draws = eval.screening_draws();

    let mut current = eval.evaluate(&[seed], draws).ok()?;
    let mut indices = vec![seed];
    let mut best_valid = eval.is_valid(&current).then(|| current.clone());

    while indices.len() < c.max_legs {
        let extensions = ranked_extensions(eval, &indices, expansion_width);
        let evaluated = eval.evaluate_many(&extensions, draws);
        let Some(best) = evaluated.into_iter().min_by(CandidateSlip::rank_cmp) else {
            break;
        };

        let below_min = indices.len() < c.min_legs;
        if !below_min && best.score() <= current.score() + SCORE_EPSILON {
            break;
        }

        indices = eval.pool().indices_of(&best).ok()?;
        if eval.is_valid(&best)
            && best_valid
                .as_ref()
                .map_or(true, |b| best.rank_cmp(b) == Ordering::Less)
        {
            best_valid = Some(best.clone());
        }
        current = best;
    }
    best_valid
}

/// Up to `width` one-leg extensions of `indices` that pass the partial
/// rules, best proxy score first.
pub(crate) fn ranked_extensions(eval: &Evaluator<'_>, indices: &[usize], width: usize) -> Vec<Vec<usize>> {
    let mut scored: Vec<(f64, Vec<usize>)> = (0..eval.pool().len())
        .filter(|j| !indices.contains(j))
        .filter_map(|j| {
            let mut next = indices.to_vec();
            next.push(j);
            next.sort_unstable();
            eval.partial_ok(&next).then(|| (eval.proxy_score(&next), next))
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.truncate(width);
    scored.into_iter().map(|(_, next)| next).collect()
}
