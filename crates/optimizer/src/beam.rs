//! Beam search over slip size.
//!
//! Level `k` holds the best `beam_width` partial slips of `k` legs. Each is
//! extended by one leg (only the `expansion_width` best extensions by proxy
//! score are simulated), duplicates are pruned, and the best `beam_width`
//! survive to the next level. Every constraint-valid slip met along the way
//! is a candidate for the final ranking.

use std::collections::HashSet;

use tracing::debug;

use parlay_core::slip::CandidateSlip;
use parlay_core::Algorithm;

use crate::greedy::ranked_extensions;
use crate::strategy::{precheck, SearchContext, SearchOutcome, SearchStrategy};

pub struct BeamSearch;

impl SearchStrategy for BeamSearch {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Beam
    }

    fn search(&self, ctx: &SearchContext<'_>) -> SearchOutcome {
        if let Some(outcome) = precheck(ctx) {
            return outcome;
        }
        let eval = ctx.evaluator;
        let c = eval.constraints();
        let width = ctx.settings.beam_width;
        let draws = eval.screening_draws();

        // Level 1: best single legs by proxy score.
        let mut singles: Vec<(f64, Vec<usize>)> = (0..eval.pool().len())
            .map(|i| vec![i])
            .filter(|s| eval.partial_ok(s))
            .map(|s| (eval.proxy_score(&s), s))
            .collect();
        singles.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        singles.truncate(width);
        let singles: Vec<Vec<usize>> = singles.into_iter().map(|(_, s)| s).collect();

        let mut beam = eval.evaluate_many(&singles, draws);
        let mut completed: Vec<CandidateSlip> = Vec::new();
        let mut interrupted = false;
        collect_valid(ctx, &beam, &mut completed);

        for size in 2..=c.max_legs {
            // Checkpoint after each level.
            if ctx.budget.exhausted() {
                interrupted = true;
                break;
            }

            let mut seen = HashSet::new();
            let expansions: Vec<Vec<usize>> = beam
                .iter()
                .filter_map(|slip| eval.pool().indices_of(slip).ok())
                .flat_map(|indices| ranked_extensions(eval, &indices, ctx.settings.expansion_width))
                .filter(|next| seen.insert(next.clone()))
                .collect();
            if expansions.is_empty() {
                break;
            }

            let mut level = eval.evaluate_many(&expansions, draws);
            level.sort_by(CandidateSlip::rank_cmp);
            collect_valid(ctx, &level, &mut completed);
            level.truncate(width);
            debug!(size, expansions = expansions.len(), kept = level.len(), "Beam level complete");
            beam = level;
        }

        SearchOutcome::from_slips(eval.finalize(completed, ctx.top_n), interrupted, ctx)
    }
}

/// Keeps constraint-valid slips, holding the candidate list to a bounded size.
fn collect_valid(ctx: &SearchContext<'_>, level: &[CandidateSlip], completed: &mut Vec<CandidateSlip>) {
    completed.extend(level.iter().filter(|s| ctx.evaluator.is_valid(s)).cloned());
    let cap = ctx.top_n.saturating_mul(4).max(16);
    if completed.len() > cap * 2 {
        completed.sort_by(CandidateSlip::rank_cmp);
        completed.truncate(cap);
    }
}
