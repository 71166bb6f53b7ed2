//! Genetic search over leg subsets.
//!
//! Individuals are sorted pool-index lists. Invalid individuals stay in the
//! population with a heavy fitness penalty instead of being discarded.
//! Fitness is evaluated in parallel; breeding is sequential on a seeded RNG,
//! so runs are reproducible.

use std::collections::HashMap;

use rand::seq::{IteratorRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use parlay_core::slip::{CandidateSlip, SCORE_EPSILON};
use parlay_core::Algorithm;

use crate::evaluator::Evaluator;
use crate::strategy::{precheck, SearchContext, SearchOutcome, SearchStrategy};

/// Subtracted from the score of constraint-invalid individuals.
pub const INVALID_PENALTY: f64 = 1_000.0;
const TOURNAMENT_SIZE: usize = 3;

type Individual = Vec<usize>;

struct Scored {
    fitness: f64,
    slip: Option<CandidateSlip>,
}

pub struct GeneticSearch;

impl SearchStrategy for GeneticSearch {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Genetic
    }

    fn search(&self, ctx: &SearchContext<'_>) -> SearchOutcome {
        if let Some(outcome) = precheck(ctx) {
            return outcome;
        }
        let eval = ctx.evaluator;
        let settings = ctx.settings;
        let mut rng = ChaCha8Rng::seed_from_u64(ctx.seed);
        let mut cache: HashMap<Individual, Scored> = HashMap::new();

        let mut population = initial_population(eval, settings.population, &mut rng);
        let mut best_fitness = f64::NEG_INFINITY;
        let mut stale = 0usize;
        let mut interrupted = false;

        for generation in 0..settings.generations {
            score_missing(eval, &population, &mut cache);
            population.sort_by(|a, b| fitness(&cache, b).total_cmp(&fitness(&cache, a)).then_with(|| a.cmp(b)));

            let leader = population.first().map_or(f64::NEG_INFINITY, |ind| fitness(&cache, ind));
            if leader > best_fitness + SCORE_EPSILON {
                best_fitness = leader;
                stale = 0;
            } else {
                stale += 1;
            }
            debug!(generation, best = leader, stale, "Genetic generation scored");

            if stale >= settings.plateau_generations {
                break;
            }
            // Checkpoint after each generation.
            if ctx.budget.exhausted() {
                interrupted = generation + 1 < settings.generations;
                break;
            }

            population = next_generation(eval, &population, &cache, settings, &mut rng);
        }
        score_missing(eval, &population, &mut cache);

        let valid: Vec<CandidateSlip> = cache
            .into_values()
            .filter(|s| s.fitness > -INVALID_PENALTY / 2.0)
            .filter_map(|s| s.slip)
            .collect();
        SearchOutcome::from_slips(eval.finalize(valid, ctx.top_n), interrupted, ctx)
    }
}

fn fitness(cache: &HashMap<Individual, Scored>, ind: &Individual) -> f64 {
    cache.get(ind).map_or(f64::NEG_INFINITY, |s| s.fitness)
}

fn score_missing(eval: &Evaluator<'_>, population: &[Individual], cache: &mut HashMap<Individual, Scored>) {
    let mut missing: Vec<Individual> = population
        .iter()
        .filter(|ind| !cache.contains_key(*ind))
        .cloned()
        .collect();
    missing.sort_unstable();
    missing.dedup();

    for slip in eval.evaluate_many(&missing, eval.screening_draws()) {
        let Ok(indices) = eval.pool().indices_of(&slip) else {
            continue;
        };
        let fitness = if eval.is_valid(&slip) {
            slip.score()
        } else {
            slip.score() - INVALID_PENALTY
        };
        cache.insert(indices, Scored { fitness, slip: Some(slip) });
    }
    // Anything that failed to evaluate is never selected.
    for ind in missing {
        cache.entry(ind).or_insert(Scored {
            fitness: f64::NEG_INFINITY,
            slip: None,
        });
    }
}

fn leg_bounds(eval: &Evaluator<'_>) -> (usize, usize) {
    let c = eval.constraints();
    let n = eval.pool().len();
    (c.min_legs.min(n), c.max_legs.min(n))
}

fn initial_population(eval: &Evaluator<'_>, size: usize, rng: &mut ChaCha8Rng) -> Vec<Individual> {
    let pool = eval.pool();
    let (min_legs, max_legs) = leg_bounds(eval);

    // One individual from the highest-edge legs anchors the population.
    let mut by_edge: Vec<usize> = (0..pool.len()).collect();
    by_edge.sort_by(|&a, &b| {
        let ea = pool.prediction(a).edge(pool.leg(a).odds());
        let eb = pool.prediction(b).edge(pool.leg(b).odds());
        eb.total_cmp(&ea).then(a.cmp(&b))
    });
    let mut anchor: Individual = by_edge.into_iter().take(min_legs).collect();
    anchor.sort_unstable();

    let mut population = vec![anchor];
    while population.len() < size {
        let len = rng.gen_range(min_legs..=max_legs);
        let mut ind: Individual = (0..pool.len()).choose_multiple(rng, len);
        ind.sort_unstable();
        population.push(ind);
    }
    population
}

fn tournament<'p>(
    population: &'p [Individual],
    cache: &HashMap<Individual, Scored>,
    rng: &mut ChaCha8Rng,
) -> &'p Individual {
    let mut best = &population[rng.gen_range(0..population.len())];
    for _ in 1..TOURNAMENT_SIZE {
        let challenger = &population[rng.gen_range(0..population.len())];
        if fitness(cache, challenger) > fitness(cache, best) {
            best = challenger;
        }
    }
    best
}

fn next_generation(
    eval: &Evaluator<'_>,
    population: &[Individual],
    cache: &HashMap<Individual, Scored>,
    settings: &parlay_core::SearchSettings,
    rng: &mut ChaCha8Rng,
) -> Vec<Individual> {
    let mut next: Vec<Individual> = population.iter().take(settings.elite).cloned().collect();

    while next.len() < settings.population {
        let a = tournament(population, cache, rng);
        let b = tournament(population, cache, rng);
        let mut child = if rng.gen_bool(settings.crossover_rate) {
            crossover(a, b, rng)
        } else {
            a.clone()
        };
        if rng.gen_bool(settings.mutation_rate) {
            mutate(&mut child, eval.pool().len(), rng);
        }
        repair(&mut child, leg_bounds(eval), eval.pool().len(), rng);
        next.push(child);
    }
    next
}

/// Child drawn from the union of both parents, sized between them.
fn crossover(a: &Individual, b: &Individual, rng: &mut ChaCha8Rng) -> Individual {
    let mut genes: Vec<usize> = a.iter().chain(b).copied().collect();
    genes.sort_unstable();
    genes.dedup();
    genes.shuffle(rng);

    let (lo, hi) = (a.len().min(b.len()), a.len().max(b.len()));
    genes.truncate(rng.gen_range(lo..=hi));
    genes.sort_unstable();
    genes
}

/// Swaps one leg for a leg outside the individual.
fn mutate(ind: &mut Individual, pool_len: usize, rng: &mut ChaCha8Rng) {
    if ind.is_empty() || ind.len() >= pool_len {
        return;
    }
    let Some(replacement) = (0..pool_len).filter(|i| !ind.contains(i)).choose(rng) else {
        return;
    };
    let slot = rng.gen_range(0..ind.len());
    ind[slot] = replacement;
    ind.sort_unstable();
}

/// Brings the leg count back inside `[min_legs, max_legs]`.
fn repair(ind: &mut Individual, (min_legs, max_legs): (usize, usize), pool_len: usize, rng: &mut ChaCha8Rng) {
    while ind.len() > max_legs {
        let slot = rng.gen_range(0..ind.len());
        ind.swap_remove(slot);
    }
    while ind.len() < min_legs {
        let Some(extra) = (0..pool_len).filter(|i| !ind.contains(i)).choose(rng) else {
            break;
        };
        ind.push(extra);
    }
    ind.sort_unstable();
}
