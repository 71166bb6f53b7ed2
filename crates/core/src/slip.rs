//! Candidate slips and their evaluated metrics.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ParlayError, Result};
use crate::leg::{Leg, LegId};
use crate::prediction::Prediction;

/// Scores closer than this are considered tied.
pub const SCORE_EPSILON: f64 = 1e-9;

/// A leg as it appears inside a slip: the leg plus its prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipLeg {
    pub leg: Arc<Leg>,
    pub prediction: Prediction,
}

impl SlipLeg {
    #[must_use]
    pub fn new(leg: Arc<Leg>, prediction: Prediction) -> Self {
        Self { leg, prediction }
    }

    #[must_use]
    pub fn id(&self) -> &LegId {
        self.leg.id()
    }
}

/// Metrics derived when a slip is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlipMetrics {
    /// Product of the legs' payout multipliers.
    pub payout_multiplier: f64,
    /// Product of leg probabilities (independence assumed).
    pub naive_probability: f64,
    /// Win probability from correlated simulation.
    pub simulated_probability: f64,
    /// Net return per unit stake under the simulated probability.
    pub expected_value: f64,
    /// Variance of net return per unit stake.
    pub variance: f64,
    /// 95% value-at-risk per unit stake (positive = loss).
    pub value_at_risk_95: f64,
    /// Spread of legs across games and subjects, in (0, 1].
    pub diversity_score: f64,
    /// Largest pairwise correlation between included legs.
    pub max_correlation: f64,
    /// Sum of |ρ| over all included pairs.
    pub total_abs_correlation: f64,
    /// Objective: EV − λ·Σ|ρ| + μ·diversity.
    pub score: f64,
    /// Set when the correlation submatrix needed heavy regularization.
    pub approximate: bool,
}

/// An evaluated set of legs. Never mutated; re-evaluation builds a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSlip {
    legs: Vec<SlipLeg>,
    metrics: SlipMetrics,
}

impl CandidateSlip {
    /// Creates a slip from its legs and evaluated metrics.
    ///
    /// Legs are stored sorted by id so equal leg sets compare equal.
    ///
    /// # Errors
    /// Returns an error if `legs` is empty or contains a duplicate id.
    pub fn new(mut legs: Vec<SlipLeg>, metrics: SlipMetrics) -> Result<Self> {
        if legs.is_empty() {
            return Err(ParlayError::EmptySlip);
        }
        legs.sort_by(|a, b| a.id().cmp(b.id()));
        for pair in legs.windows(2) {
            if pair[0].id() == pair[1].id() {
                return Err(ParlayError::DuplicateLeg(pair[0].id().to_string()));
            }
        }
        Ok(Self { legs, metrics })
    }

    #[must_use]
    pub fn legs(&self) -> &[SlipLeg] {
        &self.legs
    }

    #[must_use]
    pub fn metrics(&self) -> &SlipMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.legs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Leg ids in sorted order.
    pub fn leg_ids(&self) -> impl Iterator<Item = &LegId> {
        self.legs.iter().map(SlipLeg::id)
    }

    /// True if the slip includes `id`.
    #[must_use]
    pub fn contains(&self, id: &LegId) -> bool {
        self.legs.iter().any(|l| l.id() == id)
    }

    /// Mean prediction confidence of the included legs.
    #[must_use]
    pub fn mean_confidence(&self) -> f64 {
        self.legs.iter().map(|l| l.prediction.confidence()).sum::<f64>() / self.legs.len() as f64
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.metrics.score
    }

    /// Ranking order: higher score first; scores in the same
    /// [`SCORE_EPSILON`] bucket tie, and ties go to higher diversity, then
    /// fewer legs.
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        // Bucketing keeps the tie relation transitive.
        other
            .score_bucket()
            .total_cmp(&self.score_bucket())
            .then_with(|| {
                other
                    .metrics
                    .diversity_score
                    .total_cmp(&self.metrics.diversity_score)
            })
            .then_with(|| self.legs.len().cmp(&other.legs.len()))
            .then_with(|| self.leg_ids().cmp(other.leg_ids()))
    }

    fn score_bucket(&self) -> f64 {
        (self.metrics.score / SCORE_EPSILON).round()
    }
}

/// Sorts slips best-first and drops repeated leg sets.
pub fn rank_and_dedup(slips: &mut Vec<CandidateSlip>) {
    slips.sort_by(CandidateSlip::rank_cmp);
    let mut seen: HashSet<Vec<LegId>> = HashSet::with_capacity(slips.len());
    slips.retain(|s| seen.insert(s.leg_ids().cloned().collect()));
}

/// Diversity of a set of legs: `0.7·unique_games/n + 0.3·unique_subjects/n`.
///
/// Returns a value in (0, 1]; an empty set scores 0.
#[must_use]
pub fn diversity_score<'a>(legs: impl IntoIterator<Item = &'a Leg>) -> f64 {
    let mut games = HashSet::new();
    let mut subjects = HashSet::new();
    let mut n = 0usize;
    for leg in legs {
        games.insert(leg.game_id());
        subjects.insert(leg.subject_id());
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    0.7 * games.len() as f64 / n + 0.3 * subjects.len() as f64 / n
}
