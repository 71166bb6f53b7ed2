use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constraints::{CategoryPair, Constraints, RiskMode};
use crate::error::{ParlayError, Result};
use crate::kelly::{AllocationStrategy, KellyCriterionCalculator, StakeBounds};

/// Engine configuration, one section per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub kelly: KellySettings,
    #[serde(default)]
    pub risk: RiskSettings,
}

impl EngineConfig {
    /// Checks every section for out-of-range values.
    ///
    /// # Errors
    /// Returns the first [`ParlayError::InvalidParameter`] found.
    pub fn check(&self) -> Result<()> {
        self.simulation.check()?;
        self.search.check()?;
        self.kelly.check()?;
        self.risk.to_constraints()?;
        Ok(())
    }
}

/// Monte Carlo settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Draws per full simulation.
    pub n_draws: usize,
    /// Draws per simulation while ranking candidates during search.
    pub screening_draws: usize,
    /// Fixed seed; `None` seeds from entropy once per run.
    pub seed: Option<u64>,
    /// Smallest eigenvalue kept when repairing a correlation matrix.
    pub eigen_floor: f64,
    /// Largest element-wise repair before a result is flagged approximate.
    pub approximate_threshold: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            n_draws: 10_000,
            screening_draws: 2_000,
            seed: None,
            eigen_floor: 1e-6,
            approximate_threshold: 0.05,
        }
    }
}

impl SimulationSettings {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_draws(mut self, n_draws: usize) -> Self {
        self.n_draws = n_draws;
        self
    }

    #[must_use]
    pub fn with_screening_draws(mut self, draws: usize) -> Self {
        self.screening_draws = draws;
        self
    }

    /// # Errors
    /// Returns an error for zero draws or a non-positive eigenvalue floor.
    pub fn check(&self) -> Result<()> {
        if self.n_draws == 0 {
            return Err(ParlayError::parameter("n_draws", "must be at least 1"));
        }
        if self.screening_draws == 0 {
            return Err(ParlayError::parameter("screening_draws", "must be at least 1"));
        }
        if !(self.eigen_floor > 0.0 && self.eigen_floor < 1.0) {
            return Err(ParlayError::parameter(
                "eigen_floor",
                format!("{} outside (0, 1)", self.eigen_floor),
            ));
        }
        if self.approximate_threshold.is_nan() || self.approximate_threshold < 0.0 {
            return Err(ParlayError::parameter("approximate_threshold", "must be non-negative"));
        }
        Ok(())
    }
}

/// Search algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Greedy,
    Beam,
    Genetic,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Greedy => write!(f, "greedy"),
            Self::Beam => write!(f, "beam"),
            Self::Genetic => write!(f, "genetic"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = ParlayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "beam" | "beam_search" | "beam-search" => Ok(Self::Beam),
            "genetic" | "ga" => Ok(Self::Genetic),
            other => Err(ParlayError::parameter(
                "algorithm",
                format!("unknown algorithm '{other}'"),
            )),
        }
    }
}

/// Search settings shared by all algorithms, plus per-algorithm knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub algorithm: Algorithm,
    /// Number of slips to return.
    pub top_n: usize,
    /// Partial slips kept per beam level.
    pub beam_width: usize,
    /// Extensions per partial slip that get simulated (after a cheap pre-rank).
    pub expansion_width: usize,
    pub population: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    /// Individuals copied unchanged into the next generation.
    pub elite: usize,
    /// Generations without improvement before the genetic search stops.
    pub plateau_generations: usize,
    /// Seed legs tried by greedy search; at least `top_n` are used.
    pub greedy_restarts: usize,
    /// Wall-clock budget per optimization call; `None` runs to completion.
    pub time_budget_ms: Option<u64>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Greedy,
            top_n: 5,
            beam_width: 50,
            expansion_width: 10,
            population: 60,
            generations: 40,
            mutation_rate: 0.2,
            crossover_rate: 0.8,
            elite: 4,
            plateau_generations: 8,
            greedy_restarts: 20,
            time_budget_ms: None,
        }
    }
}

impl SearchSettings {
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    #[must_use]
    pub fn with_time_budget_ms(mut self, budget_ms: u64) -> Self {
        self.time_budget_ms = Some(budget_ms);
        self
    }

    /// # Errors
    /// Returns an error for zero sizes or rates outside [0, 1].
    pub fn check(&self) -> Result<()> {
        for (name, value) in [
            ("top_n", self.top_n),
            ("beam_width", self.beam_width),
            ("expansion_width", self.expansion_width),
            ("population", self.population),
            ("generations", self.generations),
        ] {
            if value == 0 {
                return Err(ParlayError::parameter(name, "must be at least 1"));
            }
        }
        for (name, value) in [
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParlayError::parameter(name, format!("{value} outside [0, 1]")));
            }
        }
        if self.elite >= self.population {
            return Err(ParlayError::parameter(
                "elite",
                format!("{} must be smaller than population {}", self.elite, self.population),
            ));
        }
        Ok(())
    }
}

/// Allocation strategy as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    #[default]
    Independent,
    Scaled,
    PriorityOrdered,
}

impl FromStr for AllocationMode {
    type Err = ParlayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "independent" => Ok(Self::Independent),
            "scaled" => Ok(Self::Scaled),
            "priority" | "priority_ordered" => Ok(Self::PriorityOrdered),
            other => Err(ParlayError::parameter(
                "allocation",
                format!("unknown allocation strategy '{other}'"),
            )),
        }
    }
}

/// Stake sizing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KellySettings {
    pub fraction: Decimal,
    pub min_stake: Decimal,
    pub max_stake: Decimal,
    pub max_bankroll_fraction: Decimal,
    /// Cap on the summed stake for [`AllocationMode::Scaled`].
    pub total_fraction_cap: Decimal,
    pub allocation: AllocationMode,
}

impl Default for KellySettings {
    fn default() -> Self {
        let bounds = StakeBounds::default();
        Self {
            fraction: Decimal::new(25, 2),
            min_stake: bounds.min_stake,
            max_stake: bounds.max_stake,
            max_bankroll_fraction: bounds.max_bankroll_fraction,
            total_fraction_cap: Decimal::new(25, 2),
            allocation: AllocationMode::Independent,
        }
    }
}

impl KellySettings {
    #[must_use]
    pub fn bounds(&self) -> StakeBounds {
        StakeBounds {
            min_stake: self.min_stake,
            max_stake: self.max_stake,
            max_bankroll_fraction: self.max_bankroll_fraction,
        }
    }

    #[must_use]
    pub fn calculator(&self) -> KellyCriterionCalculator {
        KellyCriterionCalculator::new(self.fraction, self.bounds())
    }

    #[must_use]
    pub fn strategy(&self) -> AllocationStrategy {
        match self.allocation {
            AllocationMode::Independent => AllocationStrategy::Independent,
            AllocationMode::Scaled => AllocationStrategy::Scaled {
                max_total_fraction: self.total_fraction_cap,
            },
            AllocationMode::PriorityOrdered => AllocationStrategy::PriorityOrdered,
        }
    }

    /// # Errors
    /// Returns an error for fractions outside (0, 1] or inverted stake bounds.
    pub fn check(&self) -> Result<()> {
        for (name, value) in [
            ("fraction", self.fraction),
            ("max_bankroll_fraction", self.max_bankroll_fraction),
            ("total_fraction_cap", self.total_fraction_cap),
        ] {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(ParlayError::parameter(name, format!("{value} outside (0, 1]")));
            }
        }
        if self.min_stake < Decimal::ZERO || self.min_stake > self.max_stake {
            return Err(ParlayError::parameter(
                "min_stake",
                format!("stake range [{}, {}] is invalid", self.min_stake, self.max_stake),
            ));
        }
        Ok(())
    }
}

/// Risk mode plus optional overrides of individual constraint fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    pub mode: RiskMode,
    pub min_legs: Option<usize>,
    pub max_legs: Option<usize>,
    pub max_correlation: Option<f64>,
    pub max_subject_exposure: Option<usize>,
    pub max_team_exposure: Option<usize>,
    pub max_game_exposure: Option<usize>,
    pub min_edge: Option<f64>,
    pub min_confidence: Option<f64>,
    pub correlation_penalty: Option<f64>,
    pub diversity_bonus: Option<f64>,
    /// Replaces the default blocked category pairs when set.
    pub blocked_pairs: Option<Vec<CategoryPair>>,
    pub exempt_subjects: Vec<String>,
}

impl RiskSettings {
    /// Expands the mode preset and applies overrides.
    ///
    /// # Errors
    /// Returns an error if the resulting constraints are inconsistent.
    pub fn to_constraints(&self) -> Result<Constraints> {
        let mut c = Constraints::for_mode(self.mode);
        if let Some(v) = self.min_legs {
            c.min_legs = v;
        }
        if let Some(v) = self.max_legs {
            c.max_legs = v;
        }
        if let Some(v) = self.max_correlation {
            c.max_correlation = v;
        }
        if let Some(v) = self.max_subject_exposure {
            c.max_subject_exposure = v;
        }
        if let Some(v) = self.max_team_exposure {
            c.max_team_exposure = v;
        }
        if let Some(v) = self.max_game_exposure {
            c.max_game_exposure = v;
        }
        if let Some(v) = self.min_edge {
            c.min_edge = v;
        }
        if let Some(v) = self.min_confidence {
            c.min_confidence = v;
        }
        if let Some(v) = self.correlation_penalty {
            c.correlation_penalty = v;
        }
        if let Some(v) = self.diversity_bonus {
            c.diversity_bonus = v;
        }
        if let Some(pairs) = &self.blocked_pairs {
            c.blocked_pairs = pairs.iter().cloned().collect::<BTreeSet<_>>();
        }
        c.exempt_subjects.extend(self.exempt_subjects.iter().cloned());
        c.check()?;
        Ok(c)
    }
}
