//! Risk modes and the constraint sets they expand to.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParlayError, Result};

/// Named risk preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskMode {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl fmt::Display for RiskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Moderate => write!(f, "moderate"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

impl FromStr for RiskMode {
    type Err = ParlayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "conservative" | "low" => Ok(Self::Conservative),
            "moderate" | "medium" => Ok(Self::Moderate),
            "aggressive" | "high" => Ok(Self::Aggressive),
            other => Err(ParlayError::parameter(
                "risk_mode",
                format!("unknown risk mode '{other}'"),
            )),
        }
    }
}

/// Unordered pair of stat categories that may not be combined for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct CategoryPair(String, String);

impl CategoryPair {
    /// Creates a pair; order and case do not matter.
    pub fn new(a: impl AsRef<str>, b: impl AsRef<str>) -> Self {
        let a = a.as_ref().trim().to_lowercase();
        let b = b.as_ref().trim().to_lowercase();
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// True if this pair is `{a, b}` in either order.
    #[must_use]
    pub fn matches(&self, a: &str, b: &str) -> bool {
        (self.0 == a && self.1 == b) || (self.0 == b && self.1 == a)
    }
}

impl From<(String, String)> for CategoryPair {
    fn from((a, b): (String, String)) -> Self {
        Self::new(a, b)
    }
}

impl From<CategoryPair> for (String, String) {
    fn from(pair: CategoryPair) -> Self {
        (pair.0, pair.1)
    }
}

impl fmt::Display for CategoryPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.0, self.1)
    }
}

/// Category pairs that are mechanically dependent for a single subject.
#[must_use]
pub fn default_blocked_pairs() -> BTreeSet<CategoryPair> {
    [
        ("points", "points_rebounds_assists"),
        ("rebounds", "points_rebounds_assists"),
        ("assists", "points_rebounds_assists"),
        ("points", "points_rebounds"),
        ("points", "points_assists"),
        ("passing_yards", "completions"),
        ("passing_yards", "passing_touchdowns"),
        ("receiving_yards", "receptions"),
        ("rushing_yards", "rushing_attempts"),
        ("hits", "total_bases"),
        ("strikeouts", "pitching_outs"),
    ]
    .into_iter()
    .map(|(a, b)| CategoryPair::new(a, b))
    .collect()
}

/// Hard and soft limits applied to a slip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub mode: RiskMode,
    pub min_legs: usize,
    pub max_legs: usize,
    /// Largest pairwise correlation allowed between two included legs.
    pub max_correlation: f64,
    pub max_subject_exposure: usize,
    pub max_team_exposure: usize,
    pub max_game_exposure: usize,
    /// Minimum simulated expected value per unit stake.
    pub min_edge: f64,
    /// Minimum mean prediction confidence.
    pub min_confidence: f64,
    pub blocked_pairs: BTreeSet<CategoryPair>,
    /// Subjects for which blocked pairs are explicitly allowed.
    #[serde(default)]
    pub exempt_subjects: BTreeSet<String>,
    /// λ: weight of Σ|ρ| in the objective.
    pub correlation_penalty: f64,
    /// μ: weight of the diversity score in the objective.
    pub diversity_bonus: f64,
}

impl Constraints {
    /// Expands a risk mode into its preset constraint set.
    #[must_use]
    pub fn for_mode(mode: RiskMode) -> Self {
        let (max_legs, max_correlation, min_edge, lambda) = match mode {
            RiskMode::Conservative => (4, 0.15, 0.15, 0.30),
            RiskMode::Moderate => (6, 0.30, 0.10, 0.15),
            RiskMode::Aggressive => (8, 0.50, 0.05, 0.05),
        };
        let (subject, team, game, min_confidence) = match mode {
            RiskMode::Conservative => (1, 2, 2, 0.65),
            RiskMode::Moderate => (2, 3, 3, 0.55),
            RiskMode::Aggressive => (3, 4, 4, 0.45),
        };
        Self {
            mode,
            min_legs: 2,
            max_legs,
            max_correlation,
            max_subject_exposure: subject,
            max_team_exposure: team,
            max_game_exposure: game,
            min_edge,
            min_confidence,
            blocked_pairs: default_blocked_pairs(),
            exempt_subjects: BTreeSet::new(),
            correlation_penalty: lambda,
            diversity_bonus: 0.05,
        }
    }

    #[must_use]
    pub fn conservative() -> Self {
        Self::for_mode(RiskMode::Conservative)
    }

    #[must_use]
    pub fn moderate() -> Self {
        Self::for_mode(RiskMode::Moderate)
    }

    #[must_use]
    pub fn aggressive() -> Self {
        Self::for_mode(RiskMode::Aggressive)
    }

    /// Sets the leg-count bounds.
    #[must_use]
    pub fn with_leg_range(mut self, min_legs: usize, max_legs: usize) -> Self {
        self.min_legs = min_legs;
        self.max_legs = max_legs;
        self
    }

    /// Sets the minimum expected value.
    #[must_use]
    pub fn with_min_edge(mut self, min_edge: f64) -> Self {
        self.min_edge = min_edge;
        self
    }

    /// Sets the minimum mean confidence.
    #[must_use]
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Sets the maximum pairwise correlation.
    #[must_use]
    pub fn with_max_correlation(mut self, max_correlation: f64) -> Self {
        self.max_correlation = max_correlation;
        self
    }

    /// Sets all three exposure caps.
    #[must_use]
    pub fn with_exposure(mut self, subject: usize, team: usize, game: usize) -> Self {
        self.max_subject_exposure = subject;
        self.max_team_exposure = team;
        self.max_game_exposure = game;
        self
    }

    /// Allows blocked category pairs for `subject`.
    #[must_use]
    pub fn exempt_subject(mut self, subject: impl Into<String>) -> Self {
        self.exempt_subjects.insert(subject.into());
        self
    }

    /// True if `{a, b}` may not be combined for `subject`.
    #[must_use]
    pub fn is_blocked(&self, subject: &str, a: &str, b: &str) -> bool {
        !self.exempt_subjects.contains(subject) && self.blocked_pairs.iter().any(|p| p.matches(a, b))
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    /// Returns [`ParlayError::InvalidParameter`] for an empty or inverted leg
    /// range, out-of-range thresholds, or negative weights.
    pub fn check(&self) -> Result<()> {
        if self.min_legs == 0 || self.min_legs > self.max_legs {
            return Err(ParlayError::parameter(
                "min_legs",
                format!(
                    "leg range [{}, {}] is empty or starts at zero",
                    self.min_legs, self.max_legs
                ),
            ));
        }
        if !(-1.0..=1.0).contains(&self.max_correlation) {
            return Err(ParlayError::parameter(
                "max_correlation",
                format!("{} outside [-1, 1]", self.max_correlation),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ParlayError::parameter(
                "min_confidence",
                format!("{} outside [0, 1]", self.min_confidence),
            ));
        }
        if self.correlation_penalty < 0.0 || self.diversity_bonus < 0.0 {
            return Err(ParlayError::parameter(
                "weights",
                "correlation penalty and diversity bonus must be non-negative",
            ));
        }
        Ok(())
    }
}

impl Default for Constraints {
    fn default() -> Self {
        Self::for_mode(RiskMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_reference_table() {
        let c = Constraints::conservative();
        assert_eq!((c.min_legs, c.max_legs), (2, 4));
        assert!((c.max_correlation - 0.15).abs() < 1e-12);
        assert!((c.min_edge - 0.15).abs() < 1e-12);
        assert!((c.correlation_penalty - 0.30).abs() < 1e-12);

        let m = Constraints::moderate();
        assert_eq!((m.min_legs, m.max_legs), (2, 6));
        assert!((m.max_correlation - 0.30).abs() < 1e-12);
        assert!((m.min_edge - 0.10).abs() < 1e-12);
        assert!((m.correlation_penalty - 0.15).abs() < 1e-12);

        let a = Constraints::aggressive();
        assert_eq!((a.min_legs, a.max_legs), (2, 8));
        assert!((a.max_correlation - 0.50).abs() < 1e-12);
        assert!((a.min_edge - 0.05).abs() < 1e-12);
        assert!((a.correlation_penalty - 0.05).abs() < 1e-12);

        for c in [c, m, a] {
            assert!((c.diversity_bonus - 0.05).abs() < 1e-12);
            assert!(c.check().is_ok());
        }
    }

    #[test]
    fn risk_mode_parses() {
        assert_eq!("Aggressive".parse::<RiskMode>().unwrap(), RiskMode::Aggressive);
        assert_eq!("low".parse::<RiskMode>().unwrap(), RiskMode::Conservative);
        assert!("yolo".parse::<RiskMode>().is_err());
    }

    #[test]
    fn category_pair_is_unordered() {
        let p = CategoryPair::new("Rebounds", "points");
        assert_eq!(p, CategoryPair::new("points", "rebounds"));
        assert!(p.matches("rebounds", "points"));
        assert!(!p.matches("rebounds", "assists"));
    }

    #[test]
    fn exempt_subject_bypasses_block() {
        let c = Constraints::moderate().exempt_subject("lebron");
        assert!(c.is_blocked("curry", "points", "points_rebounds_assists"));
        assert!(!c.is_blocked("lebron", "points", "points_rebounds_assists"));
    }

    #[test]
    fn check_rejects_inverted_range() {
        assert!(Constraints::moderate().with_leg_range(5, 3).check().is_err());
        assert!(Constraints::moderate().with_leg_range(0, 3).check().is_err());
    }

    #[test]
    fn serde_round_trip() {
        let c = Constraints::aggressive().exempt_subject("x");
        let json = serde_json::to_string(&c).unwrap();
        let back: Constraints = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
