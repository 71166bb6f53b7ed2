//! Leg definitions: the individually wagerable propositions a slip is built from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParlayError, Result};

/// Identifier of a leg, unique within a pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegId(String);

impl LegId {
    /// Creates a leg id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LegId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for LegId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Side of the line a leg is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Stat finishes above the line.
    Over,
    /// Stat finishes below the line.
    Under,
    /// Proposition resolves true.
    Yes,
    /// Proposition resolves false.
    No,
}

impl Direction {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Over => Self::Under,
            Self::Under => Self::Over,
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Over => write!(f, "over"),
            Self::Under => write!(f, "under"),
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
        }
    }
}

impl FromStr for Direction {
    type Err = ParlayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "over" | "o" | "more" => Ok(Self::Over),
            "under" | "u" | "less" => Ok(Self::Under),
            "yes" | "y" => Ok(Self::Yes),
            "no" | "n" => Ok(Self::No),
            other => Err(ParlayError::parameter(
                "direction",
                format!("unrecognised direction '{other}'"),
            )),
        }
    }
}

/// Offered payout odds for a leg.
///
/// Decimal odds are the gross payout multiplier per unit staked (2.50 returns
/// 2.50 including the stake). American odds follow the usual convention:
/// `+150` wins 150 per 100 staked, `-110` needs 110 staked to win 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "value", rename_all = "lowercase")]
pub enum Odds {
    /// Gross payout multiplier, strictly greater than 1.
    Decimal(f64),
    /// American moneyline, magnitude at least 100.
    American(i32),
}

impl Odds {
    /// Checks that the odds describe a positive net payout.
    ///
    /// # Errors
    /// Returns [`ParlayError::InvalidOdds`] for decimal odds `<= 1` or
    /// non-finite, and for American odds with magnitude below 100.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Decimal(m) if !m.is_finite() || m <= 1.0 => Err(ParlayError::InvalidOdds(
                format!("decimal odds must be > 1.0, got {m}"),
            )),
            Self::American(a) if a.abs() < 100 => Err(ParlayError::InvalidOdds(format!(
                "american odds must have magnitude >= 100, got {a}"
            ))),
            _ => Ok(()),
        }
    }

    /// Gross payout multiplier per unit staked.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        match *self {
            Self::Decimal(m) => m,
            Self::American(a) if a > 0 => 1.0 + f64::from(a) / 100.0,
            Self::American(a) => 1.0 + 100.0 / f64::from(a.abs()),
        }
    }

    /// Break-even probability implied by the odds (no vig removal).
    #[must_use]
    pub fn implied_probability(&self) -> f64 {
        1.0 / self.multiplier()
    }
}

impl FromStr for Odds {
    type Err = ParlayError;

    /// Parses `+150` / `-110` as American odds and anything else as decimal.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let odds = if s.starts_with('+') || s.starts_with('-') {
            let value: i32 = s
                .parse()
                .map_err(|_| ParlayError::InvalidOdds(format!("cannot parse '{s}'")))?;
            Self::American(value)
        } else {
            let value: f64 = s
                .parse()
                .map_err(|_| ParlayError::InvalidOdds(format!("cannot parse '{s}'")))?;
            Self::Decimal(value)
        };
        odds.validate()?;
        Ok(odds)
    }
}

/// Unvalidated leg description, as read from a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegSpec {
    pub id: String,
    pub subject_id: String,
    pub category: String,
    pub line: f64,
    pub direction: Direction,
    pub odds: Odds,
    pub game_id: String,
    pub team_id: String,
}

/// A validated, immutable leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LegSpec", into = "LegSpec")]
pub struct Leg {
    id: LegId,
    subject_id: String,
    category: String,
    line: f64,
    direction: Direction,
    odds: Odds,
    game_id: String,
    team_id: String,
}

impl Leg {
    /// Accessor for the leg id.
    #[must_use]
    pub fn id(&self) -> &LegId {
        &self.id
    }

    /// Subject (usually a player) the proposition is about.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Stat category, normalised to lowercase.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn line(&self) -> f64 {
        self.line
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn odds(&self) -> Odds {
        self.odds
    }

    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    #[must_use]
    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    /// Gross payout multiplier of the leg on its own.
    #[must_use]
    pub fn payout_multiplier(&self) -> f64 {
        self.odds.multiplier()
    }
}

impl TryFrom<LegSpec> for Leg {
    type Error = ParlayError;

    fn try_from(spec: LegSpec) -> Result<Self> {
        if spec.id.trim().is_empty() {
            return Err(ParlayError::parameter("id", "leg id must not be empty"));
        }
        if !spec.line.is_finite() {
            return Err(ParlayError::parameter(
                "line",
                format!("line for leg {} must be finite", spec.id),
            ));
        }
        spec.odds.validate()?;

        Ok(Self {
            id: LegId::new(spec.id.trim()),
            subject_id: spec.subject_id.trim().to_string(),
            category: spec.category.trim().to_lowercase(),
            line: spec.line,
            direction: spec.direction,
            odds: spec.odds,
            game_id: spec.game_id.trim().to_string(),
            team_id: spec.team_id.trim().to_string(),
        })
    }
}

impl From<Leg> for LegSpec {
    fn from(leg: Leg) -> Self {
        Self {
            id: leg.id.0,
            subject_id: leg.subject_id,
            category: leg.category,
            line: leg.line,
            direction: leg.direction,
            odds: leg.odds,
            game_id: leg.game_id,
            team_id: leg.team_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str) -> LegSpec {
        LegSpec {
            id: id.to_string(),
            subject_id: "player-1".to_string(),
            category: "Points".to_string(),
            line: 24.5,
            direction: Direction::Over,
            odds: Odds::Decimal(1.91),
            game_id: "game-1".to_string(),
            team_id: "team-1".to_string(),
        }
    }

    // ============================================
    // Odds Tests
    // ============================================

    #[test]
    fn american_plus_odds_convert_to_multiplier() {
        assert!((Odds::American(150).multiplier() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn american_minus_odds_convert_to_multiplier() {
        let m = Odds::American(-110).multiplier();
        assert!((m - (1.0 + 100.0 / 110.0)).abs() < 1e-12);
    }

    #[test]
    fn implied_probability_is_inverse_multiplier() {
        assert!((Odds::Decimal(2.0).implied_probability() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn decimal_odds_at_or_below_one_rejected() {
        assert!(Odds::Decimal(1.0).validate().is_err());
        assert!(Odds::Decimal(0.5).validate().is_err());
        assert!(Odds::Decimal(f64::NAN).validate().is_err());
    }

    #[test]
    fn american_odds_below_100_rejected() {
        assert!(Odds::American(99).validate().is_err());
        assert!(Odds::American(-50).validate().is_err());
    }

    #[test]
    fn odds_parse_signed_as_american() {
        assert_eq!("+120".parse::<Odds>().unwrap(), Odds::American(120));
        assert_eq!("-150".parse::<Odds>().unwrap(), Odds::American(-150));
        assert_eq!("1.85".parse::<Odds>().unwrap(), Odds::Decimal(1.85));
        assert!("abc".parse::<Odds>().is_err());
    }

    // ============================================
    // Leg Construction Tests
    // ============================================

    #[test]
    fn leg_normalises_category() {
        let leg = Leg::try_from(spec("a")).unwrap();
        assert_eq!(leg.category(), "points");
        assert_eq!(leg.id().as_str(), "a");
    }

    #[test]
    fn leg_rejects_empty_id() {
        assert!(Leg::try_from(spec("  ")).is_err());
    }

    #[test]
    fn leg_rejects_invalid_odds() {
        let mut s = spec("a");
        s.odds = Odds::Decimal(0.9);
        assert!(matches!(Leg::try_from(s), Err(ParlayError::InvalidOdds(_))));
    }

    #[test]
    fn leg_deserializes_through_validation() {
        let json = r#"{"id":"a","subject_id":"p","category":"Rebounds","line":8.5,
            "direction":"under","odds":{"format":"american","value":-120},
            "game_id":"g","team_id":"t"}"#;
        let leg: Leg = serde_json::from_str(json).unwrap();
        assert_eq!(leg.direction(), Direction::Under);
        assert_eq!(leg.category(), "rebounds");

        let bad = json.replace("-120", "-20");
        assert!(serde_json::from_str::<Leg>(&bad).is_err());
    }

    #[test]
    fn direction_parses_aliases() {
        assert_eq!("O".parse::<Direction>().unwrap(), Direction::Over);
        assert_eq!("less".parse::<Direction>().unwrap(), Direction::Under);
        assert_eq!(Direction::Yes.opposite(), Direction::No);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
