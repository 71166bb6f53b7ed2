//! Per-leg predictions supplied by the upstream model.

use serde::{Deserialize, Serialize};

use crate::error::{ParlayError, Result};
use crate::leg::Odds;

/// Model output for a single leg: win probability and confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPrediction")]
pub struct Prediction {
    probability: f64,
    confidence: f64,
}

#[derive(Deserialize)]
struct RawPrediction {
    probability: f64,
    confidence: f64,
}

impl TryFrom<RawPrediction> for Prediction {
    type Error = ParlayError;

    fn try_from(raw: RawPrediction) -> Result<Self> {
        Self::new(raw.probability, raw.confidence)
    }
}

impl Prediction {
    /// Creates a prediction.
    ///
    /// # Errors
    /// Returns an error if `probability` is not in the open interval (0, 1) or
    /// `confidence` is not in [0, 1].
    pub fn new(probability: f64, confidence: f64) -> Result<Self> {
        Self::for_leg("?", probability, confidence)
    }

    /// Creates a prediction, naming `leg_id` in any error.
    ///
    /// # Errors
    /// Same as [`Prediction::new`].
    pub fn for_leg(leg_id: &str, probability: f64, confidence: f64) -> Result<Self> {
        if !(probability > 0.0 && probability < 1.0) {
            return Err(ParlayError::InvalidProbability {
                leg_id: leg_id.to_string(),
                value: probability,
            });
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ParlayError::InvalidConfidence {
                leg_id: leg_id.to_string(),
                value: confidence,
            });
        }
        Ok(Self {
            probability,
            confidence,
        })
    }

    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Expected net return per unit staked on this leg alone: `p·m − 1`.
    #[must_use]
    pub fn edge(&self, odds: Odds) -> f64 {
        self.probability * odds.multiplier() - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_probability_bounds() {
        assert!(Prediction::new(0.0, 0.5).is_err());
        assert!(Prediction::new(1.0, 0.5).is_err());
        assert!(Prediction::new(f64::NAN, 0.5).is_err());
        assert!(Prediction::new(0.5, 0.5).is_ok());
    }

    #[test]
    fn rejects_confidence_bounds() {
        assert!(Prediction::new(0.5, -0.01).is_err());
        assert!(Prediction::new(0.5, 1.01).is_err());
        assert!(Prediction::new(0.5, 0.0).is_ok());
        assert!(Prediction::new(0.5, 1.0).is_ok());
    }

    #[test]
    fn error_names_the_leg() {
        let err = Prediction::for_leg("leg-7", 1.5, 0.5).unwrap_err();
        assert!(err.to_string().contains("leg-7"));
    }

    #[test]
    fn edge_against_decimal_odds() {
        let p = Prediction::new(0.55, 0.8).unwrap();
        assert!((p.edge(Odds::Decimal(2.0)) - 0.10).abs() < 1e-12);
    }

    #[test]
    fn deserialize_validates() {
        let ok: Prediction = serde_json::from_str(r#"{"probability":0.6,"confidence":0.7}"#).unwrap();
        assert!((ok.probability() - 0.6).abs() < 1e-12);
        assert!(serde_json::from_str::<Prediction>(r#"{"probability":1.2,"confidence":0.7}"#).is_err());
    }
}
