//! Error types for parlay optimization inputs.
//!
//! Only malformed input is an error. Infeasible requests, regularized
//! correlation matrices and exhausted time budgets are reported as typed
//! status on the respective results instead.

use thiserror::Error;

/// Errors raised when leg, prediction, or correlation data is malformed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParlayError {
    /// Win probability outside the open interval (0, 1).
    #[error("invalid probability for leg {leg_id}: {value} (must be in (0, 1))")]
    InvalidProbability {
        /// Leg the prediction belongs to.
        leg_id: String,
        /// Offending value.
        value: f64,
    },

    /// Confidence outside [0, 1].
    #[error("invalid confidence for leg {leg_id}: {value} (must be in [0, 1])")]
    InvalidConfidence {
        /// Leg the prediction belongs to.
        leg_id: String,
        /// Offending value.
        value: f64,
    },

    /// Correlation coefficient outside [-1, 1] or attached to a self-pair.
    #[error("invalid correlation between {a} and {b}: {value}")]
    InvalidCorrelation {
        /// First leg.
        a: String,
        /// Second leg.
        b: String,
        /// Offending value.
        value: f64,
    },

    /// Odds that do not describe a positive payout.
    #[error("invalid odds: {0}")]
    InvalidOdds(String),

    /// A slip or simulation request with no legs.
    #[error("slip must contain at least one leg")]
    EmptySlip,

    /// A referenced leg id is not part of the pool.
    #[error("unknown leg: {0}")]
    UnknownLeg(String),

    /// A leg has no matching prediction.
    #[error("missing prediction for leg: {0}")]
    MissingPrediction(String),

    /// The same leg id appears twice.
    #[error("duplicate leg: {0}")]
    DuplicateLeg(String),

    /// Any other out-of-range parameter (draw counts, bankroll, fractions).
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ParlayError {
    /// Shorthand for [`ParlayError::InvalidParameter`].
    pub fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result alias for fallible parlay operations.
pub type Result<T> = std::result::Result<T, ParlayError>;
