//! Net-return distribution of an all-or-nothing slip.
//!
//! Per unit stake a slip either returns `payout − 1` or loses 1, so the
//! simulated distribution is fully described by its win frequency. Percentiles
//! use the same nearest-rank convention as a sorted sample.

use serde::{Deserialize, Serialize};

/// Tail probability for VaR and CVaR.
pub const TAIL: f64 = 0.05;

/// Net-return percentiles per unit stake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileLadder {
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Two-point distribution of net return: `−1` with probability `1 − p`,
/// `payout − 1` with probability `p`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnDistribution {
    win_probability: f64,
    payout_multiplier: f64,
}

impl ReturnDistribution {
    #[must_use]
    pub fn new(win_probability: f64, payout_multiplier: f64) -> Self {
        Self {
            win_probability: win_probability.clamp(0.0, 1.0),
            payout_multiplier,
        }
    }

    fn gain(&self) -> f64 {
        self.payout_multiplier - 1.0
    }

    /// `p·(m − 1) − (1 − p)`.
    #[must_use]
    pub fn expected_value(&self) -> f64 {
        let p = self.win_probability;
        p * self.gain() - (1.0 - p)
    }

    /// `p·(1 − p)·m²`.
    #[must_use]
    pub fn variance(&self) -> f64 {
        let p = self.win_probability;
        p * (1.0 - p) * self.payout_multiplier * self.payout_multiplier
    }

    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Net return at quantile `q`: the loss while `q` is inside the losing
    /// mass `1 − p`, the gain above it.
    #[must_use]
    pub fn percentile(&self, q: f64) -> f64 {
        if q < 1.0 - self.win_probability {
            -1.0
        } else {
            self.gain()
        }
    }

    #[must_use]
    pub fn ladder(&self) -> PercentileLadder {
        PercentileLadder {
            p5: self.percentile(0.05),
            p25: self.percentile(0.25),
            p50: self.percentile(0.50),
            p75: self.percentile(0.75),
            p95: self.percentile(0.95),
            p99: self.percentile(0.99),
        }
    }

    /// 95% value-at-risk as a positive loss per unit stake; 0 when even the
    /// 5th percentile is a win.
    #[must_use]
    pub fn value_at_risk(&self) -> f64 {
        (-self.percentile(TAIL)).max(0.0)
    }

    /// Mean loss over the worst 5% of outcomes, floored at 0.
    #[must_use]
    pub fn conditional_value_at_risk(&self) -> f64 {
        let loss_mass = (1.0 - self.win_probability).min(TAIL);
        let gain_mass = TAIL - loss_mass;
        ((loss_mass - gain_mass * self.gain()) / TAIL).max(0.0)
    }
}
