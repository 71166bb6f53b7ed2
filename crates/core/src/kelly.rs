//! Kelly Criterion stake sizing for parlay slips.
//!
//! Converts a slip's win probability and payout multiplier into a bounded
//! stake, for a single slip or for several slips sharing one bankroll.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Practical bounds applied after fractional Kelly scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StakeBounds {
    /// Smallest stake worth placing.
    pub min_stake: Decimal,
    /// Largest stake in absolute terms.
    pub max_stake: Decimal,
    /// Largest stake as a fraction of bankroll.
    pub max_bankroll_fraction: Decimal,
}

impl Default for StakeBounds {
    fn default() -> Self {
        Self {
            min_stake: Decimal::ONE,                    // $1
            max_stake: Decimal::new(1000, 0),           // $1000
            max_bankroll_fraction: Decimal::new(10, 2), // 10%
        }
    }
}

/// Which Kelly formula produced the raw fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KellyMethod {
    /// `f* = (p·b − q) / b`
    Classic,
    /// `f* = edge / variance`, using a simulated variance.
    Variance,
}

/// Why a stake was or was not recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingReason {
    /// Positive edge, stake recommended.
    PositiveEdge,
    /// `p·m == 1`.
    NoEdge,
    /// `p·m < 1`.
    NegativeEdge,
    /// Probability, payout or bankroll out of range.
    InvalidInputs,
    /// Nothing left to allocate (priority-ordered allocation).
    BankrollExhausted,
}

/// Result of Kelly stake sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyResult {
    /// Recommended stake after fractional scaling and clamping.
    pub stake: Decimal,
    /// Raw (full, unclamped) Kelly fraction; may be negative.
    pub raw_fraction: Decimal,
    /// `max(raw, 0) × kelly_fraction`, before clamping.
    pub used_fraction: Decimal,
    /// Expected net return per unit stake, `p·m − 1`.
    pub expected_value: Decimal,
    /// True if any bound changed the stake.
    pub clamped: bool,
    pub method: KellyMethod,
    pub reason: SizingReason,
}

impl KellyResult {
    fn no_bet(raw_fraction: Decimal, expected_value: Decimal, method: KellyMethod, reason: SizingReason) -> Self {
        Self {
            stake: Decimal::ZERO,
            raw_fraction,
            used_fraction: Decimal::ZERO,
            expected_value,
            clamped: false,
            method,
            reason,
        }
    }

    /// True if a positive stake is recommended.
    #[must_use]
    pub fn should_bet(&self) -> bool {
        self.stake > Decimal::ZERO
    }
}

/// One slip to be sized as part of a multi-bet allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRequest {
    pub id: String,
    pub win_probability: f64,
    pub payout_multiplier: f64,
    /// Simulated variance of net return, if available.
    pub variance: Option<f64>,
}

impl BetRequest {
    #[must_use]
    pub fn new(id: impl Into<String>, win_probability: f64, payout_multiplier: f64) -> Self {
        Self {
            id: id.into(),
            win_probability,
            payout_multiplier,
            variance: None,
        }
    }

    /// Attaches a simulated variance, switching sizing to the variance formula.
    #[must_use]
    pub fn with_variance(mut self, variance: f64) -> Self {
        self.variance = Some(variance);
        self
    }

    /// Expected net return per unit stake.
    #[must_use]
    pub fn expected_value(&self) -> f64 {
        self.win_probability * self.payout_multiplier - 1.0
    }
}

/// How several slips share one bankroll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Each slip sized as if it were the only bet.
    Independent,
    /// Independent stakes, rescaled so their sum stays within
    /// `bankroll × max_total_fraction`. Rescaling can take a stake below
    /// `min_stake`.
    Scaled { max_total_fraction: Decimal },
    /// Slips ranked by expected value and sized one after another against
    /// the bankroll that remains.
    PriorityOrdered,
}

/// Stake for one slip of a multi-bet allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: String,
    pub result: KellyResult,
}

/// Fractional Kelly stake calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellyCriterionCalculator {
    /// Fraction of Kelly to use (0.25 = quarter Kelly).
    pub fraction: Decimal,
    pub bounds: StakeBounds,
}

impl Default for KellyCriterionCalculator {
    fn default() -> Self {
        Self {
            fraction: Decimal::new(25, 2), // 0.25 (quarter Kelly)
            bounds: StakeBounds::default(),
        }
    }
}

impl KellyCriterionCalculator {
    /// Creates a calculator with a custom fraction and bounds.
    #[must_use]
    pub fn new(fraction: Decimal, bounds: StakeBounds) -> Self {
        Self { fraction, bounds }
    }

    /// Sizes a stake with the classic Kelly formula.
    ///
    /// # Arguments
    /// * `win_probability` - Probability the slip wins, in [0, 1]
    /// * `payout_multiplier` - Gross payout per unit staked, > 1
    /// * `bankroll` - Bankroll to size against, > 0
    ///
    /// # Examples
    /// ```
    /// use parlay_core::kelly::KellyCriterionCalculator;
    /// use rust_decimal_macros::dec;
    ///
    /// let calc = KellyCriterionCalculator::default();
    /// let result = calc.size(0.55, 2.0, dec!(1000));
    ///
    /// // f* = (0.55·1 − 0.45) / 1 = 0.10; quarter Kelly = 0.025
    /// assert_eq!(result.stake, dec!(25));
    /// assert!(!result.clamped);
    /// ```
    #[must_use]
    pub fn size(&self, win_probability: f64, payout_multiplier: f64, bankroll: Decimal) -> KellyResult {
        self.size_inner(win_probability, payout_multiplier, None, bankroll)
    }

    /// Sizes a stake with `f* = edge / variance`, using a simulated variance
    /// of net return. Falls back to the classic formula if `variance` is not
    /// positive and finite.
    #[must_use]
    pub fn size_with_variance(
        &self,
        win_probability: f64,
        payout_multiplier: f64,
        variance: f64,
        bankroll: Decimal,
    ) -> KellyResult {
        self.size_inner(win_probability, payout_multiplier, Some(variance), bankroll)
    }

    fn size_inner(
        &self,
        win_probability: f64,
        payout_multiplier: f64,
        variance: Option<f64>,
        bankroll: Decimal,
    ) -> KellyResult {
        let variance = variance.filter(|v| v.is_finite() && *v > 0.0);
        let method = if variance.is_some() {
            KellyMethod::Variance
        } else {
            KellyMethod::Classic
        };

        let inputs = (
            Decimal::try_from(win_probability),
            Decimal::try_from(payout_multiplier),
        );
        let (Ok(p), Ok(m)) = inputs else {
            return KellyResult::no_bet(Decimal::ZERO, Decimal::ZERO, method, SizingReason::InvalidInputs);
        };
        if p < Decimal::ZERO || p > Decimal::ONE || m <= Decimal::ONE || bankroll <= Decimal::ZERO {
            return KellyResult::no_bet(Decimal::ZERO, Decimal::ZERO, method, SizingReason::InvalidInputs);
        }
        if !self.is_well_formed() {
            return KellyResult::no_bet(Decimal::ZERO, Decimal::ZERO, method, SizingReason::InvalidInputs);
        }

        // b = net odds, q = loss probability
        let b = m - Decimal::ONE;
        let q = Decimal::ONE - p;
        let expected_value = p * m - Decimal::ONE;

        let raw_fraction = match variance.and_then(|v| Decimal::try_from(v).ok()) {
            Some(v) if v > Decimal::ZERO => expected_value / v,
            _ => (p * b - q) / b,
        };

        if expected_value == Decimal::ZERO {
            return KellyResult::no_bet(raw_fraction, expected_value, method, SizingReason::NoEdge);
        }
        if expected_value < Decimal::ZERO || raw_fraction <= Decimal::ZERO {
            return KellyResult::no_bet(raw_fraction, expected_value, method, SizingReason::NegativeEdge);
        }

        let used_fraction = raw_fraction * self.fraction;
        let unclamped = bankroll * used_fraction;
        let stake = self.clamp(unclamped, bankroll);

        KellyResult {
            stake: stake.round_dp(2),
            raw_fraction,
            used_fraction,
            expected_value,
            clamped: stake != unclamped,
            method,
            reason: SizingReason::PositiveEdge,
        }
    }

    /// Fraction and max bankroll fraction in (0, 1], stake range non-negative
    /// and ordered.
    fn is_well_formed(&self) -> bool {
        let unit = |v: Decimal| v > Decimal::ZERO && v <= Decimal::ONE;
        unit(self.fraction)
            && unit(self.bounds.max_bankroll_fraction)
            && self.bounds.min_stake >= Decimal::ZERO
            && self.bounds.min_stake <= self.bounds.max_stake
    }

    fn clamp(&self, stake: Decimal, bankroll: Decimal) -> Decimal {
        let cap = (bankroll * self.bounds.max_bankroll_fraction).min(self.bounds.max_stake);
        stake.max(self.bounds.min_stake).min(cap).max(Decimal::ZERO)
    }

    /// Sizes several slips from one bankroll.
    ///
    /// Results come back in input order, except for
    /// [`AllocationStrategy::PriorityOrdered`], which returns them in the
    /// order they were sized (expected value descending).
    #[must_use]
    pub fn allocate(
        &self,
        bets: &[BetRequest],
        bankroll: Decimal,
        strategy: AllocationStrategy,
    ) -> Vec<Allocation> {
        match strategy {
            AllocationStrategy::Independent => bets
                .iter()
                .map(|bet| Allocation {
                    id: bet.id.clone(),
                    result: self.size_request(bet, bankroll),
                })
                .collect(),
            AllocationStrategy::Scaled { max_total_fraction } => {
                let mut allocations = self.allocate(bets, bankroll, AllocationStrategy::Independent);
                let total: Decimal = allocations.iter().map(|a| a.result.stake).sum();
                let cap = bankroll * max_total_fraction;
                if total > cap && total > Decimal::ZERO {
                    let scale = cap / total;
                    for allocation in &mut allocations {
                        if allocation.result.stake > Decimal::ZERO {
                            // Round down so the rescaled total never exceeds the cap.
                            allocation.result.stake = (allocation.result.stake * scale)
                                .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::ToZero);
                            allocation.result.clamped = true;
                        }
                    }
                }
                allocations
            }
            AllocationStrategy::PriorityOrdered => {
                let mut ordered: Vec<&BetRequest> = bets.iter().collect();
                ordered.sort_by(|a, b| b.expected_value().total_cmp(&a.expected_value()));

                let mut remaining = bankroll;
                ordered
                    .into_iter()
                    .map(|bet| {
                        let result = if remaining <= Decimal::ZERO {
                            KellyResult::no_bet(
                                Decimal::ZERO,
                                Decimal::try_from(bet.expected_value()).unwrap_or_default(),
                                KellyMethod::Classic,
                                SizingReason::BankrollExhausted,
                            )
                        } else {
                            let mut result = self.size_request(bet, remaining);
                            if result.stake > remaining {
                                result.stake = remaining;
                                result.clamped = true;
                            }
                            remaining -= result.stake;
                            result
                        };
                        Allocation {
                            id: bet.id.clone(),
                            result,
                        }
                    })
                    .collect()
            }
        }
    }

    fn size_request(&self, bet: &BetRequest, bankroll: Decimal) -> KellyResult {
        match bet.variance {
            Some(v) => self.size_with_variance(bet.win_probability, bet.payout_multiplier, v, bankroll),
            None => self.size(bet.win_probability, bet.payout_multiplier, bankroll),
        }
    }
}

/// Sizes a single stake without constructing a calculator first.
#[must_use]
pub fn size_stake(
    win_probability: f64,
    payout_multiplier: f64,
    bankroll: Decimal,
    kelly_fraction: Decimal,
    bounds: StakeBounds,
) -> KellyResult {
    KellyCriterionCalculator::new(kelly_fraction, bounds).size(win_probability, payout_multiplier, bankroll)
}
