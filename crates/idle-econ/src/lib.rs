#![deny(warnings)]

//! Economy math for Forux Idle.
//!
//! This module provides validated utilities for:
//! - The compounding upgrade cost curve
//! - Meteor bonus rewards with a minimum floor
//! - Trading-station payouts and input parsing

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Expected, user-facing failures of guarded economy operations. These are
/// precondition checks surfaced as disabled controls or inline status text,
/// never faults.
#[derive(Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum EconError {
    /// A purchase or trade needs more dilithium than the wallet holds.
    #[error("insufficient dilithium: need {required}, have {available}")]
    InsufficientFunds {
        /// Cost of the attempted operation.
        required: u64,
        /// Current balance.
        available: u64,
    },
    /// A trade amount was non-numeric, zero, or negative.
    #[error("trade amount must be a positive whole number")]
    InvalidAmount,
    /// The exchange rate must be positive.
    #[error("trade rate must be positive")]
    InvalidRate,
    /// A purchase referenced an id outside the catalog.
    #[error("unknown upgrade: {0}")]
    UnknownUpgrade(String),
}

/// Cost of the next level after `level` purchases: floor(base × growth^level).
///
/// Evaluated exactly in decimal arithmetic and floored once, so the cost is
/// always derivable from the level alone. Saturates at `u64::MAX` once the
/// curve outgrows the representable range.
///
/// Example:
/// let growth = Decimal::new(115, 2); // 1.15
/// assert_eq!(upgrade_cost(50, growth, 0), 50);
/// assert_eq!(upgrade_cost(50, growth, 1), 57);
pub fn upgrade_cost(base_cost: u64, growth: Decimal, level: u32) -> u64 {
    let mut cost = Decimal::from(base_cost);
    for _ in 0..level {
        match cost.checked_mul(growth) {
            Some(next) => cost = next,
            None => return u64::MAX,
        }
    }
    cost.floor().to_u64().unwrap_or(u64::MAX)
}

/// Bonus paid out for catching a meteor: `passive_income × multiplier`,
/// floored at `min_reward` so the event stays worthwhile before any passive
/// upgrades compound.
///
/// Example:
/// assert_eq!(meteor_reward(6, 20, 10), 120);
/// assert_eq!(meteor_reward(0, 20, 10), 10);
pub fn meteor_reward(passive_income: u64, multiplier: u64, min_reward: u64) -> u64 {
    passive_income.saturating_mul(multiplier).max(min_reward)
}

/// Coins received for `amount` dilithium at `rate` dilithium per coin,
/// floored to whole coins.
///
/// Example:
/// assert_eq!(trade_payout(250, 100).unwrap(), 2);
pub fn trade_payout(amount: u64, rate: u64) -> Result<u64, EconError> {
    if rate == 0 {
        return Err(EconError::InvalidRate);
    }
    if amount == 0 {
        return Err(EconError::InvalidAmount);
    }
    Ok(amount / rate)
}

/// Parse a trade amount typed into the trading-station input field. Accepts
/// surrounding whitespace; rejects anything that is not a positive integer.
///
/// Example:
/// assert_eq!(parse_trade_amount(" 100 ").unwrap(), 100);
/// assert!(parse_trade_amount("-5").is_err());
pub fn parse_trade_amount(input: &str) -> Result<u64, EconError> {
    let amount: u64 = input
        .trim()
        .parse()
        .map_err(|_| EconError::InvalidAmount)?;
    if amount == 0 {
        return Err(EconError::InvalidAmount);
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn growth() -> Decimal {
        Decimal::new(115, 2)
    }

    #[test]
    fn cost_starts_at_base() {
        assert_eq!(upgrade_cost(50, growth(), 0), 50);
        assert_eq!(upgrade_cost(125, growth(), 0), 125);
    }

    #[test]
    fn cost_compounds_and_floors() {
        // 50 × 1.15 = 57.5 → 57
        assert_eq!(upgrade_cost(50, growth(), 1), 57);
        // 50 × 1.15² = 66.125 → 66
        assert_eq!(upgrade_cost(50, growth(), 2), 66);
        // 125 × 1.15 = 143.75 → 143
        assert_eq!(upgrade_cost(125, growth(), 1), 143);
    }

    #[test]
    fn cost_saturates_instead_of_overflowing() {
        assert_eq!(upgrade_cost(u64::MAX, growth(), 1), u64::MAX);
        assert_eq!(upgrade_cost(10_000_000, growth(), 10_000), u64::MAX);
    }

    #[test]
    fn reward_applies_minimum_floor() {
        assert_eq!(meteor_reward(0, 20, 10), 10);
        assert_eq!(meteor_reward(1, 20, 10), 20);
        assert_eq!(meteor_reward(6, 20, 10), 120);
    }

    #[test]
    fn reward_saturates() {
        assert_eq!(meteor_reward(u64::MAX, 20, 10), u64::MAX);
    }

    #[test]
    fn payout_floors_to_whole_coins() {
        assert_eq!(trade_payout(100, 100).unwrap(), 1);
        assert_eq!(trade_payout(250, 100).unwrap(), 2);
        assert_eq!(trade_payout(99, 100).unwrap(), 0);
    }

    #[test]
    fn payout_rejects_degenerate_inputs() {
        assert_eq!(trade_payout(0, 100), Err(EconError::InvalidAmount));
        assert_eq!(trade_payout(100, 0), Err(EconError::InvalidRate));
    }

    #[test]
    fn parse_accepts_positive_integers() {
        assert_eq!(parse_trade_amount("100").unwrap(), 100);
        assert_eq!(parse_trade_amount(" 42 ").unwrap(), 42);
    }

    #[test]
    fn parse_rejects_everything_else() {
        for input in ["", "abc", "-5", "0", "3.5", "1e3"] {
            assert_eq!(parse_trade_amount(input), Err(EconError::InvalidAmount));
        }
    }

    proptest! {
        #[test]
        fn cost_strictly_increases_per_level(base in 7u64..100_000, level in 0u32..50) {
            let lo = upgrade_cost(base, growth(), level);
            let hi = upgrade_cost(base, growth(), level + 1);
            prop_assert!(hi > lo);
        }

        #[test]
        fn reward_never_below_floor(passive in 0u64..1_000_000, min in 0u64..1_000) {
            let r = meteor_reward(passive, 20, min);
            prop_assert!(r >= min);
            prop_assert!(r >= passive.saturating_mul(20));
            prop_assert!(r == min || r == passive.saturating_mul(20));
        }

        #[test]
        fn payout_is_floored_division(amount in 1u64..10_000_000, rate in 1u64..10_000) {
            let coins = trade_payout(amount, rate).unwrap();
            prop_assert!(coins * rate <= amount);
            prop_assert!(amount - coins * rate < rate);
        }
    }
}
