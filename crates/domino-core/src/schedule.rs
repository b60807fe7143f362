//! Commission schedule: the decay rule and qualification threshold.
//!
//! Commissions are a flat amount per level (`base_rate / level`), rounded to
//! cents half-up. The amount does not depend on the size of the deposit that
//! triggered the award.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decimal places commissions are rounded to.
pub const AMOUNT_SCALE: u32 = 2;

/// Parameters of the referral commission program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionSchedule {
    /// Amount awarded at level 1; level `n` receives `base_rate / n`.
    pub base_rate: Decimal,
    /// Minimum sum of approved deposits for a user to qualify.
    pub min_qualifying_deposit: Decimal,
    /// Maximum number of hops walked up the referral chain.
    pub max_chain_depth: u32,
    /// Also require each rewarded ancestor to have a referrer of their own.
    /// Off by default: the root of every chain has no referrer.
    pub require_referred_beneficiary: bool,
}

impl Default for CommissionSchedule {
    fn default() -> Self {
        Self {
            base_rate: Decimal::new(5, 1),
            min_qualifying_deposit: Decimal::from(10),
            max_chain_depth: 32,
            require_referred_beneficiary: false,
        }
    }
}

impl CommissionSchedule {
    /// Commission owed to the ancestor at `level` (1 = direct referrer).
    ///
    /// Level 0 is not a valid chain position and yields zero. The result
    /// always carries exactly [`AMOUNT_SCALE`] decimal places.
    pub fn amount_for_level(&self, level: u32) -> Decimal {
        let mut amount = if level == 0 {
            Decimal::ZERO
        } else {
            (self.base_rate / Decimal::from(level))
                .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        };
        amount.rescale(AMOUNT_SCALE);
        amount
    }

    /// Whether `total_deposited` reaches the qualification threshold.
    pub fn meets_threshold(&self, total_deposited: Decimal) -> bool {
        total_deposited >= self.min_qualifying_deposit
    }

    /// Reject schedules that cannot produce a sensible award.
    pub fn validate(&self) -> Result<()> {
        if self.base_rate <= Decimal::ZERO {
            return Err(Error::Config(format!(
                "base_rate must be positive, got {}",
                self.base_rate
            )));
        }
        if self.min_qualifying_deposit < Decimal::ZERO {
            return Err(Error::Config(format!(
                "min_qualifying_deposit must not be negative, got {}",
                self.min_qualifying_deposit
            )));
        }
        if self.max_chain_depth == 0 {
            return Err(Error::Config("max_chain_depth must be at least 1".into()));
        }
        Ok(())
    }
}

/// Parse a strictly positive monetary amount such as `"12.50"`.
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let amount = Decimal::from_str(input.trim())
        .map_err(|e| Error::Amount(format!("{input:?}: {e}")))?;
    if amount <= Decimal::ZERO {
        return Err(Error::Amount(format!("{input:?}: must be positive")));
    }
    Ok(amount.normalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cents(n: i64) -> Decimal {
        Decimal::new(n, 2)
    }

    #[test]
    fn decay_matches_published_table() {
        let schedule = CommissionSchedule::default();
        // Compare rendered strings: `Decimal` equality ignores scale.
        for (level, expected) in [(1, "0.50"), (2, "0.25"), (3, "0.17"), (4, "0.13"), (5, "0.10")] {
            assert_eq!(schedule.amount_for_level(level).to_string(), expected);
        }
    }

    #[test]
    fn amounts_always_have_two_places() {
        let whole = CommissionSchedule {
            base_rate: Decimal::from(2),
            ..CommissionSchedule::default()
        };
        assert_eq!(whole.amount_for_level(1).to_string(), "2.00");
        assert_eq!(whole.amount_for_level(4).to_string(), "0.50");
        assert_eq!(CommissionSchedule::default().amount_for_level(0).scale(), AMOUNT_SCALE);
    }

    #[test]
    fn midpoint_rounds_up() {
        // 0.5 / 4 = 0.125 sits exactly on the midpoint.
        let schedule = CommissionSchedule::default();
        assert_eq!(schedule.amount_for_level(4).to_string(), "0.13");
    }

    #[test]
    fn deep_levels_round_to_zero() {
        let schedule = CommissionSchedule::default();
        assert_eq!(schedule.amount_for_level(100), cents(1));
        assert_eq!(schedule.amount_for_level(101), Decimal::ZERO);
        assert_eq!(schedule.amount_for_level(0), Decimal::ZERO);
    }

    #[test]
    fn threshold_is_inclusive() {
        let schedule = CommissionSchedule::default();
        assert!(schedule.meets_threshold(Decimal::from(10)));
        assert!(schedule.meets_threshold(cents(1001)));
        assert!(!schedule.meets_threshold(cents(999)));
        assert!(!schedule.meets_threshold(Decimal::ZERO));
    }

    #[test]
    fn validate_rejects_degenerate_schedules() {
        assert!(CommissionSchedule::default().validate().is_ok());

        let zero_rate = CommissionSchedule {
            base_rate: Decimal::ZERO,
            ..CommissionSchedule::default()
        };
        assert!(zero_rate.validate().is_err());

        let no_depth = CommissionSchedule {
            max_chain_depth: 0,
            ..CommissionSchedule::default()
        };
        assert!(no_depth.validate().is_err());

        let negative_threshold = CommissionSchedule {
            min_qualifying_deposit: Decimal::from(-1),
            ..CommissionSchedule::default()
        };
        assert!(negative_threshold.validate().is_err());
    }

    #[test]
    fn parse_amount_accepts_positive_decimals() {
        assert_eq!(parse_amount("12.50").unwrap(), cents(1250));
        assert_eq!(parse_amount(" 7 ").unwrap(), Decimal::from(7));
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("ten").is_err());
    }
}
