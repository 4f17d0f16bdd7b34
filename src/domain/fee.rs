//! Platform fee policy.
//!
//! The fee schedule is injected into the service so it can be versioned and
//! tested without touching the escrow transitions. Fees are computed once,
//! when a purchase is initiated, and frozen on the transaction.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::MarketError;

/// Maps a purchase amount to the platform fee.
pub trait FeeSchedule: Send + Sync + fmt::Debug {
    /// Returns the fee for `amount`, already rounded to the cent.
    fn compute(&self, amount: Decimal) -> Decimal;
}

/// Rounds a money amount to two decimal places, half away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One step of a [`TieredFeeSchedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeTier {
    /// Amounts at or above this threshold use this tier.
    pub threshold: Decimal,
    /// Fee percentage, e.g. `5` for 5 %.
    pub percent: Decimal,
}

/// Percentage fee whose rate steps down as the amount grows.
///
/// The tier with the highest threshold not exceeding the amount applies.
/// Amounts below every threshold pay no fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieredFeeSchedule {
    tiers: Vec<FeeTier>,
}

impl TieredFeeSchedule {
    /// Builds a schedule from tiers in any order.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if a threshold or percentage is
    /// negative, a percentage exceeds 100, or two tiers share a threshold.
    pub fn new(mut tiers: Vec<FeeTier>) -> Result<Self, MarketError> {
        tiers.sort_by(|a, b| a.threshold.cmp(&b.threshold));
        for tier in &tiers {
            if tier.threshold < Decimal::ZERO {
                return Err(MarketError::Validation(format!(
                    "fee tier threshold must be non-negative, got {}",
                    tier.threshold
                )));
            }
            if tier.percent < Decimal::ZERO || tier.percent > Decimal::ONE_HUNDRED {
                return Err(MarketError::Validation(format!(
                    "fee percentage must be within 0..=100, got {}",
                    tier.percent
                )));
            }
        }
        if tiers
            .windows(2)
            .any(|pair| matches!(pair, [a, b] if a.threshold == b.threshold))
        {
            return Err(MarketError::Validation(
                "fee tiers must have distinct thresholds".to_string(),
            ));
        }
        Ok(Self { tiers })
    }

    /// A single rate applied to every amount.
    #[must_use]
    pub fn flat(percent: Decimal) -> Self {
        Self {
            tiers: vec![FeeTier {
                threshold: Decimal::ZERO,
                percent,
            }],
        }
    }

    /// Returns the tiers sorted by threshold.
    #[must_use]
    pub fn tiers(&self) -> &[FeeTier] {
        &self.tiers
    }

    fn percent_for(&self, amount: Decimal) -> Decimal {
        self.tiers
            .iter()
            .rev()
            .find(|tier| tier.threshold <= amount)
            .map_or(Decimal::ZERO, |tier| tier.percent)
    }
}

impl Default for TieredFeeSchedule {
    /// 5 % below 500, 4 % from 500, 3 % from 2000.
    fn default() -> Self {
        Self {
            tiers: vec![
                FeeTier {
                    threshold: Decimal::ZERO,
                    percent: dec!(5),
                },
                FeeTier {
                    threshold: dec!(500),
                    percent: dec!(4),
                },
                FeeTier {
                    threshold: dec!(2000),
                    percent: dec!(3),
                },
            ],
        }
    }
}

impl FeeSchedule for TieredFeeSchedule {
    fn compute(&self, amount: Decimal) -> Decimal {
        if amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        round_cents(amount * self.percent_for(amount) / Decimal::ONE_HUNDRED)
    }
}

impl FromStr for TieredFeeSchedule {
    type Err = MarketError;

    /// Parses `"threshold:percent,..."`, e.g. `"0:5,500:4,2000:3"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tiers = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (threshold, percent) = part.split_once(':').ok_or_else(|| {
                MarketError::Validation(format!("fee tier `{part}` is not threshold:percent"))
            })?;
            let threshold = threshold.trim().parse::<Decimal>().map_err(|e| {
                MarketError::Validation(format!("invalid fee threshold `{threshold}`: {e}"))
            })?;
            let percent = percent.trim().parse::<Decimal>().map_err(|e| {
                MarketError::Validation(format!("invalid fee percentage `{percent}`: {e}"))
            })?;
            tiers.push(FeeTier { threshold, percent });
        }
        if tiers.is_empty() {
            return Err(MarketError::Validation(
                "fee schedule needs at least one tier".to_string(),
            ));
        }
        Self::new(tiers)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_charges_five_percent_on_small_amounts() {
        let fees = TieredFeeSchedule::default();
        assert_eq!(fees.compute(dec!(110.00)), dec!(5.50));
    }

    #[test]
    fn tiers_step_down() {
        let fees = TieredFeeSchedule::default();
        assert_eq!(fees.compute(dec!(499.99)), dec!(25.00));
        assert_eq!(fees.compute(dec!(500)), dec!(20.00));
        assert_eq!(fees.compute(dec!(2000)), dec!(60.00));
    }

    #[test]
    fn rounds_half_away_from_zero_not_truncates() {
        // 5 % of 0.10 = 0.005 -> 0.01; 5 % of 0.29 = 0.0145 -> 0.01
        let fees = TieredFeeSchedule::flat(dec!(5));
        assert_eq!(fees.compute(dec!(0.10)), dec!(0.01));
        assert_eq!(fees.compute(dec!(0.29)), dec!(0.01));
        assert_eq!(fees.compute(dec!(0.30)), dec!(0.02));
    }

    #[test]
    fn zero_amount_pays_nothing() {
        assert_eq!(TieredFeeSchedule::default().compute(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn parses_unordered_tiers() {
        let Ok(fees) = "1000:2, 0:6".parse::<TieredFeeSchedule>() else {
            panic!("schedule should parse");
        };
        assert_eq!(fees.tiers().len(), 2);
        assert_eq!(fees.compute(dec!(100)), dec!(6.00));
        assert_eq!(fees.compute(dec!(1000)), dec!(20.00));
    }

    #[test]
    fn rejects_malformed_schedules() {
        assert!("".parse::<TieredFeeSchedule>().is_err());
        assert!("0-5".parse::<TieredFeeSchedule>().is_err());
        assert!("0:150".parse::<TieredFeeSchedule>().is_err());
        assert!("0:5,0:4".parse::<TieredFeeSchedule>().is_err());
    }
}
