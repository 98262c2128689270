//! Explicit precision and rounding settings.
//!
//! Every calculation takes a [`DecimalContext`] by reference instead of
//! reading process-wide configuration. Money is held in minor units, so the
//! default money scale of zero keeps whole cents; ratios (per-share values,
//! percentages, ROI) keep eight decimal places.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Rounding applied whenever a computed value is brought back to scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round half to even (banker's rounding)
    #[default]
    HalfEven,
    /// Round half away from zero
    HalfUp,
    /// Truncate toward zero
    Down,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
        }
    }
}

/// Precision settings threaded into every arithmetic step of a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimalContext {
    /// Decimal places kept on money amounts (0 = whole minor units)
    pub money_scale: u32,
    /// Decimal places kept on per-share values, percentages and ratios
    pub ratio_scale: u32,
    /// Rounding mode used for both scales
    pub rounding: RoundingMode,
}

impl Default for DecimalContext {
    fn default() -> Self {
        Self {
            money_scale: 0,
            ratio_scale: 8,
            rounding: RoundingMode::HalfEven,
        }
    }
}

impl DecimalContext {
    /// Largest scale accepted for either setting.
    pub const MAX_SCALE: u32 = 12;

    /// Round a money amount to the configured money scale.
    pub fn money(&self, value: Decimal) -> Money {
        value.round_dp_with_strategy(self.money_scale, self.rounding.strategy())
    }

    /// Round a ratio, percentage or per-share value to the ratio scale.
    pub fn ratio(&self, value: Decimal) -> Decimal {
        value
            .round_dp_with_strategy(self.ratio_scale, self.rounding.strategy())
            .normalize()
    }

    /// `amount * part / whole`, rounded to the money scale. Zero when `whole`
    /// is zero.
    pub fn pro_rata(&self, amount: Money, part: Decimal, whole: Decimal) -> Money {
        if whole.is_zero() || amount.is_zero() {
            return Decimal::ZERO;
        }
        // Divide first: share counts times large amounts can exceed 96 bits.
        self.money(amount * (part / whole))
    }

    /// True when `value` carries no digits beyond the money scale.
    pub fn is_whole_money(&self, value: Money) -> bool {
        value.normalize().scale() <= self.money_scale
    }
}

/// Division that returns ZERO when the denominator is zero.
pub fn safe_divide(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_rounds_half_to_even() {
        let ctx = DecimalContext::default();
        assert_eq!(ctx.money(dec!(2.5)), dec!(2));
        assert_eq!(ctx.money(dec!(3.5)), dec!(4));
        assert_eq!(ctx.money(dec!(-2.5)), dec!(-2));
        assert_eq!(ctx.money(dec!(2.51)), dec!(3));
    }

    #[test]
    fn test_alternate_rounding_modes() {
        let half_up = DecimalContext {
            rounding: RoundingMode::HalfUp,
            ..DecimalContext::default()
        };
        assert_eq!(half_up.money(dec!(2.5)), dec!(3));

        let down = DecimalContext {
            rounding: RoundingMode::Down,
            ..DecimalContext::default()
        };
        assert_eq!(down.money(dec!(2.99)), dec!(2));
    }

    #[test]
    fn test_pro_rata_zero_denominator() {
        let ctx = DecimalContext::default();
        assert_eq!(ctx.pro_rata(dec!(1000), dec!(1), dec!(0)), Decimal::ZERO);
    }

    #[test]
    fn test_pro_rata_large_values_do_not_overflow() {
        let ctx = DecimalContext::default();
        // 10 trillion cents split across a billion-share pool
        let amount = ctx.pro_rata(
            dec!(10_000_000_000_000),
            dec!(250_000_000),
            dec!(1_000_000_000),
        );
        assert_eq!(amount, dec!(2_500_000_000_000));
    }

    #[test]
    fn test_ratio_scale() {
        let ctx = DecimalContext::default();
        assert_eq!(ctx.ratio(dec!(1) / dec!(3)), dec!(0.33333333));
    }

    #[test]
    fn test_is_whole_money() {
        let ctx = DecimalContext::default();
        assert!(ctx.is_whole_money(dec!(100)));
        assert!(ctx.is_whole_money(dec!(100.00)));
        assert!(!ctx.is_whole_money(dec!(100.5)));
    }

    #[test]
    fn test_context_deserializes_with_defaults() {
        let ctx: DecimalContext = serde_json::from_str(r#"{"rounding":"half_up"}"#).unwrap();
        assert_eq!(ctx.money_scale, 0);
        assert_eq!(ctx.ratio_scale, 8);
        assert_eq!(ctx.rounding, RoundingMode::HalfUp);
    }
}
