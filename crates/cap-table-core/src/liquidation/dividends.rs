use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::decimal_context::DecimalContext;
use crate::liquidation::share_class::{DividendPolicy, PreferredShareClass};
use crate::types::Money;

/// Day count for converting elapsed days into years.
pub const DAYS_PER_YEAR: Decimal = dec!(365.25);

/// Years between two dates on an actual/365.25 basis. Zero when `to`
/// precedes `from`.
pub fn years_between(from: NaiveDate, to: NaiveDate) -> Decimal {
    let days = (to - from).num_days().max(0);
    Decimal::from(days) / DAYS_PER_YEAR
}

/// Dividends owed to a preferred class as of `as_of`.
///
/// Cumulative classes accrue simple (non-compounding) interest on the original
/// investment from the issue date, on top of any unpaid balance carried on the
/// class. Every other policy returns the unpaid balance alone.
pub fn accrued_dividends(
    class: &PreferredShareClass,
    as_of: NaiveDate,
    ctx: &DecimalContext,
) -> Money {
    match class.dividend {
        DividendPolicy::Cumulative { rate } => {
            let years = years_between(class.issue_date, as_of);
            ctx.money(class.original_investment * rate * years) + class.unpaid_dividends
        }
        DividendPolicy::None | DividendPolicy::NonCumulative => class.unpaid_dividends,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liquidation::share_class::ParticipationType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn class(dividend: DividendPolicy, unpaid: Money) -> PreferredShareClass {
        PreferredShareClass {
            id: "series-a".into(),
            series_name: "Series A".into(),
            shares: 1_000_000,
            original_investment: dec!(100_000_000),
            liquidation_multiple: dec!(1),
            participation: ParticipationType::NonParticipating,
            seniority_rank: 0,
            dividend,
            unpaid_dividends: unpaid,
            conversion_ratio: dec!(1),
            issue_date: date(2021, 1, 1),
        }
    }

    #[test]
    fn test_four_years_is_exact() {
        // 2021-01-01 .. 2025-01-01 spans 1461 days = 4 x 365.25
        assert_eq!(years_between(date(2021, 1, 1), date(2025, 1, 1)), dec!(4));
    }

    #[test]
    fn test_cumulative_simple_interest() {
        let ctx = DecimalContext::default();
        let c = class(DividendPolicy::Cumulative { rate: dec!(0.08) }, Decimal::ZERO);
        // $1,000,000 x 8% x 4 years = $320,000
        assert_eq!(
            accrued_dividends(&c, date(2025, 1, 1), &ctx),
            dec!(32_000_000)
        );
    }

    #[test]
    fn test_cumulative_adds_unpaid_balance() {
        let ctx = DecimalContext::default();
        let c = class(
            DividendPolicy::Cumulative { rate: dec!(0.08) },
            dec!(500_000),
        );
        assert_eq!(
            accrued_dividends(&c, date(2025, 1, 1), &ctx),
            dec!(32_500_000)
        );
    }

    #[test]
    fn test_partial_year_rounds_to_minor_units() {
        let ctx = DecimalContext::default();
        let c = class(DividendPolicy::Cumulative { rate: dec!(0.08) }, Decimal::ZERO);
        // 100 days: 100_000_000 x 0.08 x 100 / 365.25 = 2_190_280.629...
        assert_eq!(
            accrued_dividends(&c, date(2021, 4, 11), &ctx),
            dec!(2_190_281)
        );
    }

    #[test]
    fn test_event_before_issue_accrues_nothing() {
        let ctx = DecimalContext::default();
        let c = class(DividendPolicy::Cumulative { rate: dec!(0.08) }, dec!(1_000));
        assert_eq!(accrued_dividends(&c, date(2020, 6, 30), &ctx), dec!(1_000));
    }

    #[test]
    fn test_non_cumulative_returns_unpaid_only() {
        let ctx = DecimalContext::default();
        let c = class(DividendPolicy::NonCumulative, dec!(250_000));
        assert_eq!(
            accrued_dividends(&c, date(2030, 1, 1), &ctx),
            dec!(250_000)
        );
        let none = class(DividendPolicy::None, Decimal::ZERO);
        assert_eq!(
            accrued_dividends(&none, date(2030, 1, 1), &ctx),
            Decimal::ZERO
        );
    }
}
