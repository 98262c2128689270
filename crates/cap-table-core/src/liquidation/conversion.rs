use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decimal_context::DecimalContext;
use crate::liquidation::share_class::{CommonShareClass, PreferredShareClass};
use crate::types::Money;

/// Which form of the security yields more for its holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionChoice {
    Preferred,
    Common,
}

/// Stay-preferred vs convert-to-common comparison for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferredVsCommon {
    /// Preference + dividends + participation before the common residual
    pub as_preferred: Money,
    /// Value of the as-converted shares in the common pool
    pub as_common: Money,
    /// Preferred unless conversion is strictly better
    pub optimal_choice: ConversionChoice,
    /// |as_preferred - as_common|
    pub delta: Money,
}

impl PreferredVsCommon {
    pub fn compare(as_preferred: Money, as_common: Money) -> Self {
        let optimal_choice = if as_preferred >= as_common {
            ConversionChoice::Preferred
        } else {
            ConversionChoice::Common
        };
        PreferredVsCommon {
            as_preferred,
            as_common,
            optimal_choice,
            delta: (as_preferred - as_common).abs(),
        }
    }

    /// Common stock has nothing to convert from.
    pub fn for_common(total: Money) -> Self {
        PreferredVsCommon {
            as_preferred: Decimal::ZERO,
            as_common: total,
            optimal_choice: ConversionChoice::Common,
            delta: total,
        }
    }
}

/// Outcome of the conversion pass over the preferred classes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionPlan {
    /// One comparison per preferred class, indexed like the input slice
    pub comparisons: Vec<PreferredVsCommon>,
    /// Preferred indices that convert, in the order they joined the pool
    pub converted: Vec<usize>,
    /// Common shares plus as-converted shares of every converting class
    pub pool_shares: Decimal,
}

impl ConversionPlan {
    pub fn converts(&self, preferred_index: usize) -> bool {
        self.converted.contains(&preferred_index)
    }
}

/// Decide, class by class, whether converting to common beats the preferred
/// payout already accumulated.
///
/// `order` is the evaluation order (seniority order in the waterfall).
/// `preferred_payouts[i]` is preference + dividends + participation for
/// `preferred[i]`. A class is valued at `residual x as_converted / (pool +
/// as_converted)` against the pool as it stands when the class is reached;
/// the pool grows as each class converts.
pub fn plan_conversions(
    preferred: &[PreferredShareClass],
    common: &[CommonShareClass],
    order: &[usize],
    preferred_payouts: &[Money],
    residual: Money,
    ctx: &DecimalContext,
) -> ConversionPlan {
    let mut pool_shares: Decimal = common.iter().map(|c| Decimal::from(c.shares)).sum();
    let mut comparisons =
        vec![PreferredVsCommon::compare(Decimal::ZERO, Decimal::ZERO); preferred.len()];
    let mut converted = Vec::new();

    for &i in order {
        let class = &preferred[i];
        let as_preferred = preferred_payouts[i];
        let as_converted = class.as_converted_shares();

        let as_common = ctx.pro_rata(residual, as_converted, pool_shares + as_converted);
        let comparison = PreferredVsCommon::compare(as_preferred, as_common);

        if comparison.optimal_choice == ConversionChoice::Common {
            debug!(
                series = %class.series_name,
                as_preferred = %as_preferred,
                as_common = %as_common,
                "Preferred class converts to common"
            );
            pool_shares += as_converted;
            converted.push(i);
        }
        comparisons[i] = comparison;
    }

    ConversionPlan {
        comparisons,
        converted,
        pool_shares,
    }
}
