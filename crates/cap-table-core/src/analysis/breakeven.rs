use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::decimal_context::DecimalContext;
use crate::error::CapTableError;
use crate::liquidation::conversion::{ConversionChoice, PreferredVsCommon};
use crate::liquidation::dividends::accrued_dividends;
use crate::liquidation::share_class::PreferredShareClass;
use crate::liquidation::validation::{
    validate_decimal_context, validate_exit_value, validate_preferred_classes,
};
use crate::types::{with_metadata, ComputationOutput, Money, Shares};
use crate::CapTableResult;

/// Upper bound on sweep resolution.
pub const MAX_BREAKEVEN_STEPS: u32 = 10_000;

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakevenInput {
    pub preferred_class: PreferredShareClass,
    /// Common shares the class would convert alongside
    pub common_shares: Shares,
    /// Upper end of the sweep, in minor units
    pub max_exit_value: Money,
    /// Number of evenly spaced exit values to evaluate
    pub steps: u32,
    /// Date dividends are accrued to; unpaid balance only when absent
    #[serde(default)]
    pub as_of_date: Option<NaiveDate>,
    #[serde(default)]
    pub decimal_context: DecimalContext,
}

/// Preferred vs common value at one exit value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakevenPoint {
    pub exit_value: Money,
    pub as_preferred_value: Money,
    pub as_common_value: Money,
    pub optimal_choice: ConversionChoice,
    /// as_preferred_value - as_common_value (signed)
    pub value_difference: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakevenOutput {
    pub series_name: String,
    pub points: Vec<BreakevenPoint>,
    /// First swept exit value at which the sign of `value_difference` flips
    pub crossover_exit_value: Option<Money>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Sweep `steps` exit values evenly spaced over `(0, max_exit_value]` and
/// compare staying preferred with converting, for a single class against a
/// fixed common share count.
pub fn breakeven(
    preferred_class: &PreferredShareClass,
    common_shares: Shares,
    max_exit_value: Money,
    steps: u32,
    as_of_date: Option<NaiveDate>,
    ctx: &DecimalContext,
) -> CapTableResult<Vec<BreakevenPoint>> {
    validate_decimal_context(ctx)?;
    validate_preferred_classes(std::slice::from_ref(preferred_class), ctx)?;
    validate_exit_value("max_exit_value", max_exit_value, ctx)?;
    if steps == 0 || steps > MAX_BREAKEVEN_STEPS {
        return Err(CapTableError::invalid(
            "steps",
            format!("Steps must be between 1 and {MAX_BREAKEVEN_STEPS}"),
        ));
    }

    let dividends = accrued_dividends(
        preferred_class,
        as_of_date.unwrap_or(preferred_class.issue_date),
        ctx,
    );
    let claim = preferred_class.preference_claim(ctx) + dividends;
    let step_count = Decimal::from(steps);
    let exit_at = |i: u32| ctx.money(max_exit_value * Decimal::from(i) / step_count);

    #[cfg(feature = "parallel")]
    let points = (1..=steps)
        .into_par_iter()
        .map(|i| value_at_exit(preferred_class, claim, common_shares, exit_at(i), ctx))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let points = (1..=steps)
        .map(|i| value_at_exit(preferred_class, claim, common_shares, exit_at(i), ctx))
        .collect();

    Ok(points)
}

/// Single-class waterfall at one exit value, valued the way the full
/// waterfall values a conversion. `claim` is preference plus dividends.
pub fn value_at_exit(
    class: &PreferredShareClass,
    claim: Money,
    common_shares: Shares,
    exit_value: Money,
    ctx: &DecimalContext,
) -> BreakevenPoint {
    let as_converted = class.as_converted_shares();
    let pool = as_converted + Decimal::from(common_shares);

    let mut as_preferred = claim.min(exit_value);
    if class.is_participating() {
        let mut participation = ctx.pro_rata(exit_value - as_preferred, as_converted, pool);
        if let Some(cap) = class.participation_cap_amount(ctx) {
            participation = participation.min((cap - as_preferred).max(Decimal::ZERO));
        }
        as_preferred += participation;
    }
    // Converting forfeits the preferred payout; the class shares what is left
    let as_common = ctx.pro_rata(exit_value - as_preferred, as_converted, pool);

    let comparison = PreferredVsCommon::compare(as_preferred, as_common);
    BreakevenPoint {
        exit_value,
        as_preferred_value: as_preferred,
        as_common_value: as_common,
        optimal_choice: comparison.optimal_choice,
        value_difference: as_preferred - as_common,
    }
}

/// Exit value of the first point whose `value_difference` sign differs from
/// the point before it. Zero counts as non-negative (ties stay preferred).
pub fn find_crossover(points: &[BreakevenPoint]) -> Option<Money> {
    points
        .windows(2)
        .find(|w| {
            (w[0].value_difference >= Decimal::ZERO) != (w[1].value_difference >= Decimal::ZERO)
        })
        .map(|w| w[1].exit_value)
}

pub fn analyze_breakeven(
    input: &BreakevenInput,
) -> CapTableResult<ComputationOutput<BreakevenOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let points = breakeven(
        &input.preferred_class,
        input.common_shares,
        input.max_exit_value,
        input.steps,
        input.as_of_date,
        &input.decimal_context,
    )?;
    let crossover_exit_value = find_crossover(&points);

    if crossover_exit_value.is_none() {
        warnings.push(
            "No crossover within the swept range; raise max_exit_value or steps to locate one."
                .into(),
        );
    }

    let output = BreakevenOutput {
        series_name: input.preferred_class.series_name.clone(),
        points,
        crossover_exit_value,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Preferred vs Common Breakeven Sweep (linear, single class)",
        &serde_json::json!({
            "series_name": input.preferred_class.series_name,
            "common_shares": input.common_shares,
            "max_exit_value": input.max_exit_value.to_string(),
            "steps": input.steps,
        }),
        warnings,
        elapsed,
        output,
    ))
}
