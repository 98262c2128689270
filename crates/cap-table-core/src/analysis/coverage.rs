use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::decimal_context::DecimalContext;
use crate::liquidation::dividends::accrued_dividends;
use crate::liquidation::share_class::{seniority_order, PreferredShareClass};
use crate::liquidation::validation::{validate_decimal_context, validate_preferred_classes};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::CapTableResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageInput {
    pub preferred: Vec<PreferredShareClass>,
    /// Date dividends are accrued to
    pub event_date: NaiveDate,
    #[serde(default)]
    pub decimal_context: DecimalContext,
}

/// Claim of one class and the exit value needed to cover it and everything
/// senior to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageRow {
    pub series_name: String,
    pub seniority_rank: u32,
    pub liquidation_preference: Money,
    pub cumulative_dividends: Money,
    pub total_claim: Money,
    pub cumulative_coverage: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageOutput {
    /// Senior first
    pub rows: Vec<CoverageRow>,
    /// Exit value needed to satisfy every preferred claim
    pub total_claims: Money,
}

/// Minimum exit value that fully satisfies each class and all classes senior
/// to it.
pub fn coverage(
    preferred: &[PreferredShareClass],
    event_date: NaiveDate,
    ctx: &DecimalContext,
) -> CapTableResult<Vec<CoverageRow>> {
    validate_decimal_context(ctx)?;
    validate_preferred_classes(preferred, ctx)?;

    let mut cumulative_coverage = Decimal::ZERO;
    let rows = seniority_order(preferred)
        .into_iter()
        .map(|i| {
            let class = &preferred[i];
            let liquidation_preference = class.preference_claim(ctx);
            let cumulative_dividends = accrued_dividends(class, event_date, ctx);
            let total_claim = liquidation_preference + cumulative_dividends;
            cumulative_coverage += total_claim;
            CoverageRow {
                series_name: class.series_name.clone(),
                seniority_rank: class.seniority_rank,
                liquidation_preference,
                cumulative_dividends,
                total_claim,
                cumulative_coverage,
            }
        })
        .collect();
    Ok(rows)
}

pub fn analyze_coverage(
    input: &CoverageInput,
) -> CapTableResult<ComputationOutput<CoverageOutput>> {
    let start = Instant::now();
    let rows = coverage(&input.preferred, input.event_date, &input.decimal_context)?;
    let total_claims = rows
        .last()
        .map(|r| r.cumulative_coverage)
        .unwrap_or(Decimal::ZERO);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Liquidation Preference Coverage",
        &serde_json::json!({
            "event_date": input.event_date.to_string(),
            "num_preferred_classes": input.preferred.len(),
        }),
        Vec::new(),
        elapsed,
        CoverageOutput { rows, total_claims },
    ))
}
