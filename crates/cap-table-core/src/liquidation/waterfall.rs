use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::decimal_context::{safe_divide, DecimalContext};
use crate::liquidation::conversion::{
    plan_conversions, ConversionChoice, ConversionPlan, PreferredVsCommon,
};
use crate::liquidation::dividends::accrued_dividends;
use crate::liquidation::share_class::{
    class_arena, seniority_order, ClassKind, CommonShareClass, LiquidationEvent,
    PreferredShareClass, ShareClass,
};
use crate::liquidation::validation::validate_snapshot;
use crate::types::*;
use crate::CapTableResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Cap-table snapshot and exit event for a liquidation waterfall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationInput {
    pub preferred: Vec<PreferredShareClass>,
    #[serde(default)]
    pub common: Vec<CommonShareClass>,
    pub event: LiquidationEvent,
    #[serde(default)]
    pub decimal_context: DecimalContext,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One entry of the audit trail, in the order proceeds moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallStep {
    /// 1-based position in the log
    pub step: u32,
    pub description: String,
    /// Amount distributed by this step
    pub amount: Money,
    /// Proceeds left after this step
    pub remaining: Money,
}

/// Final allocation to a single share class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub class_id: String,
    pub class_name: String,
    pub class_kind: ClassKind,
    pub shares: Shares,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seniority_rank: Option<u32>,
    pub liquidation_preference: Money,
    pub cumulative_dividends: Money,
    pub participation: Money,
    pub common_distribution: Money,
    pub total_distribution: Money,
    pub effective_per_share: Decimal,
    /// Share of the exit value, in percent
    pub ownership_pct: Decimal,
    pub preferred_vs_common: PreferredVsCommon,
}

/// Totals per category plus the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallSummary {
    pub total_liquidation_preferences: Money,
    pub total_cumulative_dividends: Money,
    pub total_participation: Money,
    pub total_common_distributions: Money,
    pub total_distributed: Money,
    /// Proceeds no class holds: residual with no common pool, plus
    /// preferred payouts forfeited by converting classes
    pub undistributed: Money,
    pub steps: Vec<WaterfallStep>,
}

/// Complete liquidation waterfall result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationAnalysis {
    pub event: LiquidationEvent,
    /// Sorted by total distribution, largest first
    pub distributions: Vec<Distribution>,
    pub summary: WaterfallSummary,
}

// ---------------------------------------------------------------------------
// Accumulator state
// ---------------------------------------------------------------------------

/// Buckets for one class. Lives in an arena indexed like `class_arena`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Allocation {
    liquidation_preference: Money,
    cumulative_dividends: Money,
    participation: Money,
    common_distribution: Money,
}

impl Allocation {
    fn preferred_payout(&self) -> Money {
        self.liquidation_preference + self.cumulative_dividends + self.participation
    }

    fn total(&self) -> Money {
        self.preferred_payout() + self.common_distribution
    }
}

struct WaterfallState {
    allocations: Vec<Allocation>,
    remaining: Money,
    steps: Vec<WaterfallStep>,
}

impl WaterfallState {
    fn new(class_count: usize, exit_value: Money) -> Self {
        Self {
            allocations: vec![Allocation::default(); class_count],
            remaining: exit_value,
            steps: Vec::new(),
        }
    }

    fn record(&mut self, description: String, amount: Money) {
        self.steps.push(WaterfallStep {
            step: self.steps.len() as u32 + 1,
            description,
            amount,
            remaining: self.remaining,
        });
    }
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Run a liquidation waterfall and wrap it with methodology, assumptions and
/// warnings.
pub fn analyze_liquidation(
    input: &LiquidationInput,
) -> CapTableResult<ComputationOutput<LiquidationAnalysis>> {
    let start = Instant::now();
    let ctx = &input.decimal_context;

    let analysis = distribute(&input.preferred, &input.common, &input.event, ctx)?;
    let warnings = collect_warnings(input, &analysis);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Liquidation Preference Waterfall (seniority, participation, conversion)",
        &serde_json::json!({
            "exit_value": input.event.exit_value.to_string(),
            "event_date": input.event.event_date.to_string(),
            "event_kind": format!("{:?}", input.event.event_kind),
            "num_preferred_classes": input.preferred.len(),
            "num_common_classes": input.common.len(),
            "money_unit": "minor units",
            "dividend_day_count": "actual/365.25, simple interest",
            "rounding": format!("{:?}", ctx.rounding),
        }),
        warnings,
        elapsed,
        analysis,
    ))
}

/// Distribute `event.exit_value` across the preferred and common classes.
///
/// Three phases run over one accumulator arena:
///
/// 1. Senior preferences: preference plus accrued dividends, strictly by
///    seniority rank, until proceeds run out.
/// 2. Participation: participating classes share the residual pro-rata with
///    common on an as-converted basis, clamped by any participation cap.
/// 3. Common residual: each preferred class converts if its share of the
///    residual beats its preferred payout; the residual is then split
///    across common holders and converted classes.
///
/// Validation runs first; nothing is allocated when it fails.
pub fn distribute(
    preferred: &[PreferredShareClass],
    common: &[CommonShareClass],
    event: &LiquidationEvent,
    ctx: &DecimalContext,
) -> CapTableResult<LiquidationAnalysis> {
    validate_snapshot(preferred, common, event, ctx)?;

    debug!(
        preferred = preferred.len(),
        common = common.len(),
        exit_value = %event.exit_value,
        "Running liquidation waterfall"
    );

    let classes = class_arena(preferred, common);
    let order = seniority_order(preferred);
    let mut state = WaterfallState::new(classes.len(), event.exit_value);

    pay_senior_preferences(preferred, &order, event, ctx, &mut state);
    pay_participation(preferred, common, &order, ctx, &mut state);

    let preferred_payouts: Vec<Money> = (0..preferred.len())
        .map(|i| state.allocations[i].preferred_payout())
        .collect();
    let plan = plan_conversions(
        preferred,
        common,
        &order,
        &preferred_payouts,
        state.remaining,
        ctx,
    );
    distribute_common_residual(preferred, common, &plan, ctx, &mut state);

    Ok(assemble(&classes, &plan, event, ctx, state))
}

/// Phase 1: preference and dividend claims, senior first.
fn pay_senior_preferences(
    preferred: &[PreferredShareClass],
    order: &[usize],
    event: &LiquidationEvent,
    ctx: &DecimalContext,
    state: &mut WaterfallState,
) {
    for &i in order {
        if state.remaining <= Decimal::ZERO {
            // Juniors past exhaustion keep zeroed buckets.
            continue;
        }
        let class = &preferred[i];
        let preference_claim = class.preference_claim(ctx);
        let dividend_claim = accrued_dividends(class, event.event_date, ctx);
        let total_claim = preference_claim + dividend_claim;
        let payout = total_claim.min(state.remaining);

        let preference_paid = ctx.pro_rata(payout, preference_claim, total_claim);
        let dividends_paid = payout - preference_paid;

        let alloc = &mut state.allocations[i];
        alloc.liquidation_preference = preference_paid;
        alloc.cumulative_dividends = dividends_paid;
        state.remaining -= payout;

        debug!(
            series = %class.series_name,
            rank = class.seniority_rank,
            claim = %total_claim,
            payout = %payout,
            remaining = %state.remaining,
            "Senior preference paid"
        );

        let mut description = format!(
            "{} liquidation preference ({}x)",
            class.series_name,
            class.liquidation_multiple.normalize()
        );
        if !dividend_claim.is_zero() {
            description.push_str(" with accrued dividends");
        }
        if payout < total_claim {
            description.push_str(", partially covered");
        }
        state.record(description, payout);
    }
}

/// Phase 2: pro-rata participation, senior first, each class taking its
/// share of the balance still remaining when it is reached.
fn pay_participation(
    preferred: &[PreferredShareClass],
    common: &[CommonShareClass],
    order: &[usize],
    ctx: &DecimalContext,
    state: &mut WaterfallState,
) {
    let participants: Vec<usize> = order
        .iter()
        .copied()
        .filter(|&i| preferred[i].is_participating())
        .collect();
    if participants.is_empty() || state.remaining <= Decimal::ZERO {
        return;
    }

    let participating_shares: Decimal = participants
        .iter()
        .map(|&i| preferred[i].as_converted_shares())
        .sum();
    let common_shares: Decimal = common.iter().map(|c| Decimal::from(c.shares)).sum();
    let total_participating_shares = participating_shares + common_shares;

    let mut paid = Decimal::ZERO;
    for &i in &participants {
        if state.remaining <= Decimal::ZERO {
            break;
        }
        let class = &preferred[i];
        let mut share = ctx.pro_rata(
            state.remaining,
            class.as_converted_shares(),
            total_participating_shares,
        );
        if let Some(cap) = class.participation_cap_amount(ctx) {
            let already_paid = state.allocations[i].liquidation_preference
                + state.allocations[i].cumulative_dividends;
            share = share.min((cap - already_paid).max(Decimal::ZERO));
        }
        share = share.min(state.remaining);

        state.allocations[i].participation = share;
        state.remaining -= share;
        paid += share;
    }

    debug!(
        participants = participants.len(),
        paid = %paid,
        remaining = %state.remaining,
        "Participation paid"
    );
    state.record(
        format!(
            "Participation across {} participating class{}",
            participants.len(),
            if participants.len() == 1 { "" } else { "es" }
        ),
        paid,
    );
}

/// Phase 3: apply the conversion plan and split the residual across the pool.
///
/// Converting classes give up their preferred buckets; the amounts they
/// held are not returned to the residual and end up undistributed.
fn distribute_common_residual(
    preferred: &[PreferredShareClass],
    common: &[CommonShareClass],
    plan: &ConversionPlan,
    ctx: &DecimalContext,
    state: &mut WaterfallState,
) {
    let forfeited: Money = plan
        .converted
        .iter()
        .map(|&i| state.allocations[i].preferred_payout())
        .sum();
    for &i in &plan.converted {
        state.allocations[i] = Allocation::default();
    }

    let residual = state.remaining;
    if residual <= Decimal::ZERO {
        return;
    }
    if plan.pool_shares.is_zero() {
        debug!(residual = %residual, "No common pool for the residual");
        state.record("Common residual: no common holders".to_string(), Decimal::ZERO);
        return;
    }

    // Arena index and pool shares: common classes first, then converters in
    // the order they joined.
    let preferred_count = preferred.len();
    let members: Vec<(usize, Decimal)> = common
        .iter()
        .enumerate()
        .map(|(j, c)| (preferred_count + j, Decimal::from(c.shares)))
        .chain(
            plan.converted
                .iter()
                .map(|&i| (i, preferred[i].as_converted_shares())),
        )
        .collect();

    // Each member takes its share of what is left, so the last member
    // absorbs rounding and the residual is allocated exactly.
    let mut pot_left = residual;
    let mut pool_left = plan.pool_shares;
    for &(idx, member_shares) in &members {
        let amount = ctx.pro_rata(pot_left, member_shares, pool_left);
        state.allocations[idx].common_distribution = amount;
        pot_left -= amount;
        pool_left -= member_shares;
    }
    state.remaining = pot_left;

    let mut description = format!(
        "Common residual across {} holder{}",
        members.len(),
        if members.len() == 1 { "" } else { "s" }
    );
    if !plan.converted.is_empty() {
        let names: Vec<&str> = plan
            .converted
            .iter()
            .map(|&i| preferred[i].series_name.as_str())
            .collect();
        description.push_str(&format!(" ({} converted to common)", names.join(", ")));
    }
    debug!(
        residual = %residual,
        forfeited = %forfeited,
        members = members.len(),
        "Common residual distributed"
    );
    state.record(description, residual - pot_left);
}

fn assemble(
    classes: &[ShareClass<'_>],
    plan: &ConversionPlan,
    event: &LiquidationEvent,
    ctx: &DecimalContext,
    state: WaterfallState,
) -> LiquidationAnalysis {
    let exit_value = event.exit_value;

    let mut distributions: Vec<Distribution> = classes
        .iter()
        .zip(&state.allocations)
        .enumerate()
        .map(|(idx, (class, alloc))| {
            let total = alloc.total();
            let preferred_vs_common = match class {
                ShareClass::Preferred(_) => plan.comparisons[idx].clone(),
                ShareClass::Common(_) => PreferredVsCommon::for_common(total),
            };
            Distribution {
                class_id: class.id().to_string(),
                class_name: class.name().to_string(),
                class_kind: class.kind(),
                shares: class.shares(),
                seniority_rank: class.seniority_rank(),
                liquidation_preference: alloc.liquidation_preference,
                cumulative_dividends: alloc.cumulative_dividends,
                participation: alloc.participation,
                common_distribution: alloc.common_distribution,
                total_distribution: total,
                effective_per_share: ctx.ratio(safe_divide(total, Decimal::from(class.shares()))),
                ownership_pct: ctx.ratio(safe_divide(total, exit_value) * Decimal::ONE_HUNDRED),
                preferred_vs_common,
            }
        })
        .collect();

    let sum = |f: fn(&Allocation) -> Money| -> Money { state.allocations.iter().map(f).sum() };
    let total_liquidation_preferences = sum(|a| a.liquidation_preference);
    let total_cumulative_dividends = sum(|a| a.cumulative_dividends);
    let total_participation = sum(|a| a.participation);
    let total_common_distributions = sum(|a| a.common_distribution);
    let total_distributed = total_liquidation_preferences
        + total_cumulative_dividends
        + total_participation
        + total_common_distributions;

    // Presentation order only; computed after every bucket is final.
    distributions.sort_by(|a, b| b.total_distribution.cmp(&a.total_distribution));

    LiquidationAnalysis {
        event: event.clone(),
        distributions,
        summary: WaterfallSummary {
            total_liquidation_preferences,
            total_cumulative_dividends,
            total_participation,
            total_common_distributions,
            total_distributed,
            undistributed: exit_value - total_distributed,
            steps: state.steps,
        },
    }
}

fn collect_warnings(input: &LiquidationInput, analysis: &LiquidationAnalysis) -> Vec<String> {
    let mut warnings = Vec::new();
    let ctx = &input.decimal_context;
    let event = &input.event;

    for class in &input.preferred {
        if class.issue_date > event.event_date {
            warnings.push(format!(
                "{} was issued after the event date; no dividends accrued.",
                class.series_name
            ));
        }
    }

    let total_claims: Money = input
        .preferred
        .iter()
        .map(|c| c.preference_claim(ctx) + accrued_dividends(c, event.event_date, ctx))
        .sum();
    if total_claims > event.exit_value {
        let impaired = analysis
            .distributions
            .iter()
            .filter(|d| d.class_kind == ClassKind::Preferred)
            .filter(|d| d.total_distribution.is_zero())
            .count();
        warnings.push(format!(
            "Exit value covers {} of {} in preference claims; {} preferred class(es) receive nothing.",
            event.exit_value, total_claims, impaired
        ));
    }

    for d in &analysis.distributions {
        if d.class_kind == ClassKind::Preferred && d.common_distribution > Decimal::ZERO {
            warnings.push(format!(
                "{} converts to common: {} as common vs {} as preferred.",
                d.class_name, d.preferred_vs_common.as_common, d.preferred_vs_common.as_preferred
            ));
        }
    }

    let forfeited: Money = analysis
        .distributions
        .iter()
        .filter(|d| d.class_kind == ClassKind::Preferred)
        .filter(|d| d.preferred_vs_common.optimal_choice == ConversionChoice::Common)
        .map(|d| d.preferred_vs_common.as_preferred)
        .sum();
    if forfeited > Decimal::ZERO {
        warnings.push(format!(
            "{} in preferred payouts forfeited by converting classes is not redistributed.",
            forfeited
        ));
    }
    let stranded = analysis.summary.undistributed - forfeited;
    if stranded > Decimal::ZERO {
        warnings.push(format!(
            "{} left undistributed: no common holders or converting classes to absorb the residual.",
            stranded
        ));
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
