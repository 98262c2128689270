use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::decimal_context::DecimalContext;
use crate::error::CapTableError;
use crate::liquidation::share_class::{
    CommonShareClass, DividendPolicy, LiquidationEvent, ParticipationType, PreferredShareClass,
};
use crate::types::{Money, Multiple, Rate};
use crate::CapTableResult;

/// Highest cumulative dividend rate accepted (50%).
pub const MAX_DIVIDEND_RATE: Rate = dec!(0.50);

/// Largest money amount accepted, in minor units. Keeps every product of an
/// amount and a term below `Decimal::MAX`.
pub const MAX_AMOUNT: Money = dec!(100_000_000_000_000_000_000);

/// Largest liquidation multiple, participation cap or conversion ratio.
pub const MAX_TERM: Multiple = dec!(1_000);

/// Validate a full snapshot. Fails on the first violation, before any
/// calculation runs.
pub fn validate_snapshot(
    preferred: &[PreferredShareClass],
    common: &[CommonShareClass],
    event: &LiquidationEvent,
    ctx: &DecimalContext,
) -> CapTableResult<()> {
    validate_decimal_context(ctx)?;
    validate_event(event, ctx)?;
    validate_preferred_classes(preferred, ctx)?;
    validate_common_classes(common)?;
    validate_unique_ids(preferred, common)
}

pub fn validate_decimal_context(ctx: &DecimalContext) -> CapTableResult<()> {
    if ctx.money_scale > DecimalContext::MAX_SCALE {
        return Err(CapTableError::invalid(
            "decimal_context.money_scale",
            format!("Money scale cannot exceed {}", DecimalContext::MAX_SCALE),
        ));
    }
    if ctx.ratio_scale > DecimalContext::MAX_SCALE {
        return Err(CapTableError::invalid(
            "decimal_context.ratio_scale",
            format!("Ratio scale cannot exceed {}", DecimalContext::MAX_SCALE),
        ));
    }
    Ok(())
}

pub fn validate_event(event: &LiquidationEvent, ctx: &DecimalContext) -> CapTableResult<()> {
    validate_exit_value("event.exit_value", event.exit_value, ctx)
}

/// Exit values must be positive and expressed in whole minor units.
pub fn validate_exit_value(field: &str, value: Money, ctx: &DecimalContext) -> CapTableResult<()> {
    if value <= Decimal::ZERO {
        return Err(CapTableError::invalid(field, "Exit value must be positive"));
    }
    if !ctx.is_whole_money(value) {
        return Err(CapTableError::invalid(
            field,
            "Exit value must be a whole number of minor units",
        ));
    }
    if value > MAX_AMOUNT {
        return Err(CapTableError::invalid(
            field,
            format!("Exit value cannot exceed {MAX_AMOUNT}"),
        ));
    }
    Ok(())
}

fn validate_term(
    field: String,
    value: Multiple,
    label: &str,
    series: &str,
) -> CapTableResult<()> {
    if value <= Decimal::ZERO {
        return Err(CapTableError::invalid(
            field,
            format!("{label} for {series} must be positive"),
        ));
    }
    if value > MAX_TERM {
        return Err(CapTableError::invalid(
            field,
            format!("{label} for {series} cannot exceed {MAX_TERM}"),
        ));
    }
    Ok(())
}

pub fn validate_preferred_classes(
    preferred: &[PreferredShareClass],
    ctx: &DecimalContext,
) -> CapTableResult<()> {
    // rank -> index of the first class holding it
    let mut ranks: HashMap<u32, usize> = HashMap::new();

    for (i, class) in preferred.iter().enumerate() {
        let field = |name: &str| format!("preferred[{i}].{name}");

        if class.id.trim().is_empty() {
            return Err(CapTableError::invalid(field("id"), "Class id is required"));
        }
        if class.series_name.trim().is_empty() {
            return Err(CapTableError::invalid(
                field("series_name"),
                "Series name is required",
            ));
        }
        if class.original_investment <= Decimal::ZERO {
            return Err(CapTableError::invalid(
                field("original_investment"),
                format!("Original investment for {} must be positive", class.series_name),
            ));
        }
        if !ctx.is_whole_money(class.original_investment) {
            return Err(CapTableError::invalid(
                field("original_investment"),
                "Original investment must be a whole number of minor units",
            ));
        }
        if class.original_investment > MAX_AMOUNT {
            return Err(CapTableError::invalid(
                field("original_investment"),
                format!("Original investment cannot exceed {MAX_AMOUNT}"),
            ));
        }
        validate_term(
            field("liquidation_multiple"),
            class.liquidation_multiple,
            "Liquidation multiple",
            &class.series_name,
        )?;
        validate_term(
            field("conversion_ratio"),
            class.conversion_ratio,
            "Conversion ratio",
            &class.series_name,
        )?;
        if let ParticipationType::ParticipatingCapped { cap } = class.participation {
            validate_term(
                field("participation.cap"),
                cap,
                "Participation cap",
                &class.series_name,
            )?;
        }
        if let DividendPolicy::Cumulative { rate } = class.dividend {
            if rate < Decimal::ZERO || rate > MAX_DIVIDEND_RATE {
                return Err(CapTableError::invalid(
                    field("dividend.rate"),
                    "Dividend rate must be between 0 and 0.50",
                ));
            }
        }
        if class.unpaid_dividends < Decimal::ZERO {
            return Err(CapTableError::invalid(
                field("unpaid_dividends"),
                "Unpaid dividends cannot be negative",
            ));
        }
        if !ctx.is_whole_money(class.unpaid_dividends) {
            return Err(CapTableError::invalid(
                field("unpaid_dividends"),
                "Unpaid dividends must be a whole number of minor units",
            ));
        }
        if class.unpaid_dividends > MAX_AMOUNT {
            return Err(CapTableError::invalid(
                field("unpaid_dividends"),
                format!("Unpaid dividends cannot exceed {MAX_AMOUNT}"),
            ));
        }
        if let Some(&holder) = ranks.get(&class.seniority_rank) {
            return Err(CapTableError::invalid(
                field("seniority_rank"),
                format!(
                    "Seniority rank {} is already held by {}",
                    class.seniority_rank, preferred[holder].series_name
                ),
            ));
        }
        ranks.insert(class.seniority_rank, i);
    }
    Ok(())
}

pub fn validate_common_classes(common: &[CommonShareClass]) -> CapTableResult<()> {
    for (i, class) in common.iter().enumerate() {
        if class.id.trim().is_empty() {
            return Err(CapTableError::invalid(
                format!("common[{i}].id"),
                "Class id is required",
            ));
        }
        if class.name.trim().is_empty() {
            return Err(CapTableError::invalid(
                format!("common[{i}].name"),
                "Class name is required",
            ));
        }
    }
    Ok(())
}

/// Distributions are keyed by class id, so ids must not repeat across kinds.
pub fn validate_unique_ids(
    preferred: &[PreferredShareClass],
    common: &[CommonShareClass],
) -> CapTableResult<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    let ids = preferred
        .iter()
        .enumerate()
        .map(|(i, c)| (format!("preferred[{i}].id"), c.id.as_str()))
        .chain(
            common
                .iter()
                .enumerate()
                .map(|(i, c)| (format!("common[{i}].id"), c.id.as_str())),
        );
    for (field, id) in ids {
        if !seen.insert(id) {
            return Err(CapTableError::invalid(
                field,
                format!("Duplicate class id '{id}'"),
            ));
        }
    }
    Ok(())
}
