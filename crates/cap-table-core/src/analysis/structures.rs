use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::decimal_context::{safe_divide, DecimalContext};
use crate::error::CapTableError;
use crate::liquidation::share_class::{
    ClassKind, CommonShareClass, EventKind, LiquidationEvent, ParticipationType,
    PreferredShareClass,
};
use crate::liquidation::validation::{
    validate_common_classes, validate_decimal_context, validate_exit_value,
    validate_preferred_classes, validate_unique_ids,
};
use crate::liquidation::waterfall::{distribute, LiquidationAnalysis};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::CapTableResult;

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

/// The canonical preference structures compared in a term-sheet negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreferenceStructure {
    NonParticipating1x,
    Participating1x,
    CappedParticipating1x,
    NonParticipating2x,
}

pub const CANONICAL_STRUCTURES: [PreferenceStructure; 4] = [
    PreferenceStructure::NonParticipating1x,
    PreferenceStructure::Participating1x,
    PreferenceStructure::CappedParticipating1x,
    PreferenceStructure::NonParticipating2x,
];

impl PreferenceStructure {
    pub fn name(&self) -> &'static str {
        match self {
            PreferenceStructure::NonParticipating1x => "1x Non-Participating",
            PreferenceStructure::Participating1x => "1x Participating",
            PreferenceStructure::CappedParticipating1x => "1x Participating (2x cap)",
            PreferenceStructure::NonParticipating2x => "2x Non-Participating",
        }
    }

    pub fn liquidation_multiple(&self) -> Multiple {
        match self {
            PreferenceStructure::NonParticipating2x => dec!(2),
            _ => Decimal::ONE,
        }
    }

    pub fn participation(&self) -> ParticipationType {
        match self {
            PreferenceStructure::NonParticipating1x | PreferenceStructure::NonParticipating2x => {
                ParticipationType::NonParticipating
            }
            PreferenceStructure::Participating1x => ParticipationType::Participating,
            PreferenceStructure::CappedParticipating1x => {
                ParticipationType::ParticipatingCapped { cap: dec!(2) }
            }
        }
    }

    /// Copies of `base` with this structure's multiple and participation.
    pub fn apply(&self, base: &[PreferredShareClass]) -> Vec<PreferredShareClass> {
        base.iter()
            .map(|class| PreferredShareClass {
                liquidation_multiple: self.liquidation_multiple(),
                participation: self.participation(),
                ..class.clone()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureComparisonInput {
    pub base_preferred: Vec<PreferredShareClass>,
    #[serde(default)]
    pub common: Vec<CommonShareClass>,
    /// Exit values to evaluate, in minor units
    pub exit_scenarios: Vec<Money>,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub event_kind: EventKind,
    #[serde(default)]
    pub decimal_context: DecimalContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureResult {
    pub name: String,
    pub structure: PreferenceStructure,
    pub analysis: LiquidationAnalysis,
    /// Everything the preferred classes receive, converted or not
    pub preferred_total_return: Money,
    /// preferred_total_return / total_investment - 1
    pub preferred_roi: Rate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub exit_value: Money,
    pub structures: Vec<StructureResult>,
    /// Structure returning the most to preferred holders (first on ties)
    pub best_for_preferred: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureComparisonOutput {
    pub total_investment: Money,
    pub scenarios: Vec<ScenarioComparison>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Run every canonical structure at every exit value. The base classes are
/// only read; each structure works on its own copies.
pub fn compare_structure_scenarios(
    base_preferred: &[PreferredShareClass],
    common: &[CommonShareClass],
    exit_scenarios: &[Money],
    event_date: NaiveDate,
    event_kind: EventKind,
    ctx: &DecimalContext,
) -> CapTableResult<Vec<ScenarioComparison>> {
    validate_decimal_context(ctx)?;
    validate_preferred_classes(base_preferred, ctx)?;
    validate_common_classes(common)?;
    validate_unique_ids(base_preferred, common)?;
    if base_preferred.is_empty() {
        return Err(CapTableError::invalid(
            "base_preferred",
            "At least one preferred class is required",
        ));
    }
    if exit_scenarios.is_empty() {
        return Err(CapTableError::invalid(
            "exit_scenarios",
            "At least one exit scenario is required",
        ));
    }
    for (i, exit_value) in exit_scenarios.iter().enumerate() {
        validate_exit_value(&format!("exit_scenarios[{i}]"), *exit_value, ctx)?;
    }

    let total_investment: Money = base_preferred.iter().map(|c| c.original_investment).sum();
    let variants: Vec<(PreferenceStructure, Vec<PreferredShareClass>)> = CANONICAL_STRUCTURES
        .iter()
        .map(|s| (*s, s.apply(base_preferred)))
        .collect();

    let run = |exit_value: &Money| {
        run_scenario(*exit_value, &variants, common, event_date, event_kind, total_investment, ctx)
    };

    #[cfg(feature = "parallel")]
    let scenarios = exit_scenarios.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let scenarios = exit_scenarios.iter().map(run).collect();

    scenarios
}

fn run_scenario(
    exit_value: Money,
    variants: &[(PreferenceStructure, Vec<PreferredShareClass>)],
    common: &[CommonShareClass],
    event_date: NaiveDate,
    event_kind: EventKind,
    total_investment: Money,
    ctx: &DecimalContext,
) -> CapTableResult<ScenarioComparison> {
    let event = LiquidationEvent {
        exit_value,
        event_date,
        event_kind,
    };

    let mut structures = Vec::with_capacity(variants.len());
    for (structure, preferred) in variants {
        let analysis = distribute(preferred, common, &event, ctx)?;
        let preferred_total_return: Money = analysis
            .distributions
            .iter()
            .filter(|d| d.class_kind == ClassKind::Preferred)
            .map(|d| d.total_distribution)
            .sum();
        let preferred_roi =
            ctx.ratio(safe_divide(preferred_total_return, total_investment) - Decimal::ONE);
        structures.push(StructureResult {
            name: structure.name().to_string(),
            structure: *structure,
            analysis,
            preferred_total_return,
            preferred_roi,
        });
    }

    let best_for_preferred = structures
        .iter()
        .fold(None::<&StructureResult>, |best, s| match best {
            Some(b) if b.preferred_total_return >= s.preferred_total_return => Some(b),
            _ => Some(s),
        })
        .map(|s| s.name.clone())
        .unwrap_or_default();

    debug!(
        exit_value = %exit_value,
        best = %best_for_preferred,
        "Structure scenario evaluated"
    );

    Ok(ScenarioComparison {
        exit_value,
        structures,
        best_for_preferred,
    })
}

pub fn compare_structures(
    input: &StructureComparisonInput,
) -> CapTableResult<ComputationOutput<StructureComparisonOutput>> {
    let start = Instant::now();
    let scenarios = compare_structure_scenarios(
        &input.base_preferred,
        &input.common,
        &input.exit_scenarios,
        input.event_date,
        input.event_kind,
        &input.decimal_context,
    )?;
    let total_investment = input.base_preferred.iter().map(|c| c.original_investment).sum();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Preference Structure Comparison (1x NP, 1x P, 1x P capped 2x, 2x NP)",
        &serde_json::json!({
            "num_preferred_classes": input.base_preferred.len(),
            "num_scenarios": input.exit_scenarios.len(),
            "event_date": input.event_date.to_string(),
        }),
        Vec::new(),
        elapsed,
        StructureComparisonOutput {
            total_investment,
            scenarios,
        },
    ))
}
