use cap_table_core::analysis::breakeven::{
    analyze_breakeven, breakeven, find_crossover, BreakevenInput,
};
use cap_table_core::analysis::coverage::{analyze_coverage, CoverageInput};
use cap_table_core::analysis::structures::{
    compare_structures, PreferenceStructure, StructureComparisonInput,
};
use cap_table_core::liquidation::conversion::ConversionChoice;
use cap_table_core::liquidation::share_class::{
    CommonShareClass, DividendPolicy, EventKind, LiquidationEvent, ParticipationType,
    PreferredShareClass,
};
use cap_table_core::liquidation::waterfall::distribute;
use cap_table_core::{DecimalContext, Money, RoundingMode};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn series(name: &str, shares: u64, investment: Money, rank: u32) -> PreferredShareClass {
    PreferredShareClass {
        id: name.to_lowercase().replace(' ', "-"),
        series_name: name.into(),
        shares,
        original_investment: investment,
        liquidation_multiple: dec!(1),
        participation: ParticipationType::NonParticipating,
        seniority_rank: rank,
        dividend: DividendPolicy::None,
        unpaid_dividends: Decimal::ZERO,
        conversion_ratio: dec!(1),
        issue_date: date(2022, 1, 1),
    }
}

fn common(shares: u64) -> Vec<CommonShareClass> {
    vec![CommonShareClass {
        id: "common".into(),
        name: "Common".into(),
        shares,
    }]
}

// ===========================================================================
// Coverage
// ===========================================================================

#[test]
fn test_coverage_matches_waterfall_threshold() {
    let mut senior = series("Series B", 2_000_000, dec!(300_000_000), 0);
    senior.liquidation_multiple = dec!(1.5);
    let preferred = vec![series("Series A", 1_000_000, dec!(100_000_000), 1), senior];
    let ctx = DecimalContext::default();

    let out = analyze_coverage(&CoverageInput {
        preferred: preferred.clone(),
        event_date: date(2024, 1, 1),
        decimal_context: ctx,
    })
    .unwrap();
    assert_eq!(out.result.rows[0].series_name, "Series B");
    assert_eq!(out.result.rows[0].cumulative_coverage, dec!(450_000_000));
    assert_eq!(out.result.total_claims, dec!(550_000_000));

    // At exactly the senior threshold, the junior receives nothing
    let ev = LiquidationEvent {
        exit_value: out.result.rows[0].cumulative_coverage,
        event_date: date(2024, 1, 1),
        event_kind: EventKind::Acquisition,
    };
    let analysis = distribute(&preferred, &common(5_000_000), &ev, &ctx).unwrap();
    let junior = analysis
        .distributions
        .iter()
        .find(|d| d.class_id == "series-a")
        .unwrap();
    assert_eq!(junior.total_distribution, Decimal::ZERO);
}

// ===========================================================================
// Breakeven
// ===========================================================================

#[test]
fn test_breakeven_crossover_for_larger_pool() {
    let class = series("Series A", 2_000_000, dec!(500_000_000), 0);
    let ctx = DecimalContext::default();
    // $5M preference vs 2/10 of the exit less that preference: indifferent at $30M
    let points = breakeven(&class, 8_000_000, dec!(5_000_000_000), 50, None, &ctx).unwrap();
    assert_eq!(points.len(), 50);
    assert_eq!(points[29].exit_value, dec!(3_000_000_000));
    assert_eq!(points[29].as_common_value, dec!(500_000_000));
    assert_eq!(points[29].optimal_choice, ConversionChoice::Preferred);
    assert_eq!(find_crossover(&points), Some(dec!(3_100_000_000)));
}

#[test]
fn test_breakeven_envelope_from_json() {
    let json = r#"{
        "preferred_class": {
            "id": "seed",
            "series_name": "Seed",
            "shares": 500000,
            "original_investment": "25000000",
            "liquidation_multiple": "1",
            "participation": "NonParticipating",
            "seniority_rank": 0,
            "conversion_ratio": "2",
            "issue_date": "2021-06-01"
        },
        "common_shares": 9000000,
        "max_exit_value": "1000000000",
        "steps": 10,
        "decimal_context": { "rounding": "half_up" }
    }"#;
    let input: BreakevenInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.decimal_context.rounding, RoundingMode::HalfUp);
    assert_eq!(input.decimal_context.ratio_scale, 8);

    let out = analyze_breakeven(&input).unwrap();
    // 1M as-converted shares out of 10M, after the $250k preference:
    // indifferent at $2.75M
    assert_eq!(out.result.crossover_exit_value, Some(dec!(300_000_000)));
    assert!(out.warnings.is_empty());
}

// ===========================================================================
// Structure comparison
// ===========================================================================

#[test]
fn test_structure_comparison_two_series() {
    let input = StructureComparisonInput {
        base_preferred: vec![
            series("Series A", 1_000_000, dec!(100_000_000), 1),
            series("Series B", 1_000_000, dec!(300_000_000), 0),
        ],
        common: common(8_000_000),
        exit_scenarios: vec![dec!(400_000_000), dec!(5_000_000_000)],
        event_date: date(2024, 12, 31),
        event_kind: EventKind::Acquisition,
        decimal_context: DecimalContext::default(),
    };
    let out = compare_structures(&input).unwrap();
    assert_eq!(out.result.total_investment, dec!(400_000_000));
    assert_eq!(out.result.scenarios.len(), 2);

    // $4M exit: 1x structures return exactly the $4M invested
    let low = &out.result.scenarios[0];
    assert_eq!(low.structures[0].structure, PreferenceStructure::NonParticipating1x);
    assert_eq!(low.structures[0].preferred_total_return, dec!(400_000_000));
    assert_eq!(low.structures[0].preferred_roi, Decimal::ZERO);
    // 2x Series B claims $6M senior and takes the whole exit
    assert_eq!(low.structures[3].preferred_total_return, dec!(400_000_000));

    // $50M exit under 1x: both series convert and give up their preferences
    let high = &out.result.scenarios[1];
    let summary = &high.structures[0].analysis.summary;
    assert_eq!(summary.total_distributed, dec!(4_600_000_000));
    assert_eq!(summary.undistributed, dec!(400_000_000));

    // Every scenario's waterfall accounts for the whole exit value
    for scenario in &out.result.scenarios {
        for s in &scenario.structures {
            let total: Money = s
                .analysis
                .distributions
                .iter()
                .map(|d| d.total_distribution)
                .sum();
            assert!(total <= scenario.exit_value);
            assert_eq!(total + s.analysis.summary.undistributed, scenario.exit_value);
        }
    }
}

#[test]
fn test_structure_comparison_leaves_base_untouched() {
    let base = vec![series("Series A", 1_000_000, dec!(100_000_000), 0)];
    let input = StructureComparisonInput {
        base_preferred: base.clone(),
        common: common(4_000_000),
        exit_scenarios: vec![dec!(1_000_000_000)],
        event_date: date(2024, 12, 31),
        event_kind: EventKind::Ipo,
        decimal_context: DecimalContext::default(),
    };
    compare_structures(&input).unwrap();
    assert_eq!(input.base_preferred, base);
}
