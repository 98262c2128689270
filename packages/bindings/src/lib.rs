use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use cap_table_core::analysis::breakeven::{analyze_breakeven, BreakevenInput};
use cap_table_core::analysis::coverage::{analyze_coverage, CoverageInput};
use cap_table_core::analysis::structures::{compare_structures, StructureComparisonInput};
use cap_table_core::liquidation::waterfall::{analyze_liquidation, LiquidationInput};
use cap_table_core::CapTableResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Deserialize `input_json`, run `f`, serialize the envelope.
fn run_json<I, O>(input_json: &str, f: impl FnOnce(&I) -> CapTableResult<O>) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = f(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Liquidation
// ---------------------------------------------------------------------------

#[napi]
pub fn distribute_proceeds(input_json: String) -> NapiResult<String> {
    run_json::<LiquidationInput, _>(&input_json, analyze_liquidation)
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[napi]
pub fn compare_preference_structures(input_json: String) -> NapiResult<String> {
    run_json::<StructureComparisonInput, _>(&input_json, compare_structures)
}

#[napi]
pub fn preference_coverage(input_json: String) -> NapiResult<String> {
    run_json::<CoverageInput, _>(&input_json, analyze_coverage)
}

#[napi]
pub fn breakeven_sweep(input_json: String) -> NapiResult<String> {
    run_json::<BreakevenInput, _>(&input_json, analyze_breakeven)
}
