use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use cap_table_core::analysis::breakeven::{self, BreakevenInput};
use cap_table_core::analysis::coverage::{self, CoverageInput};
use cap_table_core::analysis::structures::{self, StructureComparisonInput};

use crate::input;

/// Arguments for preference structure comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the preference coverage table
#[derive(Args)]
pub struct CoverageArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a breakeven sweep
#[derive(Args)]
pub struct BreakevenArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Number of exit values to evaluate (overrides the input file)
    #[arg(long)]
    pub steps: Option<u32>,

    /// Upper end of the sweep in minor units (overrides the input file)
    #[arg(long)]
    pub max_exit_value: Option<Decimal>,
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cmp_input: StructureComparisonInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for structure comparison".into());
    };
    let result = structures::compare_structures(&cmp_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_coverage(args: CoverageArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cov_input: CoverageInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for coverage".into());
    };
    let result = coverage::analyze_coverage(&cov_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_breakeven(args: BreakevenArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut be_input: BreakevenInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for breakeven".into());
    };
    if let Some(steps) = args.steps {
        be_input.steps = steps;
    }
    if let Some(max_exit_value) = args.max_exit_value {
        be_input.max_exit_value = max_exit_value;
    }
    let result = breakeven::analyze_breakeven(&be_input)?;
    Ok(serde_json::to_value(result)?)
}
