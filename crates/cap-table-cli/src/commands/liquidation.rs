use clap::Args;
use serde_json::Value;
use tracing::info;

use cap_table_core::liquidation::waterfall::{self, LiquidationInput};

use crate::input;

/// Arguments for a liquidation waterfall
#[derive(Args)]
pub struct DistributeArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_distribute(args: DistributeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let liq_input: LiquidationInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for distribute".into());
    };
    info!(
        preferred = liq_input.preferred.len(),
        common = liq_input.common.len(),
        "Distributing exit proceeds"
    );
    let result = waterfall::analyze_liquidation(&liq_input)?;
    Ok(serde_json::to_value(result)?)
}
