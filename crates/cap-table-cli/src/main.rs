mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analysis::{BreakevenArgs, CompareArgs, CoverageArgs};
use commands::liquidation::DistributeArgs;

/// Liquidation preference waterfalls for cap tables
#[derive(Parser)]
#[command(
    name = "captable",
    version,
    about = "Liquidation preference waterfalls for cap tables",
    long_about = "A CLI for distributing exit proceeds across preferred and common share \
                  classes with decimal precision. Supports seniority-ordered preferences, \
                  cumulative dividends, participation caps, conversion decisions, \
                  preference structure comparison, breakeven sweeps and coverage tables."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the liquidation waterfall for an exit event
    Distribute(DistributeArgs),
    /// Compare canonical preference structures across exit scenarios
    Compare(CompareArgs),
    /// Exit value needed to cover each class and everything senior to it
    Coverage(CoverageArgs),
    /// Sweep exit values for one class: stay preferred or convert
    Breakeven(BreakevenArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Distribute(args) => commands::liquidation::run_distribute(args),
        Commands::Compare(args) => commands::analysis::run_compare(args),
        Commands::Coverage(args) => commands::analysis::run_coverage(args),
        Commands::Breakeven(args) => commands::analysis::run_breakeven(args),
        Commands::Version => {
            println!("captable {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
