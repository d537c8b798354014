//! `br-calc` command line
//!
//! Reads calculator parameters as JSON from a file or stdin and prints the result
//! as JSON.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use br_calculators::portfolio::{self, Allocation, AssetClass};
use br_calculators::{
    AmortizationCalculator, Calculator, EmergencyFundCalculator, FixedIncomeCalculator,
    PortfolioCalculator, RetirementCalculator, amortization,
};

/// Financial planning calculators
#[derive(Parser)]
#[command(name = "br-calc", version, about = "Financial planning calculators")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print single-line JSON instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    /// Log computation details (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// SAC or Price financing schedule
    Amortization(InputArgs),
    /// SAC and Price schedules side by side
    Compare(InputArgs),
    /// CDB, LCI, LCA or Treasury yield after income tax
    FixedIncome(InputArgs),
    /// Emergency reserve target and months to reach it
    EmergencyFund(InputArgs),
    /// Portfolio projection by asset class
    Portfolio(InputArgs),
    /// Change one allocation weight and rescale the others
    Rebalance(InputArgs),
    /// Retirement wealth and monthly income projection
    Retirement(InputArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Path to JSON input file; reads stdin when absent or "-"
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Deserialize)]
struct ComparisonInput {
    principal: Decimal,
    monthly_rate: Decimal,
    term_months: u32,
}

#[derive(Deserialize)]
struct RebalanceInput {
    weights: Allocation,
    changed: AssetClass,
    new_value: Decimal,
}

fn read_input<T: DeserializeOwned>(args: &InputArgs) -> Result<T> {
    let contents = match args.input.as_deref() {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };
    serde_json::from_str(contents.trim()).context("Failed to parse input JSON")
}

fn run<C>(args: &InputArgs) -> Result<Value>
where
    C: Calculator,
    C::Params: DeserializeOwned,
    C::Output: Serialize,
{
    let params: C::Params = read_input(args)?;
    let output = C::compute(&params)?;
    Ok(serde_json::to_value(output)?)
}

fn execute(command: &Commands) -> Result<Value> {
    match command {
        Commands::Amortization(args) => run::<AmortizationCalculator>(args),
        Commands::Compare(args) => {
            let input: ComparisonInput = read_input(args)?;
            let comparison =
                amortization::compare_systems(input.principal, input.monthly_rate, input.term_months)?;
            Ok(serde_json::to_value(comparison)?)
        }
        Commands::FixedIncome(args) => run::<FixedIncomeCalculator>(args),
        Commands::EmergencyFund(args) => run::<EmergencyFundCalculator>(args),
        Commands::Portfolio(args) => run::<PortfolioCalculator>(args),
        Commands::Rebalance(args) => {
            let input: RebalanceInput = read_input(args)?;
            let weights = portfolio::rebalance(&input.weights, input.changed, input.new_value)?;
            Ok(serde_json::to_value(weights)?)
        }
        Commands::Retirement(args) => run::<RetirementCalculator>(args),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let value = execute(&cli.command)?;
    let rendered = if cli.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    println!("{}", rendered);
    Ok(())
}
