//! Validate CLI command: lists every constraint a slip breaks.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use parlay_core::{CandidateSlip, ConstraintValidator, EngineConfig, SlipFormatter, Violation};
use parlay_optimizer::SlipOptimizer;

use super::{leg_ids, print_json, DataArgs, OutputFormat, RiskArgs};

/// Arguments for the validate command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub risk: RiskArgs,

    /// Comma-separated leg ids of the slip to check
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub legs: Vec<String>,

    /// Simulation seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    valid: bool,
    slip: CandidateSlip,
    violations: Vec<Violation>,
}

/// Run the validate command. Fails when the slip breaks any rule.
pub async fn run_validate(args: ValidateArgs, base: &EngineConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let mut config = base.clone();
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    let constraints = args.risk.constraints(&config)?;
    let pool = args.data.load()?;
    let ids = leg_ids(&args.legs)?;

    let optimizer = SlipOptimizer::new(config)?;
    let slip = optimizer.evaluate_slip(&pool, &constraints, &ids)?;
    let violations = ConstraintValidator::validate_all(&slip, &constraints);

    match format {
        OutputFormat::Json => print_json(&ValidationOutput {
            valid: violations.is_empty(),
            slip: slip.clone(),
            violations: violations.clone(),
        })?,
        OutputFormat::Text => println!("{}", SlipFormatter::format_violations(&slip, &violations)),
    }

    if !violations.is_empty() {
        bail!("Slip fails {} constraint(s) under {} mode", violations.len(), constraints.mode);
    }
    Ok(())
}
