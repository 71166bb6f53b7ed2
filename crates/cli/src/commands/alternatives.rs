//! Alternatives CLI command.
//!
//! Evaluates a slip and proposes lower-risk variants of it.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use parlay_core::{CandidateSlip, EngineConfig, Report, SlipFormatter};
use parlay_optimizer::{SaferAlternative, SlipOptimizer};

use super::{leg_ids, print_json, DataArgs, OutputFormat, RiskArgs};

/// Arguments for the alternatives command.
#[derive(Args, Debug, Clone)]
pub struct AlternativesArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub risk: RiskArgs,

    /// Comma-separated leg ids of the original slip
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub legs: Vec<String>,

    /// Maximum number of alternatives
    #[arg(long, default_value = "5")]
    pub max: usize,

    /// Simulation seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Serialize)]
struct AlternativesOutput {
    original: CandidateSlip,
    alternatives: Vec<SaferAlternative>,
}

/// Run the alternatives command.
pub async fn run_alternatives(args: AlternativesArgs, base: &EngineConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let mut config = base.clone();
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    let constraints = args.risk.constraints(&config)?;
    let pool = args.data.load()?;
    let ids = leg_ids(&args.legs)?;
    let max = args.max;

    let output = tokio::task::spawn_blocking(move || -> Result<AlternativesOutput> {
        let optimizer = SlipOptimizer::new(config)?;
        let original = optimizer.evaluate_slip(&pool, &constraints, &ids)?;
        let alternatives = optimizer.safer_alternatives(&original, &pool, &constraints, max)?;
        Ok(AlternativesOutput { original, alternatives })
    })
    .await
    .context("Alternatives task failed")??;

    info!(
        "Found {} safer alternative(s) for a {}-leg slip",
        output.alternatives.len(),
        output.original.len()
    );

    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => println!("{}", format_text(&output)),
    }
    Ok(())
}

fn format_text(output: &AlternativesOutput) -> String {
    let mut report = Report::new("SAFER ALTERNATIVES");
    let title = format!("Original ({} legs)", output.original.len());
    SlipFormatter::write_slip_titled(&mut report, &title, &output.original, None);

    if output.alternatives.is_empty() {
        report.line("");
        report.line("No smaller slip satisfies the constraints.");
    }
    for (rank, alt) in output.alternatives.iter().enumerate() {
        SlipFormatter::write_slip(&mut report, rank + 1, &alt.slip, None);
        report
            .row("Strategy", alt.strategy)
            .row("Variance Reduction", format!("{:+.4}", alt.variance_reduction))
            .row("VaR Reduction", format!("{:+.4}", alt.var_reduction))
            .row("EV Retained", format!("{:.1}%", alt.ev_retained * 100.0))
            .row("Tradeoff", format!("{:.3}", alt.tradeoff))
            .line(format!("  {}", alt.note));
    }
    report.finish()
}
