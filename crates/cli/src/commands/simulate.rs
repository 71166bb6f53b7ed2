//! Simulate CLI command.
//!
//! Runs the correlated Monte Carlo simulation for a hand-picked set of legs.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use parlay_core::{EngineConfig, LegId, Report};
use parlay_simulation::{CorrelatedMonteCarloSimulator, SimulationResult};

use super::{leg_ids, print_json, DataArgs, OutputFormat};

/// Arguments for the simulate command.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Comma-separated leg ids
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub legs: Vec<String>,

    /// Payout multiplier (default: product of the legs' odds)
    #[arg(short, long)]
    pub payout: Option<f64>,

    /// Number of Monte Carlo draws (default: from config)
    #[arg(long)]
    pub draws: Option<usize>,

    /// Simulation seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Run the simulate command.
pub async fn run_simulate(args: SimulateArgs, config: &EngineConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let pool = args.data.load()?;
    let ids = leg_ids(&args.legs)?;
    let indices = pool.resolve(&ids)?;

    let mut settings = config.simulation.clone();
    if let Some(seed) = args.seed {
        settings.seed = Some(seed);
    }
    let n_draws = args.draws.unwrap_or(settings.n_draws);
    let payout = args
        .payout
        .unwrap_or_else(|| indices.iter().map(|&i| pool.leg(i).payout_multiplier()).product());

    info!("Simulating {} legs with {} draws", indices.len(), n_draws);

    let refs: Vec<&LegId> = indices.iter().map(|&i| pool.leg(i).id()).collect();
    let probabilities: Vec<f64> = indices.iter().map(|&i| pool.prediction(i).probability()).collect();
    let simulator = CorrelatedMonteCarloSimulator::new(settings);
    let result = simulator
        .simulate_dense(&refs, &probabilities, &pool.submatrix(&indices), payout, n_draws)
        .context("Simulation failed")?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => println!("{}", format_text(&refs, &result)),
    }
    Ok(())
}

fn format_text(ids: &[&LegId], result: &SimulationResult) -> String {
    let legs: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
    let mut report = Report::new("SLIP SIMULATION");

    report
        .section("Inputs")
        .row("Legs", legs.join(", "))
        .row("Draws", result.n_draws)
        .row("Payout Multiplier", format!("{:.2}x", result.payout_multiplier))
        .row("Seed", result.seed);

    report
        .section("Outcome")
        .row("Naive Probability", format!("{:.2}%", result.naive_probability * 100.0))
        .row("Win Probability", format!("{:.2}%", result.win_probability * 100.0))
        .row("Expected Value", format!("{:+.4} ({:+.2}%)", result.expected_value, result.expected_value_pct))
        .row("Std Dev", format!("{:.4}", result.std_dev));

    let p = &result.percentiles;
    report
        .section("Return Distribution")
        .row("P5 / P25 / P50", format!("{:+.2} / {:+.2} / {:+.2}", p.p5, p.p25, p.p50))
        .row("P75 / P95 / P99", format!("{:+.2} / {:+.2} / {:+.2}", p.p75, p.p95, p.p99))
        .row("VaR (95%)", format!("{:.4}", result.value_at_risk_95))
        .row("CVaR (95%)", format!("{:.4}", result.conditional_var_95));

    if let Some(reg) = &result.regularization {
        report
            .section("Correlation Repair")
            .row("Min Eigenvalue", format!("{:.4}", reg.min_eigenvalue))
            .row("Clipped Eigenvalues", reg.clipped_eigenvalues)
            .row("Max Adjustment", format!("{:.4}", reg.max_adjustment));
    }
    if result.approximate {
        report.line("⚠️  Correlation matrix was regularized; figures are approximate.");
    }
    report.finish()
}
