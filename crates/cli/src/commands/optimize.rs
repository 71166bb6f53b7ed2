//! Optimize CLI command.
//!
//! Searches the leg pool for the best slips under a risk mode and,
//! when a bankroll is given, attaches Kelly stakes.

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use tracing::info;

use parlay_core::{Algorithm, EngineConfig, KellyResult, SlipFormatter};
use parlay_optimizer::{OptimizationReport, SearchStatus, SizedReport, SlipOptimizer};

use super::{print_json, DataArgs, OutputFormat, RiskArgs};

/// Arguments for the optimize command.
#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub risk: RiskArgs,

    /// Search algorithm: greedy, beam, genetic (default: from config)
    #[arg(short, long)]
    pub algorithm: Option<String>,

    /// Number of slips to return (default: from config)
    #[arg(short = 'n', long)]
    pub top_n: Option<usize>,

    /// Bankroll to size stakes from; omit to skip sizing
    #[arg(short, long)]
    pub bankroll: Option<Decimal>,

    /// Wall-clock budget in milliseconds
    #[arg(long)]
    pub time_budget_ms: Option<u64>,

    /// Simulation seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Monte Carlo draws per final evaluation
    #[arg(long)]
    pub draws: Option<usize>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl OptimizeArgs {
    /// Configuration with command-line overrides applied.
    fn config(&self, base: &EngineConfig) -> Result<EngineConfig> {
        let mut config = base.clone();
        if let Some(algorithm) = &self.algorithm {
            config.search.algorithm = algorithm.parse::<Algorithm>()?;
        }
        if let Some(top_n) = self.top_n {
            config.search.top_n = top_n;
        }
        if let Some(ms) = self.time_budget_ms {
            config.search.time_budget_ms = Some(ms);
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
        if let Some(draws) = self.draws {
            config.simulation.n_draws = draws;
        }
        config.check().context("Invalid optimizer settings")?;
        Ok(config)
    }
}

/// Run the optimize command.
pub async fn run_optimize(args: OptimizeArgs, base: &EngineConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let config = args.config(base)?;
    let constraints = args.risk.constraints(&config)?;
    let pool = args.data.load()?;
    let algorithm = config.search.algorithm;
    let top_n = config.search.top_n;

    info!(
        "Optimizing {} legs with {} search ({} mode, top {})",
        pool.len(),
        algorithm,
        constraints.mode,
        top_n
    );

    let bankroll = args.bankroll;
    let sized = tokio::task::spawn_blocking(move || -> Result<SizedReport> {
        let optimizer = SlipOptimizer::new(config)?;
        match bankroll {
            Some(bankroll) => Ok(optimizer.optimize_and_size(&pool, &constraints, algorithm, top_n, bankroll)?),
            None => {
                let report = optimizer.optimize_pool(&pool, &constraints, algorithm, top_n)?;
                Ok(SizedReport {
                    report,
                    bankroll: Decimal::ZERO,
                    sized: Vec::new(),
                })
            }
        }
    })
    .await
    .context("Optimization task failed")??;

    match format {
        OutputFormat::Json => {
            if bankroll.is_some() {
                print_json(&sized)?;
            } else {
                print_json(&sized.report)?;
            }
        }
        OutputFormat::Text => println!("{}", format_text(&sized)),
    }
    Ok(())
}

fn format_text(sized: &SizedReport) -> String {
    let report: &OptimizationReport = &sized.report;
    let stakes: Vec<Option<KellyResult>> = if sized.sized.is_empty() {
        vec![None; report.slips.len()]
    } else {
        sized.sized.iter().map(|s| Some(s.stake.clone())).collect()
    };
    let rows: Vec<_> = report.slips.iter().cloned().zip(stakes).collect();

    let title = format!("OPTIMIZED SLIPS ({})", report.algorithm.to_string().to_uppercase());
    let mut output = SlipFormatter::format_slips(&title, &rows);

    output.push_str(&format!(
        "Pool: {} legs | Evaluations: {} | Elapsed: {} ms\n",
        report.pool_size, report.evaluations, report.elapsed_ms
    ));
    match &report.status {
        SearchStatus::Complete => {}
        SearchStatus::Partial { reason } => output.push_str(&format!("⚠️  Partial result: {reason}\n")),
        SearchStatus::Infeasible { reason } => output.push_str(&format!("❌ Infeasible: {reason}\n")),
    }
    if !sized.sized.is_empty() {
        let total: Decimal = sized.sized.iter().map(|s| s.stake.stake).sum();
        output.push_str(&format!("Total stake: ${:.2} of ${:.2} bankroll\n", total, sized.bankroll));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> OptimizeArgs {
        OptimizeArgs {
            data: DataArgs {
                data_dir: "data".into(),
            },
            risk: RiskArgs::default(),
            algorithm: None,
            top_n: None,
            bankroll: None,
            time_budget_ms: None,
            seed: None,
            draws: None,
            format: "text".to_string(),
        }
    }

    #[test]
    fn overrides_apply_to_config() {
        let mut args = args();
        args.algorithm = Some("beam".to_string());
        args.top_n = Some(2);
        args.seed = Some(9);
        args.draws = Some(5_000);

        let config = args.config(&EngineConfig::default()).unwrap();
        assert_eq!(config.search.algorithm, Algorithm::Beam);
        assert_eq!(config.search.top_n, 2);
        assert_eq!(config.simulation.seed, Some(9));
        assert_eq!(config.simulation.n_draws, 5_000);
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let mut args = args();
        args.algorithm = Some("annealing".to_string());
        assert!(args.config(&EngineConfig::default()).is_err());
    }

    #[test]
    fn empty_report_text_mentions_infeasibility() {
        let sized = SizedReport {
            report: OptimizationReport {
                algorithm: Algorithm::Greedy,
                pool_size: 4,
                slips: Vec::new(),
                status: SearchStatus::Infeasible {
                    reason: "nothing fits".to_string(),
                },
                evaluations: 0,
                elapsed_ms: 1,
            },
            bankroll: Decimal::ZERO,
            sized: Vec::new(),
        };
        let text = format_text(&sized);
        assert!(text.contains("No slip satisfies the constraints."));
        assert!(text.contains("Infeasible: nothing fits"));
    }
}
