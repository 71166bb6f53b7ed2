//! CLI commands for the parlay engine.

pub mod alternatives;
pub mod optimize;
pub mod simulate;
pub mod size;
pub mod validate;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::Serialize;

use parlay_core::{Constraints, EngineConfig, LegId, LegPool, RiskMode};

use crate::sources::load_pool;

pub use alternatives::{run_alternatives, AlternativesArgs};
pub use optimize::{run_optimize, OptimizeArgs};
pub use simulate::{run_simulate, SimulateArgs};
pub use size::{run_size, SizeArgs};
pub use validate::{run_validate, ValidateArgs};

/// Output format for command reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parses an output format from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format: '{}'. Valid formats: text, json", s)),
        }
    }
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Where leg, prediction and correlation CSV files live.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory containing legs.csv, predictions.csv and correlations.csv
    #[arg(short, long, default_value = "data", env = "PARLAY_DATA_DIR")]
    pub data_dir: PathBuf,
}

impl DataArgs {
    pub fn load(&self) -> Result<LegPool> {
        load_pool(&self.data_dir)
    }
}

/// Risk mode and constraint overrides layered over the configured `risk` section.
#[derive(Args, Debug, Clone, Default)]
pub struct RiskArgs {
    /// Risk mode: conservative, moderate, aggressive
    #[arg(long)]
    pub mode: Option<String>,

    /// Minimum legs per slip
    #[arg(long)]
    pub min_legs: Option<usize>,

    /// Maximum legs per slip
    #[arg(long)]
    pub max_legs: Option<usize>,

    /// Minimum simulated expected value per unit stake
    #[arg(long)]
    pub min_edge: Option<f64>,

    /// Maximum pairwise correlation between legs
    #[arg(long)]
    pub max_correlation: Option<f64>,
}

impl RiskArgs {
    /// Resolves the final constraint set.
    pub fn constraints(&self, config: &EngineConfig) -> Result<Constraints> {
        let mut risk = config.risk.clone();
        if let Some(mode) = &self.mode {
            risk.mode = mode.parse::<RiskMode>()?;
        }
        risk.min_legs = self.min_legs.or(risk.min_legs);
        risk.max_legs = self.max_legs.or(risk.max_legs);
        risk.min_edge = self.min_edge.or(risk.min_edge);
        risk.max_correlation = self.max_correlation.or(risk.max_correlation);
        risk.to_constraints().context("Invalid risk constraints")
    }
}

/// Turns `--legs a,b,c` into ids, rejecting an empty list.
pub fn leg_ids(legs: &[String]) -> Result<Vec<LegId>> {
    if legs.is_empty() {
        return Err(anyhow!("--legs needs at least one leg id"));
    }
    Ok(legs.iter().map(|s| LegId::from(s.trim())).collect())
}
