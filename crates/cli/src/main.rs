use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod sources;

use commands::{AlternativesArgs, OptimizeArgs, SimulateArgs, SizeArgs, ValidateArgs};

#[derive(Parser)]
#[command(name = "parlay")]
#[command(about = "Correlation-aware parlay slip optimizer", long_about = None)]
struct Cli {
    /// Directory holding Parlay.toml
    #[arg(long, global = true, default_value = "config", env = "PARLAY_CONFIG_DIR")]
    config_dir: PathBuf,

    /// Profile overlay (loads Parlay.{profile}.toml)
    #[arg(long, global = true, env = "PARLAY_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the leg pool for the best slips
    Optimize(OptimizeArgs),
    /// Simulate the joint outcome of a set of legs
    Simulate(SimulateArgs),
    /// Size a stake with fractional Kelly
    Size(SizeArgs),
    /// Propose lower-risk variants of a slip
    Alternatives(AlternativesArgs),
    /// Check a slip against the risk constraints
    Validate(ValidateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = parlay_core::ConfigLoader::load_from(&cli.config_dir, cli.profile.as_deref())?;
    tracing::debug!(
        "Loaded configuration from {} (profile: {})",
        cli.config_dir.display(),
        cli.profile.as_deref().unwrap_or("none")
    );

    match cli.command {
        Commands::Optimize(args) => {
            commands::run_optimize(args, &config).await?;
        }
        Commands::Simulate(args) => {
            commands::run_simulate(args, &config).await?;
        }
        Commands::Size(args) => {
            commands::run_size(args, &config).await?;
        }
        Commands::Alternatives(args) => {
            commands::run_alternatives(args, &config).await?;
        }
        Commands::Validate(args) => {
            commands::run_validate(args, &config).await?;
        }
    }

    Ok(())
}
