//! Size CLI command: fractional Kelly stake for a single bet.

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;

use parlay_core::{EngineConfig, KellyCriterionCalculator, KellyResult, SlipFormatter};

use super::{print_json, OutputFormat};

/// Arguments for the size command.
#[derive(Args, Debug, Clone)]
pub struct SizeArgs {
    /// Win probability of the bet
    #[arg(short, long)]
    pub probability: f64,

    /// Gross payout multiplier (decimal odds)
    #[arg(short = 'm', long)]
    pub payout: f64,

    /// Bankroll to size from
    #[arg(short, long)]
    pub bankroll: Decimal,

    /// Kelly fraction (default: from config, 0.25)
    #[arg(short, long)]
    pub fraction: Option<Decimal>,

    /// Simulated variance of net return; switches to variance-aware Kelly
    #[arg(long)]
    pub variance: Option<f64>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl SizeArgs {
    fn calculator(&self, config: &EngineConfig) -> Result<KellyCriterionCalculator> {
        let mut kelly = config.kelly.clone();
        if let Some(fraction) = self.fraction {
            kelly.fraction = fraction;
        }
        kelly.check().context("Invalid Kelly settings")?;
        Ok(kelly.calculator())
    }

    fn size(&self, config: &EngineConfig) -> Result<KellyResult> {
        let calculator = self.calculator(config)?;
        Ok(match self.variance {
            Some(variance) => calculator.size_with_variance(self.probability, self.payout, variance, self.bankroll),
            None => calculator.size(self.probability, self.payout, self.bankroll),
        })
    }
}

/// Run the size command.
pub async fn run_size(args: SizeArgs, config: &EngineConfig) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let result = args.size(config)?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => println!("{}", SlipFormatter::format_kelly(&result)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn args(probability: f64, payout: f64) -> SizeArgs {
        SizeArgs {
            probability,
            payout,
            bankroll: dec!(1000),
            fraction: None,
            variance: None,
            format: "text".to_string(),
        }
    }

    #[test]
    fn quarter_kelly_reference_bet() {
        let result = args(0.55, 2.0).size(&EngineConfig::default()).unwrap();
        assert_eq!(result.stake, dec!(25));
    }

    #[test]
    fn fraction_override_applies() {
        let mut a = args(0.55, 2.0);
        a.fraction = Some(dec!(0.5));
        let result = a.size(&EngineConfig::default()).unwrap();
        assert_eq!(result.stake, dec!(50));
    }

    #[test]
    fn invalid_fraction_is_rejected() {
        let mut a = args(0.55, 2.0);
        a.fraction = Some(dec!(1.5));
        assert!(a.size(&EngineConfig::default()).is_err());
    }

    #[test]
    fn no_edge_means_no_stake() {
        let result = args(0.40, 2.0).size(&EngineConfig::default()).unwrap();
        assert_eq!(result.stake, Decimal::ZERO);
        assert!(!result.should_bet());
    }
}
