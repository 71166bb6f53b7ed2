pub mod config;
pub mod config_loader;
pub mod constraints;
pub mod correlation;
pub mod error;
pub mod formatter;
pub mod kelly;
pub mod leg;
pub mod pool;
pub mod prediction;
pub mod slip;
pub mod traits;
pub mod validation;

pub use config::{
    Algorithm, AllocationMode, EngineConfig, KellySettings, RiskSettings, SearchSettings,
    SimulationSettings,
};
pub use config_loader::ConfigLoader;
pub use constraints::{CategoryPair, Constraints, RiskMode};
pub use correlation::{CorrelationEntry, CorrelationMatrix};
pub use error::{ParlayError, Result};
pub use formatter::{Report, SlipFormatter};
pub use kelly::{
    size_stake, Allocation, AllocationStrategy, BetRequest, KellyCriterionCalculator, KellyMethod,
    KellyResult, SizingReason, StakeBounds,
};
pub use leg::{Direction, Leg, LegId, LegSpec, Odds};
pub use pool::LegPool;
pub use prediction::Prediction;
pub use slip::{diversity_score, rank_and_dedup, CandidateSlip, SlipLeg, SlipMetrics, SCORE_EPSILON};
pub use traits::{CorrelationSource, LegCatalog, PredictionSource};
pub use validation::{ConstraintValidator, RejectReason, ValidationOutcome, Violation};
