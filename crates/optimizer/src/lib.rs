//! Slip search over a leg pool.
//!
//! [`SlipOptimizer`] is the entry point: it evaluates candidate slips with the
//! correlated simulator, searches with one of three [`SearchStrategy`]
//! implementations, and sizes the winners with the Kelly calculator.
//! [`SaferAlternativeGenerator`] proposes lower-variance variants of a slip.

pub mod alternatives;
pub mod beam;
pub mod budget;
pub mod evaluator;
pub mod genetic;
pub mod greedy;
pub mod optimizer;
pub mod strategy;

#[cfg(test)]
pub(crate) mod test_support;

pub use alternatives::{
    generate_safer_alternatives, ReductionStrategy, SaferAlternative, SaferAlternativeGenerator,
};
pub use beam::BeamSearch;
pub use budget::Budget;
pub use evaluator::Evaluator;
pub use genetic::GeneticSearch;
pub use greedy::GreedySearch;
pub use optimizer::{slip_label, OptimizationReport, SizedReport, SizedSlip, SlipOptimizer};
pub use strategy::{strategy_for, SearchContext, SearchOutcome, SearchStatus, SearchStrategy};
