//! Correlated Monte Carlo simulation for parlay slips.
//!
//! Legs are joined through a Gaussian copula: independent standard normals
//! are correlated with the Cholesky factor of the slip's correlation matrix,
//! mapped to uniforms through the normal CDF and compared with each leg's win
//! probability. Matrices that are not positive semi-definite are repaired
//! first and the repair is reported on the result.

pub mod distribution;
pub mod matrix;
pub mod normal;
pub mod simulator;

pub use distribution::{PercentileLadder, ReturnDistribution};
pub use matrix::{Factorization, Regularization};
pub use simulator::{derive_seed, CorrelatedMonteCarloSimulator, SimulationResult};
