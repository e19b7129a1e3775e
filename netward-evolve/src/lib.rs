//! # Netward Evolve — genome model and genetic threshold search
//!
//! Closes the detection feedback loop: recorded enforcement outcomes are
//! replayed against candidate threshold sets, and a small genetic search
//! keeps the set that best separates threats from benign traffic. The
//! winning genome is persisted atomically and pushed into the live
//! estimator.

pub mod evolver;
pub mod genome;


pub use evolver::{synthetic_outcomes, EvolutionResult, ThresholdEvolver};
pub use genome::Genome;
